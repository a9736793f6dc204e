use cbm_editor_core::{
    color::{ColorParseError, ColorSample},
    orchestrator::SubmitPolicy,
};

const DOCUMENTATION: &str = r##"# CBM editor preferences. You may edit this file, but be aware that formatting and comments will not
# be preserved, and all keys and values are case sensitive.

# title = "CBM Editor"            Shown alongside every error.
# submit_policy = "reject"        "reject" refuses a new operation while one is running, "queue" runs it afterwards.
# background_color = "#000000"    Background used when saving, unless the document provides one. "R,G,B" also works.
# export_extension = "png"        Extension of exported images.

"##;

#[must_use]
pub fn preferences_dir() -> Option<std::path::PathBuf> {
    let mut base_dir = dirs::preference_dir()?;
    base_dir.push(env!("CARGO_PKG_NAME"));
    Some(base_dir)
}

#[derive(serde::Serialize, serde::Deserialize, Copy, Clone, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PolicySetting {
    #[default]
    Reject,
    Queue,
}
impl From<PolicySetting> for SubmitPolicy {
    fn from(value: PolicySetting) -> Self {
        match value {
            PolicySetting::Reject => Self::Reject,
            PolicySetting::Queue => Self::Queue,
        }
    }
}

#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    pub title: String,
    pub submit_policy: PolicySetting,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    pub export_extension: String,
}
impl Default for Settings {
    fn default() -> Self {
        Self {
            title: "CBM Editor".to_owned(),
            submit_policy: PolicySetting::default(),
            background_color: None,
            export_extension: "png".to_owned(),
        }
    }
}
impl Settings {
    pub const FILENAME: &'static str = "preferences.toml";
    /// Where preferences live, if the platform has a preference directory.
    #[must_use]
    pub fn default_path() -> Option<std::path::PathBuf> {
        let mut dir = preferences_dir()?;
        dir.push(Self::FILENAME);
        Some(dir)
    }
    /// # Errors
    /// If the file can't be read or isn't valid preferences.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        let string = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&string)?)
    }
    /// Load from `path`, falling back to defaults if that fails for any reason.
    #[must_use]
    pub fn load_or_default(path: &std::path::Path) -> Self {
        match Self::load(path) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("Preferences at {path:?} weren't available, defaulting: {e:#}");
                Self::default()
            }
        }
    }
    /// # Errors
    /// If the background color isn't a color.
    pub fn background(&self) -> Result<Option<ColorSample>, ColorParseError> {
        self.background_color.as_deref().map(str::parse).transpose()
    }
    /// # Errors
    /// If serialization or writing fails.
    pub fn save(&self, path: &std::path::Path) -> anyhow::Result<()> {
        // Only the leaf, a missing preference root is left alone.
        if let Some(parent) = path.parent() {
            let _ = std::fs::DirBuilder::new().create(parent);
        }
        let string = DOCUMENTATION.to_owned() + &toml::ser::to_string_pretty(self)?;
        std::fs::write(path, string)?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::{PolicySetting, Settings};
    use cbm_editor_core::{color::ColorSample, orchestrator::SubmitPolicy};

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(Settings::FILENAME);
        let settings = Settings {
            title: "Hangar".into(),
            submit_policy: PolicySetting::Queue,
            background_color: Some("#102030".into()),
            export_extension: "bmp".into(),
        };
        settings.save(&path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("# CBM editor preferences."));
        assert!(written.contains(r#"submit_policy = "queue""#));
        let loaded = Settings::load(&path).unwrap();
        assert_eq!(loaded, settings);
        assert_eq!(
            loaded.background().unwrap(),
            Some(ColorSample::new(0x10, 0x20, 0x30))
        );
        assert_eq!(SubmitPolicy::from(loaded.submit_policy), SubmitPolicy::Queue);
    }
    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(Settings::FILENAME);
        std::fs::write(&path, "background_color = \"1,2,3\"\n").unwrap();

        let loaded = Settings::load_or_default(&path);
        assert_eq!(loaded.title, Settings::default().title);
        assert_eq!(loaded.submit_policy, PolicySetting::Reject);
        assert_eq!(loaded.background().unwrap(), Some(ColorSample::new(1, 2, 3)));
    }
    #[test]
    fn broken_file_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(Settings::FILENAME);
        std::fs::write(&path, "submit_policy = \"sometimes\"").unwrap();
        assert_eq!(Settings::load_or_default(&path), Settings::default());
        assert_eq!(
            Settings::load_or_default(&dir.path().join("missing.toml")),
            Settings::default()
        );
    }
    #[test]
    fn bad_background_is_an_error() {
        let settings = Settings {
            background_color: Some("teal".into()),
            ..Settings::default()
        };
        assert!(settings.background().is_err());
        assert_eq!(Settings::default().background().unwrap(), None);
    }
}
