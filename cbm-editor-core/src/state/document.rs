use super::image::Image;
use crate::{color::ColorSample, color_key};

/// An editable image container: an ordered list of images.
#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub struct Document {
    /// The path from which the document was loaded or saved, or None if created as new.
    pub path: Option<std::path::PathBuf>,
    pub images: Vec<Image>,
}
impl Document {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
    /// Name used to derive exported file names, inferred from the path.
    #[must_use]
    pub fn stem(&self) -> String {
        self.path
            .as_deref()
            .and_then(std::path::Path::file_stem)
            .map_or_else(|| "untitled".to_owned(), |s| s.to_string_lossy().into_owned())
    }
    /// Background color of the document, as stored in the first image's background slot.
    #[must_use]
    pub fn background_color(&self) -> Option<ColorSample> {
        self.images.first()?.background_color()
    }
    /// Write `color` into the background slot of every image.
    pub fn set_background_color(&mut self, color: ColorSample) {
        for image in &mut self.images {
            color_key::set_background_color(image, color);
        }
    }
}
