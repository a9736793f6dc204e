#![warn(clippy::pedantic)]

mod settings;

use cbm_editor_core::{
    color::ColorSample,
    io::{DirectoryStore, PngCodec},
    session::{Dispatch, Editor, Notifier},
};
use clap::Parser;
use std::{path::PathBuf, sync::Arc};

/// Edit a palette image container from the command line.
///
/// Steps run in the order the options are listed here, regardless of the order given.
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// Document directory to open. A new, empty document is used otherwise.
    #[arg(long, value_name = "DIR")]
    open: Option<PathBuf>,
    /// Append these images, selecting the last
    #[arg(long, value_name = "PNG", num_args = 1..)]
    add: Vec<PathBuf>,
    /// Select an image by index
    #[arg(long, value_name = "N")]
    select: Option<usize>,
    /// Append an empty image and select it
    #[arg(long)]
    new_image: bool,
    /// Replace the selected image's content
    #[arg(long, value_name = "PNG")]
    replace: Option<PathBuf>,
    /// Delete the selected image
    #[arg(long)]
    delete: bool,
    /// Background color used when saving
    #[arg(long, value_name = "RGB")]
    background: Option<ColorSample>,
    /// Cut the color of pixel X,Y of the selected image out of it
    #[arg(long, value_name = "X,Y", value_parser = parse_point)]
    pick: Option<(u32, u32)>,
    /// Cut a color out of the selected image, as "R,G,B" or "#RRGGBB"
    #[arg(long, value_name = "RGB")]
    color_key: Option<ColorSample>,
    /// Cut every color in the box between two corner colors out of the selected image
    #[arg(long, num_args = 2, value_names = ["RGB", "RGB"])]
    color_key_range: Vec<ColorSample>,
    /// Export the selected image into this directory
    #[arg(long, value_name = "DIR")]
    export: Option<PathBuf>,
    /// Save the document where it was opened from
    #[arg(long, conflicts_with = "save_as")]
    save: bool,
    /// Save the document into this directory
    #[arg(long, value_name = "DIR")]
    save_as: Option<PathBuf>,
    /// Preferences file to use instead of the user's
    #[arg(long, env = "CBM_EDITOR_PREFERENCES", value_name = "FILE")]
    preferences: Option<PathBuf>,
}

fn parse_point(point: &str) -> Result<(u32, u32), String> {
    let (x, y) = point
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y, got {point:?}"))?;
    let coordinate = |c: &str| c.trim().parse::<u32>().map_err(|e| format!("{c:?}: {e}"));
    Ok((coordinate(x)?, coordinate(y)?))
}

/// Forwards editor notifications to the log.
#[derive(Default)]
struct LogNotifier {
    errors: usize,
}
impl Notifier for LogNotifier {
    fn report_error(&mut self, message: &str, context: &str) {
        self.errors += 1;
        log::error!("[{context}] {message}");
    }
    fn document_changed(&mut self) {
        log::trace!("Document changed");
    }
    fn busy_changed(&mut self, busy: bool) {
        log::trace!("Busy: {busy}");
    }
}

/// Run one action to completion. Skipped and failed actions are errors.
fn step(
    editor: &mut Editor<LogNotifier>,
    action: &str,
    run: impl FnOnce(&mut Editor<LogNotifier>) -> Dispatch,
) -> anyhow::Result<()> {
    let errors = editor.state().notifier().errors;
    match run(editor) {
        Dispatch::Submitted(id) => {
            log::info!("{action} ({id})");
            editor.run_until_idle();
        }
        Dispatch::Skipped(reason) => anyhow::bail!("cannot {action}: {reason:?}"),
    }
    if editor.state().notifier().errors > errors {
        anyhow::bail!("{action} failed");
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let has_term = std::io::IsTerminal::is_terminal(&std::io::stdin());
    // Log to a terminal, if available. Else, log to "log.out" in the working directory.
    if has_term {
        env_logger::builder()
            .filter_level(log::LevelFilter::Info)
            .parse_default_env()
            .init();
    } else {
        let _ = simple_logging::log_to_file("log.out", log::LevelFilter::Info);
    }

    let args = Args::parse();

    let preferences_path = args.preferences.clone().or_else(settings::Settings::default_path);
    let preferences = match preferences_path.as_deref() {
        Some(path) if path.exists() => settings::Settings::load_or_default(path),
        Some(path) => {
            // First run, leave an editable file behind.
            let preferences = settings::Settings::default();
            if let Err(e) = preferences.save(path) {
                log::warn!("Failed to save preferences:\n{e:?}");
            }
            preferences
        }
        None => {
            log::warn!("No preferences directory, defaulting.");
            settings::Settings::default()
        }
    };

    let mut editor = Editor::new(
        LogNotifier::default(),
        Arc::new(DirectoryStore::new(PngCodec)),
        Arc::new(PngCodec),
        preferences.title.clone(),
        preferences.submit_policy.into(),
    )?;
    match preferences.background() {
        Ok(color) => editor.state_mut().background_color = color,
        Err(e) => log::warn!("Ignoring preferred background color: {e}"),
    }

    match &args.open {
        Some(path) => step(&mut editor, "open", |e| e.open(path.clone()))?,
        None => step(&mut editor, "create document", Editor::new_document)?,
    }
    if !args.add.is_empty() {
        step(&mut editor, "add images", |e| e.add_images(args.add.iter()))?;
    }
    if let Some(index) = args.select {
        editor.state_mut().select(Some(index));
        anyhow::ensure!(
            editor.state().selected().is_some(),
            "no image {index} to select"
        );
    }
    if args.new_image {
        step(&mut editor, "add empty image", Editor::new_image)?;
    }
    if let Some(path) = &args.replace {
        step(&mut editor, "replace image", |e| e.replace_image(path.clone()))?;
    }
    if args.delete {
        step(&mut editor, "delete image", Editor::delete_image)?;
    }
    if let Some(color) = args.background {
        editor.state_mut().background_color = Some(color);
    }
    if let Some((x, y)) = args.pick {
        let (width, height) = editor
            .state()
            .selected_image()
            .map(|image| (image.width(), image.height()))
            .ok_or_else(|| anyhow::anyhow!("cannot pick a color: no image selected"))?;
        // A view the size of the image, sampled at the pixel's center.
        let color = editor
            .pick_color(
                f64::from(x) + 0.5,
                f64::from(y) + 0.5,
                f64::from(width),
                f64::from(height),
            )
            .ok_or_else(|| anyhow::anyhow!("cannot pick a color from an empty image"))?;
        log::info!("Picked {color} at {x},{y}");
        step(&mut editor, "apply picked color key", Editor::apply_color_key)?;
    }
    if let Some(color) = args.color_key {
        editor.state_mut().color_key = Some(color);
        step(&mut editor, "apply color key", Editor::apply_color_key)?;
    }
    if let [key0, key1] = args.color_key_range[..] {
        let state = editor.state_mut();
        state.color_key0 = Some(key0);
        state.color_key1 = Some(key1);
        step(&mut editor, "apply color key range", Editor::apply_color_key_range)?;
    }
    if let Some(directory) = &args.export {
        let extension = preferences.export_extension.as_str();
        step(&mut editor, "export image", |e| {
            e.export_image(directory.clone(), extension)
        })?;
    }
    if args.save {
        step(&mut editor, "save", Editor::save)?;
    }
    if let Some(path) = &args.save_as {
        step(&mut editor, "save as", |e| e.save_as(path.clone()))?;
    }
    Ok(())
}
