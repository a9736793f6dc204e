//! # Editor session
//!
//! The owner-thread side of the editor: the open document, the image selection and the colors picked
//! by the user, plus every editing action as an orchestrated task.
//!
//! The document is single-writer by construction. An action moves it out of [`EditorState`] into its
//! task and the task hands it back through its marshal when done, whether it succeeded or not.
//! While a task holds it, [`EditorState::document`] is `None`.

use crate::{
    color::ColorSample,
    color_key::ColorKey,
    io::{DocumentStore, ImageCodec},
    orchestrator::{BusyFlag, Marshal, Orchestrator, Owner, SubmitError, SubmitPolicy, TaskId},
    sample,
    state::{Document, Image},
};
use anyhow::Context;
use std::{path::PathBuf, sync::Arc};

/// The presentation layer, as seen by the editor. Called only on the owner thread.
pub trait Notifier: 'static {
    /// Show a failure to the user. `context` is the editor's title.
    fn report_error(&mut self, message: &str, context: &str);
    /// The document or selection changed structurally and should be redrawn.
    fn document_changed(&mut self);
    fn busy_changed(&mut self, _busy: bool) {}
}

/// Result of requesting an action.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Dispatch {
    Submitted(TaskId),
    /// A precondition did not hold and nothing was done.
    Skipped(SkipReason),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SkipReason {
    Busy,
    NoDocument,
    NoSelection,
    NoColorKey,
    /// The document was never saved, use `save_as`.
    NoPath,
    /// The background worker is gone. This has already been reported.
    WorkerGone,
}

/// What happens to the selection once a task hands the document back.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Selection {
    Keep,
    Clear,
    Last,
}

pub struct EditorState<N> {
    document: Option<Document>,
    selected: Option<usize>,
    /// Written to every image's background slot on save.
    pub background_color: Option<ColorSample>,
    pub color_key: Option<ColorSample>,
    pub color_key0: Option<ColorSample>,
    pub color_key1: Option<ColorSample>,
    notifier: N,
}
impl<N: Notifier> EditorState<N> {
    fn new(notifier: N) -> Self {
        Self {
            document: None,
            selected: None,
            background_color: None,
            color_key: None,
            color_key0: None,
            color_key1: None,
            notifier,
        }
    }
    /// `None` when no document is open, or while a task holds it.
    #[must_use]
    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }
    #[must_use]
    pub fn selected(&self) -> Option<usize> {
        self.selected
    }
    #[must_use]
    pub fn selected_image(&self) -> Option<&Image> {
        self.document.as_ref()?.images.get(self.selected?)
    }
    /// Select an image by index. Out-of-range indices clear the selection.
    pub fn select(&mut self, index: Option<usize>) {
        let count = self.document.as_ref().map_or(0, |d| d.images.len());
        self.selected = index.filter(|&index| index < count);
    }
    #[must_use]
    pub fn notifier(&self) -> &N {
        &self.notifier
    }
    pub fn notifier_mut(&mut self) -> &mut N {
        &mut self.notifier
    }
    fn restore_document(&mut self, document: Document, selection: Selection) {
        let count = document.images.len();
        self.document = Some(document);
        self.selected = match selection {
            Selection::Keep => self.selected.filter(|&index| index < count),
            Selection::Clear => None,
            Selection::Last => count.checked_sub(1),
        };
        self.notifier.document_changed();
    }
}
impl<N: Notifier> Owner for EditorState<N> {
    fn report_error(&mut self, message: &str, context: &str) {
        self.notifier.report_error(message, context);
    }
    fn busy_changed(&mut self, busy: bool) {
        self.notifier.busy_changed(busy);
    }
}

type EditorMarshal<N> = Marshal<EditorState<N>>;

pub struct Editor<N> {
    orchestrator: Orchestrator<EditorState<N>>,
    state: EditorState<N>,
    store: Arc<dyn DocumentStore>,
    codec: Arc<dyn ImageCodec>,
}
impl<N: Notifier> Editor<N> {
    /// # Errors
    /// If the background worker could not be started.
    pub fn new(
        notifier: N,
        store: Arc<dyn DocumentStore>,
        codec: Arc<dyn ImageCodec>,
        title: impl Into<String>,
        policy: SubmitPolicy,
    ) -> std::io::Result<Self> {
        Ok(Self {
            orchestrator: Orchestrator::new(title, policy)?,
            state: EditorState::new(notifier),
            store,
            codec,
        })
    }
    #[must_use]
    pub fn state(&self) -> &EditorState<N> {
        &self.state
    }
    pub fn state_mut(&mut self) -> &mut EditorState<N> {
        &mut self.state
    }
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.orchestrator.is_busy()
    }
    #[must_use]
    pub fn busy_flag(&self) -> BusyFlag {
        self.orchestrator.busy_flag()
    }
    /// Handle everything the worker has sent so far. See [`Orchestrator::pump`].
    pub fn pump(&mut self) -> usize {
        self.orchestrator.pump(&mut self.state)
    }
    pub fn run_until_idle(&mut self) {
        self.orchestrator.run_until_idle(&mut self.state);
    }
    pub fn run_until_idle_timeout(&mut self, timeout: std::time::Duration) -> bool {
        self.orchestrator
            .run_until_idle_timeout(&mut self.state, timeout)
    }

    /// Replace the document with an empty one.
    pub fn new_document(&mut self) -> Dispatch {
        if let Err(reason) = self.ready() {
            return skip("new document", reason);
        }
        self.dispatch(|marshal: &EditorMarshal<N>| {
            let document = Document::new();
            marshal.invoke(move |state| state.restore_document(document, Selection::Clear))?;
            Ok(())
        })
    }
    /// Load a document, replacing the current one. On failure the current document is kept.
    pub fn open(&mut self, path: impl Into<PathBuf>) -> Dispatch {
        if let Err(reason) = self.ready() {
            return skip("open", reason);
        }
        let path = path.into();
        let store = Arc::clone(&self.store);
        self.dispatch(move |marshal: &EditorMarshal<N>| {
            let document = store
                .load(&path)
                .with_context(|| path.display().to_string())?;
            // Images without a palette count as a black background.
            let background = (!document.images.is_empty())
                .then(|| document.background_color().unwrap_or(ColorSample::BLACK));
            marshal.invoke(move |state| {
                if background.is_some() {
                    state.background_color = background;
                }
                state.restore_document(document, Selection::Clear);
            })?;
            Ok(())
        })
    }
    /// Save the document where it was loaded from or last saved to.
    pub fn save(&mut self) -> Dispatch {
        if let Err(reason) = self.ready().and_then(|()| self.has_document()) {
            return skip("save", reason);
        }
        if self.state.document.as_ref().is_some_and(|d| d.path.is_none()) {
            return skip("save", SkipReason::NoPath);
        }
        self.save_to(None)
    }
    pub fn save_as(&mut self, path: impl Into<PathBuf>) -> Dispatch {
        if let Err(reason) = self.ready().and_then(|()| self.has_document()) {
            return skip("save as", reason);
        }
        self.save_to(Some(path.into()))
    }
    /// Save to `path`, or to the document's own path if `None`.
    fn save_to(&mut self, path: Option<PathBuf>) -> Dispatch {
        let background = self.state.background_color.unwrap_or(ColorSample::BLACK);
        let store = Arc::clone(&self.store);
        self.with_document(move |document, _| {
            let path = match path {
                Some(path) => path,
                None => document
                    .path
                    .clone()
                    .context("document was never saved")?,
            };
            document.set_background_color(background);
            store.decompress(document);
            store
                .save(document, &path)
                .with_context(|| path.display().to_string())?;
            document.path = Some(path);
            Ok(Selection::Keep)
        })
    }
    /// Append a blank image and select it.
    pub fn new_image(&mut self) -> Dispatch {
        if let Err(reason) = self.ready().and_then(|()| self.has_document()) {
            return skip("new image", reason);
        }
        self.with_document(|document, _| {
            document.images.push(Image::blank());
            Ok(Selection::Last)
        })
    }
    /// Decode every file and append them in order, selecting the last.
    /// If any fails, none are added.
    pub fn add_images<I, P>(&mut self, paths: I) -> Dispatch
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        if let Err(reason) = self.ready().and_then(|()| self.has_document()) {
            return skip("add images", reason);
        }
        let paths: Vec<PathBuf> = paths.into_iter().map(Into::into).collect();
        let codec = Arc::clone(&self.codec);
        self.with_document(move |document, _| {
            let images = paths
                .iter()
                .map(|path| {
                    codec
                        .load(path)
                        .with_context(|| path.display().to_string())
                })
                .collect::<anyhow::Result<Vec<_>>>()?;
            document.images.extend(images);
            Ok(Selection::Last)
        })
    }
    /// Replace the selected image's content with a file.
    pub fn replace_image(&mut self, path: impl Into<PathBuf>) -> Dispatch {
        if let Err(reason) = self.ready().and_then(|()| self.selection()) {
            return skip("replace image", reason);
        }
        let path = path.into();
        let codec = Arc::clone(&self.codec);
        self.with_document(move |document, selected| {
            let (_, image) = selected_mut(document, selected)?;
            codec
                .replace_content(image, &path)
                .with_context(|| path.display().to_string())?;
            Ok(Selection::Keep)
        })
    }
    /// Remove the selected image and clear the selection.
    pub fn delete_image(&mut self) -> Dispatch {
        if let Err(reason) = self.ready().and_then(|()| self.selection()) {
            return skip("delete image", reason);
        }
        self.with_document(move |document, selected| {
            let (index, _) = selected_mut(document, selected)?;
            document.images.remove(index);
            Ok(Selection::Clear)
        })
    }
    /// Encode the selected image into `directory` as `<document name>-<index>.<extension>`.
    pub fn export_image(&mut self, directory: impl Into<PathBuf>, extension: &str) -> Dispatch {
        if let Err(reason) = self.ready().and_then(|()| self.selection()) {
            return skip("export image", reason);
        }
        let directory = directory.into();
        let extension = extension.trim_start_matches('.').to_owned();
        let codec = Arc::clone(&self.codec);
        self.with_document(move |document, selected| {
            let stem = document.stem();
            let (index, image) = selected_mut(document, selected)?;
            let file = directory.join(format!("{stem}-{index}.{extension}"));
            codec
                .save(image, &file)
                .with_context(|| file.display().to_string())?;
            log::debug!("Exported image {index} to {file:?}");
            Ok(Selection::Keep)
        })
    }
    /// Cut the picked [`EditorState::color_key`] out of the selected image.
    pub fn apply_color_key(&mut self) -> Dispatch {
        let checks = self
            .ready()
            .and_then(|()| self.selection())
            .and_then(|()| self.state.color_key.ok_or(SkipReason::NoColorKey));
        match checks {
            Ok(key) => self.key_image(ColorKey::Single(key)),
            Err(reason) => skip("color key", reason),
        }
    }
    /// Cut every color in the box spanned by [`EditorState::color_key0`] and
    /// [`EditorState::color_key1`] out of the selected image.
    pub fn apply_color_key_range(&mut self) -> Dispatch {
        let checks = self.ready().and_then(|()| self.selection()).and_then(|()| {
            match (self.state.color_key0, self.state.color_key1) {
                (Some(key0), Some(key1)) => Ok(ColorKey::range(key0, key1)),
                _ => Err(SkipReason::NoColorKey),
            }
        });
        match checks {
            Ok(key) => self.key_image(key),
            Err(reason) => skip("color key range", reason),
        }
    }
    fn key_image(&mut self, key: ColorKey) -> Dispatch {
        self.with_document(move |document, selected| {
            let (index, image) = selected_mut(document, selected)?;
            let matched = image.make_color_transparent(key);
            log::debug!("{key:?} cleared {matched} palette entries of image {index}");
            Ok(Selection::Keep)
        })
    }
    /// Pick the color under `(x, y)` of a view showing the selected image stretched over
    /// `view_width` by `view_height`, and use it for every color key. Out-of-image positions are
    /// clamped to the nearest edge.
    pub fn pick_color(
        &mut self,
        x: f64,
        y: f64,
        view_width: f64,
        view_height: f64,
    ) -> Option<ColorSample> {
        let rendered = self.state.selected_image()?.render();
        let color = sample::sample_color_at(
            &rendered,
            sample::view_to_pixel(x, view_width, rendered.width()),
            sample::view_to_pixel(y, view_height, rendered.height()),
        )?;
        log::trace!("Picked {color}");
        self.state.color_key = Some(color);
        self.state.color_key0 = Some(color);
        self.state.color_key1 = Some(color);
        Some(color)
    }

    fn ready(&self) -> Result<(), SkipReason> {
        if self.orchestrator.can_submit() {
            Ok(())
        } else {
            Err(SkipReason::Busy)
        }
    }
    fn has_document(&self) -> Result<(), SkipReason> {
        match (&self.state.document, self.orchestrator.pending()) {
            (Some(_), _) => Ok(()),
            // Held by a queued task.
            (None, pending) if pending > 0 => Err(SkipReason::Busy),
            (None, _) => Err(SkipReason::NoDocument),
        }
    }
    fn selection(&self) -> Result<(), SkipReason> {
        self.has_document()?;
        self.state
            .selected
            .map(|_| ())
            .ok_or(SkipReason::NoSelection)
    }
    fn dispatch<F>(&mut self, work: F) -> Dispatch
    where
        F: FnOnce(&EditorMarshal<N>) -> anyhow::Result<()> + Send + 'static,
    {
        match self.orchestrator.submit(work) {
            Ok(id) => Dispatch::Submitted(id),
            Err(SubmitError::Busy) => Dispatch::Skipped(SkipReason::Busy),
            Err(SubmitError::WorkerGone) => {
                let title = self.orchestrator.title().to_owned();
                self.state
                    .notifier
                    .report_error(&SubmitError::WorkerGone.to_string(), &title);
                Dispatch::Skipped(SkipReason::WorkerGone)
            }
        }
    }
    /// Run `work` on the document and selection as they are when the task starts, after every
    /// task queued before it, then hand the document back.
    fn with_document<F>(&mut self, work: F) -> Dispatch
    where
        F: FnOnce(&mut Document, Option<usize>) -> anyhow::Result<Selection> + Send + 'static,
    {
        self.dispatch(move |marshal: &EditorMarshal<N>| {
            let (document, selected) = marshal.invoke_with(|state: &mut EditorState<N>| {
                (state.document.take(), state.selected)
            })?;
            let mut document = document.context("no document is open")?;
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                work(&mut document, selected)
            }));
            let selection = match &result {
                Ok(Ok(selection)) => *selection,
                _ => Selection::Keep,
            };
            marshal.invoke(move |state: &mut EditorState<N>| {
                state.restore_document(document, selection);
            })?;
            match result {
                Ok(result) => result.map(|_| ()),
                // Let the orchestrator report it.
                Err(payload) => std::panic::resume_unwind(payload),
            }
        })
    }
}

fn selected_mut(
    document: &mut Document,
    selected: Option<usize>,
) -> anyhow::Result<(usize, &mut Image)> {
    let index = selected.context("no image is selected")?;
    let count = document.images.len();
    let image = document
        .images
        .get_mut(index)
        .with_context(|| format!("image {index} does not exist ({count} images)"))?;
    Ok((index, image))
}

fn skip(action: &str, reason: SkipReason) -> Dispatch {
    log::debug!("Skipped {action}: {reason:?}");
    Dispatch::Skipped(reason)
}
