//! # IO
//!
//! The editor reaches files only through two collaborators: a [`DocumentStore`] for whole containers,
//! and an [`ImageCodec`] for importing and exporting single images. Both are called from the
//! orchestrator's worker, hence `Send + Sync`.

pub mod directory;
pub mod indexed_png;

pub use directory::DirectoryStore;
pub use indexed_png::PngCodec;

use crate::state::{Document, Image, ImageError, PaletteError};
use std::path::Path;

#[derive(thiserror::Error, Debug)]
pub enum IoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("decode failed")]
    Decode(#[from] png::DecodingError),
    #[error("encode failed")]
    Encode(#[from] png::EncodingError),
    #[error("unsupported: {0}")]
    Unsupported(String),
    #[error("invalid data: {0}")]
    Invalid(String),
    /// Shown as just the path, the cause follows in the source chain.
    #[error("{}", path.display())]
    File {
        path: std::path::PathBuf,
        source: Box<IoError>,
    },
}
impl IoError {
    /// Attribute this error to a file.
    #[must_use]
    pub fn in_file(self, path: impl Into<std::path::PathBuf>) -> Self {
        Self::File {
            path: path.into(),
            source: Box::new(self),
        }
    }
}
impl From<ImageError> for IoError {
    fn from(value: ImageError) -> Self {
        Self::Invalid(value.to_string())
    }
}
impl From<PaletteError> for IoError {
    fn from(value: PaletteError) -> Self {
        Self::Invalid(value.to_string())
    }
}

pub trait DocumentStore: Send + Sync {
    /// # Errors
    /// If the container cannot be read or parsed.
    fn load(&self, path: &Path) -> Result<Document, IoError>;
    /// # Errors
    /// If the container cannot be written.
    fn save(&self, document: &Document, path: &Path) -> Result<(), IoError>;
    /// Prepare the in-memory representation for saving. Idempotent.
    fn decompress(&self, document: &mut Document);
}

pub trait ImageCodec: Send + Sync {
    /// # Errors
    /// If the file cannot be read or decoded.
    fn load(&self, path: &Path) -> Result<Image, IoError>;
    /// # Errors
    /// If the image cannot be encoded or written.
    fn save(&self, image: &Image, path: &Path) -> Result<(), IoError>;
    /// Whether [`Self::save`] can encode `image`, without writing anything.
    /// # Errors
    /// If the image cannot be represented by this codec.
    fn check(&self, _image: &Image) -> Result<(), IoError> {
        Ok(())
    }
    /// Replace the contents of `image` with the file at `path`. On failure, `image` is unchanged.
    /// # Errors
    /// If the file cannot be read or decoded.
    fn replace_content(&self, image: &mut Image, path: &Path) -> Result<(), IoError> {
        *image = self.load(path)?;
        Ok(())
    }
}
