pub mod document;
pub mod image;
pub mod palette;

pub use document::Document;
pub use image::{Image, ImageError};
pub use palette::{Palette, PaletteError};
