use super::palette::Palette;
use crate::{
    color::{ColorSample, PaletteEntry},
    color_key::ColorKey,
    sample::RenderedImage,
};

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageError {
    #[error("{width}x{height} image needs {expected} pixel indices, got {actual}")]
    PixelCount {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
}

/// A palette-indexed bitmap. One index byte per pixel, row-major.
#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub struct Image {
    width: u32,
    height: u32,
    /// Images decoded from some sources have no palette at all.
    palette: Option<Palette>,
    pixels: Vec<u8>,
}
impl Image {
    /// A single opaque black pixel, referencing a one-entry background palette.
    #[must_use]
    pub fn blank() -> Self {
        Self {
            width: 1,
            height: 1,
            palette: Some(Palette::background_only(PaletteEntry::from_rgb(0, 0, 0))),
            pixels: vec![0],
        }
    }
    pub fn new(
        width: u32,
        height: u32,
        palette: Option<Palette>,
        pixels: Vec<u8>,
    ) -> Result<Self, ImageError> {
        let expected = width as usize * height as usize;
        if pixels.len() != expected {
            return Err(ImageError::PixelCount {
                width,
                height,
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            palette,
            pixels,
        })
    }
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }
    #[must_use]
    pub fn palette(&self) -> Option<&Palette> {
        self.palette.as_ref()
    }
    pub fn palette_mut(&mut self) -> Option<&mut Palette> {
        self.palette.as_mut()
    }
    #[must_use]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
    /// Clear the alpha of every palette entry matched by `key`, returning how many matched.
    pub fn make_color_transparent(&mut self, key: ColorKey) -> usize {
        self.palette.as_mut().map_or(0, |palette| key.apply(palette))
    }
    /// The color of the background slot, if this image has one.
    #[must_use]
    pub fn background_color(&self) -> Option<ColorSample> {
        self.palette
            .as_ref()?
            .get(Palette::BACKGROUND)
            .map(PaletteEntry::rgb)
    }
    /// Resolve every pixel through the palette into RGBA8.
    ///
    /// Indices that fall outside of the palette (or any index, with no palette) are transparent black.
    #[must_use]
    pub fn render(&self) -> RenderedImage {
        let lookup = |index: u8| -> [u8; 4] {
            self.palette
                .as_ref()
                .and_then(|palette| palette.get(usize::from(index)))
                .map_or([0; 4], PaletteEntry::to_rgba)
        };
        let rgba = self.pixels.iter().copied().map(lookup).collect();
        RenderedImage::new(self.width, self.height, rgba)
    }
}

#[cfg(test)]
mod test {
    use super::{Image, ImageError};
    use crate::{
        color::{ColorSample, PaletteEntry},
        color_key::ColorKey,
        state::Palette,
    };

    fn two_color() -> Image {
        let palette = Palette::new(vec![
            PaletteEntry::from_rgb(0, 0, 0),
            PaletteEntry::from_rgba(200, 100, 50, 128),
        ])
        .unwrap();
        Image::new(2, 2, Some(palette), vec![0, 1, 1, 7]).unwrap()
    }

    #[test]
    fn pixel_count_checked() {
        assert_eq!(
            Image::new(3, 2, None, vec![0; 5]),
            Err(ImageError::PixelCount {
                width: 3,
                height: 2,
                expected: 6,
                actual: 5
            })
        );
    }
    #[test]
    fn render_resolves_palette() {
        let rendered = two_color().render();
        assert_eq!(rendered.pixels()[0], [0, 0, 0, 255]);
        assert_eq!(rendered.pixels()[1], [200, 100, 50, 128]);
        // Index 7 is past the end of the palette.
        assert_eq!(rendered.pixels()[3], [0, 0, 0, 0]);
    }
    #[test]
    fn render_without_palette_is_transparent() {
        let image = Image::new(1, 1, None, vec![3]).unwrap();
        assert_eq!(image.render().pixels(), &[[0, 0, 0, 0]]);
    }
    #[test]
    fn blank_is_one_background_pixel() {
        let blank = Image::blank();
        assert_eq!((blank.width(), blank.height()), (1, 1));
        assert_eq!(blank.background_color(), Some(ColorSample::BLACK));
        assert_eq!(blank.render().pixels(), &[[0, 0, 0, 255]]);
    }
    #[test]
    fn transparent_without_palette_is_noop() {
        let mut image = Image::default();
        assert_eq!(
            image.make_color_transparent(ColorKey::Single(ColorSample::BLACK)),
            0
        );
    }
}
