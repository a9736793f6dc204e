//! Picking colors out of rendered images.

use crate::color::ColorSample;

/// An RGBA8 pixel buffer, row-major, as shown to the user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedImage {
    width: u32,
    height: u32,
    pixels: Vec<[u8; 4]>,
}
impl RenderedImage {
    /// # Panics
    /// If `pixels` does not hold exactly `width * height` values.
    #[must_use]
    pub fn new(width: u32, height: u32, pixels: Vec<[u8; 4]>) -> Self {
        assert_eq!(
            pixels.len(),
            width as usize * height as usize,
            "pixel buffer does not match dimensions"
        );
        Self {
            width,
            height,
            pixels,
        }
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
    pub fn pixels(&self) -> &[[u8; 4]] {
        &self.pixels
    }
}

/// Sample the RGB of the pixel at `(x, y)`, ignoring alpha.
///
/// Coordinates are clamped into the image, so any value is accepted. Returns `None` only
/// for an image with no pixels.
#[must_use]
pub fn sample_color_at(image: &RenderedImage, x: i64, y: i64) -> Option<ColorSample> {
    if image.width == 0 || image.height == 0 {
        return None;
    }
    let x = x.clamp(0, i64::from(image.width) - 1);
    let y = y.clamp(0, i64::from(image.height) - 1);
    // Both in-bounds and non-negative after the clamp.
    let index = usize::try_from(y * i64::from(image.width) + x).ok()?;
    let [r, g, b, _] = *image.pixels.get(index)?;
    Some(ColorSample::new(r, g, b))
}

/// Map a position within a view of `view_extent` (in view units) onto the
/// `pixel_extent` pixels displayed there. Truncates toward zero.
///
/// The result is not bounded to the image - pass it to [`sample_color_at`], which clamps.
/// Non-finite intermediate values (e.g. a zero-sized view) saturate.
#[must_use]
pub fn view_to_pixel(position: f64, view_extent: f64, pixel_extent: u32) -> i64 {
    // `as` saturates at the integer bounds, and maps NaN to zero.
    #[allow(clippy::cast_possible_truncation)]
    let pixel = (position * f64::from(pixel_extent) / view_extent) as i64;
    pixel
}

#[cfg(test)]
mod test {
    use super::{sample_color_at, view_to_pixel, RenderedImage};
    use crate::color::ColorSample;

    /// 3x2, each pixel's red holds its index and alpha varies.
    fn image() -> RenderedImage {
        RenderedImage::new(
            3,
            2,
            (0..6u8).map(|i| [i, 10 + i, 20 + i, i * 40]).collect(),
        )
    }

    #[test]
    fn in_bounds() {
        assert_eq!(
            sample_color_at(&image(), 1, 1),
            Some(ColorSample::new(4, 14, 24))
        );
        assert_eq!(sample_color_at(&image(), 0, 0), Some(ColorSample::new(0, 10, 20)));
    }
    #[test]
    fn clamps_any_coordinate() {
        let image = image();
        for x in [i64::MIN, -100, -1, 0, 1, 2, 3, 100, i64::MAX] {
            for y in [i64::MIN, -1, 0, 1, 2, 7, i64::MAX] {
                let (cx, cy) = (x.clamp(0, 2), y.clamp(0, 1));
                let expected = image.pixels()[usize::try_from(cy * 3 + cx).unwrap()];
                assert_eq!(
                    sample_color_at(&image, x, y),
                    Some(ColorSample::new(expected[0], expected[1], expected[2])),
                    "at ({x}, {y})"
                );
            }
        }
    }
    #[test]
    fn empty_image() {
        let empty = RenderedImage::new(0, 5, vec![]);
        assert_eq!(sample_color_at(&empty, 0, 0), None);
    }
    #[test]
    fn view_scaling() {
        // 200 view units showing 100 pixels.
        assert_eq!(view_to_pixel(199.9, 200.0, 100), 99);
        assert_eq!(view_to_pixel(50.0, 200.0, 100), 25);
        assert_eq!(view_to_pixel(-3.0, 200.0, 100), -1);
        // Zero-sized view saturates instead of faulting.
        assert_eq!(view_to_pixel(1.0, 0.0, 100), i64::MAX);
        assert_eq!(view_to_pixel(0.0, 0.0, 100), 0);
    }
}
