//! # Color keys
//!
//! Transparency in a palette image is expressed through the palette itself: a color key
//! clears the alpha of every palette entry it matches, cutting all pixels that reference those
//! entries out of the image. Color channels are never modified by keying.

use crate::{
    color::{ColorSample, PaletteEntry},
    state::{Image, Palette},
};

/// A reference color, or an axis-aligned box in RGB space, selecting palette entries.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ColorKey {
    Single(ColorSample),
    /// Inclusive per-channel bounds. `lo` is channel-wise less than or equal to `hi`.
    Range { lo: ColorSample, hi: ColorSample },
}
impl ColorKey {
    /// A box spanned by two corner colors, given in any order.
    #[must_use]
    pub fn range(key0: ColorSample, key1: ColorSample) -> Self {
        Self::Range {
            lo: ColorSample::new(key0.r.min(key1.r), key0.g.min(key1.g), key0.b.min(key1.b)),
            hi: ColorSample::new(key0.r.max(key1.r), key0.g.max(key1.g), key0.b.max(key1.b)),
        }
    }
    #[must_use]
    pub fn matches(&self, entry: PaletteEntry) -> bool {
        let color = entry.rgb();
        match self {
            Self::Single(key) => color == *key,
            Self::Range { lo, hi } => {
                (lo.r..=hi.r).contains(&color.r)
                    && (lo.g..=hi.g).contains(&color.g)
                    && (lo.b..=hi.b).contains(&color.b)
            }
        }
    }
    /// Clear alpha on every matching entry. Returns the number of entries matched.
    pub fn apply(&self, palette: &mut Palette) -> usize {
        let mut matched = 0;
        for entry in palette.entries_mut() {
            if self.matches(*entry) {
                *entry = entry.with_alpha(PaletteEntry::TRANSPARENT);
                matched += 1;
            }
        }
        log::trace!("{self:?} matched {matched} palette entries");
        matched
    }
}

/// Make every entry exactly matching `key` transparent.
pub fn apply_single_key(palette: &mut Palette, key: ColorSample) -> usize {
    ColorKey::Single(key).apply(palette)
}

/// Make every entry inside the RGB box spanned by `key0` and `key1` transparent.
pub fn apply_range_key(palette: &mut Palette, key0: ColorSample, key1: ColorSample) -> usize {
    ColorKey::range(key0, key1).apply(palette)
}

/// Recolor the background slot of `image`, keeping its alpha.
///
/// Images without a palette, or with an empty one, are left alone.
pub fn set_background_color(image: &mut Image, color: ColorSample) {
    let Some(background) = image
        .palette_mut()
        .and_then(|palette| palette.get_mut(Palette::BACKGROUND))
    else {
        return;
    };
    *background = background.with_rgb(color);
}

#[cfg(test)]
mod test {
    use super::{apply_range_key, apply_single_key, set_background_color, ColorKey};
    use crate::{
        color::{ColorSample, PaletteEntry},
        state::{Image, Palette},
    };

    /// A palette with a spread of colors, including duplicates and partial alpha.
    fn palette() -> Palette {
        Palette::new(vec![
            PaletteEntry::from_rgb(0, 0, 0),
            PaletteEntry::from_rgb(255, 255, 255),
            PaletteEntry::from_rgb(10, 20, 30),
            PaletteEntry::from_rgba(10, 20, 30, 255),
            PaletteEntry::from_rgb(25, 10, 40),
            PaletteEntry::from_rgba(50, 50, 50, 90),
            PaletteEntry::from_rgb(51, 50, 50),
            PaletteEntry::from_rgb(10, 20, 31),
        ])
        .unwrap()
    }
    fn alphas(palette: &Palette) -> Vec<u8> {
        palette.iter().map(PaletteEntry::alpha).collect()
    }

    #[test]
    fn single_key_exact_match() {
        let original = palette();
        let mut keyed = original.clone();
        let matched = apply_single_key(&mut keyed, ColorSample::new(10, 20, 30));
        assert_eq!(matched, 2);

        for (index, (before, after)) in original.iter().zip(keyed.iter()).enumerate() {
            assert_eq!(before.rgb(), after.rgb(), "color of entry {index} changed");
            if index == 2 || index == 3 {
                assert_eq!(after.alpha(), 0);
            } else {
                assert_eq!(before, after, "unmatched entry {index} changed");
            }
        }
    }
    #[test]
    fn single_key_no_match_is_noop() {
        let mut keyed = palette();
        assert_eq!(apply_single_key(&mut keyed, ColorSample::new(1, 2, 3)), 0);
        assert_eq!(keyed, palette());
    }
    #[test]
    fn single_key_idempotent() {
        let key = ColorSample::new(255, 255, 255);
        let mut once = palette();
        apply_single_key(&mut once, key);
        let mut twice = once.clone();
        apply_single_key(&mut twice, key);
        assert_eq!(once, twice);
    }
    #[test]
    fn range_is_a_box() {
        let mut keyed = palette();
        apply_range_key(&mut keyed, ColorSample::new(0, 0, 0), ColorSample::new(50, 50, 50));
        // Entry 4 (25,10,40) is inside. Entry 6 (51,50,50) is one step outside on red only.
        assert_eq!(alphas(&keyed), vec![0, 255, 0, 0, 0, 0, 255, 0]);
    }
    #[test]
    fn range_corner_order_irrelevant() {
        let (a, b) = (ColorSample::new(50, 0, 40), ColorSample::new(0, 50, 0));
        let mut forward = palette();
        let mut backward = palette();
        apply_range_key(&mut forward, a, b);
        apply_range_key(&mut backward, b, a);
        assert_eq!(forward, backward);
        assert_eq!(ColorKey::range(a, b), ColorKey::range(b, a));
    }
    #[test]
    fn degenerate_range_equals_single() {
        for key in palette().iter().map(PaletteEntry::rgb).chain([
            ColorSample::new(7, 7, 7),
            ColorSample::new(10, 20, 31),
        ]) {
            let mut single = palette();
            let mut range = palette();
            let single_count = apply_single_key(&mut single, key);
            let range_count = apply_range_key(&mut range, key, key);
            assert_eq!(single, range, "mismatch for key {key}");
            assert_eq!(single_count, range_count);
        }
    }
    #[test]
    fn background_keeps_alpha() {
        let palette = Palette::new(vec![
            PaletteEntry::from_rgba(1, 2, 3, 40),
            PaletteEntry::from_rgb(4, 5, 6),
        ])
        .unwrap();
        let mut image = Image::new(1, 1, Some(palette), vec![1]).unwrap();
        set_background_color(&mut image, ColorSample::new(100, 110, 120));

        let palette = image.palette().unwrap();
        assert_eq!(palette.get(0), Some(PaletteEntry::from_rgba(100, 110, 120, 40)));
        assert_eq!(palette.get(1), Some(PaletteEntry::from_rgb(4, 5, 6)));
    }
    #[test]
    fn background_empty_palette() {
        let mut image = Image::new(0, 0, Some(Palette::default()), vec![]).unwrap();
        set_background_color(&mut image, ColorSample::WHITE);
        assert!(image.palette().unwrap().is_empty());
    }
}
