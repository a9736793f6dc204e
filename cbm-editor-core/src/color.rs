//! # Colors
//!
//! Two color representations are used by the editor: [`PaletteEntry`], the packed 32-bit
//! value stored in an image's palette, and [`ColorSample`], an alpha-less RGB triple as picked
//! by the user from a palette or a rendered pixel.

/// A packed palette color, laid out as `0xAABBGGRR` - red in the low byte, alpha in the high byte.
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PaletteEntry(pub u32);
impl PaletteEntry {
    pub const OPAQUE: u8 = 0xFF;
    pub const TRANSPARENT: u8 = 0x00;

    #[must_use]
    pub const fn from_rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self((a as u32) << 24 | (b as u32) << 16 | (g as u32) << 8 | r as u32)
    }
    /// An opaque entry of the given color.
    #[must_use]
    pub const fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self::from_rgba(r, g, b, Self::OPAQUE)
    }
    #[must_use]
    pub const fn r(self) -> u8 {
        (self.0 & 0xFF) as u8
    }
    #[must_use]
    pub const fn g(self) -> u8 {
        ((self.0 >> 8) & 0xFF) as u8
    }
    #[must_use]
    pub const fn b(self) -> u8 {
        ((self.0 >> 16) & 0xFF) as u8
    }
    #[must_use]
    pub const fn alpha(self) -> u8 {
        ((self.0 >> 24) & 0xFF) as u8
    }
    /// The color channels, without alpha.
    #[must_use]
    pub const fn rgb(self) -> ColorSample {
        ColorSample::new(self.r(), self.g(), self.b())
    }
    /// Replace alpha, keeping the color channels.
    #[must_use]
    pub const fn with_alpha(self, alpha: u8) -> Self {
        Self(self.0 & 0x00FF_FFFF | (alpha as u32) << 24)
    }
    /// Replace the color channels, keeping alpha.
    #[must_use]
    pub const fn with_rgb(self, color: ColorSample) -> Self {
        Self::from_rgba(color.r, color.g, color.b, self.alpha())
    }
    /// Channels in `[r, g, b, a]` order, regardless of host endianness.
    #[must_use]
    pub fn to_rgba(self) -> [u8; 4] {
        bytemuck::cast(self.0.to_le())
    }
}
impl std::fmt::Debug for PaletteEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "PaletteEntry(a={}, r={}, g={}, b={})",
            self.alpha(),
            self.r(),
            self.g(),
            self.b()
        )
    }
}

/// An 8-bit RGB color with no alpha.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct ColorSample {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}
impl ColorSample {
    pub const BLACK: Self = Self::new(0, 0, 0);
    pub const WHITE: Self = Self::new(0xFF, 0xFF, 0xFF);

    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}
impl std::fmt::Display for ColorSample {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ColorParseError {
    #[error("expected `R,G,B` or `#RRGGBB`, got {0:?}")]
    Malformed(String),
    #[error("channel {0:?} is not an integer in 0..=255")]
    Channel(String),
}

impl std::str::FromStr for ColorSample {
    type Err = ColorParseError;
    /// Accepts `R,G,B` decimal triples or `#RRGGBB` hex.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Some(hex) = trimmed.strip_prefix('#') {
            if hex.len() != 6 || !hex.is_ascii() {
                return Err(ColorParseError::Malformed(s.to_owned()));
            }
            let channel = |range: std::ops::Range<usize>| {
                u8::from_str_radix(&hex[range], 16)
                    .map_err(|_| ColorParseError::Channel(hex.to_owned()))
            };
            return Ok(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?));
        }

        let mut channels = trimmed.split(',').map(|channel| {
            let channel = channel.trim();
            channel
                .parse::<u8>()
                .map_err(|_| ColorParseError::Channel(channel.to_owned()))
        });
        match (channels.next(), channels.next(), channels.next(), channels.next()) {
            (Some(r), Some(g), Some(b), None) => Ok(Self::new(r?, g?, b?)),
            _ => Err(ColorParseError::Malformed(s.to_owned())),
        }
    }
}

#[cfg(test)]
mod test {
    use super::{ColorParseError, ColorSample, PaletteEntry};

    #[test]
    fn packed_layout() {
        let entry = PaletteEntry::from_rgba(0x11, 0x22, 0x33, 0x44);
        assert_eq!(entry.0, 0x4433_2211);
        assert_eq!(
            (entry.r(), entry.g(), entry.b(), entry.alpha()),
            (0x11, 0x22, 0x33, 0x44)
        );
        assert_eq!(entry.to_rgba(), [0x11, 0x22, 0x33, 0x44]);
    }
    #[test]
    fn alpha_and_rgb_are_independent() {
        let entry = PaletteEntry::from_rgb(10, 20, 30);
        let clear = entry.with_alpha(PaletteEntry::TRANSPARENT);
        assert_eq!(clear.rgb(), ColorSample::new(10, 20, 30));
        assert_eq!(clear.alpha(), 0);

        let recolored = clear.with_rgb(ColorSample::new(1, 2, 3));
        assert_eq!(recolored.alpha(), 0);
        assert_eq!(recolored.rgb(), ColorSample::new(1, 2, 3));
    }
    #[test]
    fn parse_samples() {
        assert_eq!("10,20,30".parse(), Ok(ColorSample::new(10, 20, 30)));
        assert_eq!(" 0 , 255,7 ".parse(), Ok(ColorSample::new(0, 255, 7)));
        assert_eq!("#ff8000".parse(), Ok(ColorSample::new(255, 128, 0)));
        assert!(matches!(
            "1,2".parse::<ColorSample>(),
            Err(ColorParseError::Malformed(_))
        ));
        assert!(matches!(
            "1,2,300".parse::<ColorSample>(),
            Err(ColorParseError::Channel(_))
        ));
        assert!(matches!(
            "#12345".parse::<ColorSample>(),
            Err(ColorParseError::Malformed(_))
        ));
    }
    #[test]
    fn display_is_hex() {
        assert_eq!(ColorSample::new(255, 128, 0).to_string(), "#ff8000");
    }
}
