use crate::color::PaletteEntry;

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaletteError {
    #[error("palette holds at most {} entries, got {0}", Palette::MAX_LEN)]
    TooManyEntries(usize),
}

/// An ordered table of up to 256 colors, indexed by an image's pixels.
///
/// Entry 0 is, by convention, the background slot.
#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub struct Palette {
    entries: Vec<PaletteEntry>,
}
impl Palette {
    pub const MAX_LEN: usize = 256;
    pub const BACKGROUND: usize = 0;

    pub fn new(entries: Vec<PaletteEntry>) -> Result<Self, PaletteError> {
        if entries.len() > Self::MAX_LEN {
            return Err(PaletteError::TooManyEntries(entries.len()));
        }
        Ok(Self { entries })
    }
    /// A palette holding nothing but the background slot.
    #[must_use]
    pub fn background_only(background: PaletteEntry) -> Self {
        Self {
            entries: vec![background],
        }
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
    #[must_use]
    pub fn get(&self, index: usize) -> Option<PaletteEntry> {
        self.entries.get(index).copied()
    }
    pub fn get_mut(&mut self, index: usize) -> Option<&mut PaletteEntry> {
        self.entries.get_mut(index)
    }
    #[must_use]
    pub fn entries(&self) -> &[PaletteEntry] {
        &self.entries
    }
    /// Mutable access to the entries. The length is fixed, keeping the size limit upheld.
    pub fn entries_mut(&mut self) -> &mut [PaletteEntry] {
        &mut self.entries
    }
    pub fn iter(&self) -> impl Iterator<Item = PaletteEntry> + '_ {
        self.entries.iter().copied()
    }
}

#[cfg(test)]
mod test {
    use super::{Palette, PaletteError};
    use crate::color::PaletteEntry;

    #[test]
    fn size_limit() {
        assert!(Palette::new(vec![PaletteEntry::default(); 256]).is_ok());
        assert_eq!(
            Palette::new(vec![PaletteEntry::default(); 257]),
            Err(PaletteError::TooManyEntries(257))
        );
    }
    #[test]
    fn out_of_range_is_none() {
        let palette = Palette::new(vec![PaletteEntry::from_rgb(1, 2, 3)]).unwrap();
        assert_eq!(palette.get(0), Some(PaletteEntry::from_rgb(1, 2, 3)));
        assert_eq!(palette.get(1), None);
    }
}
