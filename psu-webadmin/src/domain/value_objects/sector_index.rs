//! Type-safe erase-sector index value object.

use core::fmt;

/// Index of an erase sector on the flash chip.
///
/// Sector `n` starts at byte address `n * sector_size`. Keeping it apart from
/// [`FlashAddress`](super::FlashAddress) stops sector numbers and byte offsets
/// from being mixed up at the storage boundary.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SectorIndex(u32);

impl SectorIndex {
    /// Create a new sector index.
    ///
    /// # Examples
    ///
    /// ```
    /// use psu_webadmin::domain::SectorIndex;
    ///
    /// let sector = SectorIndex::new(0x7C);
    /// assert_eq!(sector.value(), 0x7C);
    /// ```
    #[inline]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Get the underlying u32 value.
    #[inline]
    pub const fn value(self) -> u32 {
        self.0
    }

    /// Get the following sector.
    #[inline]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Number of sectors from `other` up to this one.
    #[inline]
    pub const fn offset_from(self, other: Self) -> u32 {
        self.0.saturating_sub(other.0)
    }
}

impl fmt::Display for SectorIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sector({:#X})", self.0)
    }
}

impl From<u32> for SectorIndex {
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}

impl From<SectorIndex> for u32 {
    fn from(sector: SectorIndex) -> Self {
        sector.value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sector_index_next() {
        let sector = SectorIndex::new(0x7C);
        assert_eq!(sector.next().value(), 0x7D);

        let last = SectorIndex::new(u32::MAX);
        assert_eq!(last.next().value(), u32::MAX); // saturating
    }

    #[test]
    fn test_sector_index_offset() {
        let first = SectorIndex::new(0x100);
        let later = SectorIndex::new(0x103);
        assert_eq!(later.offset_from(first), 3);
        assert_eq!(first.offset_from(later), 0);
    }

    #[test]
    fn test_sector_index_display() {
        assert_eq!(format!("{}", SectorIndex::new(0x7C)), "Sector(0x7C)");
    }
}
