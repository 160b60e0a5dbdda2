//! Flash geometry and the region reserved for the served asset.

use super::{FlashAddress, SectorIndex};

/// Erase-sector size of the SPI flash (4KB).
pub const SECTOR_SIZE: usize = 4096;

/// Minimum program width of the SPI flash in bytes.
pub const WORD_SIZE: usize = 4;

/// Size of the little-endian length prefix stored in front of the asset.
pub const LENGTH_PREFIX: usize = 4;

/// Flash geometry plus the region holding the served asset.
///
/// The region starts with a 4-byte little-endian length prefix followed by
/// the asset bytes. It always spans whole sectors.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageLayout {
    sector_size: usize,
    word_size: usize,
    region_start: SectorIndex,
    region_sectors: u32,
}

impl StorageLayout {
    /// Flash map 2: 1MB chip, 512KB + 512KB images. The gap after the first
    /// image slot holds the page.
    pub const MAP2: Self = Self::preset(0x7C, 4);

    /// Flash map 4: 4MB chip, 512KB + 512KB images.
    pub const MAP4: Self = Self::preset(0x100, 16);

    /// Flash map 6: 4MB chip, 1024KB + 1024KB images.
    pub const MAP6: Self = Self::preset(0x300, 16);

    /// Layout selected by the `flash-map*` cargo feature.
    #[cfg(feature = "flash-map6")]
    pub const DEFAULT: Self = Self::MAP6;

    /// Layout selected by the `flash-map*` cargo feature.
    #[cfg(all(feature = "flash-map4", not(feature = "flash-map6")))]
    pub const DEFAULT: Self = Self::MAP4;

    /// Layout selected by the `flash-map*` cargo feature.
    #[cfg(not(any(feature = "flash-map4", feature = "flash-map6")))]
    pub const DEFAULT: Self = Self::MAP2;

    const fn preset(region_start: u32, region_sectors: u32) -> Self {
        Self {
            sector_size: SECTOR_SIZE,
            word_size: WORD_SIZE,
            region_start: SectorIndex::new(region_start),
            region_sectors,
        }
    }

    /// Create a layout with custom geometry.
    ///
    /// # Errors
    ///
    /// Returns an error if any size is zero, if the sector size is not a
    /// multiple of the word size, or if the region cannot hold the prefix.
    ///
    /// # Examples
    ///
    /// ```
    /// use psu_webadmin::domain::StorageLayout;
    ///
    /// let layout = StorageLayout::new(4096, 4, 0x7C, 4).unwrap();
    /// assert_eq!(layout.region_capacity(), 16 * 1024);
    /// ```
    pub const fn new(
        sector_size: usize,
        word_size: usize,
        region_start: u32,
        region_sectors: u32,
    ) -> Result<Self, LayoutError> {
        if sector_size == 0 || word_size == 0 {
            return Err(LayoutError::ZeroSize);
        }
        if sector_size % word_size != 0 {
            return Err(LayoutError::UnalignedSector {
                sector_size,
                word_size,
            });
        }
        if region_sectors == 0 || sector_size < LENGTH_PREFIX {
            return Err(LayoutError::EmptyRegion);
        }
        Ok(Self {
            sector_size,
            word_size,
            region_start: SectorIndex::new(region_start),
            region_sectors,
        })
    }

    /// Erase-sector size in bytes.
    #[inline]
    pub const fn sector_size(&self) -> usize {
        self.sector_size
    }

    /// Program word size in bytes.
    #[inline]
    pub const fn word_size(&self) -> usize {
        self.word_size
    }

    /// First sector of the asset region.
    #[inline]
    pub const fn region_start(&self) -> SectorIndex {
        self.region_start
    }

    /// Number of sectors in the asset region.
    #[inline]
    pub const fn region_sectors(&self) -> u32 {
        self.region_sectors
    }

    /// Region size in bytes, prefix included.
    #[inline]
    pub const fn region_capacity(&self) -> usize {
        self.region_sectors as usize * self.sector_size
    }

    /// Largest asset the region can hold behind its prefix.
    #[inline]
    pub const fn max_asset_len(&self) -> usize {
        self.region_capacity() - LENGTH_PREFIX
    }

    /// Byte address of the first byte of `sector`.
    #[inline]
    pub const fn sector_address(&self, sector: SectorIndex) -> FlashAddress {
        FlashAddress::new(sector.value() * self.sector_size as u32)
    }

    /// Byte address of the region's length prefix.
    #[inline]
    pub const fn region_address(&self) -> FlashAddress {
        self.sector_address(self.region_start)
    }

    /// Whether `sector` lies inside the asset region.
    #[inline]
    pub const fn contains(&self, sector: SectorIndex) -> bool {
        sector.value() >= self.region_start.value()
            && sector.offset_from(self.region_start) < self.region_sectors
    }

    /// Round `len` up to the next multiple of the word size.
    ///
    /// ```
    /// use psu_webadmin::domain::StorageLayout;
    ///
    /// let layout = StorageLayout::MAP2;
    /// assert_eq!(layout.word_align(0), 0);
    /// assert_eq!(layout.word_align(5), 8);
    /// assert_eq!(layout.word_align(4096), 4096);
    /// ```
    #[inline]
    pub const fn word_align(&self, len: usize) -> usize {
        len.div_ceil(self.word_size) * self.word_size
    }
}

impl Default for StorageLayout {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Errors that can occur when creating a [`StorageLayout`].
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutError {
    /// Sector or word size is zero.
    ZeroSize,
    /// Sector size is not a multiple of the word size.
    UnalignedSector {
        /// The requested sector size.
        sector_size: usize,
        /// The word size.
        word_size: usize,
    },
    /// The region has no room for the length prefix.
    EmptyRegion,
}

impl core::fmt::Display for LayoutError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::ZeroSize => write!(f, "Sector and word size must be non-zero"),
            Self::UnalignedSector {
                sector_size,
                word_size,
            } => write!(
                f,
                "Sector size {} must be a multiple of word size {}",
                sector_size, word_size
            ),
            Self::EmptyRegion => write!(f, "Asset region must span at least one sector"),
        }
    }
}

impl core::error::Error for LayoutError {}
