//! NOR flash adapter for embedded-storage traits
//!
//! Wraps any `embedded-storage` NOR flash and exposes it as the domain's
//! [`StorageDevice`] port, so the transfer engine runs unchanged over the
//! ESP8266 SPI flash driver, an external SPI NOR chip, or the in-memory
//! [`MemFlash`](crate::infrastructure::MemFlash) used in tests.
//!
//! # Example
//!
//! ```ignore
//! use esp_storage::FlashStorage as EspFlash;
//! use psu_webadmin::adapters::NorFlashStorage;
//! use psu_webadmin::domain::StorageLayout;
//!
//! let layout = StorageLayout::DEFAULT;
//! let storage = NorFlashStorage::new(EspFlash::new(), layout.sector_size())?;
//! ```

use embedded_storage::nor_flash::{NorFlash, NorFlashError, NorFlashErrorKind, ReadNorFlash};

use crate::domain::ports::StorageDevice;
use crate::domain::value_objects::{FlashAddress, SectorIndex};

/// Error type for NOR flash storage operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NorFlashStorageError {
    /// The flash driver reported a failure.
    Flash(NorFlashErrorKind),
    /// The sector lies beyond the end of the chip.
    OutOfBounds {
        /// Requested sector.
        sector: SectorIndex,
    },
    /// The sector size is not a whole number of flash erase blocks.
    Geometry {
        /// Requested sector size.
        sector_size: usize,
        /// Erase granularity of the flash.
        erase_size: usize,
    },
}

impl core::fmt::Display for NorFlashStorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Flash(kind) => write!(f, "NOR flash error: {:?}", kind),
            Self::OutOfBounds { sector } => write!(f, "{} is outside the flash", sector),
            Self::Geometry {
                sector_size,
                erase_size,
            } => write!(
                f,
                "Sector size {} is not a multiple of erase size {}",
                sector_size, erase_size
            ),
        }
    }
}

impl core::error::Error for NorFlashStorageError {}

impl<E: NorFlashError> From<E> for NorFlashStorageError {
    fn from(err: E) -> Self {
        Self::Flash(err.kind())
    }
}

/// Adapter that wraps embedded-storage NOR flash as a [`StorageDevice`]
///
/// Sector `n` covers bytes `n * sector_size .. (n + 1) * sector_size` of the
/// chip. Erase protection is left to the driver; lifting it always succeeds.
pub struct NorFlashStorage<F> {
    flash: F,
    sector_size: usize,
}

impl<F: NorFlash> NorFlashStorage<F> {
    /// Create a new NOR flash adapter
    ///
    /// # Arguments
    /// * `flash` - The underlying flash implementation
    /// * `sector_size` - Erase sector size used by the domain layer
    ///
    /// # Errors
    /// Returns [`NorFlashStorageError::Geometry`] unless `sector_size` is a
    /// non-zero multiple of the flash's erase size.
    pub fn new(flash: F, sector_size: usize) -> Result<Self, NorFlashStorageError> {
        if sector_size == 0 || sector_size % F::ERASE_SIZE != 0 {
            return Err(NorFlashStorageError::Geometry {
                sector_size,
                erase_size: F::ERASE_SIZE,
            });
        }
        Ok(Self { flash, sector_size })
    }
}

impl<F> NorFlashStorage<F> {
    /// Get a reference to the underlying flash
    pub fn inner(&self) -> &F {
        &self.flash
    }

    /// Get a mutable reference to the underlying flash
    pub fn inner_mut(&mut self) -> &mut F {
        &mut self.flash
    }

    /// Consume the adapter and return the underlying flash
    pub fn into_inner(self) -> F {
        self.flash
    }
}

impl<F> StorageDevice for NorFlashStorage<F>
where
    F: NorFlash + ReadNorFlash,
{
    type Error = NorFlashStorageError;

    fn read(&mut self, address: FlashAddress, buf: &mut [u8]) -> Result<(), Self::Error> {
        self.flash.read(address.value(), buf)?;
        Ok(())
    }

    fn erase_sector(&mut self, sector: SectorIndex) -> Result<(), Self::Error> {
        let from = sector.value() as usize * self.sector_size;
        let to = from + self.sector_size;
        if to > self.flash.capacity() {
            return Err(NorFlashStorageError::OutOfBounds { sector });
        }
        self.flash.erase(from as u32, to as u32)?;
        Ok(())
    }

    fn write(&mut self, address: FlashAddress, buf: &[u8]) -> Result<(), Self::Error> {
        self.flash.write(address.value(), buf)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLOCK: usize = 4096;

    /// Mock NOR flash for testing
    struct MockFlash {
        data: [[u8; BLOCK]; 4],
    }

    impl MockFlash {
        fn new() -> Self {
            Self {
                data: [[0xFF; BLOCK]; 4],
            }
        }
    }

    impl embedded_storage::nor_flash::ErrorType for MockFlash {
        type Error = MockFlashError;
    }

    #[derive(Debug)]
    struct MockFlashError;

    impl NorFlashError for MockFlashError {
        fn kind(&self) -> NorFlashErrorKind {
            NorFlashErrorKind::OutOfBounds
        }
    }

    impl ReadNorFlash for MockFlash {
        const READ_SIZE: usize = 1;

        fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
            let page = offset as usize / BLOCK;
            let page_offset = offset as usize % BLOCK;
            if page < self.data.len() && page_offset + bytes.len() <= BLOCK {
                bytes.copy_from_slice(&self.data[page][page_offset..page_offset + bytes.len()]);
                Ok(())
            } else {
                Err(MockFlashError)
            }
        }

        fn capacity(&self) -> usize {
            self.data.len() * BLOCK
        }
    }

    impl NorFlash for MockFlash {
        const WRITE_SIZE: usize = 1;
        const ERASE_SIZE: usize = BLOCK;

        fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
            let start_page = from as usize / BLOCK;
            let end_page = (to as usize).div_ceil(BLOCK);
            for page in start_page..end_page.min(self.data.len()) {
                self.data[page] = [0xFF; BLOCK];
            }
            Ok(())
        }

        fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
            let page = offset as usize / BLOCK;
            let page_offset = offset as usize % BLOCK;
            if page < self.data.len() && page_offset + bytes.len() <= BLOCK {
                self.data[page][page_offset..page_offset + bytes.len()].copy_from_slice(bytes);
                Ok(())
            } else {
                Err(MockFlashError)
            }
        }
    }

    #[test]
    fn test_erase_write_read() {
        let mut storage = NorFlashStorage::new(MockFlash::new(), BLOCK).unwrap();
        storage.inner_mut().data[1] = [0u8; BLOCK];

        storage.erase_sector(SectorIndex::new(1)).unwrap();
        storage.write(FlashAddress::new(0x1000), &[42; 8]).unwrap();

        let mut buf = [0u8; 12];
        storage.read(FlashAddress::new(0x1000), &mut buf).unwrap();
        assert_eq!(&buf[..8], &[42; 8]);
        assert_eq!(&buf[8..], &[0xFF; 4]);
    }

    #[test]
    fn test_erase_out_of_bounds() {
        let mut storage = NorFlashStorage::new(MockFlash::new(), BLOCK).unwrap();
        let err = storage.erase_sector(SectorIndex::new(4)).unwrap_err();
        assert_eq!(
            err,
            NorFlashStorageError::OutOfBounds {
                sector: SectorIndex::new(4)
            }
        );
    }

    #[test]
    fn test_driver_error_kind_is_kept() {
        let mut storage = NorFlashStorage::new(MockFlash::new(), BLOCK).unwrap();
        let err = storage
            .write(FlashAddress::new(0x4000), &[0; 4])
            .unwrap_err();
        assert_eq!(err, NorFlashStorageError::Flash(NorFlashErrorKind::OutOfBounds));
    }

    #[test]
    fn test_geometry_mismatch() {
        assert!(matches!(
            NorFlashStorage::new(MockFlash::new(), 1024),
            Err(NorFlashStorageError::Geometry { erase_size: 4096, .. })
        ));
    }
}
