//! StorageDevice port - raw access to the SPI flash.
//!
//! The transfer engine reads, erases and programs flash only through this
//! trait. The [`NorFlashStorage`](crate::adapters::NorFlashStorage) adapter
//! provides it for any `embedded-storage` NOR flash.

use crate::domain::value_objects::{FlashAddress, SectorIndex};

/// Port for sector-erase, word-programmed flash.
///
/// # Contract
///
/// - `write` buffers must be a multiple of the device word size long and
///   target previously erased flash; anything else is undefined at the
///   device level and callers must round up themselves.
/// - `read` buffers must likewise be word-sized multiples.
/// - Every call is synchronous and either completes or fails; there is no
///   partially applied erase or write to clean up afterwards.
pub trait StorageDevice {
    /// Device error type.
    type Error: core::fmt::Debug;

    /// Read `buf.len()` bytes starting at `address`.
    fn read(&mut self, address: FlashAddress, buf: &mut [u8]) -> Result<(), Self::Error>;

    /// Erase one whole sector.
    fn erase_sector(&mut self, sector: SectorIndex) -> Result<(), Self::Error>;

    /// Program `buf` at `address`.
    fn write(&mut self, address: FlashAddress, buf: &[u8]) -> Result<(), Self::Error>;

    /// Lift block erase protection so sectors can be rewritten.
    ///
    /// Devices without protection bits succeed without doing anything.
    fn disable_erase_protect(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl<T: StorageDevice + ?Sized> StorageDevice for &mut T {
    type Error = T::Error;

    fn read(&mut self, address: FlashAddress, buf: &mut [u8]) -> Result<(), Self::Error> {
        (**self).read(address, buf)
    }

    fn erase_sector(&mut self, sector: SectorIndex) -> Result<(), Self::Error> {
        (**self).erase_sector(sector)
    }

    fn write(&mut self, address: FlashAddress, buf: &[u8]) -> Result<(), Self::Error> {
        (**self).write(address, buf)
    }

    fn disable_erase_protect(&mut self) -> Result<(), Self::Error> {
        (**self).disable_erase_protect()
    }
}
