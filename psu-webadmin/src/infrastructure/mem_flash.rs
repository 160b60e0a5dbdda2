//! In-memory NOR flash.
//!
//! Behaves like a real SPI NOR part: 4-byte read and program granularity,
//! 4KB erase blocks, and programming can only clear bits. Every operation is
//! logged so tests can check what the engine asked the chip to do.

use alloc::vec;
use alloc::vec::Vec;

use embedded_storage::nor_flash::{
    check_erase, check_read, check_write, ErrorType, NorFlash, NorFlashErrorKind, ReadNorFlash,
};

use crate::domain::value_objects::{StorageLayout, SECTOR_SIZE, WORD_SIZE};

/// One logged flash operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashOp {
    /// `read(offset, len)`
    Read {
        /// Start offset.
        offset: u32,
        /// Byte count.
        len: usize,
    },
    /// `erase(from, to)`
    Erase {
        /// First byte erased.
        from: u32,
        /// One past the last byte erased.
        to: u32,
    },
    /// `write(offset, len)`
    Write {
        /// Start offset.
        offset: u32,
        /// Byte count.
        len: usize,
    },
}

/// Which operation kind an injected fault hits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashFault {
    /// Fail every read.
    Read,
    /// Fail every erase.
    Erase,
    /// Fail every write.
    Write,
}

/// RAM-backed NOR flash implementing `embedded-storage`.
#[derive(Debug, Clone)]
pub struct MemFlash {
    data: Vec<u8>,
    ops: Vec<FlashOp>,
    fault: Option<FlashFault>,
}

impl MemFlash {
    /// Create an erased chip of `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![0xFF; capacity],
            ops: Vec::new(),
            fault: None,
        }
    }

    /// Create an erased chip just large enough to hold the region of
    /// `layout`.
    pub fn for_layout(layout: &StorageLayout) -> Self {
        let end = layout.region_address().value() as usize + layout.region_capacity();
        Self::new(end)
    }

    /// Raw chip contents.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Mutable chip contents, bypassing NOR semantics.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Operations performed so far.
    pub fn ops(&self) -> &[FlashOp] {
        &self.ops
    }

    /// Forget the logged operations.
    pub fn clear_ops(&mut self) {
        self.ops.clear();
    }

    /// Erase operations performed so far.
    pub fn erases(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.ops.iter().filter_map(|op| match *op {
            FlashOp::Erase { from, to } => Some((from, to)),
            _ => None,
        })
    }

    /// Write operations performed so far.
    pub fn writes(&self) -> impl Iterator<Item = (u32, usize)> + '_ {
        self.ops.iter().filter_map(|op| match *op {
            FlashOp::Write { offset, len } => Some((offset, len)),
            _ => None,
        })
    }

    /// Make every operation of one kind fail, or clear the fault with `None`.
    pub fn inject_fault(&mut self, fault: Option<FlashFault>) {
        self.fault = fault;
    }

    fn check_fault(&self, kind: FlashFault) -> Result<(), NorFlashErrorKind> {
        match self.fault {
            Some(fault) if fault == kind => Err(NorFlashErrorKind::Other),
            _ => Ok(()),
        }
    }
}

impl ErrorType for MemFlash {
    type Error = NorFlashErrorKind;
}

impl ReadNorFlash for MemFlash {
    const READ_SIZE: usize = WORD_SIZE;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        self.check_fault(FlashFault::Read)?;
        check_read(self, offset, bytes.len())?;
        let start = offset as usize;
        bytes.copy_from_slice(&self.data[start..start + bytes.len()]);
        self.ops.push(FlashOp::Read {
            offset,
            len: bytes.len(),
        });
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.data.len()
    }
}

impl NorFlash for MemFlash {
    const WRITE_SIZE: usize = WORD_SIZE;
    const ERASE_SIZE: usize = SECTOR_SIZE;

    fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
        self.check_fault(FlashFault::Erase)?;
        check_erase(self, from, to)?;
        self.data[from as usize..to as usize].fill(0xFF);
        self.ops.push(FlashOp::Erase { from, to });
        Ok(())
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        self.check_fault(FlashFault::Write)?;
        check_write(self, offset, bytes.len())?;
        let start = offset as usize;
        for (cell, byte) in self.data[start..start + bytes.len()].iter_mut().zip(bytes) {
            *cell &= *byte;
        }
        self.ops.push(FlashOp::Write {
            offset,
            len: bytes.len(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_only_clears_bits() {
        let mut flash = MemFlash::new(SECTOR_SIZE);
        flash.write(0, &[0x0F, 0xF0, 0xFF, 0x00]).unwrap();
        flash.write(0, &[0xF0, 0xF0, 0x0F, 0xFF]).unwrap();
        assert_eq!(&flash.as_bytes()[..4], &[0x00, 0xF0, 0x0F, 0x00]);

        flash.erase(0, SECTOR_SIZE as u32).unwrap();
        assert_eq!(&flash.as_bytes()[..4], &[0xFF; 4]);
    }

    #[test]
    fn test_rejects_unaligned_access() {
        let mut flash = MemFlash::new(SECTOR_SIZE);
        let mut buf = [0u8; 3];
        assert_eq!(flash.read(0, &mut buf), Err(NorFlashErrorKind::NotAligned));
        assert_eq!(flash.write(2, &[0; 4]), Err(NorFlashErrorKind::NotAligned));
        assert_eq!(flash.erase(0, 100), Err(NorFlashErrorKind::NotAligned));
        assert!(flash.ops().is_empty());
    }

    #[test]
    fn test_fault_injection() {
        let mut flash = MemFlash::new(SECTOR_SIZE);
        flash.inject_fault(Some(FlashFault::Erase));
        assert_eq!(flash.erase(0, SECTOR_SIZE as u32), Err(NorFlashErrorKind::Other));
        assert!(flash.write(0, &[0; 4]).is_ok());
    }

    #[test]
    fn test_for_layout_covers_region() {
        let flash = MemFlash::for_layout(&StorageLayout::MAP2);
        assert_eq!(flash.capacity(), 0x80000);
    }
}
