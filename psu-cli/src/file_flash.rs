//! File-backed NOR flash
//!
//! Provides an `embedded-storage` NOR flash over a flash image file, so the
//! handlers can run against the same bytes across invocations.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use embedded_storage::nor_flash::{
    check_erase, check_read, check_write, ErrorType, NorFlash, NorFlashError, NorFlashErrorKind,
    ReadNorFlash,
};
use psu_webadmin::domain::{SECTOR_SIZE, WORD_SIZE};

const ERASED: u8 = 0xFF;

/// Errors from [`FileFlash`].
#[derive(Debug)]
pub enum FileFlashError {
    /// The image file could not be read or written.
    Io(io::Error),
    /// The access broke the flash geometry.
    Flash(NorFlashErrorKind),
}

impl fmt::Display for FileFlashError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "Flash image I/O error: {}", e),
            Self::Flash(kind) => write!(f, "Flash access rejected: {:?}", kind),
        }
    }
}

impl std::error::Error for FileFlashError {}

impl NorFlashError for FileFlashError {
    fn kind(&self) -> NorFlashErrorKind {
        match self {
            Self::Io(_) => NorFlashErrorKind::Other,
            Self::Flash(kind) => *kind,
        }
    }
}

impl From<io::Error> for FileFlashError {
    fn from(e: io::Error) -> Self {
        log::error!("Flash image I/O error: {}", e);
        Self::Io(e)
    }
}

impl From<NorFlashErrorKind> for FileFlashError {
    fn from(kind: NorFlashErrorKind) -> Self {
        Self::Flash(kind)
    }
}

/// NOR flash stored in a file.
///
/// Same geometry as the appliance's SPI part: word-sized reads and writes,
/// sector-sized erases, and writes that can only clear bits.
pub struct FileFlash {
    file: File,
    capacity: usize,
}

impl FileFlash {
    /// Open the image at `path`, creating it or extending it with erased
    /// bytes until it holds at least `capacity` bytes.
    pub fn open(path: &Path, capacity: usize) -> io::Result<Self> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        let len = file.metadata()?.len() as usize;
        if len < capacity {
            file.seek(SeekFrom::Start(len as u64))?;
            file.write_all(&vec![ERASED; capacity - len])?;
            file.flush()?;
        }

        Ok(Self {
            file,
            capacity: capacity.max(len),
        })
    }

    fn read_at(&mut self, offset: u32, bytes: &mut [u8]) -> io::Result<()> {
        self.file.seek(SeekFrom::Start(offset as u64))?;
        self.file.read_exact(bytes)
    }

    fn write_at(&mut self, offset: u32, bytes: &[u8]) -> io::Result<()> {
        self.file.seek(SeekFrom::Start(offset as u64))?;
        self.file.write_all(bytes)?;
        self.file.flush()
    }
}

impl ErrorType for FileFlash {
    type Error = FileFlashError;
}

impl ReadNorFlash for FileFlash {
    const READ_SIZE: usize = WORD_SIZE;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        check_read(self, offset, bytes.len())?;
        self.read_at(offset, bytes)?;
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}

impl NorFlash for FileFlash {
    const WRITE_SIZE: usize = WORD_SIZE;
    const ERASE_SIZE: usize = SECTOR_SIZE;

    fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
        check_erase(self, from, to)?;
        self.write_at(from, &vec![ERASED; (to - from) as usize])?;
        Ok(())
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        check_write(self, offset, bytes.len())?;
        let mut cells = vec![0u8; bytes.len()];
        self.read_at(offset, &mut cells)?;
        for (cell, byte) in cells.iter_mut().zip(bytes) {
            *cell &= *byte;
        }
        self.write_at(offset, &cells)?;
        Ok(())
    }
}
