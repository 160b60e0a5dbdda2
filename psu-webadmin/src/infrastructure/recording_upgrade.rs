//! Upgrade subsystem that stages the image in RAM and records every call.

use alloc::vec::Vec;
use core::fmt;

use crate::domain::ports::{BootImage, UpgradeSubsystem};

/// The recording subsystem refused a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpgradeRefused {
    /// Zero-based index of the refused submit.
    pub block: usize,
}

impl fmt::Display for UpgradeRefused {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Upgrade block {} refused", self.block)
    }
}

impl core::error::Error for UpgradeRefused {}

/// [`UpgradeSubsystem`] keeping the staged image and a call log in memory.
#[derive(Debug, Clone)]
pub struct RecordingUpgrade {
    running: BootImage,
    inits: u32,
    started: bool,
    erased: Vec<usize>,
    submits: Vec<usize>,
    image: Vec<u8>,
    finished: bool,
    reboots: u32,
    refuse_block: Option<usize>,
}

impl RecordingUpgrade {
    /// Create a subsystem whose firmware booted from `running`.
    pub fn new(running: BootImage) -> Self {
        Self {
            running,
            inits: 0,
            started: false,
            erased: Vec::new(),
            submits: Vec::new(),
            image: Vec::new(),
            finished: false,
            reboots: 0,
            refuse_block: None,
        }
    }

    /// Refuse the `block`-th submit (zero-based).
    pub fn refuse_block(mut self, block: usize) -> Self {
        self.refuse_block = Some(block);
        self
    }

    /// Times `init` was called.
    pub fn inits(&self) -> u32 {
        self.inits
    }

    /// Whether the upgrade-start flag is set.
    pub fn started(&self) -> bool {
        self.started
    }

    /// Lengths passed to `erase_block`, in order.
    pub fn erased(&self) -> &[usize] {
        &self.erased
    }

    /// Lengths passed to `submit`, in order.
    pub fn submits(&self) -> &[usize] {
        &self.submits
    }

    /// Bytes staged so far.
    pub fn image(&self) -> &[u8] {
        &self.image
    }

    /// Whether the image was flagged complete.
    pub fn finished(&self) -> bool {
        self.finished
    }

    /// Times `reboot` was called.
    pub fn reboots(&self) -> u32 {
        self.reboots
    }
}

impl Default for RecordingUpgrade {
    fn default() -> Self {
        Self::new(BootImage::User1)
    }
}

impl UpgradeSubsystem for RecordingUpgrade {
    type Error = UpgradeRefused;

    fn init(&mut self) {
        self.inits += 1;
        self.started = false;
        self.finished = false;
        self.erased.clear();
        self.submits.clear();
        self.image.clear();
    }

    fn mark_start(&mut self) {
        self.started = true;
    }

    fn erase_block(&mut self, len: usize) -> Result<(), Self::Error> {
        self.erased.push(len);
        Ok(())
    }

    fn submit(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        let block = self.submits.len();
        if self.refuse_block == Some(block) {
            return Err(UpgradeRefused { block });
        }
        self.submits.push(data.len());
        self.image.extend_from_slice(data);
        Ok(())
    }

    fn mark_finished(&mut self) {
        self.finished = true;
    }

    fn reboot(&mut self) {
        self.reboots += 1;
        if self.finished {
            self.running = self.running.other();
        }
    }

    fn running_image(&self) -> BootImage {
        self.running
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reboot_switches_only_finished_image() {
        let mut upgrade = RecordingUpgrade::default();
        upgrade.reboot();
        assert_eq!(upgrade.running_image(), BootImage::User1);

        upgrade.mark_finished();
        upgrade.reboot();
        assert_eq!(upgrade.running_image(), BootImage::User2);
        assert_eq!(upgrade.reboots(), 2);
    }

    #[test]
    fn test_refused_block() {
        let mut upgrade = RecordingUpgrade::default().refuse_block(1);
        upgrade.submit(b"abcd").unwrap();
        assert_eq!(upgrade.submit(b"efgh"), Err(UpgradeRefused { block: 1 }));
        assert_eq!(upgrade.image(), b"abcd");
    }
}
