//! UpgradeSubsystem port - the bootloader's over-the-air upgrade API.
//!
//! The subsystem knows which image slot is inactive and where the next block
//! goes; callers only feed it erase requests and data.

use core::fmt;

/// The two firmware image slots.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum BootImage {
    /// First image slot (`user1`).
    #[serde(rename = "user1")]
    User1,
    /// Second image slot (`user2`).
    #[serde(rename = "user2")]
    User2,
}

impl BootImage {
    /// 1-based slot number as shown to users.
    pub const fn number(self) -> u8 {
        match self {
            Self::User1 => 1,
            Self::User2 => 2,
        }
    }

    /// The other slot.
    pub const fn other(self) -> Self {
        match self {
            Self::User1 => Self::User2,
            Self::User2 => Self::User1,
        }
    }
}

impl fmt::Display for BootImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "user{}", self.number())
    }
}

/// Port for staging and activating a new firmware image.
pub trait UpgradeSubsystem {
    /// Subsystem error type.
    type Error: core::fmt::Debug;

    /// Reset the subsystem's write position to the start of the idle slot.
    fn init(&mut self);

    /// Flag that an upgrade is in progress.
    fn mark_start(&mut self);

    /// Erase `len` bytes ahead of the write position.
    fn erase_block(&mut self, len: usize) -> Result<(), Self::Error>;

    /// Append exactly `data` to the staged image.
    fn submit(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Flag the staged image as complete so the next boot selects it.
    fn mark_finished(&mut self);

    /// Reboot into whichever image is flagged.
    fn reboot(&mut self);

    /// Slot the running firmware booted from.
    fn running_image(&self) -> BootImage;
}

impl<T: UpgradeSubsystem + ?Sized> UpgradeSubsystem for &mut T {
    type Error = T::Error;

    fn init(&mut self) {
        (**self).init()
    }

    fn mark_start(&mut self) {
        (**self).mark_start()
    }

    fn erase_block(&mut self, len: usize) -> Result<(), Self::Error> {
        (**self).erase_block(len)
    }

    fn submit(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        (**self).submit(data)
    }

    fn mark_finished(&mut self) {
        (**self).mark_finished()
    }

    fn reboot(&mut self) {
        (**self).reboot()
    }

    fn running_image(&self) -> BootImage {
        (**self).running_image()
    }
}
