//! Type-safe flash byte address value object.

use core::fmt;

/// An absolute byte address on the flash chip.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FlashAddress(u32);

impl FlashAddress {
    /// Create a new flash address.
    #[inline]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Get the underlying u32 value.
    #[inline]
    pub const fn value(self) -> u32 {
        self.0
    }

    /// Move the address forward by `bytes`.
    #[inline]
    pub const fn add(self, bytes: u32) -> Self {
        Self(self.0.saturating_add(bytes))
    }

    /// Byte distance from `other` up to this address.
    #[inline]
    pub const fn offset_from(self, other: Self) -> u32 {
        self.0.saturating_sub(other.0)
    }
}

impl fmt::Display for FlashAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#08X}", self.0)
    }
}

impl From<u32> for FlashAddress {
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}

impl From<FlashAddress> for u32 {
    fn from(addr: FlashAddress) -> Self {
        addr.value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flash_address_add() {
        let addr = FlashAddress::new(0x7C000);
        assert_eq!(addr.add(4).value(), 0x7C004);

        let top = FlashAddress::new(u32::MAX);
        assert_eq!(top.add(1).value(), u32::MAX); // saturating
    }

    #[test]
    fn test_flash_address_offset() {
        let start = FlashAddress::new(0x1000);
        let cursor = FlashAddress::new(0x1404);
        assert_eq!(cursor.offset_from(start), 0x404);
        assert_eq!(start.offset_from(cursor), 0);
    }

    #[test]
    fn test_flash_address_display() {
        assert_eq!(format!("{}", FlashAddress::new(0x7C000)), "0x07C000");
    }
}
