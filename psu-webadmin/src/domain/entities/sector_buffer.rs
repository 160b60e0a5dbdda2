//! Sector buffer entity - one erase block of pending upload data.

use alloc::boxed::Box;
use alloc::vec;

/// Value of erased NOR flash; used to pad partial words.
pub const ERASED_BYTE: u8 = 0xFF;

/// Fixed-capacity buffer that gathers upload bytes until a whole sector
/// (or the tail of the upload) is ready to commit.
///
/// The fill level never exceeds the capacity fixed at construction.
pub struct SectorBuffer {
    data: Box<[u8]>,
    len: usize,
}

impl SectorBuffer {
    /// Create an empty buffer holding up to `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![ERASED_BYTE; capacity].into_boxed_slice(),
            len: 0,
        }
    }

    /// Total capacity in bytes.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Buffered byte count.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether nothing is buffered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether the buffer holds a whole sector.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.len == self.data.len()
    }

    /// Free space in bytes.
    #[inline]
    pub fn spare(&self) -> usize {
        self.data.len() - self.len
    }

    /// Buffered bytes.
    #[inline]
    pub fn filled(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// Append as much of `bytes` as fits. Returns the number taken.
    pub fn extend(&mut self, bytes: &[u8]) -> usize {
        let take = bytes.len().min(self.spare());
        self.data[self.len..self.len + take].copy_from_slice(&bytes[..take]);
        self.len += take;
        take
    }

    /// Fill from `source`, which writes into the free tail and returns how
    /// many bytes it produced. At most `limit` bytes are offered.
    pub fn fill_with<F>(&mut self, limit: usize, source: F) -> usize
    where
        F: FnOnce(&mut [u8]) -> usize,
    {
        let end = self.len + limit.min(self.spare());
        let produced = source(&mut self.data[self.len..end]).min(end - self.len);
        self.len += produced;
        produced
    }

    /// Buffered bytes padded with [`ERASED_BYTE`] up to a multiple of `word`.
    ///
    /// The capacity must itself be a multiple of `word`.
    pub fn word_aligned(&mut self, word: usize) -> &[u8] {
        let aligned = self.len.div_ceil(word) * word;
        self.data[self.len..aligned].fill(ERASED_BYTE);
        &self.data[..aligned]
    }

    /// Drop the buffered bytes.
    #[inline]
    pub fn clear(&mut self) {
        self.len = 0;
    }
}

impl core::fmt::Debug for SectorBuffer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SectorBuffer")
            .field("len", &self.len)
            .field("capacity", &self.data.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extend_stops_at_capacity() {
        let mut buf = SectorBuffer::new(8);
        assert_eq!(buf.extend(b"hello"), 5);
        assert_eq!(buf.extend(b"world"), 3);
        assert!(buf.is_full());
        assert_eq!(buf.filled(), b"hellowor");
    }

    #[test]
    fn test_fill_with_respects_limit() {
        let mut buf = SectorBuffer::new(16);
        let n = buf.fill_with(4, |tail| {
            assert_eq!(tail.len(), 4);
            tail.copy_from_slice(b"abcd");
            4
        });
        assert_eq!(n, 4);
        assert_eq!(buf.spare(), 12);
    }

    #[test]
    fn test_word_aligned_pads_with_erased_bytes() {
        let mut buf = SectorBuffer::new(8);
        buf.extend(b"abcdef");
        buf.clear();
        buf.extend(b"x");
        assert_eq!(buf.word_aligned(4), &[b'x', 0xFF, 0xFF, 0xFF]);
        assert_eq!(buf.len(), 1);
    }

    #[test]
    fn test_word_aligned_full_buffer_unchanged() {
        let mut buf = SectorBuffer::new(4);
        buf.extend(b"abcd");
        assert_eq!(buf.word_aligned(4), b"abcd");
    }
}
