//! Type-safe buffer slot index.

use core::fmt;

/// Index of a fixed-size buffer slot.
///
/// Slot `n` covers bytes `[n * buffer_size, (n + 1) * buffer_size)` of the
/// object. Keeping the index separate from byte offsets prevents the two
/// from being mixed up in the read-ahead queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferIndex(u64);

impl BufferIndex {
    /// Create a new buffer index.
    ///
    /// # Examples
    ///
    /// ```
    /// use objio::domain::BufferIndex;
    ///
    /// let index = BufferIndex::new(3);
    /// assert_eq!(index.value(), 3);
    /// ```
    #[inline]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Slot containing byte `offset`.
    #[inline]
    pub const fn from_offset(offset: u64, buffer_size: usize) -> Self {
        Self(offset / buffer_size as u64)
    }

    /// Get the underlying value.
    #[inline]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// First byte offset covered by this slot.
    #[inline]
    pub const fn start(self, buffer_size: usize) -> u64 {
        self.0 * buffer_size as u64
    }

    /// The following slot.
    #[inline]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for BufferIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Buffer({})", self.0)
    }
}

impl From<u64> for BufferIndex {
    fn from(value: u64) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_offset() {
        assert_eq!(BufferIndex::from_offset(0, 1024), BufferIndex::new(0));
        assert_eq!(BufferIndex::from_offset(1023, 1024), BufferIndex::new(0));
        assert_eq!(BufferIndex::from_offset(1024, 1024), BufferIndex::new(1));
    }

    #[test]
    fn test_start_and_next() {
        let index = BufferIndex::new(2);
        assert_eq!(index.start(512), 1024);
        assert_eq!(index.next().value(), 3);
        assert_eq!(BufferIndex::new(u64::MAX).next().value(), u64::MAX);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", BufferIndex::new(7)), "Buffer(7)");
    }
}
