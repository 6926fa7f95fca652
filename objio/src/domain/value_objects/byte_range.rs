//! Half-open byte range value object.

use core::fmt;

/// The byte range `[start, end)` of an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ByteRange {
    start: u64,
    end: u64,
}

impl ByteRange {
    /// Range of `len` bytes starting at `start`.
    #[inline]
    pub const fn new(start: u64, len: u64) -> Self {
        Self {
            start,
            end: start.saturating_add(len),
        }
    }

    /// First byte of the range.
    #[inline]
    pub const fn start(&self) -> u64 {
        self.start
    }

    /// One past the last byte of the range.
    #[inline]
    pub const fn end(&self) -> u64 {
        self.end
    }

    /// Number of bytes covered.
    #[inline]
    pub const fn len(&self) -> u64 {
        self.end - self.start
    }

    /// Returns true if the range covers no bytes.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Returns true if both ranges share at least one byte.
    ///
    /// An empty range overlaps nothing.
    #[inline]
    pub const fn overlaps(&self, other: &Self) -> bool {
        !self.is_empty() && !other.is_empty() && self.start < other.end && other.start < self.end
    }

    /// Split the range into consecutive pieces of at most `max` bytes.
    ///
    /// # Examples
    ///
    /// ```
    /// use objio::domain::ByteRange;
    ///
    /// let pieces: Vec<_> = ByteRange::new(0, 10).chunks(4).collect();
    /// assert_eq!(pieces, vec![
    ///     ByteRange::new(0, 4),
    ///     ByteRange::new(4, 4),
    ///     ByteRange::new(8, 2),
    /// ]);
    /// ```
    pub fn chunks(self, max: usize) -> impl Iterator<Item = ByteRange> {
        let step = max.max(1) as u64;
        let end = self.end;
        (self.start..end)
            .step_by(step as usize)
            .map(move |start| ByteRange::new(start, step.min(end - start)))
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_len_and_empty() {
        let range = ByteRange::new(10, 5);
        assert_eq!(range.end(), 15);
        assert_eq!(range.len(), 5);
        assert!(!range.is_empty());
        assert!(ByteRange::new(3, 0).is_empty());
    }

    #[test]
    fn test_overlaps() {
        let a = ByteRange::new(0, 10);
        assert!(a.overlaps(&ByteRange::new(9, 5)));
        assert!(!a.overlaps(&ByteRange::new(10, 5)));
        assert!(!a.overlaps(&ByteRange::new(5, 0)));
        assert!(!ByteRange::new(5, 0).overlaps(&a));
    }

    #[test]
    fn test_chunks_exact_and_empty() {
        assert_eq!(ByteRange::new(8, 8).chunks(4).count(), 2);
        assert_eq!(ByteRange::new(8, 0).chunks(4).count(), 0);
        let last = ByteRange::new(0, 9).chunks(4).last().unwrap();
        assert_eq!(last, ByteRange::new(8, 1));
    }
}
