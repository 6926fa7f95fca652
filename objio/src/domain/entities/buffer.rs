//! Write buffer entity.

use super::BufferState;
use crate::domain::value_objects::ByteRange;
use bytes::{Bytes, BytesMut};

/// Bytes accumulated for one flush.
///
/// A buffer is anchored at the object offset of its first byte and grows by
/// contiguous appends until it reaches its capacity. Freezing hands the
/// content off as an immutable [`Bytes`] for the flush task.
#[derive(Debug)]
pub struct Buffer {
    start: u64,
    capacity: usize,
    data: BytesMut,
}

impl Buffer {
    /// Create an empty buffer anchored at `start`.
    pub fn new(start: u64, capacity: usize) -> Self {
        Self {
            start,
            capacity,
            data: BytesMut::with_capacity(capacity),
        }
    }

    /// Object offset of the first byte.
    #[inline]
    pub fn start(&self) -> u64 {
        self.start
    }

    /// Object offset one past the last buffered byte.
    #[inline]
    pub fn end(&self) -> u64 {
        self.start + self.data.len() as u64
    }

    /// Number of buffered bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if nothing has been buffered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes that still fit.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.capacity - self.data.len()
    }

    /// Current fill state.
    pub fn state(&self) -> BufferState {
        if self.data.is_empty() {
            BufferState::Empty
        } else if self.data.len() >= self.capacity {
            BufferState::Full
        } else {
            BufferState::Partial
        }
    }

    /// Object range covered by the buffered bytes.
    #[inline]
    pub fn range(&self) -> ByteRange {
        ByteRange::new(self.start, self.data.len() as u64)
    }

    /// Copy as much of `src` as fits, returning the number of bytes taken.
    pub fn append(&mut self, src: &[u8]) -> usize {
        let n = src.len().min(self.remaining());
        self.data.extend_from_slice(&src[..n]);
        n
    }

    /// Hand off the content and re-anchor the now empty buffer at `next_start`.
    pub fn take(&mut self, next_start: u64) -> (ByteRange, Bytes) {
        let range = self.range();
        let data = self.data.split().freeze();
        self.start = next_start;
        self.data.reserve(self.capacity);
        (range, data)
    }

    /// Re-anchor an empty buffer at `start`.
    ///
    /// Has no effect if the buffer holds data.
    pub fn reanchor(&mut self, start: u64) {
        if self.data.is_empty() {
            self.start = start;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_until_full() {
        let mut buffer = Buffer::new(100, 4);
        assert_eq!(buffer.state(), BufferState::Empty);
        assert_eq!(buffer.append(b"ab"), 2);
        assert_eq!(buffer.state(), BufferState::Partial);
        assert_eq!(buffer.append(b"cdef"), 2);
        assert_eq!(buffer.state(), BufferState::Full);
        assert_eq!(buffer.append(b"g"), 0);
        assert_eq!(buffer.range(), ByteRange::new(100, 4));
    }

    #[test]
    fn test_take_reanchors() {
        let mut buffer = Buffer::new(0, 8);
        buffer.append(b"hello");
        let (range, data) = buffer.take(5);
        assert_eq!(range, ByteRange::new(0, 5));
        assert_eq!(&data[..], b"hello");
        assert!(buffer.is_empty());
        assert_eq!(buffer.start(), 5);
        assert_eq!(buffer.remaining(), 8);
    }

    #[test]
    fn test_reanchor_only_when_empty() {
        let mut buffer = Buffer::new(0, 8);
        buffer.reanchor(32);
        assert_eq!(buffer.start(), 32);
        buffer.append(b"x");
        buffer.reanchor(64);
        assert_eq!(buffer.start(), 32);
        assert_eq!(buffer.end(), 33);
    }
}
