//! Write-behind flush tracking.

use crate::domain::value_objects::ByteRange;
use std::collections::VecDeque;

/// How a writable stream turns full buffers into backend calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushDiscipline {
    /// Buffers become numbered parts, applied in creation order.
    ///
    /// Only forward writes are possible.
    Sequential,
    /// Buffers become range updates of at most `max_flush_size` bytes at
    /// their own offsets, after the object has been pre-allocated.
    RandomWrite {
        /// Largest single range update the backend accepts.
        max_flush_size: usize,
    },
}

impl FlushDiscipline {
    /// Returns true for [`RandomWrite`](Self::RandomWrite).
    #[inline]
    pub const fn is_random_write(&self) -> bool {
        matches!(self, Self::RandomWrite { .. })
    }

    /// Range-update limit, for random-write objects.
    #[inline]
    pub const fn max_flush_size(&self) -> Option<usize> {
        match self {
            Self::RandomWrite { max_flush_size } => Some(*max_flush_size),
            Self::Sequential => None,
        }
    }
}

/// Flushes that have been scheduled but not yet confirmed.
///
/// Kept in creation order. `max_buffers` bounds how many may be pending
/// (`0` means no limit); a writer that finds the queue saturated must wait
/// for the oldest before scheduling another.
#[derive(Debug)]
pub struct WriteBehind<T> {
    pending: VecDeque<(ByteRange, T)>,
    max_buffers: usize,
}

impl<T> WriteBehind<T> {
    /// Create an empty queue.
    pub fn new(max_buffers: usize) -> Self {
        Self {
            pending: VecDeque::new(),
            max_buffers,
        }
    }

    /// Number of pending flushes.
    #[inline]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns true if nothing is pending.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Returns true if another flush must wait for an older one first.
    #[inline]
    pub fn is_saturated(&self) -> bool {
        self.max_buffers != 0 && self.pending.len() >= self.max_buffers
    }

    /// Record a scheduled flush of `range`.
    pub fn push(&mut self, range: ByteRange, flush: T) {
        self.pending.push_back((range, flush));
    }

    /// Remove the oldest pending flush.
    pub fn pop_oldest(&mut self) -> Option<(ByteRange, T)> {
        self.pending.pop_front()
    }

    /// Remove every pending flush whose range overlaps `range`, oldest first.
    pub fn take_overlapping(&mut self, range: &ByteRange) -> Vec<(ByteRange, T)> {
        let mut taken = Vec::new();
        let mut kept = VecDeque::with_capacity(self.pending.len());
        for (pending, flush) in self.pending.drain(..) {
            if pending.overlaps(range) {
                taken.push((pending, flush));
            } else {
                kept.push_back((pending, flush));
            }
        }
        self.pending = kept;
        taken
    }

    /// Remove every pending flush, oldest first.
    pub fn drain(&mut self) -> impl Iterator<Item = (ByteRange, T)> + '_ {
        self.pending.drain(..)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discipline_queries() {
        assert!(!FlushDiscipline::Sequential.is_random_write());
        let random = FlushDiscipline::RandomWrite { max_flush_size: 4 };
        assert!(random.is_random_write());
        assert_eq!(random.max_flush_size(), Some(4));
        assert_eq!(FlushDiscipline::Sequential.max_flush_size(), None);
    }

    #[test]
    fn test_saturation() {
        let mut queue = WriteBehind::new(2);
        assert!(!queue.is_saturated());
        queue.push(ByteRange::new(0, 4), 'a');
        queue.push(ByteRange::new(4, 4), 'b');
        assert!(queue.is_saturated());
        assert_eq!(queue.pop_oldest(), Some((ByteRange::new(0, 4), 'a')));
        assert!(!queue.is_saturated());

        let mut unbounded = WriteBehind::new(0);
        for i in 0..100 {
            unbounded.push(ByteRange::new(i, 1), ());
        }
        assert!(!unbounded.is_saturated());
    }

    #[test]
    fn test_take_overlapping_keeps_order() {
        let mut queue = WriteBehind::new(0);
        queue.push(ByteRange::new(0, 4), 0);
        queue.push(ByteRange::new(4, 4), 1);
        queue.push(ByteRange::new(8, 4), 2);
        queue.push(ByteRange::new(2, 4), 3);

        let taken: Vec<_> = queue
            .take_overlapping(&ByteRange::new(3, 2))
            .into_iter()
            .map(|(_, id)| id)
            .collect();
        assert_eq!(taken, vec![0, 1, 3]);
        assert_eq!(queue.len(), 1);

        let rest: Vec<_> = queue.drain().map(|(_, id)| id).collect();
        assert_eq!(rest, vec![2]);
        assert!(queue.is_empty());
    }
}
