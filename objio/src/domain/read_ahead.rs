//! Read-ahead window planning.

use crate::domain::value_objects::BufferIndex;
use std::collections::VecDeque;

/// The window of buffer fetches kept in flight ahead of a reader.
///
/// Entries are held in ascending slot order. The window never holds more
/// than `max_buffers` entries (`0` means no limit) and never schedules a
/// slot twice unless the reader seeks back to it. The fetch itself is
/// opaque: `T` is whatever handle the caller's scheduler returns.
#[derive(Debug)]
pub struct ReadAhead<T> {
    queue: VecDeque<(BufferIndex, T)>,
    next_fetch: BufferIndex,
    max_buffers: usize,
}

impl<T> ReadAhead<T> {
    /// Create an empty window starting at slot 0.
    pub fn new(max_buffers: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            next_fetch: BufferIndex::new(0),
            max_buffers,
        }
    }

    /// Number of queued fetches.
    #[inline]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Returns true if nothing is queued.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Next slot that will be scheduled.
    #[inline]
    pub fn next_fetch(&self) -> BufferIndex {
        self.next_fetch
    }

    /// Anchor the window at `index`, the slot the reader needs next.
    ///
    /// Queued entries before `index` are discarded. If the remaining queue
    /// does not start at `index` the whole window is discarded and
    /// scheduling restarts there. Returns the number of entries dropped.
    pub fn realign(&mut self, index: BufferIndex) -> usize {
        let before = self.queue.len();
        while self.queue.front().is_some_and(|(slot, _)| *slot < index) {
            self.queue.pop_front();
        }
        match self.queue.front() {
            Some((slot, _)) if *slot == index => {}
            Some(_) => {
                self.queue.clear();
                self.next_fetch = index;
            }
            None => self.next_fetch = index,
        }
        before - self.queue.len()
    }

    /// Schedule fetches until the window is full or `slot_count` is reached.
    ///
    /// Returns the number of fetches scheduled.
    pub fn refill(&mut self, slot_count: u64, mut schedule: impl FnMut(BufferIndex) -> T) -> usize {
        let mut scheduled = 0;
        while self.next_fetch.value() < slot_count
            && (self.max_buffers == 0 || self.queue.len() < self.max_buffers)
        {
            let slot = self.next_fetch;
            self.queue.push_back((slot, schedule(slot)));
            self.next_fetch = slot.next();
            scheduled += 1;
        }
        scheduled
    }

    /// Take the fetch for `index` if it is at the front of the window.
    pub fn pop_front(&mut self, index: BufferIndex) -> Option<T> {
        match self.queue.front() {
            Some((slot, _)) if *slot == index => self.queue.pop_front().map(|(_, fetch)| fetch),
            _ => None,
        }
    }

    /// Discard every queued fetch.
    pub fn clear(&mut self) -> usize {
        let dropped = self.queue.len();
        self.queue.clear();
        dropped
    }
}
