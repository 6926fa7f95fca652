//! Position, mode and lifecycle of one open stream.

use crate::domain::error::ObjectIoError;
use crate::domain::value_objects::OpenMode;
use parking_lot::Mutex;
use std::io::SeekFrom;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared cursor and lifecycle flags of a stream.
///
/// The position is the only field callers mutate concurrently; it sits
/// behind its own lock so a reader never observes a torn update. The closed
/// flag moves one way, from open to closed.
#[derive(Debug)]
pub struct StreamState {
    name: String,
    mode: OpenMode,
    seekable: bool,
    position: Mutex<u64>,
    closed: AtomicBool,
}

impl StreamState {
    /// Create the state of a stream opened on `name`.
    pub fn new(name: impl Into<String>, mode: OpenMode, seekable: bool) -> Self {
        Self {
            name: name.into(),
            mode,
            seekable,
            position: Mutex::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// Object path.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Mode the stream was opened with.
    #[inline]
    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    /// Returns true if the stream was opened for reading.
    #[inline]
    pub fn readable(&self) -> bool {
        self.mode.is_readable()
    }

    /// Returns true if the stream was opened for writing.
    #[inline]
    pub fn writable(&self) -> bool {
        self.mode.is_writable()
    }

    /// Returns true unless the backend declared the stream non-seekable.
    #[inline]
    pub fn seekable(&self) -> bool {
        self.seekable
    }

    /// Returns true once the stream has been closed.
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Current offset.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectIoError::UnsupportedOperation`] on a non-seekable stream.
    pub fn tell(&self) -> Result<u64, ObjectIoError> {
        if !self.seekable {
            return Err(ObjectIoError::UnsupportedOperation("tell"));
        }
        Ok(*self.position.lock())
    }

    /// Current offset, regardless of seekability.
    #[inline]
    pub(crate) fn position(&self) -> u64 {
        *self.position.lock()
    }

    pub(crate) fn set_position(&self, position: u64) {
        *self.position.lock() = position;
    }

    /// Move the position forward by `n` bytes and return the new offset.
    ///
    /// Callers check [`end_of_write`](Self::end_of_write) first, so the
    /// sum never wraps.
    pub(crate) fn advance(&self, n: usize) -> u64 {
        let mut position = self.position.lock();
        *position = position.saturating_add(n as u64);
        *position
    }

    /// Offset just past `len` bytes written at the current position.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectIoError::InvalidInput`] if that offset does not fit
    /// in a `u64`.
    pub(crate) fn end_of_write(&self, len: usize) -> Result<u64, ObjectIoError> {
        let position = self.position();
        position.checked_add(len as u64).ok_or_else(|| {
            ObjectIoError::InvalidInput(format!("Write of {} bytes at {} overflows the object size", len, position))
        })
    }

    /// Absolute offset `pos` refers to, without moving.
    ///
    /// `size` is required for [`SeekFrom::End`].
    ///
    /// # Errors
    ///
    /// Returns [`ObjectIoError::InvalidInput`] for a negative target and
    /// [`ObjectIoError::UnsupportedOperation`] when seeking is not allowed.
    pub fn target(&self, pos: SeekFrom, size: Option<u64>) -> Result<u64, ObjectIoError> {
        let current = *self.position.lock();
        self.resolve(pos, current, size)
    }

    /// Move to `pos` and return the new absolute offset.
    ///
    /// Computing and storing the target happens under one lock.
    pub fn seek(&self, pos: SeekFrom, size: Option<u64>) -> Result<u64, ObjectIoError> {
        let mut position = self.position.lock();
        let target = self.resolve(pos, *position, size)?;
        *position = target;
        Ok(target)
    }

    fn resolve(&self, pos: SeekFrom, current: u64, size: Option<u64>) -> Result<u64, ObjectIoError> {
        if !self.seekable {
            return Err(ObjectIoError::UnsupportedOperation("seek"));
        }
        let (base, offset) = match pos {
            SeekFrom::Start(offset) => return Ok(offset),
            SeekFrom::Current(offset) => (current, offset),
            SeekFrom::End(offset) => (
                size.ok_or(ObjectIoError::UnsupportedOperation("seek from end"))?,
                offset,
            ),
        };
        base.checked_add_signed(offset).ok_or_else(|| {
            ObjectIoError::InvalidInput(format!("Negative seek position {}", base as i128 + offset as i128))
        })
    }

    /// Flip the closed flag, returning true only for the first call.
    pub fn mark_closed(&self) -> bool {
        !self.closed.swap(true, Ordering::AcqRel)
    }

    /// Check the stream is still open.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectIoError::StreamClosed`] once closed.
    pub fn ensure_open(&self) -> Result<(), ObjectIoError> {
        if self.is_closed() {
            return Err(ObjectIoError::StreamClosed);
        }
        Ok(())
    }

    /// Check the stream is open and readable.
    pub fn ensure_readable(&self) -> Result<(), ObjectIoError> {
        self.ensure_open()?;
        if !self.readable() {
            return Err(ObjectIoError::UnsupportedOperation("read"));
        }
        Ok(())
    }

    /// Check the stream is open and writable.
    pub fn ensure_writable(&self) -> Result<(), ObjectIoError> {
        self.ensure_open()?;
        if !self.writable() {
            return Err(ObjectIoError::UnsupportedOperation("write"));
        }
        Ok(())
    }
}
