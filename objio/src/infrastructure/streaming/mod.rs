//! Object streams.
//!
//! [`BufferedObjectStream`] prefetches and flushes whole buffers on a
//! worker pool; [`RawObjectStream`] maps every call to the backend
//! directly. [`ObjectStream`] is what [`open`](crate::open) returns and
//! holds either one.

mod buffered_stream;
mod chunks;
mod raw_stream;
mod std_io_impl;

pub use buffered_stream::BufferedObjectStream;
pub(crate) use buffered_stream::WriteSetup;
pub use chunks::ObjectChunks;
pub use raw_stream::RawObjectStream;

use crate::domain::{Metadata, ObjectIoError, ObjectSystem, OpenMode};
use bytes::Bytes;
use core::fmt;
use std::io::SeekFrom;

/// A raw or buffered stream, chosen at open time.
pub enum ObjectStream<S: ObjectSystem> {
    /// Unbuffered stream.
    Raw(RawObjectStream<S>),
    /// Read-ahead / write-behind stream.
    Buffered(BufferedObjectStream<S>),
}

macro_rules! delegate {
    ($self:ident, $stream:ident => $body:expr) => {
        match $self {
            ObjectStream::Raw($stream) => $body,
            ObjectStream::Buffered($stream) => $body,
        }
    };
}

impl<S: ObjectSystem> ObjectStream<S> {
    /// Object path.
    pub fn name(&self) -> &str {
        delegate!(self, s => s.name())
    }

    /// Mode the stream was opened with.
    pub fn mode(&self) -> OpenMode {
        delegate!(self, s => s.mode())
    }

    /// Returns true for streams opened with `r`.
    pub fn readable(&self) -> bool {
        delegate!(self, s => s.readable())
    }

    /// Returns true for streams opened with `w`, `a` or `x`.
    pub fn writable(&self) -> bool {
        delegate!(self, s => s.writable())
    }

    /// Returns true if the stream can seek.
    pub fn seekable(&self) -> bool {
        delegate!(self, s => s.seekable())
    }

    /// Returns true once closed.
    pub fn closed(&self) -> bool {
        delegate!(self, s => s.closed())
    }

    /// Returns true for [`ObjectStream::Buffered`].
    pub fn is_buffered(&self) -> bool {
        matches!(self, Self::Buffered(_))
    }

    /// Current offset.
    pub fn tell(&self) -> Result<u64, ObjectIoError> {
        delegate!(self, s => s.tell())
    }

    /// Object metadata.
    pub fn metadata(&self) -> Result<&Metadata, ObjectIoError> {
        delegate!(self, s => s.metadata())
    }

    /// Object size.
    pub fn size(&self) -> Result<u64, ObjectIoError> {
        delegate!(self, s => s.size())
    }

    /// Read into `buf`; zero at end of object.
    pub fn read_into(&mut self, buf: &mut [u8]) -> Result<usize, ObjectIoError> {
        delegate!(self, s => s.read_into(buf))
    }

    /// Read up to `n` bytes, or everything left with `None`.
    pub fn read_bytes(&mut self, n: Option<usize>) -> Result<Bytes, ObjectIoError> {
        delegate!(self, s => s.read_bytes(n))
    }

    /// Read everything left.
    pub fn read_all(&mut self) -> Result<Bytes, ObjectIoError> {
        delegate!(self, s => s.read_all())
    }

    /// Write `data` at the current position.
    pub fn write_bytes(&mut self, data: &[u8]) -> Result<usize, ObjectIoError> {
        delegate!(self, s => s.write_bytes(data))
    }

    /// Move to `pos`.
    pub fn seek_to(&mut self, pos: SeekFrom) -> Result<u64, ObjectIoError> {
        delegate!(self, s => s.seek_to(pos))
    }

    /// Finish the stream.
    pub fn close(&mut self) -> Result<(), ObjectIoError> {
        delegate!(self, s => s.close())
    }
}

impl<S: ObjectSystem> fmt::Debug for ObjectStream<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        delegate!(self, s => fmt::Debug::fmt(s, f))
    }
}

impl<S: ObjectSystem> fmt::Display for ObjectStream<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        delegate!(self, s => fmt::Display::fmt(s, f))
    }
}
