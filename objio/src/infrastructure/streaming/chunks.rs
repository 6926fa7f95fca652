//! Chunked iteration over an object.

use crate::domain::{ByteRange, ObjectIoError, TransferHandle};
use crate::infrastructure::worker_pool::PrefetchFirst;
use bytes::Bytes;
use core::fmt;
use std::sync::Arc;

/// Sequential range reads covering `[start, size)`.
pub(crate) struct RangeReads {
    handle: Arc<dyn TransferHandle>,
    pieces: Box<dyn Iterator<Item = ByteRange> + Send>,
}

impl RangeReads {
    pub(crate) fn new(handle: Arc<dyn TransferHandle>, start: u64, size: u64, chunk_size: usize) -> Self {
        let range = ByteRange::new(start.min(size), size.saturating_sub(start));
        Self {
            handle,
            pieces: Box::new(range.chunks(chunk_size)),
        }
    }
}

impl Iterator for RangeReads {
    type Item = Result<Bytes, ObjectIoError>;

    fn next(&mut self) -> Option<Self::Item> {
        let piece = self.pieces.next()?;
        Some(
            self.handle
                .read_range(piece.start(), piece.len() as usize)
                .map_err(|e| ObjectIoError::transfer("read_range", piece.start(), e)),
        )
    }
}

/// Iterator returned by
/// [`BufferedObjectStream::chunks`](crate::BufferedObjectStream::chunks).
///
/// Yields one `buffer_size` chunk per step; the last one may be shorter.
pub struct ObjectChunks {
    inner: PrefetchFirst<RangeReads>,
}

impl ObjectChunks {
    pub(crate) fn new(inner: PrefetchFirst<RangeReads>) -> Self {
        Self { inner }
    }
}

impl Iterator for ObjectChunks {
    type Item = Result<Bytes, ObjectIoError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|item| item.and_then(|chunk| chunk))
    }
}

impl fmt::Debug for ObjectChunks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectChunks").field("inner", &self.inner).finish()
    }
}
