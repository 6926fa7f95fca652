//! Unbuffered stream over one object.

use crate::adapters::ObjectBinding;
use crate::domain::{ByteRange, FlushDiscipline, Metadata, ObjectIoError, ObjectSystem, OpenMode, StreamState};
use crate::log_macros::{debug, log_warn};
use bytes::Bytes;
use core::fmt;
use std::io::SeekFrom;

// Whole-object image held by a raw writer until flush
struct WriteImage {
    data: Vec<u8>,
    dirty: bool,
}

/// A stream that maps each read to one range request.
///
/// Reads go straight to the backend with no prefetching. Writes edit an
/// in-memory image of the object that is uploaded as a whole on
/// [`flush_image`](Self::flush_image) and on [`close`](Self::close), so a
/// raw writer can seek freely whatever the object kind.
pub struct RawObjectStream<S: ObjectSystem> {
    state: StreamState,
    binding: ObjectBinding<S>,
    discipline: Option<FlushDiscipline>,
    image: Option<WriteImage>,
}

impl<S: ObjectSystem> RawObjectStream<S> {
    pub(crate) fn new_reader(state: StreamState, binding: ObjectBinding<S>) -> Self {
        Self {
            state,
            binding,
            discipline: None,
            image: None,
        }
    }

    /// `initial` holds the existing content kept in append mode.
    pub(crate) fn new_writer(
        state: StreamState,
        binding: ObjectBinding<S>,
        discipline: FlushDiscipline,
        initial: Option<Bytes>,
    ) -> Self {
        // Truncating modes create the object even if nothing is written
        let image = match initial {
            Some(existing) => WriteImage {
                data: existing.to_vec(),
                dirty: false,
            },
            None => WriteImage {
                data: Vec::new(),
                dirty: true,
            },
        };
        state.set_position(image.data.len() as u64);
        Self {
            state,
            binding,
            discipline: Some(discipline),
            image: Some(image),
        }
    }

    /// Object path.
    pub fn name(&self) -> &str {
        self.state.name()
    }

    /// Mode the stream was opened with.
    pub fn mode(&self) -> OpenMode {
        self.state.mode()
    }

    /// Returns true for streams opened with `r`.
    pub fn readable(&self) -> bool {
        self.state.readable()
    }

    /// Returns true for streams opened with `w`, `a` or `x`.
    pub fn writable(&self) -> bool {
        self.state.writable()
    }

    /// Raw streams can always seek.
    pub fn seekable(&self) -> bool {
        self.state.seekable()
    }

    /// Returns true once [`close`](Self::close) has run.
    pub fn closed(&self) -> bool {
        self.state.is_closed()
    }

    /// Current offset.
    pub fn tell(&self) -> Result<u64, ObjectIoError> {
        self.state.tell()
    }

    /// Object metadata.
    pub fn metadata(&self) -> Result<&Metadata, ObjectIoError> {
        self.binding.metadata()
    }

    /// Object size; for writers, the size of the pending image.
    pub fn size(&self) -> Result<u64, ObjectIoError> {
        match &self.image {
            Some(image) => Ok(image.data.len() as u64),
            None => self.binding.size(),
        }
    }

    /// Read into `buf` with a single range request.
    pub fn read_into(&mut self, buf: &mut [u8]) -> Result<usize, ObjectIoError> {
        self.state.ensure_readable()?;
        if buf.is_empty() {
            return Ok(0);
        }
        let position = self.state.position();
        let data = self.fetch(position, buf.len())?;
        let n = data.len().min(buf.len());
        buf[..n].copy_from_slice(&data[..n]);
        self.state.advance(n);
        Ok(n)
    }

    /// Read up to `n` bytes, or to the end of the object with `None`.
    pub fn read_bytes(&mut self, n: Option<usize>) -> Result<Bytes, ObjectIoError> {
        self.state.ensure_readable()?;
        let position = self.state.position();
        let len = match n {
            Some(n) => n,
            None => self.binding.size()?.saturating_sub(position) as usize,
        };
        if len == 0 {
            return Ok(Bytes::new());
        }
        let data = self.fetch(position, len)?;
        self.state.advance(data.len());
        Ok(data)
    }

    /// Read everything from the current position to the end of the object.
    pub fn read_all(&mut self) -> Result<Bytes, ObjectIoError> {
        self.read_bytes(None)
    }

    fn fetch(&self, offset: u64, len: usize) -> Result<Bytes, ObjectIoError> {
        let handle = self.binding.handle()?;
        match handle.read_range(offset, len) {
            Ok(data) => Ok(data),
            Err(err) if err.is_out_of_range() => Ok(Bytes::new()),
            Err(err) => Err(ObjectIoError::transfer("read_range", offset, err)),
        }
    }

    /// Write `data` at the current position of the image.
    ///
    /// Writing past the end zero-fills the gap.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectIoError::InvalidInput`] if the image cannot grow to
    /// the end of the write.
    pub fn write_bytes(&mut self, data: &[u8]) -> Result<usize, ObjectIoError> {
        self.state.ensure_writable()?;
        let image = self
            .image
            .as_mut()
            .ok_or(ObjectIoError::UnsupportedOperation("write"))?;
        let end = self.state.end_of_write(data.len())?;
        let too_large = || ObjectIoError::InvalidInput(format!("Write ending at {} does not fit in memory", end));
        let end = usize::try_from(end).map_err(|_| too_large())?;
        let position = end - data.len();
        if image.data.len() < end {
            image
                .data
                .try_reserve(end - image.data.len())
                .map_err(|_| too_large())?;
            image.data.resize(end, 0);
        }
        image.data[position..end].copy_from_slice(data);
        image.dirty = true;
        self.state.advance(data.len());
        Ok(data.len())
    }

    /// Move to `pos` and return the new offset.
    pub fn seek_to(&mut self, pos: SeekFrom) -> Result<u64, ObjectIoError> {
        self.state.ensure_open()?;
        let size = match pos {
            SeekFrom::End(_) => Some(self.size()?),
            _ => None,
        };
        self.state.seek(pos, size)
    }

    /// Upload the image if it changed since the last upload.
    pub fn flush_image(&mut self) -> Result<(), ObjectIoError> {
        self.state.ensure_open()?;
        self.upload()
    }

    fn upload(&mut self) -> Result<(), ObjectIoError> {
        let (Some(image), Some(discipline)) = (self.image.as_mut(), self.discipline) else {
            return Ok(());
        };
        if !image.dirty {
            return Ok(());
        }
        let handle = self.binding.handle()?;
        let data = Bytes::copy_from_slice(&image.data);
        debug!("{}: uploading {} bytes", self.state.name(), data.len());
        match discipline {
            FlushDiscipline::Sequential => {
                handle
                    .begin_upload(false)
                    .map_err(|e| ObjectIoError::transfer("begin_upload", 0, e))?;
                handle
                    .flush_part(0, data)
                    .map_err(|e| ObjectIoError::transfer("flush_part", 0, e))?;
                handle
                    .commit(1)
                    .map_err(|e| ObjectIoError::transfer("commit", 0, e))?;
            }
            FlushDiscipline::RandomWrite { max_flush_size } => {
                let size = data.len() as u64;
                handle
                    .create_from_size(size)
                    .map_err(|e| ObjectIoError::transfer("create_from_size", 0, e))?;
                for piece in ByteRange::new(0, size).chunks(max_flush_size) {
                    let from = piece.start() as usize;
                    handle
                        .update_range(piece.start(), data.slice(from..from + piece.len() as usize))
                        .map_err(|e| ObjectIoError::transfer("update_range", piece.start(), e))?;
                }
            }
        }
        image.dirty = false;
        Ok(())
    }

    /// Upload pending writes and close. Only the first call does anything.
    pub fn close(&mut self) -> Result<(), ObjectIoError> {
        if !self.state.mark_closed() {
            return Ok(());
        }
        self.upload()
    }
}

impl<S: ObjectSystem> fmt::Display for RawObjectStream<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<RawObjectStream name='{}' mode='{}'>",
            self.state.name(),
            self.state.mode()
        )
    }
}

impl<S: ObjectSystem> fmt::Debug for RawObjectStream<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawObjectStream")
            .field("state", &self.state)
            .field("discipline", &self.discipline)
            .finish_non_exhaustive()
    }
}

impl<S: ObjectSystem> Drop for RawObjectStream<S> {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            log_warn!("error closing {} on drop: {}", self.state.name(), err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ObjectKind;
    use objio_platform::MemorySystem;

    fn raw_writer(system: &MemorySystem, path: &str, kind: ObjectKind, discipline: FlushDiscipline) -> RawObjectStream<MemorySystem> {
        let binding = ObjectBinding::new(system.clone(), path, kind);
        RawObjectStream::new_writer(StreamState::new(path, OpenMode::WRITE, true), binding, discipline, None)
    }

    #[test]
    fn test_read_is_one_request() {
        let system = MemorySystem::new();
        system.put_object("obj", ObjectKind::Block, b"0123456789".to_vec());
        let binding = ObjectBinding::new(system.clone(), "obj", ObjectKind::Block);
        let mut stream = RawObjectStream::new_reader(StreamState::new("obj", OpenMode::READ, true), binding);

        let mut buf = [0u8; 4];
        assert_eq!(stream.read_into(&mut buf).unwrap(), 4);
        assert_eq!(&buf, b"0123");
        stream.seek_to(SeekFrom::End(-2)).unwrap();
        assert_eq!(&stream.read_all().unwrap()[..], b"89");
        assert_eq!(stream.read_into(&mut buf).unwrap(), 0);
        assert_eq!(system.read_calls("obj"), vec![(0, 4), (8, 2), (10, 4)]);
    }

    #[test]
    fn test_sequential_writer_seeks_in_image() {
        let system = MemorySystem::new();
        let mut stream = raw_writer(&system, "blob", ObjectKind::Block, FlushDiscipline::Sequential);
        stream.write_bytes(b"hello").unwrap();
        stream.seek_to(SeekFrom::Start(0)).unwrap();
        stream.write_bytes(b"J").unwrap();
        stream.seek_to(SeekFrom::Start(7)).unwrap();
        stream.write_bytes(b"!").unwrap();
        stream.close().unwrap();
        assert_eq!(&system.get_object("blob").unwrap()[..], b"Jello\0\0!");
    }

    #[test]
    fn test_random_writer_chunks_upload() {
        let system = MemorySystem::new().with_max_flush_size(4);
        let mut stream = raw_writer(&system, "page", ObjectKind::Page, FlushDiscipline::RandomWrite { max_flush_size: 4 });
        stream.write_bytes(&[7u8; 10]).unwrap();
        stream.close().unwrap();
        assert_eq!(system.get_object("page").unwrap().len(), 10);
        assert_eq!(system.update_calls("page").len(), 3);
    }

    #[test]
    fn test_far_seek_write_is_rejected() {
        let system = MemorySystem::new();
        let mut stream = raw_writer(&system, "far", ObjectKind::Block, FlushDiscipline::Sequential);
        for target in [u64::MAX, u64::MAX / 2] {
            stream.seek_to(SeekFrom::Start(target)).unwrap();
            assert!(matches!(stream.write_bytes(b"x"), Err(ObjectIoError::InvalidInput(_))));
            assert_eq!(stream.tell().unwrap(), target);
        }
        assert_eq!(stream.size().unwrap(), 0);
        stream.seek_to(SeekFrom::Start(0)).unwrap();
        stream.write_bytes(b"ok").unwrap();
        stream.close().unwrap();
        assert_eq!(&system.get_object("far").unwrap()[..], b"ok");
    }

    #[test]
    fn test_empty_writer_creates_object() {
        let system = MemorySystem::new();
        let mut stream = raw_writer(&system, "empty", ObjectKind::Block, FlushDiscipline::Sequential);
        stream.close().unwrap();
        assert_eq!(system.get_object("empty").unwrap().len(), 0);
        assert!(stream.closed());
        assert!(matches!(stream.write_bytes(b"x"), Err(ObjectIoError::StreamClosed)));
    }
}
