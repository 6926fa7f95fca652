//! Read-ahead / write-behind stream over one object.

use crate::adapters::ObjectBinding;
use crate::domain::{
    Buffer, BufferConfig, BufferIndex, ByteRange, FlushDiscipline, Metadata, ObjectIoError,
    ObjectSystem, OpenMode, ReadAhead, StreamState, TransferHandle, WriteBehind,
};
use crate::infrastructure::streaming::chunks::{ObjectChunks, RangeReads};
use crate::infrastructure::worker_pool::{Pending, WorkerPool};
use crate::log_macros::{debug, log_warn, trace};
use bytes::{Bytes, BytesMut};
use core::fmt;
use parking_lot::Mutex;
use std::io::SeekFrom;
use std::sync::Arc;

type Fetch = Pending<Result<Bytes, ObjectIoError>>;
type Flush = Pending<Result<(), ObjectIoError>>;

struct ReadSide {
    window: ReadAhead<Fetch>,
    // Last delivered buffer, kept for reads that continue inside it
    current: Option<(BufferIndex, Bytes)>,
}

struct WriteSide {
    discipline: FlushDiscipline,
    buffer: Buffer,
    flushes: WriteBehind<Flush>,
    // Sequential: next part number, and whether begin_upload has run
    next_part: u32,
    upload_started: bool,
    // Append mode: size of the object before this stream wrote to it
    existing_size: Option<u64>,
    // Random write: pre-allocation target, and size allocated so far
    content_length: Option<u64>,
    allocation: Option<Arc<Mutex<u64>>>,
    high_water: u64,
    // Flush error hit after part of a write was accepted; reported next call
    deferred: Option<ObjectIoError>,
}

enum Side {
    Read(ReadSide),
    Write(WriteSide),
}

/// Write settings handed over by the opener.
#[derive(Debug, Clone, Copy)]
pub(crate) struct WriteSetup {
    pub(crate) discipline: FlushDiscipline,
    pub(crate) existing_size: Option<u64>,
    pub(crate) content_length: Option<u64>,
}

/// A buffered stream over one object.
///
/// In read mode the object is split into `buffer_size` slots that are
/// fetched ahead of the reader on a worker pool, at most `max_buffers` at a
/// time, and delivered in ascending order. In write mode bytes accumulate
/// in a buffer that is flushed in the background whenever it fills.
///
/// Transfer errors are reported by the call that consumes the failed
/// buffer: a read of that slot, a write that has to wait for a flush, or
/// [`close`](Self::close).
///
/// Streams are created by [`OpenOptions`](crate::OpenOptions) or
/// [`open`](crate::open).
///
/// # Examples
///
/// ```
/// use objio::{OpenOptions, BufferConfig};
/// use objio_platform::MemorySystem;
/// use std::io::{Read, Write};
///
/// let system = MemorySystem::new();
/// let config = BufferConfig::new(4).unwrap();
///
/// let mut writer = OpenOptions::new()
///     .mode("w")
///     .config(config)
///     .open_buffered(system.clone(), "greeting")?;
/// writer.write_all(b"hello world")?;
/// writer.close()?;
///
/// let mut reader = OpenOptions::new()
///     .config(config)
///     .open_buffered(system, "greeting")?;
/// let mut text = String::new();
/// reader.read_to_string(&mut text)?;
/// assert_eq!(text, "hello world");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct BufferedObjectStream<S: ObjectSystem> {
    state: StreamState,
    binding: ObjectBinding<S>,
    config: BufferConfig,
    pool: WorkerPool,
    side: Side,
}

impl<S: ObjectSystem> BufferedObjectStream<S> {
    pub(crate) fn new_reader(state: StreamState, binding: ObjectBinding<S>, config: BufferConfig) -> Self {
        Self {
            pool: WorkerPool::new(config.workers()),
            side: Side::Read(ReadSide {
                window: ReadAhead::new(config.max_buffers()),
                current: None,
            }),
            state,
            binding,
            config,
        }
    }

    pub(crate) fn new_writer(
        state: StreamState,
        binding: ObjectBinding<S>,
        config: BufferConfig,
        setup: WriteSetup,
    ) -> Self {
        let start = state.position();
        Self {
            pool: WorkerPool::new(config.workers()),
            side: Side::Write(WriteSide {
                discipline: setup.discipline,
                buffer: Buffer::new(start, config.buffer_size()),
                flushes: WriteBehind::new(config.max_buffers()),
                next_part: 0,
                upload_started: false,
                existing_size: setup.existing_size,
                content_length: setup.content_length,
                allocation: None,
                high_water: start,
                deferred: None,
            }),
            state,
            binding,
            config,
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

    /// Returns true if the stream supports [`seek_to`](Self::seek_to).
    pub fn seekable(&self) -> bool {
        self.state.seekable()
    }

    /// Returns true once [`close`](Self::close) has run.
    pub fn closed(&self) -> bool {
        self.state.is_closed()
    }

    /// Buffer sizing in effect.
    pub fn config(&self) -> &BufferConfig {
        &self.config
    }

    /// Flush discipline of a writable stream.
    pub fn discipline(&self) -> Option<FlushDiscipline> {
        match &self.side {
            Side::Write(writer) => Some(writer.discipline),
            Side::Read(_) => None,
        }
    }

    /// Current offset.
    pub fn tell(&self) -> Result<u64, ObjectIoError> {
        self.state.tell()
    }

    /// Object metadata as probed at open (or on first call).
    pub fn metadata(&self) -> Result<&Metadata, ObjectIoError> {
        self.binding.metadata()
    }

    /// Object size.
    ///
    /// For writers this is the end of the furthest byte written so far.
    pub fn size(&self) -> Result<u64, ObjectIoError> {
        match &self.side {
            Side::Read(_) => self.binding.size(),
            Side::Write(writer) => Ok(writer.high_water),
        }
    }

    /// Read into `buf` from the current position.
    ///
    /// Returns the number of bytes read; zero at end of object.
    pub fn read_into(&mut self, buf: &mut [u8]) -> Result<usize, ObjectIoError> {
        self.state.ensure_readable()?;
        if buf.is_empty() {
            return Ok(0);
        }
        let size = self.binding.size()?;
        let mut position = self.state.position();
        if position >= size {
            return Ok(0);
        }

        let wanted = buf.len().min((size - position) as usize);
        let mut filled = 0;
        while filled < wanted {
            let (slot, within) = self.config.slot_of(position);
            let data = self.slot(slot, size)?;
            let available = data.len().saturating_sub(within);
            if available == 0 {
                break;
            }
            let n = available.min(wanted - filled);
            buf[filled..filled + n].copy_from_slice(&data[within..within + n]);
            filled += n;
            position = self.state.advance(n);
        }
        Ok(filled)
    }

    /// Read up to `n` bytes, or to the end of the object with `None`.
    ///
    /// The result is shorter than `n` only at the end of the object.
    pub fn read_bytes(&mut self, n: Option<usize>) -> Result<Bytes, ObjectIoError> {
        self.state.ensure_readable()?;
        let remaining = self.binding.size()?.saturating_sub(self.state.position());
        let wanted = n.map_or(remaining, |n| (n as u64).min(remaining)) as usize;

        let mut out = BytesMut::zeroed(wanted);
        let mut filled = 0;
        while filled < wanted {
            let read = self.read_into(&mut out[filled..])?;
            if read == 0 {
                break;
            }
            filled += read;
        }
        out.truncate(filled);
        Ok(out.freeze())
    }

    /// Read everything from the current position to the end of the object.
    pub fn read_all(&mut self) -> Result<Bytes, ObjectIoError> {
        self.read_bytes(None)
    }

    /// Iterate over the rest of the object in `buffer_size` chunks.
    ///
    /// The first chunk is fetched on the worker pool right away. The
    /// iterator does not move this stream's position.
    pub fn chunks(&self) -> Result<ObjectChunks, ObjectIoError> {
        self.state.ensure_readable()?;
        let reads = RangeReads::new(
            self.binding.handle()?,
            self.state.position(),
            self.binding.size()?,
            self.config.buffer_size(),
        );
        Ok(ObjectChunks::new(self.pool.prefetch_first(reads)?))
    }

    fn slot(&mut self, slot: BufferIndex, size: u64) -> Result<Bytes, ObjectIoError> {
        let Self {
            binding,
            config,
            pool,
            side,
            ..
        } = self;
        let Side::Read(reader) = side else {
            return Err(ObjectIoError::UnsupportedOperation("read"));
        };
        if let Some((index, data)) = &reader.current {
            if *index == slot {
                return Ok(data.clone());
            }
        }

        let buffer_size = config.buffer_size();
        let slot_count = config.slot_count(size);
        let handle = binding.handle()?;
        let data = if slot_count <= 1 {
            // A single buffer is fetched directly on the caller's thread
            fetch(&*handle, 0, buffer_size)?
        } else {
            reader.window.realign(slot);
            schedule_fetches(&mut reader.window, pool, &handle, slot_count, buffer_size);
            let pending = reader
                .window
                .pop_front(slot)
                .ok_or(ObjectIoError::TransferAbandoned)?;
            let data = pending.wait().and_then(|result| result)?;
            schedule_fetches(&mut reader.window, pool, &handle, slot_count, buffer_size);
            data
        };
        reader.current = Some((slot, data.clone()));
        Ok(data)
    }

    /// Write `data` at the current position.
    ///
    /// Returns once every byte is buffered or handed to a flush. Blocks
    /// while `max_buffers` flushes are pending.
    ///
    /// Bytes accepted into the buffer stay there until a flush of them has
    /// been scheduled, so a failed wait never loses them.
    ///
    /// # Errors
    ///
    /// Besides the usual mode and state checks, returns the error of an
    /// earlier flush this call had to wait for. If that happens after some
    /// of `data` was accepted, the call returns the accepted count and the
    /// error is returned by the next write, flush or close.
    pub fn write_bytes(&mut self, data: &[u8]) -> Result<usize, ObjectIoError> {
        self.state.ensure_writable()?;
        self.take_deferred()?;
        self.state.end_of_write(data.len())?;
        let mut written = 0;
        while written < data.len() {
            let position = self.state.position();
            let Side::Write(writer) = &mut self.side else {
                return Err(ObjectIoError::UnsupportedOperation("write"));
            };
            if writer.buffer.is_empty() {
                writer.buffer.reanchor(position);
            } else if writer.buffer.end() != position {
                if let Err(err) = self.flush_buffer_inner(false) {
                    return self.partial_write(written, err);
                }
                continue;
            }

            let n = writer.buffer.append(&data[written..]);
            written += n;
            let end = self.state.advance(n);
            writer.high_water = writer.high_water.max(end);
            if writer.buffer.state().is_full() {
                if let Err(err) = self.flush_buffer_inner(false) {
                    return self.partial_write(written, err);
                }
            }
        }
        Ok(written)
    }

    fn partial_write(&mut self, written: usize, err: ObjectIoError) -> Result<usize, ObjectIoError> {
        match &mut self.side {
            Side::Write(writer) if written > 0 => {
                trace!("{}: deferring error after {} bytes: {}", self.state.name(), written, err);
                writer.deferred = Some(err);
                Ok(written)
            }
            _ => Err(err),
        }
    }

    fn take_deferred(&mut self) -> Result<(), ObjectIoError> {
        match &mut self.side {
            Side::Write(writer) => writer.deferred.take().map_or(Ok(()), Err),
            Side::Read(_) => Ok(()),
        }
    }

    /// Schedule a flush of the partially filled buffer.
    ///
    /// Does not wait for the flush to finish; [`close`](Self::close) does.
    pub fn flush_buffer(&mut self) -> Result<(), ObjectIoError> {
        self.state.ensure_writable()?;
        self.take_deferred()?;
        self.flush_buffer_inner(false)
    }

    fn flush_buffer_inner(&mut self, closing: bool) -> Result<(), ObjectIoError> {
        let Self {
            state,
            binding,
            pool,
            side,
            ..
        } = self;
        let Side::Write(writer) = side else {
            return Ok(());
        };
        if writer.buffer.is_empty() {
            return Ok(());
        }
        let range = writer.buffer.range();

        // Overlapping range updates must land in write order
        if writer.discipline.is_random_write() {
            let mut failed = None;
            for (pending, flush) in writer.flushes.take_overlapping(&range) {
                trace!("{}: waiting for overlapping flush {}", state.name(), pending);
                if let Err(err) = flush.wait().and_then(|result| result) {
                    failed.get_or_insert(err);
                }
            }
            if let Some(err) = failed {
                return Err(err);
            }
        }
        while writer.flushes.is_saturated() {
            if let Some((_, flush)) = writer.flushes.pop_oldest() {
                flush.wait().and_then(|result| result)?;
            }
        }

        let handle = binding.handle()?;
        let job = prepare_flush(writer, &*handle)?;
        let (range, data) = writer.buffer.take(range.end());
        let task = flush_task(job, handle, range, data);
        if closing && !pool.is_started() && writer.flushes.is_empty() {
            trace!("{}: flushing {} inline", state.name(), range);
            return task();
        }
        trace!("{}: scheduling flush of {}", state.name(), range);
        let pending = pool.submit(task).unwrap_or_else(|e| Pending::ready(Err(e)));
        writer.flushes.push(range, pending);
        Ok(())
    }

    /// Move to `pos` and return the new offset.
    ///
    /// Read streams drop prefetched buffers that no longer follow the new
    /// position. Sequential writers only accept a seek to where they
    /// already are; random-write streams flush the current buffer first.
    pub fn seek_to(&mut self, pos: SeekFrom) -> Result<u64, ObjectIoError> {
        self.state.ensure_open()?;
        match &self.side {
            Side::Read(_) => {
                let size = self.binding.size()?;
                let target = self.state.seek(pos, Some(size))?;
                let (slot, _) = self.config.slot_of(target);
                if let Side::Read(reader) = &mut self.side {
                    // Within the delivered buffer the window resumes after it
                    let inside = reader.current.as_ref().is_some_and(|(index, _)| *index == slot);
                    let anchor = if inside {
                        slot.next()
                    } else {
                        reader.current = None;
                        slot
                    };
                    let dropped = reader.window.realign(anchor);
                    if dropped > 0 {
                        debug!("{}: seek to {} dropped {} prefetched buffers", self.state.name(), target, dropped);
                    }
                }
                Ok(target)
            }
            Side::Write(writer) => {
                let target = self.state.target(pos, Some(writer.high_water))?;
                if target == self.state.position() {
                    return Ok(target);
                }
                if !writer.discipline.is_random_write() {
                    return Err(ObjectIoError::UnsupportedOperation("seek on sequential writer"));
                }
                if writer.buffer.end() != target {
                    self.flush_buffer_inner(false)?;
                }
                self.state.set_position(target);
                Ok(target)
            }
        }
    }

    /// Finish the stream.
    ///
    /// Writers flush the partial buffer, wait for every pending flush and
    /// finalize the object: a commit for sequential objects, a resize to
    /// the written size for random-write objects opened without a content
    /// length. Readers drop their prefetches without waiting. Only the
    /// first call does anything.
    ///
    /// # Errors
    ///
    /// Returns the first transfer error among the pending flushes. The
    /// stream is closed either way.
    pub fn close(&mut self) -> Result<(), ObjectIoError> {
        if !self.state.mark_closed() {
            return Ok(());
        }
        debug!("closing {}", self);
        let result = match &mut self.side {
            Side::Read(reader) => {
                let dropped = reader.window.clear();
                reader.current = None;
                if dropped > 0 {
                    trace!("{}: abandoned {} prefetches", self.state.name(), dropped);
                }
                Ok(())
            }
            Side::Write(_) => self.finish_write(),
        };
        self.pool.shutdown();
        result
    }

    fn finish_write(&mut self) -> Result<(), ObjectIoError> {
        let mut first_error = self.take_deferred().err();
        // Earlier flushes land before the final buffer is handed off
        let earlier = self.wait_flushes();
        let last = self.flush_buffer_inner(true);
        let drained = self.wait_flushes();
        for result in [earlier, last, drained] {
            if let Err(err) = result {
                first_error.get_or_insert(err);
            }
        }
        if let Some(err) = first_error {
            return Err(err);
        }

        let Self {
            state,
            binding,
            side,
            ..
        } = self;
        let Side::Write(writer) = side else {
            return Ok(());
        };

        let handle = binding.handle()?;
        match writer.discipline {
            FlushDiscipline::Sequential => {
                start_upload(writer, &*handle)?;
                debug!("{}: committing {} parts", state.name(), writer.next_part);
                handle
                    .commit(writer.next_part)
                    .map_err(|e| ObjectIoError::transfer("commit", 0, e))
            }
            FlushDiscipline::RandomWrite { .. } => {
                let allocation = allocate(writer, &*handle)?;
                if writer.content_length.is_none() {
                    let mut allocated = allocation.lock();
                    if *allocated != writer.high_water {
                        debug!("{}: resizing to {}", state.name(), writer.high_water);
                        handle
                            .resize(writer.high_water)
                            .map_err(|e| ObjectIoError::transfer("resize", writer.high_water, e))?;
                        *allocated = writer.high_water;
                    }
                }
                Ok(())
            }
        }
    }

    /// Wait for every pending flush, returning the first error.
    fn wait_flushes(&mut self) -> Result<(), ObjectIoError> {
        let Side::Write(writer) = &mut self.side else {
            return Ok(());
        };
        let mut first_error = None;
        for (range, flush) in writer.flushes.drain() {
            if let Err(err) = flush.wait().and_then(|result| result) {
                log_warn!("{}: flush of {} failed: {}", self.state.name(), range, err);
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

fn schedule_fetches(
    window: &mut ReadAhead<Fetch>,
    pool: &WorkerPool,
    handle: &Arc<dyn TransferHandle>,
    slot_count: u64,
    buffer_size: usize,
) {
    window.refill(slot_count, |slot| {
        let handle = Arc::clone(handle);
        let offset = slot.start(buffer_size);
        trace!("scheduling fetch of {} at {}", slot, offset);
        pool.submit(move || fetch(&*handle, offset, buffer_size))
            .unwrap_or_else(|e| Pending::ready(Err(e)))
    });
}

/// Read one buffer; a range past the end of the object reads as empty.
fn fetch(handle: &dyn TransferHandle, offset: u64, len: usize) -> Result<Bytes, ObjectIoError> {
    match handle.read_range(offset, len) {
        Ok(data) => Ok(data),
        Err(err) if err.is_out_of_range() => Ok(Bytes::new()),
        Err(err) => Err(ObjectIoError::transfer("read_range", offset, err)),
    }
}

fn start_upload(writer: &mut WriteSide, handle: &dyn TransferHandle) -> Result<(), ObjectIoError> {
    if !writer.upload_started {
        let append = writer.existing_size.is_some();
        handle
            .begin_upload(append)
            .map_err(|e| ObjectIoError::transfer("begin_upload", 0, e))?;
        writer.upload_started = true;
    }
    Ok(())
}

fn allocate(writer: &mut WriteSide, handle: &dyn TransferHandle) -> Result<Arc<Mutex<u64>>, ObjectIoError> {
    if let Some(allocation) = &writer.allocation {
        return Ok(Arc::clone(allocation));
    }
    let allocated = match writer.existing_size {
        Some(size) => size,
        None => {
            let size = writer.content_length.unwrap_or(0);
            debug!("pre-allocating {} bytes", size);
            handle
                .create_from_size(size)
                .map_err(|e| ObjectIoError::transfer("create_from_size", 0, e))?;
            size
        }
    };
    let allocation = Arc::new(Mutex::new(allocated));
    writer.allocation = Some(Arc::clone(&allocation));
    Ok(allocation)
}

/// Run the backend setup a flush depends on and claim its part number.
fn prepare_flush(writer: &mut WriteSide, handle: &dyn TransferHandle) -> Result<FlushJob, ObjectIoError> {
    Ok(match writer.discipline {
        FlushDiscipline::Sequential => {
            start_upload(writer, handle)?;
            let part = writer.next_part;
            writer.next_part += 1;
            FlushJob::Part(part)
        }
        FlushDiscipline::RandomWrite { max_flush_size } => FlushJob::Range {
            allocation: allocate(writer, handle)?,
            max_flush_size,
        },
    })
}

fn flush_task(
    job: FlushJob,
    handle: Arc<dyn TransferHandle>,
    range: ByteRange,
    data: Bytes,
) -> impl FnOnce() -> Result<(), ObjectIoError> + Send + 'static {
    move || match job {
        FlushJob::Part(part) => handle
            .flush_part(part, data)
            .map_err(|e| ObjectIoError::transfer("flush_part", range.start(), e)),
        FlushJob::Range {
            allocation,
            max_flush_size,
        } => write_range(&*handle, &allocation, range, data, max_flush_size),
    }
}

enum FlushJob {
    Part(u32),
    Range {
        allocation: Arc<Mutex<u64>>,
        max_flush_size: usize,
    },
}

/// Grow the object if needed, then write `data` as range updates.
fn write_range(
    handle: &dyn TransferHandle,
    allocation: &Mutex<u64>,
    range: ByteRange,
    data: Bytes,
    max_flush_size: usize,
) -> Result<(), ObjectIoError> {
    {
        let mut allocated = allocation.lock();
        if range.end() > *allocated {
            handle
                .resize(range.end())
                .map_err(|e| ObjectIoError::transfer("resize", range.start(), e))?;
            *allocated = range.end();
        }
    }
    for piece in range.chunks(max_flush_size) {
        let from = (piece.start() - range.start()) as usize;
        let chunk = data.slice(from..from + piece.len() as usize);
        handle
            .update_range(piece.start(), chunk)
            .map_err(|e| ObjectIoError::transfer("update_range", piece.start(), e))?;
    }
    Ok(())
}

impl<S: ObjectSystem> fmt::Display for BufferedObjectStream<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<BufferedObjectStream name='{}' mode='{}'>",
            self.state.name(),
            self.state.mode()
        )
    }
}

impl<S: ObjectSystem> fmt::Debug for BufferedObjectStream<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferedObjectStream")
            .field("state", &self.state)
            .field("config", &self.config)
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}

impl<S: ObjectSystem> Drop for BufferedObjectStream<S> {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            log_warn!("error closing {} on drop: {}", self.state.name(), err);
        }
    }
}
