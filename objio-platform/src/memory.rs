//! In-memory blob store.

use crate::{DEFAULT_BUFFER_SIZE, DEFAULT_MAX_FLUSH_SIZE};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use objio_system::{Capabilities, Metadata, ObjectKind, ObjectSystem, SystemError, TransferHandle};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

/// One recorded call against a [`MemorySystem`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    /// `head(path)`.
    Head {
        /// Object path.
        path: String,
    },
    /// `read_range(offset, len)`.
    ReadRange {
        /// Object path.
        path: String,
        /// Requested start offset.
        offset: u64,
        /// Requested length.
        len: usize,
    },
    /// `begin_upload(append)`.
    BeginUpload {
        /// Object path.
        path: String,
        /// Whether existing content is kept.
        append: bool,
    },
    /// `flush_part(part, data)`.
    FlushPart {
        /// Object path.
        path: String,
        /// Part number.
        part: u32,
        /// Part length in bytes.
        len: usize,
    },
    /// `commit(parts)`.
    Commit {
        /// Object path.
        path: String,
        /// Number of parts committed.
        parts: u32,
    },
    /// `create_from_size(size)`.
    CreateFromSize {
        /// Object path.
        path: String,
        /// Allocated size.
        size: u64,
    },
    /// `resize(size)`.
    Resize {
        /// Object path.
        path: String,
        /// New size.
        size: u64,
    },
    /// `update_range(offset, data)`.
    UpdateRange {
        /// Object path.
        path: String,
        /// Start offset of the update.
        offset: u64,
        /// Length of the update.
        len: usize,
    },
}

impl Call {
    /// Path the call targeted.
    pub fn path(&self) -> &str {
        match self {
            Self::Head { path }
            | Self::ReadRange { path, .. }
            | Self::BeginUpload { path, .. }
            | Self::FlushPart { path, .. }
            | Self::Commit { path, .. }
            | Self::CreateFromSize { path, .. }
            | Self::Resize { path, .. }
            | Self::UpdateRange { path, .. } => path,
        }
    }
}

struct StoredObject {
    data: Vec<u8>,
    kind: ObjectKind,
    last_modified: DateTime<Utc>,
    etag: u64,
}

struct Shared {
    objects: Mutex<HashMap<String, StoredObject>>,
    calls: Mutex<Vec<Call>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    etags: AtomicU64,
}

impl Shared {
    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }

    fn store(&self, path: &str, kind: ObjectKind, data: Vec<u8>) {
        let etag = self.etags.fetch_add(1, Ordering::Relaxed) + 1;
        self.objects.lock().insert(
            path.to_owned(),
            StoredObject {
                data,
                kind,
                last_modified: Utc::now(),
                etag,
            },
        );
    }

    fn check_writes(&self) -> Result<(), SystemError> {
        if self.fail_writes.load(Ordering::Acquire) {
            return Err(SystemError::from_status(500, "injected write failure"));
        }
        Ok(())
    }

    fn with_object<R>(
        &self,
        path: &str,
        f: impl FnOnce(&mut StoredObject) -> Result<R, SystemError>,
    ) -> Result<R, SystemError> {
        let mut objects = self.objects.lock();
        let object = objects
            .get_mut(path)
            .ok_or_else(|| SystemError::NotFound(path.to_owned()))?;
        let result = f(object)?;
        object.etag = self.etags.fetch_add(1, Ordering::Relaxed) + 1;
        object.last_modified = Utc::now();
        Ok(result)
    }
}

/// An in-process object store.
///
/// Objects live in a flat path map. Block and append objects are written
/// through numbered parts, page objects through range updates limited to
/// `max_flush_size` bytes. Every transfer call is journaled, and reads or
/// writes can be made to fail with a server error.
///
/// Clones share the same store, so a test can keep one clone for
/// inspection and hand another to the engine.
///
/// # Examples
///
/// ```
/// use objio_platform::MemorySystem;
/// use objio_system::{ObjectKind, ObjectSystem};
///
/// let system = MemorySystem::new();
/// system.put_object("bucket/key", ObjectKind::Block, &b"hello"[..]);
/// assert_eq!(system.head("bucket/key").unwrap().size, 5);
/// ```
#[derive(Clone)]
pub struct MemorySystem {
    shared: Arc<Shared>,
    default_kind: ObjectKind,
    default_buffer_size: usize,
    max_flush_size: usize,
    read_delay: Option<Duration>,
}

impl MemorySystem {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                objects: Mutex::new(HashMap::new()),
                calls: Mutex::new(Vec::new()),
                fail_reads: AtomicBool::new(false),
                fail_writes: AtomicBool::new(false),
                etags: AtomicU64::new(0),
            }),
            default_kind: ObjectKind::Block,
            default_buffer_size: DEFAULT_BUFFER_SIZE,
            max_flush_size: DEFAULT_MAX_FLUSH_SIZE,
            read_delay: None,
        }
    }

    /// Kind given to new objects when the caller does not choose one.
    pub fn with_default_kind(mut self, kind: ObjectKind) -> Self {
        self.default_kind = kind;
        self
    }

    /// Buffer size advertised through [`Capabilities`].
    pub fn with_default_buffer_size(mut self, size: usize) -> Self {
        self.default_buffer_size = size;
        self
    }

    /// Largest range update accepted by page objects.
    pub fn with_max_flush_size(mut self, size: usize) -> Self {
        self.max_flush_size = size;
        self
    }

    /// Sleep this long inside every `read_range` call.
    pub fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = Some(delay);
        self
    }

    /// Store `data` at `path`, replacing any existing object.
    pub fn put_object(&self, path: &str, kind: ObjectKind, data: impl Into<Bytes>) {
        let data: Bytes = data.into();
        self.shared.store(path, kind, data.to_vec());
    }

    /// Current content of the object at `path`.
    pub fn get_object(&self, path: &str) -> Option<Bytes> {
        self.shared
            .objects
            .lock()
            .get(path)
            .map(|object| Bytes::copy_from_slice(&object.data))
    }

    /// Returns true if an object exists at `path`.
    pub fn contains(&self, path: &str) -> bool {
        self.shared.objects.lock().contains_key(path)
    }

    /// Make every subsequent `read_range` fail (or succeed again).
    pub fn fail_reads(&self, fail: bool) {
        self.shared.fail_reads.store(fail, Ordering::Release);
    }

    /// Make every subsequent write primitive fail (or succeed again).
    pub fn fail_writes(&self, fail: bool) {
        self.shared.fail_writes.store(fail, Ordering::Release);
    }

    /// Snapshot of the call journal.
    pub fn calls(&self) -> Vec<Call> {
        self.shared.calls.lock().clone()
    }

    /// Calls recorded for `path`.
    pub fn calls_for(&self, path: &str) -> Vec<Call> {
        self.shared
            .calls
            .lock()
            .iter()
            .filter(|call| call.path() == path)
            .cloned()
            .collect()
    }

    /// `(offset, len)` of every `read_range` call on `path`.
    pub fn read_calls(&self, path: &str) -> Vec<(u64, usize)> {
        self.calls_for(path)
            .into_iter()
            .filter_map(|call| match call {
                Call::ReadRange { offset, len, .. } => Some((offset, len)),
                _ => None,
            })
            .collect()
    }

    /// `(offset, len)` of every `update_range` call on `path`.
    pub fn update_calls(&self, path: &str) -> Vec<(u64, usize)> {
        self.calls_for(path)
            .into_iter()
            .filter_map(|call| match call {
                Call::UpdateRange { offset, len, .. } => Some((offset, len)),
                _ => None,
            })
            .collect()
    }

    /// Number of `head` calls on `path`.
    pub fn head_count(&self, path: &str) -> usize {
        self.calls_for(path)
            .iter()
            .filter(|call| matches!(call, Call::Head { .. }))
            .count()
    }

    /// Forget every recorded call.
    pub fn clear_calls(&self) {
        self.shared.calls.lock().clear();
    }
}

impl Default for MemorySystem {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectSystem for MemorySystem {
    fn head(&self, path: &str) -> Result<Metadata, SystemError> {
        self.shared.record(Call::Head {
            path: path.to_owned(),
        });
        let objects = self.shared.objects.lock();
        let object = objects
            .get(path)
            .ok_or_else(|| SystemError::NotFound(path.to_owned()))?;
        Ok(Metadata {
            size: object.data.len() as u64,
            last_modified: Some(object.last_modified),
            content_type: Some("application/octet-stream".into()),
            etag: Some(format!("\"0x{:x}\"", object.etag)),
            kind: object.kind,
        })
    }

    fn default_kind(&self) -> ObjectKind {
        self.default_kind
    }

    fn capabilities(&self, kind: ObjectKind) -> Capabilities {
        match kind {
            ObjectKind::Page => Capabilities::random_write(self.default_buffer_size, self.max_flush_size),
            ObjectKind::Block | ObjectKind::Append => Capabilities::sequential(self.default_buffer_size),
        }
    }

    fn transfer_handle(
        &self,
        path: &str,
        kind: ObjectKind,
    ) -> Result<Arc<dyn TransferHandle>, SystemError> {
        Ok(Arc::new(MemoryHandle {
            shared: Arc::clone(&self.shared),
            path: path.to_owned(),
            kind,
            max_flush_size: self.max_flush_size,
            read_delay: self.read_delay,
            upload: Mutex::new(None),
        }))
    }
}

#[derive(Default)]
struct Upload {
    append: bool,
    parts: BTreeMap<u32, Bytes>,
    // Append objects: next part number to apply
    applied: u32,
}

struct MemoryHandle {
    shared: Arc<Shared>,
    path: String,
    kind: ObjectKind,
    max_flush_size: usize,
    read_delay: Option<Duration>,
    upload: Mutex<Option<Upload>>,
}

impl MemoryHandle {
    fn sequential_only(&self, op: &'static str) -> Result<(), SystemError> {
        match self.kind {
            ObjectKind::Block | ObjectKind::Append => Ok(()),
            ObjectKind::Page => Err(SystemError::Unsupported(op)),
        }
    }

    fn random_only(&self, op: &'static str) -> Result<(), SystemError> {
        match self.kind {
            ObjectKind::Page => Ok(()),
            ObjectKind::Block | ObjectKind::Append => Err(SystemError::Unsupported(op)),
        }
    }

    fn ensure_exists(&self) {
        let exists = self.shared.objects.lock().contains_key(&self.path);
        if !exists {
            self.shared.store(&self.path, self.kind, Vec::new());
        }
    }
}

impl TransferHandle for MemoryHandle {
    fn read_range(&self, offset: u64, len: usize) -> Result<Bytes, SystemError> {
        self.shared.record(Call::ReadRange {
            path: self.path.clone(),
            offset,
            len,
        });
        if let Some(delay) = self.read_delay {
            std::thread::sleep(delay);
        }
        if self.shared.fail_reads.load(Ordering::Acquire) {
            return Err(SystemError::from_status(500, "injected read failure"));
        }

        let objects = self.shared.objects.lock();
        let object = objects
            .get(&self.path)
            .ok_or_else(|| SystemError::NotFound(self.path.clone()))?;
        let size = object.data.len() as u64;
        if offset >= size {
            return Err(SystemError::OutOfRange { offset, size });
        }
        let start = offset as usize;
        let end = start.saturating_add(len).min(object.data.len());
        Ok(Bytes::copy_from_slice(&object.data[start..end]))
    }

    fn begin_upload(&self, append: bool) -> Result<(), SystemError> {
        self.shared.record(Call::BeginUpload {
            path: self.path.clone(),
            append,
        });
        self.sequential_only("begin_upload")?;
        self.shared.check_writes()?;

        if self.kind == ObjectKind::Append {
            if append {
                self.ensure_exists();
            } else {
                self.shared.store(&self.path, self.kind, Vec::new());
            }
        }
        *self.upload.lock() = Some(Upload {
            append,
            ..Upload::default()
        });
        Ok(())
    }

    fn flush_part(&self, part: u32, data: Bytes) -> Result<(), SystemError> {
        self.shared.record(Call::FlushPart {
            path: self.path.clone(),
            part,
            len: data.len(),
        });
        self.sequential_only("flush_part")?;
        self.shared.check_writes()?;

        let mut guard = self.upload.lock();
        let upload = guard
            .as_mut()
            .ok_or_else(|| SystemError::Backend("no upload in progress".into()))?;
        upload.parts.insert(part, data);

        if self.kind == ObjectKind::Append {
            // Apply every part that is now contiguous with the object tail
            while let Some(next) = upload.parts.remove(&upload.applied) {
                self.shared
                    .with_object(&self.path, |object| {
                        object.data.extend_from_slice(&next);
                        Ok(())
                    })?;
                upload.applied += 1;
            }
        }
        Ok(())
    }

    fn commit(&self, parts: u32) -> Result<(), SystemError> {
        self.shared.record(Call::Commit {
            path: self.path.clone(),
            parts,
        });
        self.sequential_only("commit")?;
        self.shared.check_writes()?;

        let upload = self
            .upload
            .lock()
            .take()
            .ok_or_else(|| SystemError::Backend("no upload in progress".into()))?;

        match self.kind {
            ObjectKind::Append => {
                if upload.applied != parts || !upload.parts.is_empty() {
                    return Err(SystemError::Backend(format!(
                        "append commit of {} parts but {} applied",
                        parts, upload.applied
                    )));
                }
                Ok(())
            }
            _ => {
                let mut data = if upload.append {
                    self.shared
                        .objects
                        .lock()
                        .get(&self.path)
                        .map(|object| object.data.clone())
                        .unwrap_or_default()
                } else {
                    Vec::new()
                };
                for index in 0..parts {
                    let part = upload.parts.get(&index).ok_or_else(|| {
                        SystemError::Backend(format!("part {} missing at commit", index))
                    })?;
                    data.extend_from_slice(part);
                }
                self.shared.store(&self.path, self.kind, data);
                Ok(())
            }
        }
    }

    fn create_from_size(&self, size: u64) -> Result<(), SystemError> {
        self.shared.record(Call::CreateFromSize {
            path: self.path.clone(),
            size,
        });
        self.random_only("create_from_size")?;
        self.shared.check_writes()?;
        self.shared.store(&self.path, self.kind, vec![0; size as usize]);
        Ok(())
    }

    fn resize(&self, size: u64) -> Result<(), SystemError> {
        self.shared.record(Call::Resize {
            path: self.path.clone(),
            size,
        });
        self.random_only("resize")?;
        self.shared.check_writes()?;
        self.shared.with_object(&self.path, |object| {
            object.data.resize(size as usize, 0);
            Ok(())
        })
    }

    fn update_range(&self, offset: u64, data: Bytes) -> Result<(), SystemError> {
        self.shared.record(Call::UpdateRange {
            path: self.path.clone(),
            offset,
            len: data.len(),
        });
        self.random_only("update_range")?;
        self.shared.check_writes()?;
        if data.len() > self.max_flush_size {
            return Err(SystemError::from_status(
                413,
                format!(
                    "range update of {} bytes exceeds {}",
                    data.len(),
                    self.max_flush_size
                ),
            ));
        }
        self.shared.with_object(&self.path, |object| {
            let size = object.data.len() as u64;
            let end = offset + data.len() as u64;
            if end > size {
                return Err(SystemError::OutOfRange { offset, size });
            }
            object.data[offset as usize..end as usize].copy_from_slice(&data);
            Ok(())
        })
    }
}
