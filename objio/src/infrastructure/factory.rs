//! Opening streams.

use crate::adapters::{ObjectBinding, from_system};
use crate::domain::{
    BufferConfig, FlushDiscipline, Metadata, ObjectIoError, ObjectKind, ObjectSystem, OpenMode, StreamState,
};
use crate::infrastructure::streaming::{BufferedObjectStream, ObjectStream, RawObjectStream, WriteSetup};
use crate::log_macros::debug;

/// Options for opening an object stream.
///
/// # Examples
///
/// ```
/// use objio::{OpenOptions, presets};
/// use objio_platform::MemorySystem;
/// use objio_system::ObjectKind;
///
/// let system = MemorySystem::new();
/// let mut stream = OpenOptions::new()
///     .mode("x")
///     .kind(ObjectKind::Page)
///     .content_length(1024)
///     .buffer_size(presets::BUFFER_64K)?
///     .open(system, "disk.img")?;
/// stream.write_bytes(&[1; 1024])?;
/// stream.close()?;
/// # Ok::<(), objio::ObjectIoError>(())
/// ```
#[derive(Debug, Clone)]
pub struct OpenOptions {
    mode: String,
    config: Option<BufferConfig>,
    content_length: Option<u64>,
    kind: Option<ObjectKind>,
    buffered: bool,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenOptions {
    /// Read mode, buffered, with the backend's default buffer size.
    pub fn new() -> Self {
        Self {
            mode: "r".into(),
            config: None,
            content_length: None,
            kind: None,
            buffered: true,
        }
    }

    /// Mode token: `r`, `w`, `a` or `x`, optionally followed by `b`.
    pub fn mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = mode.into();
        self
    }

    /// Buffer sizing; defaults to the backend's buffer size.
    pub fn config(mut self, config: BufferConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Shorthand for a [`config`](Self::config) with only a buffer size.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectIoError::InvalidConfig`] for a zero size.
    pub fn buffer_size(self, buffer_size: usize) -> Result<Self, ObjectIoError> {
        let config = BufferConfig::new(buffer_size).map_err(ObjectIoError::InvalidConfig)?;
        Ok(self.config(config))
    }

    /// Final object size, for random-write objects pre-allocated on
    /// first flush. Without it the object is resized on close.
    pub fn content_length(mut self, content_length: u64) -> Self {
        self.content_length = Some(content_length);
        self
    }

    /// Kind used when the object does not exist yet.
    pub fn kind(mut self, kind: ObjectKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Choose between a buffered and a raw stream.
    pub fn buffered(mut self, buffered: bool) -> Self {
        self.buffered = buffered;
        self
    }

    /// Open `path` on `system`.
    ///
    /// # Errors
    ///
    /// - [`ObjectIoError::InvalidMode`] for an unknown mode token.
    /// - [`ObjectIoError::ObjectNotFound`] when reading a missing object.
    /// - [`ObjectIoError::ObjectExists`] for `x` on an existing object.
    /// - [`ObjectIoError::UnsupportedOperation`] when a random-write kind
    ///   reports no range limit.
    pub fn open<S: ObjectSystem>(&self, system: S, path: &str) -> Result<ObjectStream<S>, ObjectIoError> {
        if self.buffered {
            self.open_buffered(system, path).map(ObjectStream::Buffered)
        } else {
            self.open_raw(system, path).map(ObjectStream::Raw)
        }
    }

    /// Open a [`BufferedObjectStream`] regardless of [`buffered`](Self::buffered).
    pub fn open_buffered<S: ObjectSystem>(
        &self,
        system: S,
        path: &str,
    ) -> Result<BufferedObjectStream<S>, ObjectIoError> {
        let probe = self.probe(&system, path)?;
        let mut config = match self.config {
            Some(config) => config,
            None => BufferConfig::new(probe.capabilities_buffer_size).map_err(ObjectIoError::InvalidConfig)?,
        };
        if let Some(limit) = probe.discipline.max_flush_size() {
            config = config.clamp_to(limit);
        }
        debug!(
            "opening buffered '{}' mode {} kind {} with buffer size {}",
            path,
            probe.mode,
            probe.kind,
            config.buffer_size()
        );

        let (state, binding) = probe.bind(system, path);
        if probe.mode.is_readable() {
            return Ok(BufferedObjectStream::new_reader(state, binding, config));
        }
        let setup = WriteSetup {
            discipline: probe.discipline,
            existing_size: probe.appended_size(),
            content_length: self.content_length,
        };
        Ok(BufferedObjectStream::new_writer(state, binding, config, setup))
    }

    /// Open a [`RawObjectStream`] regardless of [`buffered`](Self::buffered).
    pub fn open_raw<S: ObjectSystem>(&self, system: S, path: &str) -> Result<RawObjectStream<S>, ObjectIoError> {
        let probe = self.probe(&system, path)?;
        debug!("opening raw '{}' mode {} kind {}", path, probe.mode, probe.kind);

        let (state, binding) = probe.bind(system, path);
        if probe.mode.is_readable() {
            return Ok(RawObjectStream::new_reader(state, binding));
        }
        let initial = match probe.appended_size() {
            Some(size) if size > 0 => {
                let handle = binding.handle()?;
                Some(
                    handle
                        .read_range(0, size as usize)
                        .map_err(|e| ObjectIoError::transfer("read_range", 0, e))?,
                )
            }
            Some(_) => Some(bytes::Bytes::new()),
            None => None,
        };
        Ok(RawObjectStream::new_writer(state, binding, probe.discipline, initial))
    }

    fn probe<S: ObjectSystem>(&self, system: &S, path: &str) -> Result<Probe, ObjectIoError> {
        let mode: OpenMode = self.mode.parse()?;
        let existing = match system.head(path) {
            Ok(metadata) => Some(metadata),
            Err(err) if err.is_not_found() => None,
            Err(err) => return Err(from_system(err)),
        };

        match &existing {
            None if mode.is_readable() => return Err(ObjectIoError::ObjectNotFound(path.into())),
            Some(_) if mode.is_create_new() => return Err(ObjectIoError::ObjectExists(path.into())),
            _ => {}
        }

        let kind = existing
            .as_ref()
            .map(|metadata| metadata.kind)
            .or(self.kind)
            .unwrap_or_else(|| system.default_kind());
        let capabilities = system.capabilities(kind);
        let discipline = match (kind, capabilities.max_flush_size) {
            (_, Some(max_flush_size)) => FlushDiscipline::RandomWrite { max_flush_size },
            (ObjectKind::Page, None) => {
                return Err(ObjectIoError::UnsupportedOperation("page object without range limit"));
            }
            _ => FlushDiscipline::Sequential,
        };

        Ok(Probe {
            mode,
            kind,
            discipline,
            existing,
            capabilities_buffer_size: capabilities.default_buffer_size,
        })
    }
}

/// Everything learnt about an object before building its stream.
struct Probe {
    mode: OpenMode,
    kind: ObjectKind,
    discipline: FlushDiscipline,
    existing: Option<Metadata>,
    capabilities_buffer_size: usize,
}

impl Probe {
    /// Existing size kept by an append-mode writer.
    fn appended_size(&self) -> Option<u64> {
        self.existing
            .as_ref()
            .filter(|_| self.mode.is_append())
            .map(|metadata| metadata.size)
    }

    fn bind<S: ObjectSystem>(&self, system: S, path: &str) -> (StreamState, ObjectBinding<S>) {
        let state = StreamState::new(path, self.mode, true);
        if let Some(size) = self.appended_size() {
            state.set_position(size);
        }
        let binding = ObjectBinding::new(system, path, self.kind);
        let binding = match &self.existing {
            // Truncating writers must not report the old size
            Some(metadata) if !self.mode.is_writable() || self.mode.is_append() => {
                binding.with_metadata(metadata.clone())
            }
            _ => binding,
        };
        (state, binding)
    }
}

/// Open `path` on `system` with `mode` and default options.
///
/// # Examples
///
/// ```
/// use objio::open;
/// use objio_platform::MemorySystem;
/// use std::io::Write;
///
/// let system = MemorySystem::new();
/// let mut out = open(system.clone(), "notes.txt", "w")?;
/// out.write_all(b"first line\n")?;
/// out.close()?;
///
/// let mut inp = open(system, "notes.txt", "r")?;
/// assert_eq!(&inp.read_all()?[..], b"first line\n");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn open<S: ObjectSystem>(system: S, path: &str, mode: &str) -> Result<ObjectStream<S>, ObjectIoError> {
    OpenOptions::new().mode(mode).open(system, path)
}
