//! Binding of one object path to its backend system.

use crate::adapters::from_system;
use crate::domain::{Capabilities, Metadata, ObjectIoError, ObjectKind, ObjectSystem, TransferHandle};
use crate::infrastructure::Memoized;
use core::fmt;
use std::sync::Arc;

/// One object of one [`ObjectSystem`], as seen by a stream.
///
/// Metadata and the transfer handle are looked up on first use and then
/// kept for the binding's lifetime; they are never refreshed, even if the
/// remote object changes.
///
/// # Examples
///
/// ```
/// use objio::adapters::ObjectBinding;
/// use objio_platform::MemorySystem;
/// use objio_system::ObjectKind;
///
/// let system = MemorySystem::new();
/// system.put_object("data.bin", ObjectKind::Block, vec![0u8; 16]);
///
/// let binding = ObjectBinding::new(system.clone(), "data.bin", ObjectKind::Block);
/// assert_eq!(binding.size().unwrap(), 16);
/// assert_eq!(binding.size().unwrap(), 16);
/// assert_eq!(system.head_count("data.bin"), 1);
/// ```
pub struct ObjectBinding<S: ObjectSystem> {
    system: S,
    path: String,
    kind: ObjectKind,
    metadata: Memoized<Metadata>,
    handle: Memoized<Arc<dyn TransferHandle>>,
}

impl<S: ObjectSystem> ObjectBinding<S> {
    /// Bind `path` of `system`, treating the object as `kind`.
    pub fn new(system: S, path: impl Into<String>, kind: ObjectKind) -> Self {
        Self {
            system,
            path: path.into(),
            kind,
            metadata: Memoized::new(),
            handle: Memoized::new(),
        }
    }

    /// Use `metadata` instead of calling `head` later.
    ///
    /// Lets the opener hand over the metadata it already probed.
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Memoized::seeded(metadata);
        self
    }

    /// Object path.
    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Object kind the binding was created with.
    #[inline]
    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    /// The backend system.
    #[inline]
    pub fn system(&self) -> &S {
        &self.system
    }

    /// Transfer limits for this object's kind.
    pub fn capabilities(&self) -> Capabilities {
        self.system.capabilities(self.kind)
    }

    /// Object metadata, fetched with `head` on first call.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectIoError::ObjectNotFound`] if the object does not
    /// exist; the next call asks again.
    pub fn metadata(&self) -> Result<&Metadata, ObjectIoError> {
        self.metadata
            .get_or_try_init(|| self.system.head(&self.path).map_err(from_system))
    }

    /// Object size in bytes.
    pub fn size(&self) -> Result<u64, ObjectIoError> {
        self.metadata().map(|meta| meta.size)
    }

    /// Transfer primitives for the object, resolved on first call.
    pub fn handle(&self) -> Result<Arc<dyn TransferHandle>, ObjectIoError> {
        self.handle
            .get_or_try_init(|| {
                self.system
                    .transfer_handle(&self.path, self.kind)
                    .map_err(from_system)
            })
            .map(Arc::clone)
    }
}

impl<S: ObjectSystem> fmt::Debug for ObjectBinding<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectBinding")
            .field("path", &self.path)
            .field("kind", &self.kind)
            .field("metadata", &self.metadata.get())
            .finish()
    }
}
