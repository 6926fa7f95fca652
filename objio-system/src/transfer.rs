//! The system and transfer-handle traits.

use crate::{Capabilities, Metadata, ObjectKind, SystemError};
use bytes::Bytes;
use std::sync::Arc;

/// Raw transfer primitives for one object.
///
/// A handle is resolved once per open stream and then shared with the
/// engine's worker threads, so every method takes `&self` and
/// implementations must be safe to call concurrently.
///
/// Sequential kinds implement [`begin_upload`](Self::begin_upload),
/// [`flush_part`](Self::flush_part) and [`commit`](Self::commit).
/// Random-write kinds implement [`create_from_size`](Self::create_from_size),
/// [`resize`](Self::resize) and [`update_range`](Self::update_range). The
/// defaults report [`SystemError::Unsupported`].
pub trait TransferHandle: Send + Sync {
    /// Read up to `len` bytes starting at `offset`.
    ///
    /// Returns fewer bytes when the range crosses the end of the object.
    ///
    /// # Errors
    ///
    /// Returns [`SystemError::OutOfRange`] when `offset` is at or past the end
    /// of the object, and [`SystemError::NotFound`] when it does not exist.
    fn read_range(&self, offset: u64, len: usize) -> Result<Bytes, SystemError>;

    /// Start a sequential upload.
    ///
    /// With `append` the committed object keeps its current content in front
    /// of the uploaded parts; otherwise the upload replaces it.
    fn begin_upload(&self, append: bool) -> Result<(), SystemError> {
        let _ = append;
        Err(SystemError::Unsupported("begin_upload"))
    }

    /// Upload part number `part` of a sequential upload.
    ///
    /// Parts may arrive out of order; the backend applies them by number.
    fn flush_part(&self, part: u32, data: Bytes) -> Result<(), SystemError> {
        let _ = (part, data);
        Err(SystemError::Unsupported("flush_part"))
    }

    /// Finish a sequential upload made of parts `0..parts`.
    fn commit(&self, parts: u32) -> Result<(), SystemError> {
        let _ = parts;
        Err(SystemError::Unsupported("commit"))
    }

    /// Create (or truncate) the object with `size` zero bytes.
    fn create_from_size(&self, size: u64) -> Result<(), SystemError> {
        let _ = size;
        Err(SystemError::Unsupported("create_from_size"))
    }

    /// Grow or shrink the object to `size` bytes.
    fn resize(&self, size: u64) -> Result<(), SystemError> {
        let _ = size;
        Err(SystemError::Unsupported("resize"))
    }

    /// Overwrite `data.len()` bytes at `offset`.
    ///
    /// The range must lie inside the current object size.
    fn update_range(&self, offset: u64, data: Bytes) -> Result<(), SystemError> {
        let _ = (offset, data);
        Err(SystemError::Unsupported("update_range"))
    }
}

/// A storage system that maps logical paths to objects.
///
/// This is the boundary the engine consumes; listing, copying and path
/// parsing live behind it and are not part of this trait.
pub trait ObjectSystem: Send + Sync + 'static {
    /// Describe the object at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`SystemError::NotFound`] if the object does not exist.
    fn head(&self, path: &str) -> Result<Metadata, SystemError>;

    /// Kind used for new objects when the caller does not choose one.
    fn default_kind(&self) -> ObjectKind {
        ObjectKind::Block
    }

    /// Transfer limits for objects of `kind`.
    fn capabilities(&self, kind: ObjectKind) -> Capabilities;

    /// Resolve the raw transfer primitives for `path`.
    fn transfer_handle(
        &self,
        path: &str,
        kind: ObjectKind,
    ) -> Result<Arc<dyn TransferHandle>, SystemError>;
}

impl<S: ObjectSystem> ObjectSystem for Arc<S> {
    fn head(&self, path: &str) -> Result<Metadata, SystemError> {
        (**self).head(path)
    }

    fn default_kind(&self) -> ObjectKind {
        (**self).default_kind()
    }

    fn capabilities(&self, kind: ObjectKind) -> Capabilities {
        (**self).capabilities(kind)
    }

    fn transfer_handle(
        &self,
        path: &str,
        kind: ObjectKind,
    ) -> Result<Arc<dyn TransferHandle>, SystemError> {
        (**self).transfer_handle(path, kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Read-only fixture: one object, no write support
    struct FixedObject {
        data: Bytes,
    }

    impl TransferHandle for FixedObject {
        fn read_range(&self, offset: u64, len: usize) -> Result<Bytes, SystemError> {
            let size = self.data.len() as u64;
            if offset >= size {
                return Err(SystemError::OutOfRange { offset, size });
            }
            let start = offset as usize;
            let end = (start + len).min(self.data.len());
            Ok(self.data.slice(start..end))
        }
    }

    struct FixedSystem {
        heads: Mutex<u32>,
    }

    impl ObjectSystem for FixedSystem {
        fn head(&self, path: &str) -> Result<Metadata, SystemError> {
            *self.heads.lock().unwrap() += 1;
            if path == "present" {
                Ok(Metadata::with_size(5, ObjectKind::Block))
            } else {
                Err(SystemError::NotFound(path.into()))
            }
        }

        fn capabilities(&self, _kind: ObjectKind) -> Capabilities {
            Capabilities::sequential(4)
        }

        fn transfer_handle(
            &self,
            _path: &str,
            _kind: ObjectKind,
        ) -> Result<Arc<dyn TransferHandle>, SystemError> {
            Ok(Arc::new(FixedObject {
                data: Bytes::from_static(b"hello"),
            }))
        }
    }

    #[test]
    fn test_read_range_truncates_at_end() {
        let handle = FixedObject {
            data: Bytes::from_static(b"hello"),
        };
        assert_eq!(&handle.read_range(3, 10).unwrap()[..], b"lo");
        assert!(handle.read_range(5, 1).unwrap_err().is_out_of_range());
    }

    #[test]
    fn test_default_write_primitives_are_unsupported() {
        let handle = FixedObject {
            data: Bytes::new(),
        };
        assert_eq!(
            handle.resize(10),
            Err(SystemError::Unsupported("resize"))
        );
        assert_eq!(
            handle.flush_part(0, Bytes::new()),
            Err(SystemError::Unsupported("flush_part"))
        );
    }

    #[test]
    fn test_arc_system_forwards() {
        let system = Arc::new(FixedSystem {
            heads: Mutex::new(0),
        });
        assert_eq!(system.head("present").unwrap().size, 5);
        assert!(system.head("absent").unwrap_err().is_not_found());
        assert_eq!(system.default_kind(), ObjectKind::Block);
        assert_eq!(*system.heads.lock().unwrap(), 2);
    }
}
