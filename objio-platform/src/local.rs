//! Objects stored as files under a root directory.

use crate::{DEFAULT_BUFFER_SIZE, DEFAULT_MAX_FLUSH_SIZE};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use objio_system::{Capabilities, Metadata, ObjectKind, ObjectSystem, SystemError, TransferHandle};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn classify(err: io::Error, path: &Path) -> SystemError {
    match err.kind() {
        io::ErrorKind::NotFound => SystemError::NotFound(path.display().to_string()),
        io::ErrorKind::PermissionDenied => {
            SystemError::PermissionDenied(path.display().to_string())
        }
        _ => SystemError::Backend(format!("{}: {}", path.display(), err)),
    }
}

/// A directory tree exposed as an object store.
///
/// Object paths are relative to the root and may contain `/` separators;
/// missing parent directories are created on first write. Files support
/// positioned writes, so every object is reported as a page object.
///
/// # Examples
///
/// ```no_run
/// use objio_platform::LocalSystem;
/// use objio_system::ObjectSystem;
///
/// let system = LocalSystem::new("/var/lib/objects");
/// let meta = system.head("reports/2024.csv")?;
/// println!("{} bytes", meta.size);
/// # Ok::<(), objio_system::SystemError>(())
/// ```
#[derive(Debug, Clone)]
pub struct LocalSystem {
    root: PathBuf,
    default_buffer_size: usize,
    max_flush_size: usize,
}

impl LocalSystem {
    /// Serve objects from `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            default_buffer_size: DEFAULT_BUFFER_SIZE,
            max_flush_size: DEFAULT_MAX_FLUSH_SIZE,
        }
    }

    /// Buffer size advertised through [`Capabilities`].
    pub fn with_default_buffer_size(mut self, size: usize) -> Self {
        self.default_buffer_size = size;
        self
    }

    /// Largest range update accepted in one call.
    pub fn with_max_flush_size(mut self, size: usize) -> Self {
        self.max_flush_size = size;
        self
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }
}

impl ObjectSystem for LocalSystem {
    fn head(&self, path: &str) -> Result<Metadata, SystemError> {
        let file = self.resolve(path);
        let meta = fs::metadata(&file).map_err(|e| classify(e, &file))?;
        if !meta.is_file() {
            return Err(SystemError::NotFound(file.display().to_string()));
        }
        Ok(Metadata {
            size: meta.len(),
            last_modified: meta.modified().ok().map(DateTime::<Utc>::from),
            content_type: None,
            etag: None,
            kind: ObjectKind::Page,
        })
    }

    fn default_kind(&self) -> ObjectKind {
        ObjectKind::Page
    }

    fn capabilities(&self, _kind: ObjectKind) -> Capabilities {
        Capabilities::random_write(self.default_buffer_size, self.max_flush_size)
    }

    fn transfer_handle(
        &self,
        path: &str,
        _kind: ObjectKind,
    ) -> Result<Arc<dyn TransferHandle>, SystemError> {
        Ok(Arc::new(LocalHandle {
            file: self.resolve(path),
            max_flush_size: self.max_flush_size,
        }))
    }
}

struct LocalHandle {
    file: PathBuf,
    max_flush_size: usize,
}

impl LocalHandle {
    fn open_existing(&self, write: bool) -> Result<File, SystemError> {
        OpenOptions::new()
            .read(true)
            .write(write)
            .open(&self.file)
            .map_err(|e| self.classify(e))
    }

    fn classify(&self, err: io::Error) -> SystemError {
        classify(err, &self.file)
    }
}

// A fresh descriptor per call keeps concurrent workers from sharing a cursor
impl TransferHandle for LocalHandle {
    fn read_range(&self, offset: u64, len: usize) -> Result<Bytes, SystemError> {
        let mut file = self.open_existing(false)?;
        let size = file.metadata().map_err(|e| self.classify(e))?.len();
        if offset >= size {
            return Err(SystemError::OutOfRange { offset, size });
        }
        let len = len.min((size - offset) as usize);
        let mut data = vec![0u8; len];
        file.seek(SeekFrom::Start(offset))
            .and_then(|_| file.read_exact(&mut data))
            .map_err(|e| self.classify(e))?;
        Ok(Bytes::from(data))
    }

    fn create_from_size(&self, size: u64) -> Result<(), SystemError> {
        if let Some(parent) = self.file.parent() {
            fs::create_dir_all(parent).map_err(|e| self.classify(e))?;
        }
        let file = File::create(&self.file).map_err(|e| self.classify(e))?;
        file.set_len(size).map_err(|e| self.classify(e))
    }

    fn resize(&self, size: u64) -> Result<(), SystemError> {
        let file = self.open_existing(true)?;
        file.set_len(size).map_err(|e| self.classify(e))
    }

    fn update_range(&self, offset: u64, data: Bytes) -> Result<(), SystemError> {
        if data.len() > self.max_flush_size {
            return Err(SystemError::Backend(format!(
                "range update of {} bytes exceeds {}",
                data.len(),
                self.max_flush_size
            )));
        }
        let mut file = self.open_existing(true)?;
        let size = file.metadata().map_err(|e| self.classify(e))?.len();
        if offset + data.len() as u64 > size {
            return Err(SystemError::OutOfRange { offset, size });
        }
        file.seek(SeekFrom::Start(offset))
            .and_then(|_| file.write_all(&data))
            .map_err(|e| self.classify(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_object() {
        let dir = tempfile::tempdir().unwrap();
        let system = LocalSystem::new(dir.path());
        assert!(system.head("nope").unwrap_err().is_not_found());

        let handle = system.transfer_handle("nope", ObjectKind::Page).unwrap();
        assert!(handle.read_range(0, 4).unwrap_err().is_not_found());
        assert!(handle.resize(4).unwrap_err().is_not_found());
    }

    #[test]
    fn test_directory_is_not_an_object() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        let system = LocalSystem::new(dir.path());
        assert!(system.head("sub").unwrap_err().is_not_found());
    }

    #[test]
    fn test_create_update_read() {
        let dir = tempfile::tempdir().unwrap();
        let system = LocalSystem::new(dir.path()).with_max_flush_size(8);
        let handle = system.transfer_handle("a/b/obj", ObjectKind::Page).unwrap();

        handle.create_from_size(6).unwrap();
        handle.update_range(2, Bytes::from_static(b"xy")).unwrap();
        assert!(handle.update_range(5, Bytes::from_static(b"zz")).unwrap_err().is_out_of_range());
        assert!(matches!(
            handle.update_range(0, Bytes::from(vec![1u8; 9])),
            Err(SystemError::Backend(_))
        ));

        assert_eq!(&handle.read_range(0, 100).unwrap()[..], b"\0\0xy\0\0");
        assert!(handle.read_range(6, 1).unwrap_err().is_out_of_range());

        let meta = system.head("a/b/obj").unwrap();
        assert_eq!(meta.size, 6);
        assert_eq!(meta.kind, ObjectKind::Page);
        assert!(meta.last_modified.is_some());
    }

    #[test]
    fn test_resize_truncates_and_extends() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("obj"), b"abcdef").unwrap();
        let system = LocalSystem::new(dir.path());
        let handle = system.transfer_handle("/obj", ObjectKind::Page).unwrap();

        handle.resize(3).unwrap();
        assert_eq!(fs::read(dir.path().join("obj")).unwrap(), b"abc");
        handle.resize(5).unwrap();
        assert_eq!(fs::read(dir.path().join("obj")).unwrap(), b"abc\0\0");
    }

    #[test]
    fn test_every_kind_is_random_write() {
        let system = LocalSystem::new("unused");
        assert!(system.capabilities(ObjectKind::Block).supports_random_write());
        assert_eq!(system.default_kind(), ObjectKind::Page);
        assert_eq!(system.root(), Path::new("unused"));
    }
}
