//! Engine errors.
//!
//! Every stream operation reports an [`ObjectIoError`]. Backend failures
//! arrive as [`SystemError`] and are wrapped either as a plain
//! [`System`](ObjectIoError::System) error (probing, metadata) or as a
//! [`BackendTransfer`](ObjectIoError::BackendTransfer) error that records
//! which buffer transfer failed.

use crate::domain::value_objects::BufferConfigError;
use core::fmt;
use objio_system::SystemError;
use std::io;

/// Errors that can occur while opening or using a stream.
#[derive(Debug)]
#[non_exhaustive]
pub enum ObjectIoError {
    /// The mode token is not one of `r`, `w`, `a`, `x` (optionally with `b`).
    InvalidMode(String),

    /// The operation is not available on this stream.
    ///
    /// Raised for reads on write streams and the reverse, `tell` on a
    /// non-seekable stream and seeking a sequential writer.
    UnsupportedOperation(&'static str),

    /// The stream has been closed.
    StreamClosed,

    /// An argument is out of range, such as a negative seek target.
    InvalidInput(String),

    /// Invalid buffer configuration.
    InvalidConfig(BufferConfigError),

    /// The object does not exist.
    ObjectNotFound(String),

    /// The object exists and the stream was opened with `x`.
    ObjectExists(String),

    /// A buffer fetch or flush failed.
    BackendTransfer {
        /// Transfer primitive that failed.
        operation: &'static str,
        /// Object offset of the buffer involved.
        offset: u64,
        /// Error reported by the backend.
        source: SystemError,
    },

    /// Any other backend failure.
    System(SystemError),

    /// The worker pool could not be started.
    WorkerPool(io::Error),

    /// A transfer task was dropped before producing a result.
    TransferAbandoned,
}

impl ObjectIoError {
    /// Wrap a failed transfer of the buffer at `offset`.
    pub fn transfer(operation: &'static str, offset: u64, source: SystemError) -> Self {
        Self::BackendTransfer {
            operation,
            offset,
            source,
        }
    }

    /// Returns true for [`ObjectNotFound`](Self::ObjectNotFound).
    #[inline]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ObjectNotFound(_))
    }

    /// Returns true for [`BackendTransfer`](Self::BackendTransfer).
    #[inline]
    pub fn is_transfer(&self) -> bool {
        matches!(self, Self::BackendTransfer { .. })
    }
}

impl fmt::Display for ObjectIoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidMode(mode) => write!(f, "Invalid mode: '{}'", mode),
            Self::UnsupportedOperation(op) => write!(f, "Unsupported operation: {}", op),
            Self::StreamClosed => write!(f, "I/O operation on closed stream"),
            Self::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            Self::InvalidConfig(e) => write!(f, "Invalid buffer configuration: {}", e),
            Self::ObjectNotFound(path) => write!(f, "No such object: '{}'", path),
            Self::ObjectExists(path) => write!(f, "Object already exists: '{}'", path),
            Self::BackendTransfer {
                operation,
                offset,
                source,
            } => write!(f, "{} failed for buffer at offset {}: {}", operation, offset, source),
            Self::System(e) => write!(f, "{}", e),
            Self::WorkerPool(e) => write!(f, "Unable to start worker pool: {}", e),
            Self::TransferAbandoned => write!(f, "Transfer task ended without a result"),
        }
    }
}

impl core::error::Error for ObjectIoError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Self::InvalidConfig(e) => Some(e),
            Self::BackendTransfer { source, .. } => Some(source),
            Self::System(e) => Some(e),
            Self::WorkerPool(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ObjectIoError> for io::Error {
    fn from(err: ObjectIoError) -> Self {
        let kind = match &err {
            ObjectIoError::InvalidMode(_)
            | ObjectIoError::InvalidInput(_)
            | ObjectIoError::InvalidConfig(_) => io::ErrorKind::InvalidInput,
            ObjectIoError::UnsupportedOperation(_) => io::ErrorKind::Unsupported,
            ObjectIoError::StreamClosed => io::ErrorKind::BrokenPipe,
            ObjectIoError::ObjectNotFound(_) => io::ErrorKind::NotFound,
            ObjectIoError::ObjectExists(_) => io::ErrorKind::AlreadyExists,
            ObjectIoError::System(SystemError::PermissionDenied(_))
            | ObjectIoError::BackendTransfer {
                source: SystemError::PermissionDenied(_),
                ..
            } => io::ErrorKind::PermissionDenied,
            _ => io::ErrorKind::Other,
        };
        io::Error::new(kind, err)
    }
}
