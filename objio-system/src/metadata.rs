//! Object metadata and backend capabilities.

use chrono::{DateTime, Utc};
use core::fmt;

/// The storage kind of an object, as reported by a probe.
///
/// The kind decides how the engine flushes written data: block and append
/// objects are written sequentially as numbered parts, page objects accept
/// independent range updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ObjectKind {
    /// Whole-object upload from ordered parts, committed at close.
    #[default]
    Block,
    /// Parts are appended to the object in creation order.
    Append,
    /// Random-access object updated through range writes.
    Page,
}

impl ObjectKind {
    /// Name used by blob services for this kind.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Block => "BlockBlob",
            Self::Append => "AppendBlob",
            Self::Page => "PageBlob",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata returned by [`ObjectSystem::head`](crate::ObjectSystem::head).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    /// Object size in bytes.
    pub size: u64,
    /// Last modification time, when the backend reports one.
    pub last_modified: Option<DateTime<Utc>>,
    /// MIME type, when the backend reports one.
    pub content_type: Option<String>,
    /// Entity tag, when the backend reports one.
    pub etag: Option<String>,
    /// Storage kind of the object.
    pub kind: ObjectKind,
}

impl Metadata {
    /// Metadata for an object of `size` bytes with nothing else known.
    pub fn with_size(size: u64, kind: ObjectKind) -> Self {
        Self {
            size,
            last_modified: None,
            content_type: None,
            etag: None,
            kind,
        }
    }
}

/// Transfer limits a backend declares for one object kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Buffer size the engine uses when the caller does not choose one.
    pub default_buffer_size: usize,
    /// Largest range a single `update_range` call accepts.
    ///
    /// `Some` means the kind supports random-offset writes; `None` restricts
    /// writers to sequential parts.
    pub max_flush_size: Option<usize>,
}

impl Capabilities {
    /// Capabilities of a sequential-only kind.
    pub const fn sequential(default_buffer_size: usize) -> Self {
        Self {
            default_buffer_size,
            max_flush_size: None,
        }
    }

    /// Capabilities of a random-write kind.
    pub const fn random_write(default_buffer_size: usize, max_flush_size: usize) -> Self {
        Self {
            default_buffer_size,
            max_flush_size: Some(max_flush_size),
        }
    }

    /// Returns true if random-offset range writes are supported.
    #[inline]
    pub const fn supports_random_write(&self) -> bool {
        self.max_flush_size.is_some()
    }
}
