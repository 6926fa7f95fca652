//! Concrete [`ObjectSystem`](objio_system::ObjectSystem) implementations.
//!
//! - [`MemorySystem`]: an in-process blob store with block, append and page
//!   objects, a journal of every transfer call and switchable fault injection.
//!   Intended for tests and benchmarks.
//! - [`LocalSystem`]: objects stored as files under a root directory. Every
//!   object is random-write capable.

#![warn(missing_docs)]

mod local;
mod memory;

pub use local::LocalSystem;
pub use memory::{Call, MemorySystem};

/// Default buffer size advertised by the systems in this crate (8 MiB).
pub const DEFAULT_BUFFER_SIZE: usize = 8 * 1024 * 1024;

/// Default largest range update accepted by page objects (4 MiB).
pub const DEFAULT_MAX_FLUSH_SIZE: usize = 4 * 1024 * 1024;
