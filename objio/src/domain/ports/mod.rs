//! Ports to the storage backend.
//!
//! The engine consumes an [`ObjectSystem`] to describe objects and resolve
//! their [`TransferHandle`]. Both traits live in the `objio-system` crate so
//! backends can implement them without depending on the engine.

pub use objio_system::{Capabilities, Metadata, ObjectKind, ObjectSystem, SystemError, TransferHandle};
