//! Object storage system port.
//!
//! This crate defines what the `objio` engine needs from a storage backend:
//! a way to describe an object ([`ObjectSystem::head`]), the capabilities of
//! each object kind, and the raw transfer primitives ([`TransferHandle`]) the
//! engine wraps in buffers.
//!
//! Backends (in-memory stores, local directories, blob services) implement
//! these traits; the engine never talks to a client directly.
//!
//! ```text
//! ┌─────────────────────┐
//! │   objio engine      │
//! └──────────┬──────────┘
//!            │ depends on
//!            ▼
//! ┌─────────────────────┐
//! │  ObjectSystem port  │  ◄── This crate
//! └──────────┬──────────┘
//!            │ implemented by
//!            ▼
//! ┌─────────────────────┐
//! │  objio-platform     │
//! └─────────────────────┘
//! ```

#![warn(missing_docs)]

mod error;
mod metadata;
mod transfer;

pub use error::SystemError;
pub use metadata::{Capabilities, Metadata, ObjectKind};
pub use transfer::{ObjectSystem, TransferHandle};

pub use bytes::Bytes;
