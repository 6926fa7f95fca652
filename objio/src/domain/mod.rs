//! Domain layer: the buffering rules, free of threads and backends.
//!
//! - **Value objects**: [`OpenMode`], [`BufferIndex`], [`ByteRange`],
//!   [`BufferConfig`]
//! - **Entities**: [`Buffer`], [`StreamState`]
//! - **Services**: [`ReadAhead`] plans the fetch window of a reader,
//!   [`WriteBehind`] tracks the pending flushes of a writer
//! - **Ports**: [`ObjectSystem`] and [`TransferHandle`], re-exported from
//!   `objio-system`
//! - **Errors**: [`ObjectIoError`]
//!
//! ```text
//!     ┌──────────────────────────────────┐
//!     │      Domain Layer (Core)         │
//!     │  StreamState, Buffer, OpenMode   │
//!     │  ReadAhead, WriteBehind          │
//!     └──────────────┬───────────────────┘
//!                    │ depends on
//!                    ▼
//!     ┌──────────────────────────────────┐
//!     │  Ports: ObjectSystem,            │
//!     │         TransferHandle           │
//!     └──────────────────────────────────┘
//!                    ▲
//!                    │ implemented by
//!     ┌──────────────────────────────────┐
//!     │  objio-platform / your backend   │
//!     └──────────────────────────────────┘
//! ```
//!
//! The services are pure bookkeeping: they decide *which* buffer to fetch
//! or wait for, and the infrastructure layer performs the transfer.

pub mod entities;
pub mod error;
pub mod ports;
pub mod value_objects;

mod read_ahead;
mod write_behind;

pub use entities::{Buffer, BufferState, StreamState};
pub use error::ObjectIoError;
pub use ports::{Capabilities, Metadata, ObjectKind, ObjectSystem, SystemError, TransferHandle};
pub use read_ahead::ReadAhead;
pub use value_objects::{presets, BufferConfig, BufferConfigError, BufferIndex, ByteRange, OpenMode};
pub use write_behind::{FlushDiscipline, WriteBehind};
