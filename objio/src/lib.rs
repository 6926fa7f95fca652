//! Buffered read-ahead / write-behind streams over object storage.
//!
//! Object stores answer large range requests well and small ones badly.
//! This crate turns ordinary `std::io` reads, writes and seeks into a
//! bounded number of large concurrent transfers against any backend that
//! implements [`ObjectSystem`](objio_system::ObjectSystem).
//!
//! # Architecture
//!
//! ## Domain Layer (`domain`)
//! Buffering rules with no threads and no backend:
//! - **Value Objects**: `OpenMode`, `BufferIndex`, `ByteRange`, `BufferConfig`
//! - **Entities**: `Buffer`, `StreamState`
//! - **Services**: `ReadAhead` (fetch window), `WriteBehind` (pending flushes)
//! - **Ports**: `ObjectSystem`, `TransferHandle`
//!
//! ## Adapter Layer (`adapters`)
//! - **`ObjectBinding`**: one object of one system, with memoized metadata
//!   and transfer handle
//!
//! ## Infrastructure Layer (`infrastructure`)
//! - **`WorkerPool`**: lazily started thread pool on tokio's blocking pool
//! - **`BufferedObjectStream`** / **`RawObjectStream`**: the streams
//! - **`open`** / **`OpenOptions`**: pick the stream and flush discipline
//!   from the probed object kind
//!
//! # Quick Start
//!
//! ```
//! use objio::{OpenOptions, presets};
//! use objio_platform::MemorySystem;
//! use std::io::{Read, Seek, SeekFrom, Write};
//!
//! let system = MemorySystem::new();
//!
//! let mut out = OpenOptions::new()
//!     .mode("wb")
//!     .buffer_size(presets::BUFFER_64K)?
//!     .open(system.clone(), "bucket/report.csv")?;
//! out.write_all(b"id,value\n1,42\n")?;
//! out.close()?;
//!
//! let mut inp = objio::open(system, "bucket/report.csv", "rb")?;
//! inp.seek(SeekFrom::Start(9))?;
//! let mut row = String::new();
//! inp.read_to_string(&mut row)?;
//! assert_eq!(row, "1,42\n");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Features
//!
//! - `log` (default): log pool start-up, transfer scheduling, seeks and
//!   close through the `log` crate

#![warn(missing_docs)]

mod log_macros;

pub mod adapters;
pub mod domain;
pub mod infrastructure;

pub use domain::{presets, BufferConfig, FlushDiscipline, ObjectIoError, OpenMode};
pub use infrastructure::{BufferedObjectStream, ObjectStream, OpenOptions, RawObjectStream, open};
pub use objio_system;
