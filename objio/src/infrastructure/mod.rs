//! Infrastructure layer: threads, once-guards and the streams themselves.
//!
//! - [`Memoized`]: once-computed per-stream values
//! - [`WorkerPool`]: lazily started bounded pool for transfers
//! - [`streaming`]: buffered and raw object streams with `std::io` impls
//! - [`OpenOptions`] / [`open`]: probe an object and build its stream

mod factory;
mod memoized;
pub mod streaming;
mod worker_pool;

pub use factory::{OpenOptions, open};
pub use memoized::Memoized;
pub use streaming::{BufferedObjectStream, ObjectChunks, ObjectStream, RawObjectStream};
pub use worker_pool::{Pending, PrefetchFirst, WorkerPool};
