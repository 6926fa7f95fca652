//! Value objects for the domain layer.
//!
//! Small validated types that keep offsets, slot numbers and configuration
//! from being mixed up as bare integers.

mod buffer_config;
mod buffer_index;
mod byte_range;
mod mode;

pub use buffer_config::{presets, BufferConfig, BufferConfigError};
pub use buffer_index::BufferIndex;
pub use byte_range::ByteRange;
pub use mode::OpenMode;
