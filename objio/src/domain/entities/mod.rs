//! Domain entities.
//!
//! - [`Buffer`]: a write buffer being filled before it is flushed
//! - [`StreamState`]: name, mode, position and closed flag of one stream

mod buffer;
mod buffer_state;
mod stream_state;

pub use buffer::Buffer;
pub use buffer_state::BufferState;
pub use stream_state::StreamState;
