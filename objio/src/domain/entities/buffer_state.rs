//! Fill state of a write buffer.

/// How full a [`Buffer`](super::Buffer) is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BufferState {
    /// No bytes written yet.
    #[default]
    Empty,
    /// Some bytes written; more fit.
    Partial,
    /// Capacity reached; the buffer must be flushed.
    Full,
}

impl BufferState {
    /// Check if the buffer holds data that still has to be flushed.
    #[inline]
    pub const fn has_data(&self) -> bool {
        !matches!(self, BufferState::Empty)
    }

    /// Check if the buffer is full.
    #[inline]
    pub const fn is_full(&self) -> bool {
        matches!(self, BufferState::Full)
    }
}
