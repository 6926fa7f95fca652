//! Buffer configuration value object.

use super::BufferIndex;
use core::num::NonZeroUsize;

/// Sizing of the buffered engine.
///
/// - `buffer_size`: bytes per buffer slot, and the size of every fetch or
///   flush the engine issues
/// - `max_buffers`: in-flight fetches (read) or pending flushes (write)
///   allowed at once; `0` means unbounded
/// - `max_workers`: worker threads used for transfers; `None` picks a
///   default from the CPU count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferConfig {
    buffer_size: usize,
    max_buffers: usize,
    max_workers: Option<NonZeroUsize>,
}

impl BufferConfig {
    /// Create a configuration with the given buffer size, unbounded
    /// buffering and the default worker count.
    ///
    /// # Errors
    ///
    /// Returns [`BufferConfigError::ZeroBufferSize`] if `buffer_size` is zero.
    ///
    /// # Examples
    ///
    /// ```
    /// use objio::domain::BufferConfig;
    ///
    /// let config = BufferConfig::new(1024 * 1024).unwrap();
    /// assert_eq!(config.buffer_size(), 1024 * 1024);
    /// assert_eq!(config.max_buffers(), 0);
    /// ```
    pub const fn new(buffer_size: usize) -> Result<Self, BufferConfigError> {
        if buffer_size == 0 {
            return Err(BufferConfigError::ZeroBufferSize);
        }
        Ok(Self {
            buffer_size,
            max_buffers: 0,
            max_workers: None,
        })
    }

    /// Limit the number of in-flight buffers (`0` for unbounded).
    pub const fn with_max_buffers(mut self, max_buffers: usize) -> Self {
        self.max_buffers = max_buffers;
        self
    }

    /// Use exactly `max_workers` worker threads.
    ///
    /// # Errors
    ///
    /// Returns [`BufferConfigError::ZeroWorkers`] if `max_workers` is zero.
    pub const fn with_max_workers(mut self, max_workers: usize) -> Result<Self, BufferConfigError> {
        match NonZeroUsize::new(max_workers) {
            Some(n) => {
                self.max_workers = Some(n);
                Ok(self)
            }
            None => Err(BufferConfigError::ZeroWorkers),
        }
    }

    /// Bytes per buffer slot.
    #[inline]
    pub const fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// In-flight buffer limit (`0` for unbounded).
    #[inline]
    pub const fn max_buffers(&self) -> usize {
        self.max_buffers
    }

    /// Explicit worker count, if one was configured.
    #[inline]
    pub fn max_workers(&self) -> Option<usize> {
        self.max_workers.map(NonZeroUsize::get)
    }

    /// Worker count to use: the configured one, else `min(32, cpus + 4)`.
    pub fn workers(&self) -> usize {
        self.max_workers().unwrap_or_else(|| {
            let cpus = std::thread::available_parallelism().map_or(1, NonZeroUsize::get);
            (cpus + 4).min(32)
        })
    }

    /// Slot containing `offset` and the offset within that slot.
    ///
    /// # Examples
    ///
    /// ```
    /// use objio::domain::BufferConfig;
    ///
    /// let config = BufferConfig::new(4096).unwrap();
    /// let (slot, within) = config.slot_of(5000);
    /// assert_eq!(slot.value(), 1);
    /// assert_eq!(within, 904);
    /// ```
    #[inline]
    pub const fn slot_of(&self, offset: u64) -> (BufferIndex, usize) {
        let slot = BufferIndex::from_offset(offset, self.buffer_size);
        let within = (offset % self.buffer_size as u64) as usize;
        (slot, within)
    }

    /// Number of slots needed to cover `size` bytes.
    #[inline]
    pub const fn slot_count(&self, size: u64) -> u64 {
        size.div_ceil(self.buffer_size as u64)
    }

    /// Shrink the buffer size to at most `limit` bytes.
    pub fn clamp_to(mut self, limit: usize) -> Self {
        if limit > 0 && self.buffer_size > limit {
            self.buffer_size = limit;
        }
        self
    }
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            buffer_size: presets::BUFFER_8M,
            max_buffers: 0,
            max_workers: None,
        }
    }
}

/// Common buffer sizes.
pub mod presets {
    /// 64 KiB.
    pub const BUFFER_64K: usize = 64 * 1024;
    /// 1 MiB.
    pub const BUFFER_1M: usize = 1024 * 1024;
    /// 4 MiB, the range-update limit of page blobs.
    pub const BUFFER_4M: usize = 4 * 1024 * 1024;
    /// 8 MiB, the default.
    pub const BUFFER_8M: usize = 8 * 1024 * 1024;
    /// 32 MiB.
    pub const BUFFER_32M: usize = 32 * 1024 * 1024;
}

/// Errors that can occur when creating a [`BufferConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferConfigError {
    /// Buffer size is zero.
    ZeroBufferSize,
    /// Worker count is zero.
    ZeroWorkers,
}

impl core::fmt::Display for BufferConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::ZeroBufferSize => write!(f, "Buffer size cannot be zero"),
            Self::ZeroWorkers => write!(f, "Worker count cannot be zero"),
        }
    }
}

impl core::error::Error for BufferConfigError {}
