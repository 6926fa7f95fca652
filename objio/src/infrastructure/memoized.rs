//! Once-computed values.

use once_cell::sync::OnceCell;

/// A value computed on first access and kept for the owner's lifetime.
///
/// Used for per-stream lookups that are expensive and idempotent, such as
/// the object metadata or the backend transfer handle. A failed fallible
/// initialisation stores nothing, so the next access tries again. The value
/// is never refreshed once stored.
///
/// # Examples
///
/// ```
/// use objio::infrastructure::Memoized;
///
/// let size: Memoized<u64> = Memoized::new();
/// assert_eq!(*size.get_or_init(|| 42), 42);
/// assert_eq!(*size.get_or_init(|| unreachable!()), 42);
/// ```
#[derive(Debug)]
pub struct Memoized<T> {
    cell: OnceCell<T>,
}

impl<T> Memoized<T> {
    /// Create an empty slot.
    pub const fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    /// Create a slot that already holds `value`.
    pub fn seeded(value: T) -> Self {
        Self {
            cell: OnceCell::with_value(value),
        }
    }

    /// Get the stored value, computing it with `init` on first access.
    ///
    /// Concurrent first accesses run `init` once; the others wait for it.
    pub fn get_or_init(&self, init: impl FnOnce() -> T) -> &T {
        self.cell.get_or_init(init)
    }

    /// Like [`get_or_init`](Self::get_or_init) for fallible computations.
    ///
    /// # Errors
    ///
    /// Returns the error from `init`; nothing is stored in that case.
    pub fn get_or_try_init<E>(&self, init: impl FnOnce() -> Result<T, E>) -> Result<&T, E> {
        self.cell.get_or_try_init(init)
    }

    /// The stored value, if it has been computed.
    #[inline]
    pub fn get(&self) -> Option<&T> {
        self.cell.get()
    }

    /// Returns true once a value is stored.
    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.cell.get().is_some()
    }

    /// Remove and return the stored value.
    pub fn take(&mut self) -> Option<T> {
        self.cell.take()
    }
}

impl<T> Default for Memoized<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_evaluates_once() {
        let calls = AtomicUsize::new(0);
        let memo = Memoized::new();
        for _ in 0..10 {
            let value = memo.get_or_init(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                "metadata".to_string()
            });
            assert_eq!(value, "metadata");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failure_is_not_cached() {
        let calls = AtomicUsize::new(0);
        let memo: Memoized<u32> = Memoized::new();
        let attempt = || {
            memo.get_or_try_init(|| {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err("transient")
                } else {
                    Ok(7)
                }
            })
            .copied()
        };
        assert_eq!(attempt(), Err("transient"));
        assert!(!memo.is_initialized());
        assert_eq!(attempt(), Ok(7));
        assert_eq!(attempt(), Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_seeded_skips_init() {
        let memo = Memoized::seeded(5u8);
        assert_eq!(*memo.get_or_init(|| panic!("seeded value ignored")), 5);
    }

    #[test]
    fn test_concurrent_first_access() {
        let calls = Arc::new(AtomicUsize::new(0));
        let memo = Arc::new(Memoized::new());
        let threads: Vec<_> = (0..8)
            .map(|_| {
                let calls = Arc::clone(&calls);
                let memo = Arc::clone(&memo);
                std::thread::spawn(move || {
                    *memo.get_or_init(|| {
                        calls.fetch_add(1, Ordering::SeqCst);
                        std::thread::sleep(std::time::Duration::from_millis(10));
                        99u64
                    })
                })
            })
            .collect();
        for thread in threads {
            assert_eq!(thread.join().unwrap(), 99);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_take() {
        let mut memo = Memoized::seeded(1);
        assert_eq!(memo.take(), Some(1));
        assert_eq!(memo.get(), None);
    }
}
