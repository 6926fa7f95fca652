//! Lazily started worker pool for backend transfers.

use crate::domain::ObjectIoError;
use crate::log_macros::debug;
use core::fmt;
use once_cell::sync::OnceCell;
use std::mem;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::runtime::{Builder, Runtime};
use tokio::task::JoinHandle;

/// A bounded pool of worker threads, created on first use.
///
/// Backed by the blocking pool of a private tokio runtime limited to
/// `max_workers` threads. Transfer primitives are ordinary blocking calls,
/// so each submitted closure occupies one thread until it returns.
///
/// Streams that never need concurrency never start the runtime. Dropping
/// the pool shuts it down without waiting for running tasks.
///
/// # Examples
///
/// ```
/// use objio::infrastructure::WorkerPool;
///
/// let pool = WorkerPool::new(2);
/// assert!(!pool.is_started());
///
/// let pending = pool.submit(|| 6 * 7).unwrap();
/// assert_eq!(pending.wait().unwrap(), 42);
/// assert!(pool.is_started());
/// ```
pub struct WorkerPool {
    max_workers: usize,
    workers: OnceCell<Workers>,
}

// One runtime generation; `abandoned` is raised when it shuts down
struct Workers {
    runtime: Runtime,
    abandoned: Arc<AtomicBool>,
}

impl WorkerPool {
    /// Create a pool that will run at most `max_workers` tasks at once.
    ///
    /// A value of zero is treated as one.
    pub fn new(max_workers: usize) -> Self {
        Self {
            max_workers: max_workers.max(1),
            workers: OnceCell::new(),
        }
    }

    /// Worker thread limit.
    #[inline]
    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Returns true once the underlying runtime exists.
    #[inline]
    pub fn is_started(&self) -> bool {
        self.workers.get().is_some()
    }

    fn workers(&self) -> Result<&Workers, ObjectIoError> {
        self.workers.get_or_try_init(|| {
            debug!("starting worker pool with {} threads", self.max_workers);
            let runtime = Builder::new_multi_thread()
                .worker_threads(1)
                .max_blocking_threads(self.max_workers)
                .thread_name("objio-worker")
                .build()
                .map_err(ObjectIoError::WorkerPool)?;
            Ok(Workers {
                runtime,
                abandoned: Arc::new(AtomicBool::new(false)),
            })
        })
    }

    /// Run `task` on a worker thread.
    ///
    /// Never blocks the caller: when every worker is busy the task waits in
    /// the pool's queue. A panic inside `task` is re-raised by
    /// [`Pending::wait`].
    ///
    /// # Errors
    ///
    /// Returns [`ObjectIoError::WorkerPool`] if the pool cannot be started.
    pub fn submit<F, T>(&self, task: F) -> Result<Pending<T>, ObjectIoError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let workers = self.workers()?;
        let abandoned = Arc::clone(&workers.abandoned);
        let handle = workers.runtime.spawn_blocking(move || {
            if abandoned.load(Ordering::Acquire) {
                return None;
            }
            Some(task())
        });
        Ok(Pending::scheduled(handle))
    }

    /// Start evaluating the first element of `iter` on a worker right away.
    ///
    /// The returned iterator blocks on its first `next` until that element
    /// is ready, then yields the rest of `iter` on the calling thread. An
    /// empty `iter` yields nothing.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectIoError::WorkerPool`] if the pool cannot be started.
    pub fn prefetch_first<I>(&self, mut iter: I) -> Result<PrefetchFirst<I>, ObjectIoError>
    where
        I: Iterator + Send + 'static,
        I::Item: Send + 'static,
    {
        let pending = self.submit(move || {
            let first = iter.next();
            (first, iter)
        })?;
        Ok(PrefetchFirst {
            state: PrefetchState::Waiting(pending),
        })
    }

    /// Stop the pool without waiting for running tasks.
    ///
    /// Tasks already running finish normally. Queued tasks that have not
    /// started never run; waiting on them reports
    /// [`ObjectIoError::TransferAbandoned`]. A later
    /// [`submit`](Self::submit) starts a fresh pool.
    pub fn shutdown(&mut self) {
        if let Some(workers) = self.workers.take() {
            debug!("shutting down worker pool");
            workers.abandoned.store(true, Ordering::Release);
            workers.runtime.shutdown_background();
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("max_workers", &self.max_workers)
            .field("started", &self.is_started())
            .finish()
    }
}

enum PendingInner<T> {
    Ready(T),
    // `None` once the pool shut down before the task started
    Scheduled(JoinHandle<Option<T>>),
}

/// Result of a submitted task, available once the task has run.
///
/// Dropping a `Pending` detaches the task: it still runs, its result is
/// discarded.
pub struct Pending<T> {
    inner: PendingInner<T>,
}

impl<T> Pending<T> {
    /// A result that is already known.
    pub fn ready(value: T) -> Self {
        Self {
            inner: PendingInner::Ready(value),
        }
    }

    fn scheduled(handle: JoinHandle<Option<T>>) -> Self {
        Self {
            inner: PendingInner::Scheduled(handle),
        }
    }

    /// Returns true if [`wait`](Self::wait) would return without blocking.
    pub fn is_finished(&self) -> bool {
        match &self.inner {
            PendingInner::Ready(_) => true,
            PendingInner::Scheduled(handle) => handle.is_finished(),
        }
    }

    /// Block until the task has run and return its result.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectIoError::TransferAbandoned`] if the pool was shut
    /// down before the task ran.
    ///
    /// # Panics
    ///
    /// Resumes the task's panic, if it panicked.
    pub fn wait(self) -> Result<T, ObjectIoError> {
        match self.inner {
            PendingInner::Ready(value) => Ok(value),
            PendingInner::Scheduled(handle) => match futures::executor::block_on(handle) {
                Ok(Some(value)) => Ok(value),
                Ok(None) => Err(ObjectIoError::TransferAbandoned),
                Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
                Err(_) => Err(ObjectIoError::TransferAbandoned),
            },
        }
    }
}

impl<T> fmt::Debug for Pending<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pending")
            .field("finished", &self.is_finished())
            .finish()
    }
}

enum PrefetchState<I: Iterator> {
    Waiting(Pending<(Option<I::Item>, I)>),
    Running(I),
    Done,
}

/// Iterator returned by [`WorkerPool::prefetch_first`].
///
/// Yields `Err` once if the prefetch task was abandoned, then stops.
pub struct PrefetchFirst<I: Iterator> {
    state: PrefetchState<I>,
}

impl<I: Iterator> Iterator for PrefetchFirst<I> {
    type Item = Result<I::Item, ObjectIoError>;

    fn next(&mut self) -> Option<Self::Item> {
        match mem::replace(&mut self.state, PrefetchState::Done) {
            PrefetchState::Waiting(pending) => match pending.wait() {
                Ok((Some(first), rest)) => {
                    self.state = PrefetchState::Running(rest);
                    Some(Ok(first))
                }
                Ok((None, _)) => None,
                Err(err) => Some(Err(err)),
            },
            PrefetchState::Running(mut iter) => {
                let item = iter.next()?;
                self.state = PrefetchState::Running(iter);
                Some(Ok(item))
            }
            PrefetchState::Done => None,
        }
    }
}

impl<I: Iterator> fmt::Debug for PrefetchFirst<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state {
            PrefetchState::Waiting(_) => "waiting",
            PrefetchState::Running(_) => "running",
            PrefetchState::Done => "done",
        };
        f.debug_struct("PrefetchFirst").field("state", &state).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[test]
    fn test_pool_is_lazy() {
        let mut pool = WorkerPool::new(4);
        assert!(!pool.is_started());
        pool.shutdown();
        assert!(!pool.is_started());
    }

    #[test]
    fn test_submit_runs_concurrently() {
        let pool = WorkerPool::new(2);
        let barrier = Arc::new(Barrier::new(2));
        let pending: Vec<_> = (0..2)
            .map(|i| {
                let barrier = Arc::clone(&barrier);
                pool.submit(move || {
                    barrier.wait();
                    i
                })
                .unwrap()
            })
            .collect();
        let results: Vec<_> = pending.into_iter().map(|p| p.wait().unwrap()).collect();
        assert_eq!(results, vec![0, 1]);
    }

    #[test]
    fn test_submit_does_not_block_when_busy() {
        let pool = WorkerPool::new(1);
        let first = pool
            .submit(|| std::thread::sleep(Duration::from_millis(50)))
            .unwrap();
        // Queued behind the sleeping task
        let second = pool.submit(|| 2).unwrap();
        assert!(!second.is_finished());
        first.wait().unwrap();
        assert_eq!(second.wait().unwrap(), 2);
    }

    #[test]
    fn test_errors_surface_on_wait() {
        let pool = WorkerPool::new(1);
        let pending = pool.submit(|| Err::<(), _>("boom")).unwrap();
        assert_eq!(pending.wait().unwrap(), Err("boom"));
    }

    #[test]
    #[should_panic(expected = "task exploded")]
    fn test_panic_is_resumed() {
        let pool = WorkerPool::new(1);
        let pending = pool.submit(|| -> u8 { panic!("task exploded") }).unwrap();
        let _ = pending.wait();
    }

    #[test]
    fn test_ready() {
        let pending = Pending::ready(3);
        assert!(pending.is_finished());
        assert_eq!(pending.wait().unwrap(), 3);
    }

    #[test]
    fn test_prefetch_first_starts_immediately() {
        let pool = WorkerPool::new(1);
        let evaluated = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&evaluated);
        let iter = (0..3).map(move |i| {
            counter.fetch_add(1, Ordering::SeqCst);
            i * 10
        });

        let mut prefetched = pool.prefetch_first(iter).unwrap();
        // First element is computed without consuming the iterator
        while evaluated.load(Ordering::SeqCst) == 0 {
            std::thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(evaluated.load(Ordering::SeqCst), 1);

        assert_eq!(prefetched.next().unwrap().unwrap(), 0);
        assert_eq!(prefetched.next().unwrap().unwrap(), 10);
        assert_eq!(prefetched.next().unwrap().unwrap(), 20);
        assert!(prefetched.next().is_none());
        assert!(prefetched.next().is_none());
        assert_eq!(evaluated.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_prefetch_first_empty() {
        let pool = WorkerPool::new(1);
        let mut prefetched = pool.prefetch_first(std::iter::empty::<u8>()).unwrap();
        assert!(prefetched.next().is_none());
    }

    #[test]
    fn test_shutdown_abandons_queued_tasks() {
        let mut pool = WorkerPool::new(1);
        let _running = pool
            .submit(|| std::thread::sleep(Duration::from_millis(100)))
            .unwrap();
        let ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran);
        let queued = pool.submit(move || flag.store(true, Ordering::SeqCst)).unwrap();
        std::thread::sleep(Duration::from_millis(20));
        pool.shutdown();
        assert!(matches!(queued.wait(), Err(ObjectIoError::TransferAbandoned)));
        assert!(!ran.load(Ordering::SeqCst));
    }

    #[test]
    fn test_running_task_finishes_after_shutdown() {
        let mut pool = WorkerPool::new(1);
        let barrier = Arc::new(Barrier::new(2));
        let started = Arc::clone(&barrier);
        let running = pool
            .submit(move || {
                started.wait();
                std::thread::sleep(Duration::from_millis(20));
                5
            })
            .unwrap();
        barrier.wait();
        pool.shutdown();
        assert_eq!(running.wait().unwrap(), 5);

        // A fresh generation starts on demand
        assert_eq!(pool.submit(|| 6).unwrap().wait().unwrap(), 6);
        assert!(pool.is_started());
    }
}
