//! Bounded worker pool for independent per-path work.
//!
//! [`TaskPool`] wraps a dedicated rayon thread pool. Units of work are
//! independent and stateless; each worker thread may build its own scratch
//! state once through [`TaskPool::map_init`]. Results come back as a `Vec`
//! whose order callers must not rely on.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;

/// Default worker count: available parallelism minus one, at least one.
#[must_use]
pub fn default_worker_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get().saturating_sub(1))
        .unwrap_or(1)
        .max(1)
}

/// Errors that can occur while building a pool.
#[derive(thiserror::Error, Debug)]
pub enum PoolError {
    /// The underlying thread pool could not be created.
    #[error("Failed to build worker pool: {0}")]
    Build(#[from] rayon::ThreadPoolBuildError),
}

/// A bounded pool of worker threads.
pub struct TaskPool {
    pool: rayon::ThreadPool,
    workers: usize,
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl std::fmt::Debug for TaskPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskPool")
            .field("workers", &self.workers)
            .field("shutdown_flag", &self.shutdown_flag)
            .finish()
    }
}

impl TaskPool {
    /// Create a pool with the given number of workers (minimum one).
    ///
    /// # Errors
    ///
    /// Returns [`PoolError`] if the OS refuses to spawn the threads.
    pub fn new(workers: usize) -> Result<Self, PoolError> {
        let workers = workers.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("dupfind-worker-{}", i))
            .build()?;
        Ok(Self {
            pool,
            workers,
            shutdown_flag: None,
        })
    }

    /// Skip remaining units once the flag is raised.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Number of worker threads.
    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Run `task` over every item, with per-worker state built by `init`.
    ///
    /// Items not started before shutdown is requested produce no result.
    pub fn map_init<T, S, R, I, F>(&self, items: Vec<T>, init: I, task: F) -> Vec<R>
    where
        T: Send,
        R: Send,
        I: Fn() -> S + Sync + Send,
        F: Fn(&mut S, T) -> R + Sync + Send,
    {
        self.pool.install(|| {
            items
                .into_par_iter()
                .map_init(&init, |state, item| {
                    if self.is_shutdown_requested() {
                        None
                    } else {
                        Some(task(state, item))
                    }
                })
                .flatten()
                .collect()
        })
    }
}
