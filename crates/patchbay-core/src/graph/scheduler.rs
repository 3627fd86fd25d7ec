//! Worker pool for intra-level parallel dispatch.
//!
//! The graph hands one level at a time to [`Scheduler::install`]; the calling
//! thread blocks inside `install` until every task of that level has finished,
//! which is the join barrier between levels.

use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, warn};

/// Hardware threads minus one, never less than one.
pub fn default_worker_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get().saturating_sub(1))
        .unwrap_or(1)
        .max(1)
}

/// Dedicated rayon pool owned by a graph.
pub struct Scheduler {
    pool: Option<ThreadPool>,
}

impl Scheduler {
    /// A scheduler without worker threads.
    pub fn disabled() -> Self {
        Self { pool: None }
    }

    /// Starts a pool with `threads` workers (`0` = [`default_worker_threads`]).
    ///
    /// If the pool cannot be built the scheduler stays disabled and the graph
    /// runs every level sequentially.
    pub fn start(threads: usize) -> Self {
        let threads = if threads == 0 {
            default_worker_threads()
        } else {
            threads
        };
        match ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("patchbay-worker-{i}"))
            .build()
        {
            Ok(pool) => {
                debug!(threads, "worker pool started");
                Self { pool: Some(pool) }
            }
            Err(err) => {
                warn!(%err, "worker pool unavailable, falling back to sequential execution");
                Self::disabled()
            }
        }
    }

    /// Returns true while the pool is running.
    #[inline]
    pub fn is_running(&self) -> bool {
        self.pool.is_some()
    }

    /// Worker thread count (0 when disabled).
    pub fn threads(&self) -> usize {
        self.pool.as_ref().map_or(0, ThreadPool::current_num_threads)
    }

    /// Runs `op` inside the pool and waits for it.
    ///
    /// Returns `None` without running `op` when the pool is not running.
    pub fn install<R, F>(&self, op: F) -> Option<R>
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        self.pool.as_ref().map(|pool| pool.install(op))
    }

    /// Stops the workers. Idempotent.
    pub fn shutdown(&mut self) {
        if self.pool.take().is_some() {
            debug!("worker pool shut down");
        }
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("threads", &self.threads())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_threads_at_least_one() {
        assert!(default_worker_threads() >= 1);
    }

    #[test]
    fn test_disabled_does_not_run() {
        let sched = Scheduler::disabled();
        assert!(!sched.is_running());
        assert_eq!(sched.threads(), 0);
        assert_eq!(sched.install(|| 1), None);
    }

    #[test]
    fn test_start_and_shutdown() {
        let mut sched = Scheduler::start(2);
        assert!(sched.is_running());
        assert_eq!(sched.threads(), 2);
        assert_eq!(sched.install(|| 40 + 2), Some(42));
        sched.shutdown();
        sched.shutdown();
        assert!(!sched.is_running());
    }
}
