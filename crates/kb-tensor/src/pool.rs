// Pooled executor (feature "pool").
//
// Keeps a rayon thread pool alive across kernel calls so repeated calls do
// not pay thread creation. Partitioning and join-before-return are unchanged.

use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::error::{Result, TensorError};
use crate::executor::{Executor, SpawnReport, WorkerTask};

/// Executor backed by a persistent rayon pool of fixed size.
#[derive(Debug)]
pub struct PooledExecutor {
    pool: ThreadPool,
}

impl PooledExecutor {
    /// Build a pool with `threads` workers (at least one).
    ///
    /// # Errors
    /// Returns `AllocationFailure` if the pool threads cannot be created.
    pub fn new(threads: usize) -> Result<Self> {
        let threads = threads.max(1);
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("kb-pool-{i}"))
            .build()
            .map_err(|e| {
                log::error!("failed to build worker pool: {e}");
                TensorError::AllocationFailure {
                    what: "pool threads",
                    count: threads,
                }
            })?;
        log::debug!("worker pool ready with {threads} threads");
        Ok(PooledExecutor { pool })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }
}

impl Executor for PooledExecutor {
    fn name(&self) -> &str {
        "pool"
    }

    fn fork_join<'a>(&self, tasks: Vec<WorkerTask<'a>>) -> SpawnReport {
        let requested = tasks.len();
        self.pool.scope(move |s| {
            for task in tasks {
                s.spawn(move |_| task());
            }
        });
        SpawnReport {
            requested,
            spawned: requested,
        }
    }
}
