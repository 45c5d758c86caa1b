use std::fmt::Debug;
use std::thread;

use crate::error::{Result, TensorError};

/// A unit of work handed to an executor. Borrows the caller's inputs and the
/// worker's exclusive output region for the duration of one kernel call.
pub type WorkerTask<'a> = Box<dyn FnOnce() + Send + 'a>;

/// How many of the submitted tasks actually ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpawnReport {
    pub requested: usize,
    pub spawned: usize,
}

impl SpawnReport {
    pub fn is_complete(&self) -> bool {
        self.spawned == self.requested
    }
}

/// Fork/join strategy used by the kernels.
///
/// Implementations run every task they manage to start and must not return
/// before all of those tasks have finished. A task that could not be started
/// is dropped without running; the shortfall is reported back through
/// `SpawnReport` and turned into an error by the caller.
pub trait Executor: Send + Sync + Debug {
    /// Returns the name of this executor (e.g., "threads", "pool").
    fn name(&self) -> &str;

    /// Run `tasks` concurrently and wait for all started tasks to finish.
    fn fork_join<'a>(&self, tasks: Vec<WorkerTask<'a>>) -> SpawnReport;
}

/// Spawns one scoped OS thread per task and joins them all before returning.
///
/// No threads outlive a call. If the OS refuses to create a thread, no
/// further threads are spawned for that call.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadPerCall;

impl ThreadPerCall {
    pub fn new() -> Self {
        ThreadPerCall
    }
}

impl Executor for ThreadPerCall {
    fn name(&self) -> &str {
        "threads"
    }

    fn fork_join<'a>(&self, tasks: Vec<WorkerTask<'a>>) -> SpawnReport {
        let requested = tasks.len();
        let mut spawned = 0;

        thread::scope(|s| {
            for (id, task) in tasks.into_iter().enumerate() {
                let builder = thread::Builder::new().name(format!("kb-worker-{id}"));
                match builder.spawn_scoped(s, task) {
                    Ok(_) => spawned += 1,
                    Err(e) => {
                        log::warn!("failed to spawn worker {id} of {requested}: {e}");
                        break;
                    }
                }
            }
        });

        SpawnReport { requested, spawned }
    }
}

/// One worker's share of a kernel call.
pub trait WorkerJob: Send {
    fn run(self);
}

/// Reserve a per-call job array for `workers` entries.
///
/// # Errors
/// Returns `AllocationFailure` if the reservation fails.
pub fn job_array<J>(workers: usize) -> Result<Vec<J>> {
    let mut jobs = Vec::new();
    jobs.try_reserve_exact(workers)
        .map_err(|_| TensorError::AllocationFailure {
            what: "worker jobs",
            count: workers,
        })?;
    Ok(jobs)
}

/// Hand `jobs` to `executor`, one task per job, and wait for them.
///
/// # Errors
/// Returns `AllocationFailure` if the task array cannot be reserved, and
/// `PartialExecution` if the executor could not start every job.
pub fn dispatch<'a, J>(op: &'static str, executor: &dyn Executor, jobs: Vec<J>) -> Result<()>
where
    J: WorkerJob + 'a,
{
    let mut tasks: Vec<WorkerTask<'a>> = job_array(jobs.len())?;
    for job in jobs {
        tasks.push(Box::new(move || job.run()));
    }

    log::trace!("{op}: forking {} tasks on '{}'", tasks.len(), executor.name());
    let report = executor.fork_join(tasks);

    if !report.is_complete() {
        log::warn!(
            "{op}: {} of {} workers started, unowned rows left unprocessed",
            report.spawned,
            report.requested
        );
        return Err(TensorError::PartialExecution {
            op,
            requested: report.requested,
            spawned: report.spawned,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountJob<'a> {
        hits: &'a AtomicUsize,
        slot: &'a mut usize,
        id: usize,
    }

    impl WorkerJob for CountJob<'_> {
        fn run(self) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            *self.slot = self.id * 10;
        }
    }

    /// Starts only the first `limit` tasks, like an OS that ran out of threads.
    #[derive(Debug)]
    struct Starved {
        limit: usize,
    }

    impl Executor for Starved {
        fn name(&self) -> &str {
            "starved"
        }

        fn fork_join<'a>(&self, tasks: Vec<WorkerTask<'a>>) -> SpawnReport {
            let requested = tasks.len();
            let mut spawned = 0;
            for task in tasks.into_iter().take(self.limit) {
                task();
                spawned += 1;
            }
            SpawnReport { requested, spawned }
        }
    }

    fn count_jobs<'a>(hits: &'a AtomicUsize, slots: &'a mut [usize]) -> Vec<CountJob<'a>> {
        slots
            .iter_mut()
            .enumerate()
            .map(|(id, slot)| CountJob { hits, slot, id })
            .collect()
    }

    #[test]
    fn test_thread_per_call_joins_all() {
        let hits = AtomicUsize::new(0);
        let mut slots = vec![0usize; 6];
        dispatch("count", &ThreadPerCall::new(), count_jobs(&hits, &mut slots)).unwrap();
        assert_eq!(hits.load(Ordering::Relaxed), 6);
        assert_eq!(slots, vec![0, 10, 20, 30, 40, 50]);
    }

    #[test]
    fn test_worker_threads_are_named() {
        let names = std::sync::Mutex::new(Vec::new());
        let tasks: Vec<WorkerTask<'_>> = (0..2)
            .map(|_| {
                let names = &names;
                Box::new(move || {
                    let name = thread::current().name().map(str::to_owned);
                    names.lock().unwrap().push(name);
                }) as WorkerTask<'_>
            })
            .collect();
        let report = ThreadPerCall::new().fork_join(tasks);
        assert!(report.is_complete());
        let mut names = names.into_inner().unwrap();
        names.sort();
        assert_eq!(
            names,
            vec![Some("kb-worker-0".to_string()), Some("kb-worker-1".to_string())]
        );
    }

    #[test]
    fn test_partial_spawn_is_an_error() {
        let hits = AtomicUsize::new(0);
        let mut slots = vec![0usize; 4];
        let err = dispatch("count", &Starved { limit: 2 }, count_jobs(&hits, &mut slots))
            .unwrap_err();
        assert_eq!(
            err,
            TensorError::PartialExecution {
                op: "count",
                requested: 4,
                spawned: 2
            }
        );
        assert_eq!(slots, vec![0, 10, 0, 0]);
    }

    #[test]
    fn test_empty_dispatch() {
        let jobs: Vec<CountJob<'_>> = Vec::new();
        assert!(dispatch("none", &ThreadPerCall::new(), jobs).is_ok());
    }
}
