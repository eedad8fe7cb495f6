//! Host-supplied worker scheduling.
//!
//! The driver only needs "run this job somewhere and tell me when it is
//! done". [`WorkerPool`] is that seam; [`ThreadSpawner`] and [`RayonSpawner`]
//! are the two stock implementations. Hosts with their own job system
//! implement the trait with [`TaskHandle::pending`] and [`run_job`].

use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use crate::error::{ConfigReason, PipelineError, PipelineResult, WorkerFault};
use crate::worker::WorkerReport;

/// Outcome of a worker job.
pub type JobOutcome = Result<WorkerReport, WorkerFault>;

/// A unit of work handed to a [`WorkerPool`].
pub type Job = Box<dyn FnOnce() -> JobOutcome + Send + 'static>;

/// Runs jobs concurrently.
pub trait WorkerPool: Send + Sync {
    /// Schedules `job`. `name` identifies the job in thread names and logs.
    fn spawn(&self, name: &str, job: Job) -> Result<TaskHandle, WorkerFault>;
}

/// Completion handle for a scheduled job.
#[derive(Debug)]
pub struct TaskHandle {
    slot: Arc<TaskSlot>,
}

/// Write side of a [`TaskHandle`].
///
/// Dropping a completer without calling [`complete`](Self::complete) settles
/// the task with a [`WorkerFault::Spawn`], so a job lost by its pool can never
/// leave the driver waiting.
#[derive(Debug)]
pub struct TaskCompleter {
    slot: Option<Arc<TaskSlot>>,
}

#[derive(Debug, Default)]
struct TaskSlot {
    done: AtomicBool,
    outcome: Mutex<Option<JobOutcome>>,
}

impl TaskSlot {
    fn settle(&self, outcome: JobOutcome) {
        *self.outcome.lock().unwrap_or_else(PoisonError::into_inner) = Some(outcome);
        self.done.store(true, Ordering::Release);
    }
}

impl TaskHandle {
    /// Creates an unsettled handle and the completer that settles it.
    #[must_use]
    pub fn pending() -> (Self, TaskCompleter) {
        let slot = Arc::new(TaskSlot::default());
        (
            Self {
                slot: Arc::clone(&slot),
            },
            TaskCompleter { slot: Some(slot) },
        )
    }

    /// Returns `true` once the job has settled, successfully or not.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.slot.done.load(Ordering::Acquire)
    }

    /// Takes the job outcome. `None` until settled, and after the first take.
    pub fn take_outcome(&self) -> Option<JobOutcome> {
        if !self.is_finished() {
            return None;
        }
        self.slot
            .outcome
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

impl TaskCompleter {
    /// Settles the task.
    pub fn complete(mut self, outcome: JobOutcome) {
        if let Some(slot) = self.slot.take() {
            slot.settle(outcome);
        }
    }
}

impl Drop for TaskCompleter {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.take() {
            slot.settle(Err(WorkerFault::Spawn {
                reason: "job dropped before it ran".to_owned(),
            }));
        }
    }
}

/// Runs `job`, converting a panic into [`WorkerFault::Panicked`].
pub fn run_job(job: Job) -> JobOutcome {
    catch_unwind(AssertUnwindSafe(job)).unwrap_or_else(|payload| {
        Err(WorkerFault::Panicked {
            message: panic_message(payload.as_ref()),
        })
    })
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

/// Runs every job on its own named OS thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSpawner;

impl WorkerPool for ThreadSpawner {
    fn spawn(&self, name: &str, job: Job) -> Result<TaskHandle, WorkerFault> {
        let (handle, completer) = TaskHandle::pending();
        thread::Builder::new()
            .name(name.to_owned())
            .spawn(move || completer.complete(run_job(job)))
            .map_err(|err| WorkerFault::Spawn {
                reason: err.to_string(),
            })?;
        Ok(handle)
    }
}

/// Runs jobs on a dedicated rayon thread pool.
#[derive(Clone)]
pub struct RayonSpawner {
    pool: Arc<rayon::ThreadPool>,
}

impl RayonSpawner {
    /// Builds a pool of `threads` threads named `fanpipe-worker-{i}`.
    pub fn new(threads: usize) -> PipelineResult<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("fanpipe-worker-{i}"))
            .build()
            .map_err(|err| PipelineError::InvalidConfig {
                reason: ConfigReason::ThreadPool {
                    message: err.to_string(),
                },
            })?;
        Ok(Self::from_pool(Arc::new(pool)))
    }

    /// Wraps an existing pool.
    #[must_use]
    pub fn from_pool(pool: Arc<rayon::ThreadPool>) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }
}

impl fmt::Debug for RayonSpawner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RayonSpawner")
            .field("threads", &self.threads())
            .finish()
    }
}

impl WorkerPool for RayonSpawner {
    fn spawn(&self, _name: &str, job: Job) -> Result<TaskHandle, WorkerFault> {
        let (handle, completer) = TaskHandle::pending();
        self.pool.spawn(move || completer.complete(run_job(job)));
        Ok(handle)
    }
}
