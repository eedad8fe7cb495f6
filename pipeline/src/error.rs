//! Error types for pipeline operations.

use std::fmt;

use crate::types::Chunk;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors reported by a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PipelineError {
    /// The index range cannot be split evenly across the workers.
    InvalidPartition {
        total_count: usize,
        worker_count: usize,
    },

    /// The configuration is unusable.
    InvalidConfig { reason: ConfigReason },

    /// One or more workers failed. Sorted by worker number.
    WorkerFault { failures: Vec<WorkerFailure> },

    /// The collector received an index outside the result buffer.
    IndexOutOfRange { index: usize, len: usize },

    /// The collector received the same index twice.
    DuplicateIndex { index: usize },

    /// The channel drained with result slots still unwritten.
    Incomplete { missing: usize },

    /// The run was cancelled before every index was produced.
    Cancelled,

    /// The collector thread could not be started or panicked.
    CollectorFailed { message: String },

    /// The task already handed out its result.
    TaskConsumed,
}

/// Why a configuration was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigReason {
    /// `channel_capacity` was `Some(0)`.
    ZeroCapacity,
    /// A worker thread pool could not be built.
    ThreadPool { message: String },
}

/// A failure raised while a worker processed its chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerFault {
    /// The vector source failed at `index`.
    Source { index: usize, reason: String },
    /// The channel was closed while the worker still had items to publish.
    ChannelClosed { index: usize },
    /// The worker panicked.
    Panicked { message: String },
    /// The worker could not be scheduled.
    Spawn { reason: String },
}

/// A worker fault together with the worker and chunk it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerFailure {
    pub worker: usize,
    pub chunk: Chunk,
    pub fault: WorkerFault,
}

/// Failure reported by a [`VectorSource`](crate::VectorSource).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    reason: String,
}

impl SourceError {
    /// Creates a new source error.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// The failure description.
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPartition {
                total_count,
                worker_count,
            } => {
                write!(
                    f,
                    "cannot split {total_count} items evenly across {worker_count} workers"
                )
            }
            Self::InvalidConfig { reason } => write!(f, "invalid config: {reason}"),
            Self::WorkerFault { failures } => match failures.first() {
                Some(first) if failures.len() > 1 => write!(
                    f,
                    "{} workers failed, first: {first}",
                    failures.len()
                ),
                Some(first) => write!(f, "{first}"),
                None => write!(f, "worker fault"),
            },
            Self::IndexOutOfRange { index, len } => {
                write!(f, "index {index} out of range for result buffer of {len}")
            }
            Self::DuplicateIndex { index } => write!(f, "index {index} collected twice"),
            Self::Incomplete { missing } => {
                write!(f, "pipeline drained with {missing} result slots unwritten")
            }
            Self::Cancelled => write!(f, "pipeline cancelled"),
            Self::CollectorFailed { message } => write!(f, "collector failed: {message}"),
            Self::TaskConsumed => write!(f, "pipeline result already taken"),
        }
    }
}

impl fmt::Display for ConfigReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroCapacity => write!(f, "channel capacity must be at least 1"),
            Self::ThreadPool { message } => write!(f, "thread pool: {message}"),
        }
    }
}

impl fmt::Display for WorkerFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source { index, reason } => {
                write!(f, "source failed at index {index}: {reason}")
            }
            Self::ChannelClosed { index } => {
                write!(f, "channel closed before index {index} was published")
            }
            Self::Panicked { message } => write!(f, "panicked: {message}"),
            Self::Spawn { reason } => write!(f, "could not be scheduled: {reason}"),
        }
    }
}

impl fmt::Display for WorkerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "worker {} ({}..{}) {}",
            self.worker,
            self.chunk.start,
            self.chunk.end(),
            self.fault
        )
    }
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

impl std::error::Error for PipelineError {}
impl std::error::Error for WorkerFault {}
impl std::error::Error for SourceError {}
