//! Producing the vectors of one chunk.

use std::time::{Duration, Instant};

use channel::BoundedChannel;
use tracing::debug;

use crate::cancel::CancelToken;
use crate::error::WorkerFault;
use crate::generate::VectorSource;
use crate::types::{Chunk, IndexedVector};

/// What a worker did during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WorkerReport {
    pub worker: usize,
    pub chunk: Chunk,
    /// Items published before the worker stopped.
    pub produced: usize,
    pub elapsed: Duration,
    /// Executing thread, recorded with the `worker-diagnostics` feature.
    pub thread: Option<String>,
}

/// Publishes one [`IndexedVector`] per index of `chunk`, in ascending order.
///
/// Blocks while the channel is full. Stops early, without error, when
/// `cancel` is set.
pub fn run_worker(
    worker: usize,
    chunk: Chunk,
    source: &dyn VectorSource,
    channel: &BoundedChannel<IndexedVector>,
    cancel: &CancelToken,
) -> Result<WorkerReport, WorkerFault> {
    let start = Instant::now();
    let mut produced = 0;
    for index in chunk.range() {
        if cancel.is_cancelled() {
            debug!(worker, index, "worker observed cancellation");
            break;
        }
        let vector = source
            .vector_at(index)
            .map_err(|err| WorkerFault::Source {
                index,
                reason: err.to_string(),
            })?;
        channel
            .push(IndexedVector { index, vector })
            .map_err(|_| WorkerFault::ChannelClosed { index })?;
        produced += 1;
    }
    Ok(WorkerReport {
        worker,
        chunk,
        produced,
        elapsed: start.elapsed(),
        thread: thread_label(),
    })
}

#[cfg(feature = "worker-diagnostics")]
pub(crate) fn thread_label() -> Option<String> {
    let current = std::thread::current();
    Some(
        current
            .name()
            .map_or_else(|| format!("{:?}", current.id()), str::to_owned),
    )
}

#[cfg(not(feature = "worker-diagnostics"))]
pub(crate) const fn thread_label() -> Option<String> {
    None
}
