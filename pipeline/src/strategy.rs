//! Alternative generation strategies sharing the pipeline's entry point.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Instant;

use rayon::prelude::*;

use crate::cancel::CancelToken;
use crate::error::{WorkerFailure, WorkerFault};
use crate::generate::VectorSource;
use crate::pool::{panic_message, JobOutcome};
use crate::types::{Chunk, Vec3};
use crate::worker::{thread_label, WorkerReport};

/// How a run produces its vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "kebab-case")
)]
pub enum Strategy {
    /// Workers publish through the bounded channel to a single collector.
    #[default]
    Channel,
    /// Workers write disjoint chunks of the buffer directly, on rayon.
    ParallelFor,
    /// One job computes the whole range.
    Sequential,
}

impl Strategy {
    pub const ALL: [Self; 3] = [Self::Channel, Self::ParallelFor, Self::Sequential];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Channel => "channel",
            Self::ParallelFor => "parallel-for",
            Self::Sequential => "sequential",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a direct-write strategy.
#[derive(Debug)]
pub(crate) struct FillOutcome {
    pub buffer: Vec<Vec3>,
    pub reports: Vec<WorkerReport>,
    pub failures: Vec<WorkerFailure>,
}

impl FillOutcome {
    fn new(buffer: Vec<Vec3>) -> Self {
        Self {
            buffer,
            reports: Vec::new(),
            failures: Vec::new(),
        }
    }

    fn record(&mut self, worker: usize, chunk: Chunk, outcome: JobOutcome) {
        match outcome {
            Ok(report) => self.reports.push(report),
            Err(fault) => self.failures.push(WorkerFailure {
                worker,
                chunk,
                fault,
            }),
        }
    }
}

/// Writes the vectors of `chunk` into `out`, where `out[0]` is `chunk.start`.
fn fill_chunk(
    worker: usize,
    chunk: Chunk,
    source: &dyn VectorSource,
    out: &mut [Vec3],
    cancel: &CancelToken,
) -> JobOutcome {
    let start = Instant::now();
    let mut produced = 0;
    for (index, slot) in chunk.range().zip(out.iter_mut()) {
        if cancel.is_cancelled() {
            break;
        }
        *slot = source
            .vector_at(index)
            .map_err(|err| WorkerFault::Source {
                index,
                reason: err.to_string(),
            })?;
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

fn fill_guarded(
    worker: usize,
    chunk: Chunk,
    source: &dyn VectorSource,
    out: &mut [Vec3],
    cancel: &CancelToken,
) -> JobOutcome {
    catch_unwind(AssertUnwindSafe(|| {
        fill_chunk(worker, chunk, source, out, cancel)
    }))
    .unwrap_or_else(|payload| {
        Err(WorkerFault::Panicked {
            message: panic_message(payload.as_ref()),
        })
    })
}

/// Fills the whole buffer on the calling thread.
pub(crate) fn fill_sequential(
    source: &dyn VectorSource,
    mut buffer: Vec<Vec3>,
    cancel: &CancelToken,
) -> FillOutcome {
    let chunk = Chunk::new(0, buffer.len());
    let outcome = fill_guarded(0, chunk, source, &mut buffer, cancel);
    let mut fill = FillOutcome::new(buffer);
    fill.record(0, chunk, outcome);
    fill
}

/// Fills `worker_count` equal chunks of the buffer in parallel.
///
/// `buffer.len()` must be a multiple of `worker_count`.
pub(crate) fn fill_parallel_for(
    source: &dyn VectorSource,
    mut buffer: Vec<Vec3>,
    worker_count: usize,
    cancel: &CancelToken,
) -> FillOutcome {
    if buffer.is_empty() || worker_count == 0 {
        return FillOutcome::new(buffer);
    }
    let chunk_len = buffer.len() / worker_count;
    let results: Vec<(usize, Chunk, JobOutcome)> = buffer
        .par_chunks_mut(chunk_len)
        .enumerate()
        .map(|(worker, out)| {
            let chunk = Chunk::new(worker * chunk_len, out.len());
            (worker, chunk, fill_guarded(worker, chunk, source, out, cancel))
        })
        .collect();

    let mut fill = FillOutcome::new(buffer);
    for (worker, chunk, outcome) in results {
        fill.record(worker, chunk, outcome);
    }
    fill
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceError;
    use crate::generate::{vector_at, SeededSource};

    fn expected(len: usize) -> Vec<Vec3> {
        (0..len).map(vector_at).collect()
    }

    #[test]
    fn strategy_names() {
        assert_eq!(Strategy::default(), Strategy::Channel);
        assert_eq!(Strategy::ParallelFor.to_string(), "parallel-for");
        assert_eq!(Strategy::ALL.len(), 3);
    }

    #[test]
    fn sequential_fills_everything() {
        let fill = fill_sequential(&SeededSource, vec![Vec3::ZERO; 40], &CancelToken::new());
        assert!(fill.failures.is_empty());
        assert_eq!(fill.reports.len(), 1);
        assert_eq!(fill.reports[0].produced, 40);
        assert_eq!(fill.buffer, expected(40));
    }

    #[test]
    fn parallel_for_matches_sequential() {
        let fill = fill_parallel_for(&SeededSource, vec![Vec3::ZERO; 120], 4, &CancelToken::new());
        assert!(fill.failures.is_empty());
        assert_eq!(fill.reports.len(), 4);
        assert_eq!(fill.reports[3].chunk, Chunk::new(90, 30));
        assert_eq!(fill.buffer, expected(120));
    }

    #[test]
    fn parallel_for_attributes_faults() {
        let source = |index: usize| -> Result<Vec3, SourceError> {
            if index == 35 {
                Err(SourceError::new("boom"))
            } else {
                Ok(vector_at(index))
            }
        };
        let fill = fill_parallel_for(&source, vec![Vec3::ZERO; 40], 4, &CancelToken::new());
        assert_eq!(fill.reports.len(), 3);
        assert_eq!(fill.failures.len(), 1);
        assert_eq!(fill.failures[0].worker, 3);
        assert_eq!(fill.failures[0].chunk, Chunk::new(30, 10));
    }

    #[test]
    fn parallel_for_contains_panics() {
        let source = |index: usize| -> Result<Vec3, SourceError> {
            assert!(index != 5, "index five");
            Ok(Vec3::ZERO)
        };
        let fill = fill_parallel_for(&source, vec![Vec3::ZERO; 20], 2, &CancelToken::new());
        assert_eq!(fill.failures.len(), 1);
        assert!(matches!(
            fill.failures[0].fault,
            WorkerFault::Panicked { .. }
        ));
    }

    #[test]
    fn cancelled_fill_produces_nothing() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let fill = fill_sequential(&SeededSource, vec![Vec3::ZERO; 8], &cancel);
        assert_eq!(fill.reports[0].produced, 0);
    }

    #[test]
    fn empty_parallel_for_is_noop() {
        let fill = fill_parallel_for(&SeededSource, Vec::new(), 4, &CancelToken::new());
        assert!(fill.reports.is_empty());
        assert!(fill.failures.is_empty());
    }
}
