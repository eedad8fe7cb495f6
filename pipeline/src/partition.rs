//! Splitting the index range into per-worker chunks.

use crate::error::{PipelineError, PipelineResult};
use crate::types::Chunk;

/// Splits `[0, total_count)` into `worker_count` equal, ascending chunks.
///
/// `worker_count` must be non-zero and divide `total_count` exactly.
pub fn partition(total_count: usize, worker_count: usize) -> PipelineResult<Vec<Chunk>> {
    let chunk_len = chunk_len(total_count, worker_count)?;
    Ok((0..worker_count)
        .map(|worker| Chunk::new(worker * chunk_len, chunk_len))
        .collect())
}

/// Checks the split without building it, returning the chunk length.
pub(crate) fn chunk_len(total_count: usize, worker_count: usize) -> PipelineResult<usize> {
    if worker_count == 0 || total_count % worker_count != 0 {
        return Err(PipelineError::InvalidPartition {
            total_count,
            worker_count,
        });
    }
    Ok(total_count / worker_count)
}
