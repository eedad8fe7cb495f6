use std::time::Duration;

use pipeline::PipelineRun;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GenerationMetrics {
    pub vectors: usize,
    /// Frames the job stayed pending.
    pub frames: u64,
    pub polls: u64,
    pub elapsed: Duration,
}

impl GenerationMetrics {
    #[must_use]
    pub fn from_run(run: &PipelineRun, frames: u64) -> Self {
        Self {
            vectors: run.buffer.len(),
            frames,
            polls: run.metrics.polls,
            elapsed: run.elapsed,
        }
    }
}

pub trait MetricsSink: Send + Sync {
    fn record_generation(&mut self, metrics: GenerationMetrics);
}
