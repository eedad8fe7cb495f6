use std::fmt;
use std::task::Poll;

use bevy_ecs::prelude::Resource;
use pipeline::{DriverState, Pipeline, PipelineTask};
use tracing::debug;

use crate::metrics::{GenerationMetrics, MetricsSink};
use crate::outcome::FinishedGeneration;

/// The in-flight generation task, polled once per frame by
/// [`poll_generation`](crate::poll_generation).
#[derive(Resource, Default)]
pub struct GenerationJob {
    task: Option<PipelineTask>,
    frames: u64,
    metrics: Option<Box<dyn MetricsSink>>,
}

impl GenerationJob {
    #[must_use]
    pub fn new(task: PipelineTask) -> Self {
        Self {
            task: Some(task),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn start(pipeline: &Pipeline) -> Self {
        Self::new(pipeline.start())
    }

    /// Replaces the current task. An unfinished previous task is cancelled.
    pub fn replace(&mut self, task: PipelineTask) {
        if self.task.is_some() {
            debug!("replacing unfinished generation task");
        }
        self.task = Some(task);
        self.frames = 0;
    }

    pub fn set_metrics_sink(&mut self, sink: Box<dyn MetricsSink>) {
        self.metrics = Some(sink);
    }

    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.task.is_some()
    }

    /// Frames the current task has stayed pending.
    #[must_use]
    pub const fn frames(&self) -> u64 {
        self.frames
    }

    #[must_use]
    pub fn state(&self) -> Option<DriverState> {
        self.task.as_ref().map(PipelineTask::state)
    }

    pub fn cancel(&self) {
        if let Some(task) = &self.task {
            task.cancel();
        }
    }

    /// Advances the task by one step. Returns the result once it settles.
    pub(crate) fn poll(&mut self) -> Option<FinishedGeneration> {
        let task = self.task.as_mut()?;
        match task.advance() {
            Poll::Pending => {
                self.frames += 1;
                None
            }
            Poll::Ready(result) => {
                self.task = None;
                let frames = std::mem::take(&mut self.frames);
                if let (Ok(run), Some(sink)) = (&result, self.metrics.as_mut()) {
                    sink.record_generation(GenerationMetrics::from_run(run, frames));
                }
                Some(FinishedGeneration { result, frames })
            }
        }
    }
}

impl fmt::Debug for GenerationJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationJob")
            .field("task", &self.task)
            .field("frames", &self.frames)
            .field("has_metrics_sink", &self.metrics.is_some())
            .finish()
    }
}
