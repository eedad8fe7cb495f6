use bevy_ecs::prelude::Resource;
use pipeline::{PipelineResult, PipelineRun};

/// A settled generation run.
#[derive(Debug)]
pub struct FinishedGeneration {
    pub result: PipelineResult<PipelineRun>,
    /// Frames the job stayed pending before it settled.
    pub frames: u64,
}

/// The most recent settled run.
#[derive(Resource, Debug, Default)]
pub struct GenerationOutcome {
    last: Option<FinishedGeneration>,
    completed: u64,
}

impl GenerationOutcome {
    #[must_use]
    pub const fn last(&self) -> Option<&FinishedGeneration> {
        self.last.as_ref()
    }

    pub fn take(&mut self) -> Option<FinishedGeneration> {
        self.last.take()
    }

    /// Runs settled since the resource was created.
    #[must_use]
    pub const fn completed(&self) -> u64 {
        self.completed
    }

    pub(crate) fn record(&mut self, finished: FinishedGeneration) {
        self.completed += 1;
        self.last = Some(finished);
    }
}
