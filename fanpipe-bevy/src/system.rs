use bevy_ecs::prelude::{Component, Entity, ResMut, World};
use pipeline::{Pipeline, ResultBuffer, Vec3};
use tracing::{info, warn};

use crate::job::GenerationJob;
use crate::outcome::GenerationOutcome;

/// One generated vector, spawned as its own entity.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct GeneratedVector {
    pub index: usize,
    pub vector: Vec3,
}

/// Polls the [`GenerationJob`] once and records a settled run in
/// [`GenerationOutcome`]. Never blocks the frame.
pub fn poll_generation(mut job: ResMut<GenerationJob>, mut outcome: ResMut<GenerationOutcome>) {
    let Some(finished) = job.poll() else {
        return;
    };
    match &finished.result {
        Ok(run) => info!(
            vectors = run.buffer.len(),
            frames = finished.frames,
            "generation finished"
        ),
        Err(err) => warn!(%err, frames = finished.frames, "generation failed"),
    }
    outcome.record(finished);
}

/// Inserts a fresh [`GenerationJob`] for `pipeline`, creating the
/// [`GenerationOutcome`] resource if needed.
pub fn start_generation(world: &mut World, pipeline: &Pipeline) {
    world.init_resource::<GenerationOutcome>();
    match world.get_resource_mut::<GenerationJob>() {
        Some(mut job) => job.replace(pipeline.start()),
        None => world.insert_resource(GenerationJob::start(pipeline)),
    }
}

/// Spawns one [`GeneratedVector`] entity per slot of `buffer`, in index order.
pub fn spawn_vectors(world: &mut World, buffer: &ResultBuffer) -> Vec<Entity> {
    buffer
        .iter()
        .enumerate()
        .map(|(index, vector)| {
            world
                .spawn(GeneratedVector {
                    index,
                    vector: *vector,
                })
                .id()
        })
        .collect()
}
