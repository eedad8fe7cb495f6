use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use bevy_ecs::prelude::*;
use fanpipe_bevy::{
    poll_generation, spawn_vectors, start_generation, GeneratedVector, GenerationJob,
    GenerationMetrics, GenerationOutcome, MetricsSink,
};
use pipeline::{vector_at, Pipeline, PipelineConfig, PipelineError, SourceError, Vec3};

fn schedule() -> Schedule {
    let mut schedule = Schedule::default();
    schedule.add_systems(poll_generation);
    schedule
}

fn run_until_settled(world: &mut World, schedule: &mut Schedule) -> u64 {
    let deadline = Instant::now() + Duration::from_secs(10);
    let mut frames = 0;
    while world.resource::<GenerationJob>().is_running() {
        assert!(Instant::now() < deadline, "generation never settled");
        schedule.run(world);
        frames += 1;
        thread::sleep(Duration::from_micros(200));
    }
    frames
}

#[test]
fn schedule_drives_generation_to_completion() {
    let mut world = World::new();
    let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
    start_generation(&mut world, &pipeline);
    let mut schedule = schedule();

    let frames = run_until_settled(&mut world, &mut schedule);
    assert!(frames >= 1);

    let outcome = world.resource::<GenerationOutcome>();
    assert_eq!(outcome.completed(), 1);
    let finished = outcome.last().unwrap();
    let run = finished.result.as_ref().unwrap();
    assert_eq!(run.buffer.len(), 240);
    assert_eq!(run.buffer[0], vector_at(0));
    assert_eq!(finished.frames + 1, frames);
}

#[test]
fn failed_generation_is_recorded() {
    let failing = |index: usize| -> Result<Vec3, SourceError> {
        if index == 3 {
            Err(SourceError::new("broken"))
        } else {
            Ok(vector_at(index))
        }
    };
    let mut world = World::new();
    let pipeline = Pipeline::new(PipelineConfig::for_testing())
        .unwrap()
        .with_source(failing);
    start_generation(&mut world, &pipeline);
    run_until_settled(&mut world, &mut schedule());

    let finished = world.resource_mut::<GenerationOutcome>().take().unwrap();
    assert!(matches!(
        finished.result,
        Err(PipelineError::WorkerFault { .. })
    ));
}

#[test]
fn idle_job_is_a_noop() {
    let mut world = World::new();
    world.init_resource::<GenerationJob>();
    world.init_resource::<GenerationOutcome>();
    schedule().run(&mut world);
    assert_eq!(world.resource::<GenerationOutcome>().completed(), 0);
}

#[test]
fn restarting_replaces_the_job() {
    let mut world = World::new();
    let pipeline = Pipeline::new(PipelineConfig::for_testing()).unwrap();
    let mut schedule = schedule();

    start_generation(&mut world, &pipeline);
    run_until_settled(&mut world, &mut schedule);
    start_generation(&mut world, &pipeline);
    run_until_settled(&mut world, &mut schedule);

    assert_eq!(world.resource::<GenerationOutcome>().completed(), 2);
}

#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Vec<GenerationMetrics>>>);

impl MetricsSink for Recorder {
    fn record_generation(&mut self, metrics: GenerationMetrics) {
        self.0.lock().unwrap().push(metrics);
    }
}

#[test]
fn metrics_sink_sees_successful_runs() {
    let recorder = Recorder::default();
    let pipeline = Pipeline::new(PipelineConfig::for_testing()).unwrap();
    let mut job = GenerationJob::start(&pipeline);
    job.set_metrics_sink(Box::new(recorder.clone()));

    let mut world = World::new();
    world.insert_resource(job);
    world.init_resource::<GenerationOutcome>();
    run_until_settled(&mut world, &mut schedule());

    let recorded = recorder.0.lock().unwrap();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].vectors, 64);
}

#[test]
fn vectors_spawn_as_entities() {
    let mut world = World::new();
    let run = pipeline::run_pipeline(12, 3).unwrap();
    let entities = spawn_vectors(&mut world, &run.buffer);
    assert_eq!(entities.len(), 12);

    let spawned = world.get::<GeneratedVector>(entities[7]).unwrap();
    assert_eq!(spawned.index, 7);
    assert_eq!(spawned.vector, vector_at(7));
}
