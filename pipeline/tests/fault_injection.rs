use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use pipeline::{
    run_job, vector_at, Chunk, Job, Pipeline, PipelineConfig, PipelineError, SourceError,
    Strategy, TaskHandle, ThreadSpawner, Vec3, WorkerFault, WorkerPool,
};

fn config(total_count: usize, worker_count: usize) -> PipelineConfig {
    PipelineConfig {
        poll_interval: Duration::from_micros(100),
        ..PipelineConfig::new(total_count, worker_count)
    }
}

fn failing_at(bad: usize) -> impl Fn(usize) -> Result<Vec3, SourceError> + Send + Sync {
    move |index| {
        if index == bad {
            Err(SourceError::new("sensor offline"))
        } else {
            Ok(vector_at(index))
        }
    }
}

fn worker_failures(err: PipelineError) -> Vec<pipeline::WorkerFailure> {
    match err {
        PipelineError::WorkerFault { failures } => failures,
        other => panic!("expected worker fault, got {other:?}"),
    }
}

#[test]
fn source_fault_fails_the_run() {
    let err = Pipeline::new(config(100, 4))
        .unwrap()
        .with_source(failing_at(60))
        .run()
        .unwrap_err();
    let failures = worker_failures(err);
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].worker, 2);
    assert_eq!(failures[0].chunk, Chunk::new(50, 25));
    assert_eq!(
        failures[0].fault,
        WorkerFault::Source {
            index: 60,
            reason: "sensor offline".into(),
        }
    );
}

#[test]
fn source_fault_under_backpressure_does_not_hang() {
    let config = PipelineConfig {
        channel_capacity: Some(1),
        ..config(400, 4)
    };
    let err = Pipeline::new(config)
        .unwrap()
        .with_source(failing_at(5))
        .run()
        .unwrap_err();
    assert_eq!(worker_failures(err)[0].worker, 0);
}

#[test]
fn panicking_worker_is_contained() {
    let source = |index: usize| -> Result<Vec3, SourceError> {
        assert!(index != 33, "bad vector");
        Ok(vector_at(index))
    };
    let err = Pipeline::new(config(40, 4))
        .unwrap()
        .with_source(source)
        .run()
        .unwrap_err();
    let failures = worker_failures(err);
    assert_eq!(failures[0].worker, 3);
    assert!(matches!(failures[0].fault, WorkerFault::Panicked { .. }));
}

#[test]
fn faults_in_every_strategy() {
    for strategy in Strategy::ALL {
        let config = PipelineConfig {
            strategy,
            ..config(80, 4)
        };
        let err = Pipeline::new(config)
            .unwrap()
            .with_source(failing_at(79))
            .run()
            .unwrap_err();
        assert!(
            matches!(err, PipelineError::WorkerFault { .. }),
            "{strategy}: {err:?}"
        );
    }
}

#[test]
fn failures_are_sorted_by_worker() {
    let source = |index: usize| -> Result<Vec3, SourceError> {
        if index % 10 == 9 {
            Err(SourceError::new("every tenth"))
        } else {
            Ok(vector_at(index))
        }
    };
    let err = Pipeline::new(config(40, 4))
        .unwrap()
        .with_source(source)
        .run()
        .unwrap_err();
    let workers: Vec<_> = worker_failures(err).iter().map(|f| f.worker).collect();
    assert_eq!(workers, vec![0, 1, 2, 3]);
}

/// Refuses to schedule one particular worker.
struct RefusingPool {
    refuse: String,
}

impl WorkerPool for RefusingPool {
    fn spawn(&self, name: &str, job: Job) -> Result<TaskHandle, WorkerFault> {
        if name == self.refuse {
            return Err(WorkerFault::Spawn {
                reason: "no capacity".into(),
            });
        }
        ThreadSpawner.spawn(name, job)
    }
}

#[test]
fn unscheduled_worker_is_a_fault() {
    let pipeline = Pipeline::new(config(40, 4))
        .unwrap()
        .with_spawner(RefusingPool {
            refuse: "fanpipe-worker-1".into(),
        });
    let failures = worker_failures(pipeline.run().unwrap_err());
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].worker, 1);
    assert!(matches!(failures[0].fault, WorkerFault::Spawn { .. }));
}

/// Accepts jobs and throws them away.
struct LosingPool;

impl WorkerPool for LosingPool {
    fn spawn(&self, _name: &str, job: Job) -> Result<TaskHandle, WorkerFault> {
        let (handle, completer) = TaskHandle::pending();
        drop(job);
        drop(completer);
        Ok(handle)
    }
}

#[test]
fn lost_jobs_settle_instead_of_hanging() {
    let pipeline = Pipeline::new(config(40, 4)).unwrap().with_spawner(LosingPool);
    let failures = worker_failures(pipeline.run().unwrap_err());
    assert_eq!(failures.len(), 4);
}

/// Runs jobs inline on the driver's thread and counts them.
#[derive(Default)]
struct InlinePool {
    jobs: Arc<AtomicUsize>,
}

impl WorkerPool for InlinePool {
    fn spawn(&self, _name: &str, job: Job) -> Result<TaskHandle, WorkerFault> {
        self.jobs.fetch_add(1, Ordering::Relaxed);
        let (handle, completer) = TaskHandle::pending();
        completer.complete(run_job(job));
        Ok(handle)
    }
}

#[test]
fn inline_pool_works_with_roomy_channel() {
    let jobs = Arc::new(AtomicUsize::new(0));
    let pipeline = Pipeline::new(config(120, 3))
        .unwrap()
        .with_spawner(InlinePool {
            jobs: Arc::clone(&jobs),
        });
    let run = pipeline.run().unwrap();
    assert_eq!(run.buffer.len(), 120);
    assert_eq!(jobs.load(Ordering::Relaxed), 3);
}
