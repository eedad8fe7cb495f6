//! Bounded fan-out/fan-in vector generation.
//!
//! `N` workers each compute a deterministic pseudo-random [`Vec3`] for every
//! index of their [`Chunk`], publish `(index, vector)` pairs through a
//! bounded [`channel::BoundedChannel`], and a single collector writes them
//! into a [`ResultBuffer`] by index. A [`PipelineTask`] drives the run as a
//! polled state machine so a frame-stepped host never blocks its own turn.
//!
//! # Features
//!
//! - Three strategies behind one entry point: channel, rayon parallel-for,
//!   and sequential
//! - Pluggable worker scheduling ([`WorkerPool`]) and vector sources
//!   ([`VectorSource`])
//! - Cooperative cancellation and fixed-rate polling ([`FrameLoop`])
//! - Per-run metrics, including channel high-water mark
//!
//! # Design Principles
//!
//! - **Exactly once** - every index is written once or the run fails.
//! - **Never hangs** - faulted and panicked workers still settle, and the
//!   channel is always closed before the collector is awaited.
//! - **Deterministic** - the vector at an index depends only on the index.
//!
//! # Example
//!
//! ```
//! let run = pipeline::run_pipeline(240, 4).unwrap();
//! assert_eq!(run.buffer.len(), 240);
//! assert_eq!(run.buffer[0], pipeline::vector_at(0));
//! ```

mod cancel;
mod collector;
mod config;
mod driver;
mod error;
mod frame;
mod generate;
mod partition;
mod pool;
mod scratch;
mod strategy;
mod types;
mod worker;

pub use cancel::CancelToken;
pub use collector::{collect, CollectOutcome, CollectStats};
pub use config::PipelineConfig;
pub use driver::{run_pipeline, DriverState, Pipeline, PipelineRun, PipelineTask, RunMetrics};
pub use error::{
    ConfigReason, PipelineError, PipelineResult, SourceError, WorkerFailure, WorkerFault,
};
pub use frame::{FrameLoop, FrameReport};
pub use generate::{vector_at, SeededSource, VectorSource, COMPONENT_RANGE};
pub use partition::partition;
pub use pool::{
    run_job, Job, JobOutcome, RayonSpawner, TaskCompleter, TaskHandle, ThreadSpawner, WorkerPool,
};
pub use scratch::BufferPool;
pub use strategy::Strategy;
pub use types::{Chunk, IndexedVector, ResultBuffer, Vec3};
pub use worker::{run_worker, WorkerReport};

pub use channel::ChannelStats;
