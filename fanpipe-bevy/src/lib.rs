//! Bevy adapter for fanpipe generation.
//!
//! Add [`poll_generation`] to a schedule and insert a [`GenerationJob`]
//! (or call [`start_generation`]); each schedule run advances the pipeline
//! by one non-blocking step and the settled result lands in
//! [`GenerationOutcome`].

mod job;
mod metrics;
mod outcome;
mod system;

pub use job::GenerationJob;
pub use metrics::{GenerationMetrics, MetricsSink};
pub use outcome::{FinishedGeneration, GenerationOutcome};
pub use system::{poll_generation, spawn_vectors, start_generation, GeneratedVector};
