//! The cooperatively polled pipeline driver.
//!
//! A [`PipelineTask`] moves through
//! `Idle -> WorkersRunning -> AllWorkersDone -> CollectorDraining -> Complete`.
//! Each call to [`PipelineTask::advance`] goes as far as it can without
//! blocking and reports `Poll::Pending` at the two suspension points: waiting
//! for every worker to settle, and waiting for the collector to drain.

use std::fmt;
use std::future::Future;
use std::mem;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use channel::{BoundedChannel, ChannelStats};
use tracing::{debug, info, warn};

use crate::cancel::CancelToken;
use crate::collector::{collect, CollectOutcome, CollectStats};
use crate::config::PipelineConfig;
use crate::error::{ConfigReason, PipelineError, PipelineResult, WorkerFailure, WorkerFault};
use crate::generate::{SeededSource, VectorSource};
use crate::partition::partition;
use crate::pool::{panic_message, Job, TaskHandle, ThreadSpawner, WorkerPool};
use crate::scratch::BufferPool;
use crate::strategy::{fill_parallel_for, fill_sequential, FillOutcome, Strategy};
use crate::types::{Chunk, IndexedVector, ResultBuffer, Vec3};
use crate::worker::{run_worker, WorkerReport};

/// Progress of a [`PipelineTask`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverState {
    /// Nothing launched yet.
    Idle,
    /// Workers scheduled; waiting for all of them to settle.
    WorkersRunning,
    /// Every worker settled; the channel is being closed.
    AllWorkersDone,
    /// Waiting for the collector to drain the closed channel.
    CollectorDraining,
    /// Result produced. No worker or collector is running.
    Complete,
}

/// Read-only instrumentation for a finished run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RunMetrics {
    pub strategy: Strategy,
    pub total_count: usize,
    pub worker_count: usize,
    /// Channel traffic; `None` for strategies without a channel.
    pub channel: Option<ChannelStats>,
    pub collected: Option<CollectStats>,
    /// Number of times the task was polled.
    pub polls: u64,
    /// Bytes reserved for working buffers, the result copy and the channel.
    pub reserved_bytes: usize,
    /// Per-worker reports, sorted by worker.
    pub workers: Vec<WorkerReport>,
}

/// A successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineRun {
    pub buffer: ResultBuffer,
    /// Wall-clock time from launch to completion.
    pub elapsed: Duration,
    pub metrics: RunMetrics,
}

/// Generates vectors with the configured strategy.
///
/// A `Pipeline` is reusable: every [`start`](Self::start) creates an
/// independent task, and working buffers are pooled across runs.
pub struct Pipeline {
    config: PipelineConfig,
    spawner: Arc<dyn WorkerPool>,
    source: Arc<dyn VectorSource>,
    buffers: Arc<BufferPool>,
}

impl Pipeline {
    /// Creates a pipeline with OS-thread workers and the seeded source.
    pub fn new(config: PipelineConfig) -> PipelineResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            spawner: Arc::new(ThreadSpawner),
            source: Arc::new(SeededSource),
            buffers: Arc::new(BufferPool::default()),
        })
    }

    #[must_use]
    pub fn with_spawner(self, spawner: impl WorkerPool + 'static) -> Self {
        self.with_shared_spawner(Arc::new(spawner))
    }

    #[must_use]
    pub fn with_shared_spawner(mut self, spawner: Arc<dyn WorkerPool>) -> Self {
        self.spawner = spawner;
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: impl VectorSource + 'static) -> Self {
        self.source = Arc::new(source);
        self
    }

    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Working buffers retained between runs.
    #[must_use]
    pub fn buffers(&self) -> &BufferPool {
        &self.buffers
    }

    /// Creates an idle task. Work is launched on its first poll.
    #[must_use]
    pub fn start(&self) -> PipelineTask {
        PipelineTask::new(
            self.config.clone(),
            Arc::clone(&self.source),
            Arc::clone(&self.spawner),
            Arc::clone(&self.buffers),
        )
    }

    /// Runs to completion, sleeping `poll_interval` between polls.
    pub fn run(&self) -> PipelineResult<PipelineRun> {
        self.start().wait()
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Generates `total_count` vectors across `worker_count` workers through the
/// bounded channel, blocking the calling thread until done.
pub fn run_pipeline(total_count: usize, worker_count: usize) -> PipelineResult<PipelineRun> {
    Pipeline::new(PipelineConfig::new(total_count, worker_count))?.run()
}

struct WorkerSlot {
    worker: usize,
    chunk: Chunk,
    handle: TaskHandle,
    settled: bool,
}

/// One pipeline run, driven by polling.
///
/// Dropping an unfinished task cancels it and closes its channel so every
/// thread it started winds down on its own.
pub struct PipelineTask {
    config: PipelineConfig,
    source: Arc<dyn VectorSource>,
    spawner: Arc<dyn WorkerPool>,
    buffers: Arc<BufferPool>,
    cancel: CancelToken,
    state: DriverState,
    started: Option<Instant>,
    polls: u64,
    channel: Option<Arc<BoundedChannel<IndexedVector>>>,
    workers: Vec<WorkerSlot>,
    collector: Option<JoinHandle<CollectOutcome>>,
    direct: Option<JoinHandle<FillOutcome>>,
    working: Option<Vec<Vec3>>,
    collected: Option<CollectStats>,
    collector_fault: Option<PipelineError>,
    failures: Vec<WorkerFailure>,
    reports: Vec<WorkerReport>,
    outcome: Option<PipelineResult<PipelineRun>>,
}

impl PipelineTask {
    fn new(
        config: PipelineConfig,
        source: Arc<dyn VectorSource>,
        spawner: Arc<dyn WorkerPool>,
        buffers: Arc<BufferPool>,
    ) -> Self {
        Self {
            config,
            source,
            spawner,
            buffers,
            cancel: CancelToken::new(),
            state: DriverState::Idle,
            started: None,
            polls: 0,
            channel: None,
            workers: Vec::new(),
            collector: None,
            direct: None,
            working: None,
            collected: None,
            collector_fault: None,
            failures: Vec::new(),
            reports: Vec::new(),
            outcome: None,
        }
    }

    #[must_use]
    pub const fn state(&self) -> DriverState {
        self.state
    }

    #[must_use]
    pub const fn polls(&self) -> u64 {
        self.polls
    }

    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Asks the workers to stop. The run then settles with
    /// [`PipelineError::Cancelled`] unless every index was already produced.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// A token that cancels this task from elsewhere.
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Advances the run as far as possible without blocking.
    ///
    /// Returns the result exactly once; polling again afterwards yields
    /// [`PipelineError::TaskConsumed`].
    pub fn advance(&mut self) -> Poll<PipelineResult<PipelineRun>> {
        self.polls += 1;
        loop {
            match self.state {
                DriverState::Idle => self.launch(),
                DriverState::WorkersRunning => {
                    if !self.workers_settled() {
                        return Poll::Pending;
                    }
                    self.transition(DriverState::AllWorkersDone);
                }
                DriverState::AllWorkersDone => {
                    if let Some(channel) = &self.channel {
                        channel.close();
                    }
                    self.transition(DriverState::CollectorDraining);
                }
                DriverState::CollectorDraining => {
                    if !self.collector_drained() {
                        return Poll::Pending;
                    }
                    self.complete();
                }
                DriverState::Complete => {
                    return Poll::Ready(
                        self.outcome
                            .take()
                            .unwrap_or(Err(PipelineError::TaskConsumed)),
                    );
                }
            }
        }
    }

    /// Polls until complete, sleeping `poll_interval` between polls.
    pub fn wait(mut self) -> PipelineResult<PipelineRun> {
        loop {
            if let Poll::Ready(result) = self.advance() {
                return result;
            }
            thread::sleep(self.config.poll_interval);
        }
    }

    fn transition(&mut self, next: DriverState) {
        debug!(from = ?self.state, to = ?next, "driver transition");
        self.state = next;
    }

    fn fail(&mut self, err: PipelineError) {
        warn!(%err, "pipeline failed to launch");
        self.outcome = Some(Err(err));
        self.transition(DriverState::Complete);
    }

    fn launch(&mut self) {
        self.started = Some(Instant::now());
        if self.config.total_count == 0 {
            self.working = Some(Vec::new());
            self.transition(DriverState::WorkersRunning);
            return;
        }
        let launched = match self.config.strategy {
            Strategy::Channel => self.launch_channel(),
            Strategy::ParallelFor | Strategy::Sequential => self.launch_direct(),
        };
        match launched {
            Ok(()) => self.transition(DriverState::WorkersRunning),
            Err(err) => self.fail(err),
        }
    }

    fn launch_channel(&mut self) -> PipelineResult<()> {
        let chunks = partition(self.config.total_count, self.config.worker_count)?;
        let channel = BoundedChannel::with_capacity(self.config.effective_capacity()).map_err(
            |_| PipelineError::InvalidConfig {
                reason: ConfigReason::ZeroCapacity,
            },
        )?;
        let channel = Arc::new(channel);

        // The collector starts first so producers always have a consumer.
        let buffer = self.buffers.rent(self.config.total_count);
        let drain_from = Arc::clone(&channel);
        let collector = thread::Builder::new()
            .name("fanpipe-collector".to_owned())
            .spawn(move || collect(&drain_from, buffer))
            .map_err(|err| PipelineError::CollectorFailed {
                message: err.to_string(),
            })?;
        self.collector = Some(collector);

        for (worker, chunk) in chunks.into_iter().enumerate() {
            let job: Job = {
                let channel = Arc::clone(&channel);
                let source = Arc::clone(&self.source);
                let cancel = self.cancel.clone();
                Box::new(move || run_worker(worker, chunk, &*source, &channel, &cancel))
            };
            match self.spawner.spawn(&format!("fanpipe-worker-{worker}"), job) {
                Ok(handle) => self.workers.push(WorkerSlot {
                    worker,
                    chunk,
                    handle,
                    settled: false,
                }),
                Err(fault) => {
                    warn!(worker, %fault, "worker could not be scheduled");
                    self.failures.push(WorkerFailure {
                        worker,
                        chunk,
                        fault,
                    });
                }
            }
        }
        debug!(
            workers = self.workers.len(),
            capacity = channel.capacity(),
            "channel workers launched"
        );
        self.channel = Some(channel);
        Ok(())
    }

    fn launch_direct(&mut self) -> PipelineResult<()> {
        let total_count = self.config.total_count;
        let worker_count = self.config.worker_count;
        let strategy = self.config.strategy;
        let buffer = self.buffers.rent(total_count);
        let source = Arc::clone(&self.source);
        let cancel = self.cancel.clone();
        let direct = thread::Builder::new()
            .name(format!("fanpipe-{strategy}"))
            .spawn(move || match strategy {
                Strategy::ParallelFor => fill_parallel_for(&*source, buffer, worker_count, &cancel),
                Strategy::Channel | Strategy::Sequential => {
                    fill_sequential(&*source, buffer, &cancel)
                }
            })
            .map_err(|err| PipelineError::WorkerFault {
                failures: vec![WorkerFailure {
                    worker: 0,
                    chunk: Chunk::new(0, total_count),
                    fault: WorkerFault::Spawn {
                        reason: err.to_string(),
                    },
                }],
            })?;
        debug!(%strategy, "direct strategy launched");
        self.direct = Some(direct);
        Ok(())
    }

    fn workers_settled(&mut self) -> bool {
        if self.direct.as_ref().is_some_and(|direct| !direct.is_finished()) {
            return false;
        }
        if let Some(direct) = self.direct.take() {
            match direct.join() {
                Ok(fill) => {
                    self.working = Some(fill.buffer);
                    self.reports.extend(fill.reports);
                    self.failures.extend(fill.failures);
                }
                Err(payload) => self.failures.push(WorkerFailure {
                    worker: 0,
                    chunk: Chunk::new(0, self.config.total_count),
                    fault: WorkerFault::Panicked {
                        message: panic_message(payload.as_ref()),
                    },
                }),
            }
        }

        for slot in &mut self.workers {
            if slot.settled || !slot.handle.is_finished() {
                continue;
            }
            match slot.handle.take_outcome() {
                Some(Ok(report)) => self.reports.push(report),
                Some(Err(fault)) => {
                    warn!(worker = slot.worker, %fault, "worker faulted");
                    self.failures.push(WorkerFailure {
                        worker: slot.worker,
                        chunk: slot.chunk,
                        fault,
                    });
                }
                None => {}
            }
            slot.settled = true;
        }
        self.workers.iter().all(|slot| slot.settled)
    }

    fn collector_drained(&mut self) -> bool {
        if self
            .collector
            .as_ref()
            .is_some_and(|collector| !collector.is_finished())
        {
            return false;
        }
        if let Some(collector) = self.collector.take() {
            match collector.join() {
                Ok(outcome) => {
                    self.working = Some(outcome.buffer);
                    self.collected = Some(outcome.stats);
                    self.collector_fault = outcome.fault;
                }
                Err(payload) => {
                    self.collector_fault = Some(PipelineError::CollectorFailed {
                        message: panic_message(payload.as_ref()),
                    });
                }
            }
        }
        true
    }

    fn settled_error(&mut self) -> Option<PipelineError> {
        if !self.failures.is_empty() {
            self.failures.sort_by_key(|failure| failure.worker);
            return Some(PipelineError::WorkerFault {
                failures: mem::take(&mut self.failures),
            });
        }
        let produced: usize = self.reports.iter().map(|report| report.produced).sum();
        if self.cancel.is_cancelled() && produced < self.config.total_count {
            return Some(PipelineError::Cancelled);
        }
        self.collector_fault.take()
    }

    fn reserved_bytes(&self) -> usize {
        let vectors = self.config.total_count * mem::size_of::<Vec3>() * 2;
        let queued = self.channel.as_ref().map_or(0, |channel| {
            channel.capacity() * mem::size_of::<IndexedVector>()
        });
        vectors + queued
    }

    fn complete(&mut self) {
        let elapsed = self.started.map_or(Duration::ZERO, |started| started.elapsed());
        let working = self.working.take();
        let result = match self.settled_error() {
            Some(err) => {
                warn!(%err, strategy = %self.config.strategy, "pipeline failed");
                Err(err)
            }
            None => {
                let buffer = working
                    .as_deref()
                    .map_or_else(ResultBuffer::default, ResultBuffer::copy_from_slice);
                self.reports.sort_by_key(|report| report.worker);
                let metrics = RunMetrics {
                    strategy: self.config.strategy,
                    total_count: self.config.total_count,
                    worker_count: self.config.worker_count,
                    channel: self.channel.as_ref().map(|channel| channel.stats()),
                    collected: self.collected,
                    polls: self.polls,
                    reserved_bytes: self.reserved_bytes(),
                    workers: mem::take(&mut self.reports),
                };
                info!(
                    strategy = %metrics.strategy,
                    total = metrics.total_count,
                    workers = metrics.worker_count,
                    elapsed_us = saturating_micros(elapsed),
                    polls = metrics.polls,
                    "pipeline complete"
                );
                Ok(PipelineRun {
                    buffer,
                    elapsed,
                    metrics,
                })
            }
        };
        if let Some(working) = working {
            self.buffers.give_back(working);
        }
        self.outcome = Some(result);
        self.transition(DriverState::Complete);
    }
}

fn saturating_micros(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX)
}

/// Polling as a future.
///
/// Workers and the collector never signal the waker, so a pending task
/// re-wakes itself on every poll. On an async executor this polls in a
/// tight loop and keeps one executor thread busy until the run settles.
/// Hosts that care about CPU should poll once per frame with
/// [`PipelineTask::advance`] or [`FrameLoop`](crate::FrameLoop) instead.
impl Future for PipelineTask {
    type Output = PipelineResult<PipelineRun>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let poll = self.get_mut().advance();
        if poll.is_pending() {
            cx.waker().wake_by_ref();
        }
        poll
    }
}

impl Drop for PipelineTask {
    fn drop(&mut self) {
        if self.state != DriverState::Complete {
            self.cancel.cancel();
            if let Some(channel) = &self.channel {
                channel.close();
            }
        }
    }
}

impl fmt::Debug for PipelineTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineTask")
            .field("state", &self.state)
            .field("polls", &self.polls)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
