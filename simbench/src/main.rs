use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use pipeline::{
    vector_at, FrameLoop, Pipeline, PipelineConfig, RayonSpawner, Strategy, ThreadSpawner, Vec3,
    WorkerPool,
};
use simbench::{StrategyStats, Summary};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "simbench",
    version,
    about = "fanpipe pipeline benchmark harness"
)]
struct Cli {
    /// Number of vectors generated per run.
    #[arg(long, default_value_t = 240)]
    total: usize,
    /// Number of workers. Must divide --total.
    #[arg(long, default_value_t = 4)]
    workers: usize,
    /// Strategy to measure.
    #[arg(long, value_enum, default_value_t = StrategyArg::All)]
    strategy: StrategyArg,
    /// Runs per strategy.
    #[arg(long, default_value_t = 50)]
    iterations: u32,
    /// Channel capacity (defaults to --total).
    #[arg(long)]
    capacity: Option<usize>,
    /// Where channel workers run.
    #[arg(long, value_enum, default_value_t = PoolArg::Threads)]
    pool: PoolArg,
    /// Simulated frame period in milliseconds.
    #[arg(long, default_value_t = 1)]
    frame_ms: u64,
    /// Output directory for summary.json.
    #[arg(long, default_value = "target/simbench")]
    out_dir: PathBuf,
    /// Fail if any strategy's p95 run time exceeds this many microseconds.
    #[arg(long)]
    max_p95_us: Option<u64>,
    /// Fail if any strategy's average run time exceeds this many microseconds.
    #[arg(long)]
    max_avg_us: Option<u64>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StrategyArg {
    Channel,
    ParallelFor,
    Sequential,
    All,
}

impl StrategyArg {
    fn strategies(self) -> Vec<Strategy> {
        match self {
            Self::Channel => vec![Strategy::Channel],
            Self::ParallelFor => vec![Strategy::ParallelFor],
            Self::Sequential => vec![Strategy::Sequential],
            Self::All => Strategy::ALL.to_vec(),
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PoolArg {
    Threads,
    Rayon,
}

impl PoolArg {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Threads => "threads",
            Self::Rayon => "rayon",
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    fs::create_dir_all(&cli.out_dir)
        .with_context(|| format!("create output dir {}", cli.out_dir.display()))?;

    let spawner: Arc<dyn WorkerPool> = match cli.pool {
        PoolArg::Threads => Arc::new(ThreadSpawner),
        PoolArg::Rayon => Arc::new(RayonSpawner::new(cli.workers).context("build rayon pool")?),
    };
    let reference: Vec<Vec3> = (0..cli.total).map(vector_at).collect();
    let frames = FrameLoop::new(Duration::from_millis(cli.frame_ms));

    let mut summary = Summary {
        total: cli.total,
        workers: cli.workers,
        iterations: cli.iterations,
        capacity: cli.capacity,
        pool: cli.pool.as_str().to_owned(),
        frame_ms: cli.frame_ms,
        strategies: Vec::new(),
    };

    for strategy in cli.strategy.strategies() {
        let config = PipelineConfig {
            channel_capacity: cli.capacity,
            strategy,
            poll_interval: frames.frame(),
            ..PipelineConfig::new(cli.total, cli.workers)
        };
        let pipeline = Pipeline::new(config)
            .with_context(|| format!("configure {strategy} pipeline"))?
            .with_shared_spawner(Arc::clone(&spawner));
        let stats = measure(&pipeline, &frames, cli.iterations, &reference)?;
        info!(
            %strategy,
            avg_us = stats.avg_us,
            p95_us = stats.p95_us,
            avg_frames = stats.avg_frames,
            "strategy measured"
        );
        summary.strategies.push(stats);
    }

    summary.assert_budgets(cli.max_p95_us, cli.max_avg_us)?;
    write_summary_json(&cli.out_dir, &summary)?;
    Ok(())
}

fn measure(
    pipeline: &Pipeline,
    frames: &FrameLoop,
    iterations: u32,
    reference: &[Vec3],
) -> Result<StrategyStats> {
    let strategy = pipeline.config().strategy;
    let mut stats = StrategyStats::new(strategy);
    for iteration in 0..iterations {
        let report = frames.drive(&mut pipeline.start());
        let run = report
            .output
            .with_context(|| format!("{strategy} iteration {iteration}"))?;
        if let Some(index) = first_mismatch(run.buffer.as_slice(), reference) {
            anyhow::bail!(
                "{strategy} iteration {iteration} diverged from reference at index {index}"
            );
        }
        let high_water = run.metrics.channel.map(|channel| channel.high_water);
        stats.record(run.elapsed, report.frames, high_water);
    }
    stats.finalize();
    Ok(stats)
}

fn first_mismatch(actual: &[Vec3], expected: &[Vec3]) -> Option<usize> {
    if actual.len() != expected.len() {
        return Some(actual.len().min(expected.len()));
    }
    actual.iter().zip(expected).position(|(a, b)| a != b)
}

fn write_summary_json(out_dir: &Path, summary: &Summary) -> Result<()> {
    let path = out_dir.join("summary.json");
    let contents = serde_json::to_string_pretty(summary).context("serialize summary")?;
    fs::write(&path, contents).with_context(|| format!("write {}", path.display()))?;
    info!(path = %path.display(), "summary written");
    Ok(())
}
