//! Strategy benchmarking for the fanpipe pipeline.
//!
//! This crate provides:
//!
//! - Per-strategy timing statistics (avg/p95/min/max)
//! - Budget checks suitable for CI regression gates
//! - A JSON summary format
//!
//! # Design Principles
//!
//! - **Verified** - Every measured run is checked against the sequential
//!   reference before it counts.
//! - **Measurable** - Output format suitable for CI regression tracking.

use std::time::Duration;

use anyhow::Result;
use pipeline::Strategy;
use serde::Serialize;

/// Timings collected for one strategy.
#[derive(Debug, Clone, Serialize)]
pub struct StrategyStats {
    pub strategy: Strategy,
    pub runs: u32,
    pub avg_us: u64,
    pub p95_us: u64,
    pub min_us: u64,
    pub max_us: u64,
    pub avg_frames: u64,
    /// Highest channel occupancy seen across runs, for channel runs.
    pub max_high_water: Option<usize>,
    #[serde(skip)]
    elapsed_us: Vec<u64>,
    #[serde(skip)]
    frames: Vec<u64>,
}

impl StrategyStats {
    #[must_use]
    pub const fn new(strategy: Strategy) -> Self {
        Self {
            strategy,
            runs: 0,
            avg_us: 0,
            p95_us: 0,
            min_us: 0,
            max_us: 0,
            avg_frames: 0,
            max_high_water: None,
            elapsed_us: Vec::new(),
            frames: Vec::new(),
        }
    }

    pub fn record(&mut self, elapsed: Duration, frames: u64, high_water: Option<usize>) {
        self.runs += 1;
        self.elapsed_us
            .push(u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX));
        self.frames.push(frames);
        if let Some(high_water) = high_water {
            self.max_high_water = Some(
                self.max_high_water
                    .map_or(high_water, |max| max.max(high_water)),
            );
        }
    }

    pub fn finalize(&mut self) {
        if self.elapsed_us.is_empty() {
            return;
        }
        let runs = self.elapsed_us.len() as u64;
        self.avg_us = self.elapsed_us.iter().sum::<u64>() / runs;
        self.avg_frames = self.frames.iter().sum::<u64>() / runs;
        self.min_us = self.elapsed_us.iter().copied().min().unwrap_or(0);
        self.max_us = self.elapsed_us.iter().copied().max().unwrap_or(0);
        self.p95_us = p95(&mut self.elapsed_us);
    }
}

/// The `summary.json` document.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub total: usize,
    pub workers: usize,
    pub iterations: u32,
    pub capacity: Option<usize>,
    pub pool: String,
    pub frame_ms: u64,
    pub strategies: Vec<StrategyStats>,
}

impl Summary {
    /// Fails if any strategy exceeds a budget.
    pub fn assert_budgets(&self, max_p95_us: Option<u64>, max_avg_us: Option<u64>) -> Result<()> {
        for stats in &self.strategies {
            if let Some(max_p95) = max_p95_us {
                if stats.p95_us > max_p95 {
                    anyhow::bail!(
                        "{} p95 {}us exceeds budget {}us",
                        stats.strategy,
                        stats.p95_us,
                        max_p95
                    );
                }
            }
            if let Some(max_avg) = max_avg_us {
                if stats.avg_us > max_avg {
                    anyhow::bail!(
                        "{} avg {}us exceeds budget {}us",
                        stats.strategy,
                        stats.avg_us,
                        max_avg
                    );
                }
            }
        }
        Ok(())
    }
}

/// 95th percentile (nearest rank). Sorts `values` in place; 0 when empty.
pub fn p95(values: &mut [u64]) -> u64 {
    if values.is_empty() {
        return 0;
    }
    values.sort_unstable();
    let idx = ((values.len() as f64) * 0.95).ceil() as usize;
    let idx = idx.saturating_sub(1).min(values.len() - 1);
    values[idx]
}
