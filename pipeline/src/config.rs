//! Run configuration.

use std::time::Duration;

use crate::error::{ConfigReason, PipelineError, PipelineResult};
use crate::partition::chunk_len;
use crate::strategy::Strategy;

/// Parameters for a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PipelineConfig {
    /// Number of vectors to generate.
    pub total_count: usize,

    /// Number of workers. Must divide `total_count`.
    pub worker_count: usize,

    /// Channel capacity. `None` sizes the channel to `total_count` so
    /// producers never block in the steady state.
    pub channel_capacity: Option<usize>,

    pub strategy: Strategy,

    /// Sleep between polls in [`PipelineTask::wait`](crate::PipelineTask::wait).
    pub poll_interval: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            total_count: 240,
            worker_count: 4,
            channel_capacity: None,
            strategy: Strategy::Channel,
            poll_interval: Duration::from_millis(1),
        }
    }
}

impl PipelineConfig {
    /// Creates a channel-strategy config with the default channel sizing.
    #[must_use]
    pub const fn new(total_count: usize, worker_count: usize) -> Self {
        Self {
            total_count,
            worker_count,
            channel_capacity: None,
            strategy: Strategy::Channel,
            poll_interval: Duration::from_millis(1),
        }
    }

    /// Creates a small config with a tight channel, suitable for tests.
    #[must_use]
    pub const fn for_testing() -> Self {
        Self {
            total_count: 64,
            worker_count: 4,
            channel_capacity: Some(8),
            strategy: Strategy::Channel,
            poll_interval: Duration::from_micros(100),
        }
    }

    /// Checks the partition precondition and the channel capacity.
    pub fn validate(&self) -> PipelineResult<()> {
        chunk_len(self.total_count, self.worker_count)?;
        if self.channel_capacity == Some(0) {
            return Err(PipelineError::InvalidConfig {
                reason: ConfigReason::ZeroCapacity,
            });
        }
        Ok(())
    }

    /// The capacity the channel is built with.
    #[must_use]
    pub fn effective_capacity(&self) -> usize {
        self.channel_capacity.unwrap_or(self.total_count).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = PipelineConfig::default();
        assert_eq!(config.total_count, 240);
        assert_eq!(config.worker_count, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn default_capacity_matches_total() {
        assert_eq!(PipelineConfig::default().effective_capacity(), 240);
        assert_eq!(PipelineConfig::new(0, 1).effective_capacity(), 1);
        assert_eq!(PipelineConfig::for_testing().effective_capacity(), 8);
    }

    #[test]
    fn testing_config_smaller() {
        let test = PipelineConfig::for_testing();
        let default = PipelineConfig::default();
        assert!(test.total_count < default.total_count);
        assert!(test.validate().is_ok());
    }

    #[test]
    fn uneven_partition_rejected() {
        let config = PipelineConfig::new(10, 4);
        assert!(matches!(
            config.validate(),
            Err(PipelineError::InvalidPartition { .. })
        ));
    }

    #[test]
    fn empty_range_with_huge_worker_count_is_valid() {
        assert!(PipelineConfig::new(0, usize::MAX).validate().is_ok());
        assert!(PipelineConfig::new(0, 1 << 40).validate().is_ok());
    }

    #[test]
    fn zero_capacity_rejected() {
        let config = PipelineConfig {
            channel_capacity: Some(0),
            ..PipelineConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(PipelineError::InvalidConfig {
                reason: ConfigReason::ZeroCapacity,
            })
        );
    }

    #[test]
    fn config_const_constructible() {
        const CONFIG: PipelineConfig = PipelineConfig::for_testing();
        assert_eq!(CONFIG.total_count, 64);
    }
}
