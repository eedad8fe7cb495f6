use std::time::Duration;

use pipeline::{partition, vector_at, Pipeline, PipelineConfig, PipelineError};
use proptest::prelude::*;

proptest! {
    #[test]
    fn prop_chunks_tile_the_range(worker_count in 1usize..16, per_worker in 0usize..64) {
        let total_count = worker_count * per_worker;
        let chunks = partition(total_count, worker_count).unwrap();
        prop_assert_eq!(chunks.len(), worker_count);

        let mut next = 0;
        for chunk in &chunks {
            prop_assert_eq!(chunk.start, next);
            prop_assert_eq!(chunk.count, per_worker);
            next = chunk.end();
        }
        prop_assert_eq!(next, total_count);
    }

    #[test]
    fn prop_uneven_split_rejected(worker_count in 2usize..16, total_count in 1usize..1_000) {
        prop_assume!(total_count % worker_count != 0);
        prop_assert_eq!(
            partition(total_count, worker_count).unwrap_err(),
            PipelineError::InvalidPartition { total_count, worker_count }
        );
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_small_runs_match_reference(
        worker_count in 1usize..6,
        per_worker in 0usize..40,
        capacity in 1usize..8,
    ) {
        let total_count = worker_count * per_worker;
        let config = PipelineConfig {
            channel_capacity: Some(capacity),
            poll_interval: Duration::from_micros(50),
            ..PipelineConfig::new(total_count, worker_count)
        };
        let run = Pipeline::new(config).unwrap().run().unwrap();
        prop_assert_eq!(run.buffer.len(), total_count);
        for (index, vector) in run.buffer.iter().enumerate() {
            prop_assert_eq!(*vector, vector_at(index));
        }
        let channel = run.metrics.channel.unwrap();
        prop_assert!(channel.high_water <= capacity);
    }
}
