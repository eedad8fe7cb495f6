use std::time::Duration;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pipeline::{Pipeline, PipelineConfig, RayonSpawner, Strategy};

fn config(total_count: usize, worker_count: usize, strategy: Strategy) -> PipelineConfig {
    PipelineConfig {
        strategy,
        poll_interval: Duration::from_micros(20),
        ..PipelineConfig::new(total_count, worker_count)
    }
}

fn bench_strategies(c: &mut Criterion) {
    for &(total, workers) in &[(240usize, 4usize), (24_000, 8)] {
        let mut group = c.benchmark_group(format!("generate_{total}"));
        group.throughput(Throughput::Elements(total as u64));
        for strategy in Strategy::ALL {
            let pipeline = Pipeline::new(config(total, workers, strategy)).unwrap();
            group.bench_with_input(
                BenchmarkId::from_parameter(strategy),
                &pipeline,
                |b, pipeline| b.iter(|| pipeline.run().unwrap()),
            );
        }
        group.finish();
    }
}

fn bench_backpressure(c: &mut Criterion) {
    let mut group = c.benchmark_group("channel_capacity");
    group.throughput(Throughput::Elements(24_000));
    for capacity in [1usize, 64, 24_000] {
        let config = PipelineConfig {
            channel_capacity: Some(capacity),
            ..config(24_000, 8, Strategy::Channel)
        };
        let pipeline = Pipeline::new(config)
            .unwrap()
            .with_spawner(RayonSpawner::new(8).unwrap());
        group.bench_with_input(
            BenchmarkId::from_parameter(capacity),
            &pipeline,
            |b, pipeline| b.iter(|| pipeline.run().unwrap()),
        );
    }
    group.finish();
}

criterion_group!(benches, bench_strategies, bench_backpressure);
criterion_main!(benches);
