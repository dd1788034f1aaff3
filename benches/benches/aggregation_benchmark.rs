//! Aggregation benchmarks for ticksmith.
//!
//! Run with: `cargo bench --package ticksmith-bench`

use chrono::TimeDelta;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use tempfile::TempDir;
use ticksmith_bench::{SyntheticConfig, synthetic_ticks};
use ticksmith_lib::calendar::{Direction, iter_missing};
use ticksmith_lib::prelude::*;
use ticksmith_lib::{
    CandleAggregator, ExistingIndex, aggregate_trades, cluster_trades_with_time_window,
    volume_filter_with_time_window,
};

const SIZES: [usize; 2] = [10_000, 100_000];

fn primitives_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("primitives");

    for size in SIZES {
        let ticks = synthetic_ticks(&SyntheticConfig {
            ticks: size,
            ..Default::default()
        });
        let Ok(merged) = aggregate_trades(&ticks) else {
            continue;
        };
        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::new("aggregate_trades", size), &ticks, |b, ticks| {
            b.iter(|| aggregate_trades(black_box(ticks)));
        });

        group.bench_with_input(BenchmarkId::new("volume_filter", size), &merged, |b, merged| {
            b.iter(|| volume_filter_with_time_window(black_box(merged), 25.0, Some(Step::MINUTE)));
        });

        group.bench_with_input(BenchmarkId::new("cluster", size), &merged, |b, merged| {
            b.iter(|| cluster_trades_with_time_window(black_box(merged), Some(Step::MINUTE)));
        });

        group.bench_with_input(BenchmarkId::new("candles_1t", size), &merged, |b, merged| {
            b.iter(|| {
                let mut aggregator = CandleAggregator::new(Step::MINUTE);
                let mut candles: Vec<_> = black_box(merged)
                    .iter()
                    .filter_map(|trade| aggregator.process(trade))
                    .collect();
                candles.extend(aggregator.finish());
                candles
            });
        });
    }

    group.finish();
}

fn gaps_benchmark(c: &mut Criterion) {
    let config = SyntheticConfig::default();
    let start = config.start;
    let Ok(range) = TimeRange::new(start, start + TimeDelta::days(30)) else {
        return;
    };

    // Every other hour present.
    let existing: ExistingIndex = (0..30 * 24)
        .step_by(2)
        .map(|hour| (start + TimeDelta::hours(hour), Frequency::Hour))
        .collect();

    c.bench_function("iter_missing_30d", |b| {
        b.iter(|| iter_missing(black_box(range), &existing, Direction::Forward).count());
    });
}

fn pipeline_benchmark(c: &mut Criterion) {
    let config = SyntheticConfig {
        ticks: 50_000,
        spacing_ms: 1_000,
        ..Default::default()
    };
    let ticks = synthetic_ticks(&config);
    let Some(last) = ticks.last() else {
        return;
    };
    let Ok(range) = TimeRange::new(config.start, last.timestamp + TimeDelta::hours(1)) else {
        return;
    };
    let max_to = range.end() + TimeDelta::days(1);
    let Ok(window) = Step::new(5, StepUnit::Minute) else {
        return;
    };

    let mut group = c.benchmark_group("pipeline");
    group.sample_size(10);
    group.throughput(Throughput::Elements(ticks.len() as u64));

    group.bench_function("ingest_and_aggregate_5t", |b| {
        b.iter_batched(
            || {
                let dir = TempDir::new().ok();
                let source = MemoryTickSource::new().with_ticks("BENCH", ticks.clone());
                (dir, source)
            },
            |(dir, mut source)| {
                let Some(dir) = dir else { return };
                let Ok(mut store) = FileStore::new(dir.path().to_path_buf()) else {
                    return;
                };
                let _ = TradeDataIngestor::new(&mut store, &mut source, SymbolConfig::new("BENCH"))
                    .with_max_timestamp_to(max_to)
                    .run(range, Step::DAY, false);
                let mut target = TimeCandleTarget::new(&mut store, "BENCH", "bench-5t", window);
                let driver =
                    AggregationDriver::new(DriverConfig::default().with_max_timestamp_to(max_to));
                let _ = driver.run(&mut target, range, Step::DAY, false);
            },
            criterion::BatchSize::PerIteration,
        );
    });

    group.finish();
}

criterion_group!(benches, primitives_benchmark, gaps_benchmark, pipeline_benchmark);
criterion_main!(benches);
