//! Benchmarks for per-partition reduction and the combiner fold
//!
//! Run with: cargo bench

use conflux::{AggregateOp, CombineFold, CombinerOp, MemoryPartition, SeriesValues};
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use std::collections::HashMap;

fn scalar_series(count: usize) -> Vec<SeriesValues> {
    (0..count)
        .map(|i| SeriesValues::single(format!("series-{}", i), 120_000, (i % 200) as f64 * 10.0))
        .collect()
}

fn bench_histogram_fold(c: &mut Criterion) {
    let mut group = c.benchmark_group("histogram_fold");

    for size in [100, 1000, 10000] {
        let series = scalar_series(size);
        let op = CombinerOp::Histogram {
            bucket_width: 100.0,
            bucket_count: 20,
        };

        group.throughput(Throughput::Elements(size as u64));
        group.bench_function(format!("fold_{}", size), |b| {
            b.iter(|| {
                let mut fold = CombineFold::new(&op);
                for entry in &series {
                    fold.fold(black_box(entry.clone())).unwrap();
                }
                fold.finish()
            })
        });
    }

    group.finish();
}

fn bench_partition_reduce(c: &mut Criterion) {
    let mut group = c.benchmark_group("partition_reduce");

    let rows = (0..10_000)
        .map(|i| {
            (
                i as i64 * 1000,
                HashMap::from([("min".to_string(), (i % 500) as f64)]),
            )
        })
        .collect();
    let partition = MemoryPartition::from_rows(
        "series-0",
        "timestamp",
        vec!["min".to_string()],
        rows,
    );

    group.throughput(Throughput::Elements(10_000));

    let sum = AggregateOp::Sum {
        value_column: "min".to_string(),
    };
    group.bench_function("sum_10000", |b| {
        b.iter(|| sum.eval(black_box(&partition)).unwrap())
    });

    let grouped = AggregateOp::TimeGroupMin {
        time_column: "timestamp".to_string(),
        value_column: "min".to_string(),
        start: 0,
        end: 10_000_000,
        windows: 100,
    };
    group.bench_function("time_group_min_10000", |b| {
        b.iter(|| grouped.eval(black_box(&partition)).unwrap())
    });

    group.finish();
}

criterion_group!(benches, bench_histogram_fold, bench_partition_reduce);
criterion_main!(benches);
