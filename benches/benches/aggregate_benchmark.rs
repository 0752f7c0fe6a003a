//! Hot-path benchmarks: parsing, windowing and summarizing.
//!
//! Run with: `cargo bench --package tickbar-bench`

use criterion::{BatchSize, BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use tickbar_bench::Workload;
use tickbar_lib::{TickParser, WindowAggregator, summarize};

fn workloads() -> Vec<(&'static str, Workload)> {
    vec![
        (
            "1-symbol",
            Workload {
                symbols: 1,
                ticks_per_minute: 600,
                minutes: 10,
            },
        ),
        (
            "50-symbols",
            Workload {
                symbols: 50,
                ticks_per_minute: 60,
                minutes: 10,
            },
        ),
    ]
}

fn parse_benchmark(c: &mut Criterion) {
    let parser = TickParser::default();
    let mut group = c.benchmark_group("parse");

    for (name, workload) in workloads() {
        let payloads = workload.payloads();
        group.throughput(Throughput::Elements(payloads.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), &payloads, |b, payloads| {
            b.iter(|| {
                payloads
                    .iter()
                    .filter(|payload| parser.parse(black_box(payload)).is_ok())
                    .count()
            });
        });
    }
    group.finish();
}

fn aggregate_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregate");

    for (name, workload) in workloads() {
        let ticks = workload.ticks();
        group.throughput(Throughput::Elements(ticks.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), &ticks, |b, ticks| {
            b.iter_batched(
                || ticks.clone(),
                |ticks| {
                    let mut aggregator = WindowAggregator::new();
                    let mut summaries = 0usize;
                    for tick in ticks {
                        if let Some(window) = aggregator.apply(tick).into_sealed() {
                            summaries += usize::from(window.summarize().is_ok());
                        }
                    }
                    for window in aggregator.drain() {
                        summaries += usize::from(window.summarize().is_ok());
                    }
                    black_box(summaries)
                },
                BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

fn summarize_benchmark(c: &mut Criterion) {
    let workload = Workload {
        symbols: 1,
        ticks_per_minute: 10_000,
        minutes: 1,
    };
    let ticks = workload.ticks();
    let minute_start = ticks[0].minute_start();

    let mut group = c.benchmark_group("summarize");
    group.throughput(Throughput::Elements(ticks.len() as u64));
    group.bench_function("10k-ticks", |b| {
        b.iter(|| summarize(ticks[0].symbol(), minute_start, black_box(&ticks)));
    });
    group.finish();
}

criterion_group!(
    benches,
    parse_benchmark,
    aggregate_benchmark,
    summarize_benchmark
);
criterion_main!(benches);
