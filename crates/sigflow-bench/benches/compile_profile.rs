//! Criterion benchmarks for dependency resolution and fusion.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use sigflow_bench::{filter_bank, scattered_resets};

fn bench_finalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("finalize");
    for channels in [16, 64, 256] {
        group.bench_with_input(BenchmarkId::new("resolve", channels), &channels, |b, &n| {
            b.iter(|| black_box(filter_bank(n, 8, false).finalize().unwrap()));
        });
        group.bench_with_input(BenchmarkId::new("resolve_and_fuse", channels), &channels, |b, &n| {
            b.iter(|| black_box(filter_bank(n, 8, true).finalize().unwrap()));
        });
    }
    group.finish();
}

fn bench_unfusable(c: &mut Criterion) {
    let mut group = c.benchmark_group("keyed_unfusable");
    for count in [250, 500, 1000, 2000] {
        group.bench_with_input(BenchmarkId::new("resolve_and_fuse", count), &count, |b, &n| {
            b.iter(|| black_box(scattered_resets(n, true).finalize().unwrap()));
        });
    }
    group.finish();
}

fn bench_schedule_levels(c: &mut Criterion) {
    let model = filter_bank(128, 8, false).finalize().unwrap();
    c.bench_function("levels_128_channels", |b| {
        b.iter(|| {
            let schedule = black_box(model.schedule());
            black_box(schedule.levels().iter().map(Vec::len).max())
        });
    });
}

criterion_group!(benches, bench_finalize, bench_unfusable, bench_schedule_levels);
criterion_main!(benches);
