//! Criterion benchmarks for stepping the filter-bank profile.

use std::hint::black_box;
use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};
use sigflow_bench::filter_bank;
use sigflow_engine::Stepper;

fn stepper(channels: usize, width: usize, fuse: bool) -> Stepper {
    let model = filter_bank(channels, width, fuse).finalize().unwrap();
    let mut stepper = Stepper::new(Arc::new(model));
    // Warm up so probe buffers have started growing.
    stepper.step().unwrap();
    stepper
}

fn bench_step_fused(c: &mut Criterion) {
    let mut s = stepper(64, 128, true);
    c.bench_function("step_64x128_fused", |b| {
        b.iter(|| black_box(s.step().unwrap()));
    });
}

fn bench_step_unfused(c: &mut Criterion) {
    let mut s = stepper(64, 128, false);
    c.bench_function("step_64x128_unfused", |b| {
        b.iter(|| black_box(s.step().unwrap()));
    });
}

fn bench_1000_steps(c: &mut Criterion) {
    let model = Arc::new(filter_bank(16, 64, true).finalize().unwrap());
    c.bench_function("1000_steps_16x64", |b| {
        b.iter(|| {
            let mut s = Stepper::new(Arc::clone(&model));
            s.run_steps(1000).unwrap();
            black_box(s.step_count());
        });
    });
}

criterion_group!(
    benches,
    bench_step_fused,
    bench_step_unfused,
    bench_1000_steps
);
criterion_main!(benches);
