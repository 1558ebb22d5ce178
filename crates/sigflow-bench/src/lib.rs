//! Benchmark profiles for the sigflow simulator.
//!
//! - [`filter_bank`]: `channels` independent drive → lowpass → integrator
//!   chains, `width` elements each, laid out so the fusion pass can batch
//!   every stage into one operator
//! - [`scattered_resets`]: many scalar resets whose fusion keys are all
//!   distinct, so the fusion pass inspects every one and fuses none
//! - [`stimulus`]: the deterministic input pattern the profiles use

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use sigflow_core::Dtype;
use sigflow_engine::{ModelBuilder, ModelConfig, ProbeConfig};
use sigflow_ops::{CopyMode, CopySignal, Integrate, Lowpass, NoiseInc, Reset};
use sigflow_store::Initial;

/// Build an uncompiled filter-bank model.
///
/// Per channel: `drive += stim`, `filtered` lowpasses `drive`, `acc`
/// integrates `filtered`. A single seeded noise source perturbs every
/// drive and every channel's `acc` is probed every 10 steps.
///
/// Declares `3 * channels + 2` operators; with fusion enabled they compile
/// to 5.
pub fn filter_bank(channels: usize, width: usize, fuse: bool) -> ModelBuilder {
    let total = channels * width;
    let mut b = ModelBuilder::new(ModelConfig::default().with_dt(0.001).with_fusion(fuse));

    let stim = b
        .declare_readonly("stim", &[total], Dtype::F64, Initial::Values(stimulus(total)))
        .expect("profile shapes are valid");
    let drive = b
        .declare_signal("drive", &[total], Dtype::F64, Initial::Zeros)
        .expect("profile shapes are valid");
    let filtered = b
        .declare_signal("filtered", &[total], Dtype::F64, Initial::Zeros)
        .expect("profile shapes are valid");
    let acc = b
        .declare_signal("acc", &[total], Dtype::F64, Initial::Zeros)
        .expect("profile shapes are valid");

    let clear = Reset::new(b.store(), drive, 0.0).expect("drive exists");
    b.declare_operator(Box::new(clear));
    let noise = NoiseInc::builder()
        .dst(drive)
        .scale(0.05)
        .seed(42)
        .build(b.store())
        .expect("drive exists");
    b.declare_operator(Box::new(noise));

    for ch in 0..channels {
        let offset = ch * width;
        let view = |b: &mut ModelBuilder, base| {
            b.declare_view(base, &[width], offset)
                .expect("channel views tile their base")
        };
        let s = view(&mut b, stim);
        let d = view(&mut b, drive);
        let f = view(&mut b, filtered);
        let a = view(&mut b, acc);

        let copy = CopySignal::new(b.store(), s, d, CopyMode::Increment).expect("sizes match");
        let lowpass = Lowpass::new(b.store(), d, f, 0.01).expect("sizes match");
        let integrate = Integrate::new(b.store(), a, f, 1.0).expect("sizes match");
        b.declare_operator(Box::new(copy));
        b.declare_operator(Box::new(lowpass));
        b.declare_operator(Box::new(integrate));
        b.declare_probe(ProbeConfig::new(a).every(10));
    }
    b
}

/// Build an uncompiled model of `count` scalar signals, each reset to its
/// own index every step.
pub fn scattered_resets(count: usize, fuse: bool) -> ModelBuilder {
    let mut b = ModelBuilder::new(ModelConfig::default().with_fusion(fuse));
    for i in 0..count {
        let x = b
            .declare_signal(format!("x{i}"), &[], Dtype::F64, Initial::Zeros)
            .expect("profile shapes are valid");
        let reset = Reset::new(b.store(), x, i as f64).expect("x exists");
        b.declare_operator(Box::new(reset));
    }
    b
}

/// A deterministic stimulus in `[-1, 1]`.
pub fn stimulus(len: usize) -> Vec<f64> {
    (0..len).map(|i| (i as f64 * 0.37).sin()).collect()
}
