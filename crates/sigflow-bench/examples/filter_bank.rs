//! End-to-end filter bank example.
//!
//! Demonstrates: build a model → compile with fusion → run → read probes →
//! checkpoint → reset → restore. Set `RUST_LOG=debug` to see the resolver
//! and fusion pass.

use std::sync::Arc;

use sigflow_bench::filter_bank;
use sigflow_engine::Stepper;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== sigflow filter bank ===\n");

    let model = Arc::new(filter_bank(4, 8, true).finalize().unwrap());
    println!(
        "compiled {} declared operators into {} ({} levels)",
        model.declared_operators(),
        model.operators().len(),
        model.schedule().levels().len()
    );
    for op in model.scheduled() {
        println!("  {:<32} fused={}", op.name(), op.fused_count());
    }

    let mut stepper = Stepper::new(Arc::clone(&model));
    stepper.run(0.05).unwrap();
    println!("\nafter {:.3}s ({} steps):", stepper.time(), stepper.step_count().0);
    for (i, _) in model.probes().iter().enumerate() {
        let probe = sigflow_core::ProbeId(i as u32);
        let data = stepper.probe_data(probe).unwrap();
        let last = data.last().unwrap();
        let mean = last.iter().sum::<f64>() / last.len() as f64;
        println!("  channel {i}: {} samples, mean acc = {mean:>9.5}", data.len());
    }
    println!("  last step took {}μs", stepper.last_metrics().total_us);

    let checkpoint = stepper.checkpoint();
    let json = checkpoint.to_json().unwrap();
    println!("\ncheckpoint: {} bytes of JSON", json.len());

    stepper.reset();
    println!("reset to step {}", stepper.step_count().0);
    stepper.restore(&checkpoint).unwrap();
    println!("restored to step {}", stepper.step_count().0);
}
