//! Test utilities for sigflow development.
//!
//! Provides reusable operator fixtures (see [`fixtures`]) and a small
//! harness for running a single operator against a store's buffers
//! without building a full model.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

pub use fixtures::{
    ConstOperator, CounterOperator, FailingOperator, IdentityOperator, IncrementOperator,
    NanOperator,
};

use sigflow_core::{Dtype, OperatorError, SignalId, StepId};
use sigflow_graph::{Operator, StepContext};
use sigflow_store::{Initial, SignalData, SignalStore};

/// Run `op` once against `data`, as the stepper would at `step`.
pub fn step_operator(
    op: &dyn Operator,
    data: &mut SignalData,
    step: u64,
    dt: f64,
) -> Result<(), OperatorError> {
    let time = step.saturating_sub(1) as f64 * dt;
    let mut ctx = StepContext::new(data, op.access(), StepId(step), time, dt);
    op.step(&mut ctx)
}

/// Instantiate `store` and run `op` once at step 1 with `dt = 0.001`.
pub fn run_once(op: &dyn Operator, store: &SignalStore) -> Result<SignalData, OperatorError> {
    let mut data = store.instantiate();
    step_operator(op, &mut data, 1, 0.001)?;
    Ok(data)
}

/// Allocate a 1-D F64 signal holding `values`.
pub fn vector(store: &mut SignalStore, name: &str, values: &[f64]) -> SignalId {
    store
        .allocate(name, &[values.len()], Dtype::F64, Initial::Values(values.to_vec()))
        .expect("test vector allocation")
}

/// Allocate a scalar F64 signal.
pub fn scalar(store: &mut SignalStore, name: &str, value: f64) -> SignalId {
    store
        .allocate(name, &[], Dtype::F64, Initial::Fill(value))
        .expect("test scalar allocation")
}
