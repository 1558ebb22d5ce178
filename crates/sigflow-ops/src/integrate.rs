//! Forward-Euler integration: `state += scale * dt * input`.
//!
//! `state` is an update target, so every same-step reader sees the value
//! from the end of the previous step. This is how feedback loops are
//! expressed without a same-step cycle.

use sigflow_core::{AccessSet, OperatorError, SignalId};
use sigflow_graph::{FuseKey, Operator, StepContext};
use sigflow_store::SignalStore;

use crate::support::{batch, downcast_all, dtype_of, expect_size, fused_label, label, size_of};

/// Integrates `input` into `state` once per step.
#[derive(Debug)]
pub struct Integrate {
    name: String,
    state: SignalId,
    input: SignalId,
    scale: f64,
    access: AccessSet,
    fused: usize,
}

impl Integrate {
    /// Create an integrator of `input` into `state`.
    ///
    /// # Errors
    ///
    /// [`OperatorError::ShapeMismatch`] if the element counts differ.
    pub fn new(
        store: &SignalStore,
        state: SignalId,
        input: SignalId,
        scale: f64,
    ) -> Result<Self, OperatorError> {
        expect_size(store, input, size_of(store, state)?)?;
        Ok(Self::assemble(label("Integrate", store, state), state, input, scale, 1))
    }

    fn assemble(name: String, state: SignalId, input: SignalId, scale: f64, fused: usize) -> Self {
        Self {
            name,
            state,
            input,
            scale,
            access: AccessSet::new().read(input).update(state),
            fused,
        }
    }

    /// Override the operator name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// The integrated signal.
    pub fn state(&self) -> SignalId {
        self.state
    }
}

impl Operator for Integrate {
    fn name(&self) -> &str {
        &self.name
    }

    fn access(&self) -> &AccessSet {
        &self.access
    }

    fn step(&self, ctx: &mut StepContext<'_>) -> Result<(), OperatorError> {
        let gain = self.scale * ctx.dt();
        let input = ctx.read(self.input)?.to_vec();
        for (s, i) in ctx.write(self.state)?.iter_mut().zip(&input) {
            *s += gain * i;
        }
        Ok(())
    }

    fn fuse_key(&self, store: &SignalStore) -> Option<FuseKey> {
        Some(FuseKey::new("Integrate", dtype_of(store, self.state)?).with_param(self.scale))
    }

    fn fuse(&self, members: &[&dyn Operator], store: &mut SignalStore) -> Option<Box<dyn Operator>> {
        let ops = downcast_all::<Integrate>(members)?;
        let state = batch(store, &ops, |op| op.state)?;
        let input = batch(store, &ops, |op| op.input)?;
        Some(Box::new(Self::assemble(
            fused_label(&self.name, members.len()),
            state,
            input,
            self.scale,
            ops.iter().map(|op| op.fused).sum(),
        )))
    }

    fn fused_count(&self) -> usize {
        self.fused
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sigflow_test_utils::{step_operator, vector};

    #[test]
    fn accumulates_scaled_input() {
        let mut store = SignalStore::new();
        let s = vector(&mut store, "s", &[0.0, 1.0]);
        let u = vector(&mut store, "u", &[1.0, -2.0]);
        let op = Integrate::new(&store, s, u, 10.0).unwrap();
        assert_eq!(op.access().updates(), &[s]);

        let mut data = store.instantiate();
        for step in 1..=4 {
            step_operator(&op, &mut data, step, 0.25).unwrap();
        }
        // 4 steps * 10 * 0.25 = 10 per unit input.
        assert_eq!(data.read(s).unwrap(), &[10.0, -19.0]);
    }

    #[test]
    fn scale_is_part_of_the_key() {
        let mut store = SignalStore::new();
        let s = vector(&mut store, "s", &[0.0]);
        let u = vector(&mut store, "u", &[0.0]);
        let a = Integrate::new(&store, s, u, 1.0).unwrap();
        let b = Integrate::new(&store, s, u, 2.0).unwrap();
        assert_ne!(a.fuse_key(&store), b.fuse_key(&store));
    }
}
