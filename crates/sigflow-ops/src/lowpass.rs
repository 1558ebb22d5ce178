//! First-order lowpass filter on a signal.

use sigflow_core::{AccessSet, OperatorError, SignalId};
use sigflow_graph::{FuseKey, Operator, StepContext};
use sigflow_store::SignalStore;

use crate::support::{batch, downcast_all, dtype_of, expect_size, fused_label, label, size_of};

/// Exponential smoothing: `y += (1 - exp(-dt / tau)) * (x - y)`.
///
/// `output` is an update target; `tau == 0` passes the input through.
#[derive(Debug)]
pub struct Lowpass {
    name: String,
    input: SignalId,
    output: SignalId,
    tau: f64,
    access: AccessSet,
    fused: usize,
}

impl Lowpass {
    /// Create a lowpass from `input` into `output`.
    ///
    /// # Errors
    ///
    /// [`OperatorError::ShapeMismatch`] if the element counts differ,
    /// [`OperatorError::InvalidParameter`] if `tau` is negative or not finite.
    pub fn new(
        store: &SignalStore,
        input: SignalId,
        output: SignalId,
        tau: f64,
    ) -> Result<Self, OperatorError> {
        if !tau.is_finite() || tau < 0.0 {
            return Err(OperatorError::InvalidParameter {
                reason: format!("lowpass time constant must be finite and >= 0, got {tau}"),
            });
        }
        expect_size(store, output, size_of(store, input)?)?;
        Ok(Self::assemble(label("Lowpass", store, output), input, output, tau, 1))
    }

    fn assemble(name: String, input: SignalId, output: SignalId, tau: f64, fused: usize) -> Self {
        Self {
            name,
            input,
            output,
            tau,
            access: AccessSet::new().read(input).update(output),
            fused,
        }
    }

    /// Override the operator name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Time constant in seconds.
    pub fn tau(&self) -> f64 {
        self.tau
    }

    /// Smoothing factor for one step of length `dt`.
    pub fn decay(tau: f64, dt: f64) -> f64 {
        if tau <= 0.0 {
            1.0
        } else {
            1.0 - (-dt / tau).exp()
        }
    }
}

impl Operator for Lowpass {
    fn name(&self) -> &str {
        &self.name
    }

    fn access(&self) -> &AccessSet {
        &self.access
    }

    fn step(&self, ctx: &mut StepContext<'_>) -> Result<(), OperatorError> {
        let alpha = Self::decay(self.tau, ctx.dt());
        let input = ctx.read(self.input)?.to_vec();
        for (y, x) in ctx.write(self.output)?.iter_mut().zip(&input) {
            *y += alpha * (x - *y);
        }
        Ok(())
    }

    fn fuse_key(&self, store: &SignalStore) -> Option<FuseKey> {
        Some(FuseKey::new("Lowpass", dtype_of(store, self.output)?).with_param(self.tau))
    }

    fn fuse(&self, members: &[&dyn Operator], store: &mut SignalStore) -> Option<Box<dyn Operator>> {
        let ops = downcast_all::<Lowpass>(members)?;
        let input = batch(store, &ops, |op| op.input)?;
        let output = batch(store, &ops, |op| op.output)?;
        Some(Box::new(Self::assemble(
            fused_label(&self.name, members.len()),
            input,
            output,
            self.tau,
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
    use proptest::prelude::*;
    use sigflow_test_utils::{step_operator, vector};

    #[test]
    fn converges_towards_input() {
        let mut store = SignalStore::new();
        let x = vector(&mut store, "x", &[1.0]);
        let y = vector(&mut store, "y", &[0.0]);
        let op = Lowpass::new(&store, x, y, 0.01).unwrap();
        let mut data = store.instantiate();

        step_operator(&op, &mut data, 1, 0.001).unwrap();
        let alpha = 1.0 - (-0.1f64).exp();
        assert!((data.read(y).unwrap()[0] - alpha).abs() < 1e-12);

        for step in 2..=200 {
            step_operator(&op, &mut data, step, 0.001).unwrap();
        }
        assert!((data.read(y).unwrap()[0] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn zero_tau_passes_through() {
        let mut store = SignalStore::new();
        let x = vector(&mut store, "x", &[3.0, -4.0]);
        let y = vector(&mut store, "y", &[0.0, 0.0]);
        let op = Lowpass::new(&store, x, y, 0.0).unwrap();
        let mut data = store.instantiate();
        step_operator(&op, &mut data, 1, 0.1).unwrap();
        assert_eq!(data.read(y).unwrap(), &[3.0, -4.0]);
    }

    #[test]
    fn negative_tau_rejected() {
        let mut store = SignalStore::new();
        let x = vector(&mut store, "x", &[0.0]);
        let y = vector(&mut store, "y", &[0.0]);
        assert!(matches!(
            Lowpass::new(&store, x, y, -1.0),
            Err(OperatorError::InvalidParameter { .. })
        ));
        assert!(matches!(
            Lowpass::new(&store, x, y, f64::INFINITY),
            Err(OperatorError::InvalidParameter { .. })
        ));
    }

    proptest! {
        #[test]
        fn step_stays_between_output_and_input(
            x in -1e3f64..1e3,
            y in -1e3f64..1e3,
            tau in 0.0f64..1.0,
            dt in 1e-5f64..0.1,
        ) {
            let mut store = SignalStore::new();
            let xs = vector(&mut store, "x", &[x]);
            let ys = vector(&mut store, "y", &[y]);
            let op = Lowpass::new(&store, xs, ys, tau).unwrap();
            let mut data = store.instantiate();
            step_operator(&op, &mut data, 1, dt).unwrap();
            let out = data.read(ys).unwrap()[0];
            let (lo, hi) = if x < y { (x, y) } else { (y, x) };
            prop_assert!(out >= lo - 1e-9 && out <= hi + 1e-9);
            prop_assert!((0.0..=1.0).contains(&Lowpass::decay(tau, dt)));
        }
    }
}
