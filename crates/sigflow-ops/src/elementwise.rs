//! Elementwise multiply-accumulate: `y += a * x`.

use sigflow_core::{AccessSet, OperatorError, SignalId};
use sigflow_graph::{FuseKey, Operator, StepContext};
use sigflow_store::SignalStore;

use crate::support::{batch, downcast_all, dtype_of, expect_size, fused_label, label, size_of};

/// Increments `y` by the elementwise product of `a` and `x`.
///
/// `x` and `y` hold the same number of elements; `a` holds either that
/// many or exactly one, in which case it broadcasts.
#[derive(Debug)]
pub struct ElementwiseInc {
    name: String,
    a: SignalId,
    x: SignalId,
    y: SignalId,
    broadcast: bool,
    access: AccessSet,
    fused: usize,
}

impl ElementwiseInc {
    /// Create `y += a * x`.
    ///
    /// # Errors
    ///
    /// [`OperatorError::ShapeMismatch`] if `x` and `y` differ in size or
    /// `a` is neither a scalar nor the same size.
    pub fn new(
        store: &SignalStore,
        a: SignalId,
        x: SignalId,
        y: SignalId,
    ) -> Result<Self, OperatorError> {
        let n = size_of(store, y)?;
        expect_size(store, x, n)?;
        let a_len = size_of(store, a)?;
        let broadcast = a_len == 1 && n != 1;
        if !broadcast {
            expect_size(store, a, n)?;
        }
        Ok(Self::assemble(label("ElementwiseInc", store, y), a, x, y, broadcast, 1))
    }

    fn assemble(
        name: String,
        a: SignalId,
        x: SignalId,
        y: SignalId,
        broadcast: bool,
        fused: usize,
    ) -> Self {
        Self {
            name,
            a,
            x,
            y,
            broadcast,
            access: AccessSet::new().read(a).read(x).increment(y),
            fused,
        }
    }

    /// Override the operator name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Whether `a` is a scalar applied to every element.
    pub fn is_broadcast(&self) -> bool {
        self.broadcast
    }
}

impl Operator for ElementwiseInc {
    fn name(&self) -> &str {
        &self.name
    }

    fn access(&self) -> &AccessSet {
        &self.access
    }

    fn step(&self, ctx: &mut StepContext<'_>) -> Result<(), OperatorError> {
        let a = ctx.read(self.a)?.to_vec();
        let x = ctx.read(self.x)?.to_vec();
        let y = ctx.write(self.y)?;
        if self.broadcast {
            let k = a[0];
            for (yi, xi) in y.iter_mut().zip(&x) {
                *yi += k * xi;
            }
        } else {
            for ((yi, ai), xi) in y.iter_mut().zip(&a).zip(&x) {
                *yi += ai * xi;
            }
        }
        Ok(())
    }

    fn fuse_key(&self, store: &SignalStore) -> Option<FuseKey> {
        if self.broadcast {
            return None;
        }
        Some(FuseKey::new("ElementwiseInc", dtype_of(store, self.y)?))
    }

    fn fuse(&self, members: &[&dyn Operator], store: &mut SignalStore) -> Option<Box<dyn Operator>> {
        let ops = downcast_all::<ElementwiseInc>(members)?;
        let a = batch(store, &ops, |op| op.a)?;
        let x = batch(store, &ops, |op| op.x)?;
        let y = batch(store, &ops, |op| op.y)?;
        Some(Box::new(Self::assemble(
            fused_label(&self.name, members.len()),
            a,
            x,
            y,
            false,
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
    use sigflow_test_utils::{run_once, scalar, vector};

    #[test]
    fn multiplies_elementwise() {
        let mut store = SignalStore::new();
        let a = vector(&mut store, "a", &[1.0, 2.0, 3.0]);
        let x = vector(&mut store, "x", &[4.0, 5.0, 6.0]);
        let y = vector(&mut store, "y", &[1.0, 1.0, 1.0]);
        let op = ElementwiseInc::new(&store, a, x, y).unwrap();
        assert!(!op.is_broadcast());
        let data = run_once(&op, &store).unwrap();
        assert_eq!(data.read(y).unwrap(), &[5.0, 11.0, 19.0]);
    }

    #[test]
    fn scalar_gain_broadcasts_and_never_fuses() {
        let mut store = SignalStore::new();
        let a = scalar(&mut store, "gain", 2.0);
        let x = vector(&mut store, "x", &[1.0, -1.0]);
        let y = vector(&mut store, "y", &[0.0, 0.0]);
        let op = ElementwiseInc::new(&store, a, x, y).unwrap();
        assert!(op.is_broadcast());
        assert!(op.fuse_key(&store).is_none());
        let data = run_once(&op, &store).unwrap();
        assert_eq!(data.read(y).unwrap(), &[2.0, -2.0]);
    }

    #[test]
    fn mismatched_gain_rejected() {
        let mut store = SignalStore::new();
        let a = vector(&mut store, "a", &[1.0, 2.0]);
        let x = vector(&mut store, "x", &[1.0, 2.0, 3.0]);
        let y = vector(&mut store, "y", &[0.0, 0.0, 0.0]);
        assert!(matches!(
            ElementwiseInc::new(&store, a, x, y),
            Err(OperatorError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn scalar_signals_are_not_broadcast() {
        let mut store = SignalStore::new();
        let a = scalar(&mut store, "a", 2.0);
        let x = scalar(&mut store, "x", 3.0);
        let y = scalar(&mut store, "y", 0.0);
        let op = ElementwiseInc::new(&store, a, x, y).unwrap();
        assert!(!op.is_broadcast());
        let data = run_once(&op, &store).unwrap();
        assert_eq!(data.read(y).unwrap(), &[6.0]);
    }
}
