//! Matrix-vector multiply-accumulate: `y += A x`.

use sigflow_core::{AccessSet, OperatorError, SignalId};
use sigflow_graph::{Operator, StepContext};
use sigflow_store::SignalStore;

use crate::support::{expect_size, label, size_of};

/// Increments `y` (length `m`) by `A x`, where `A` is a row-major
/// `m × n` matrix and `x` has length `n`.
///
/// Never fuses: batching matrix products needs a block-diagonal layout.
#[derive(Debug)]
pub struct DotInc {
    name: String,
    a: SignalId,
    x: SignalId,
    y: SignalId,
    rows: usize,
    cols: usize,
    access: AccessSet,
}

impl DotInc {
    /// Create `y += A x`.
    ///
    /// # Errors
    ///
    /// [`OperatorError::ShapeMismatch`] if `A` does not hold
    /// `len(y) * len(x)` elements.
    pub fn new(
        store: &SignalStore,
        a: SignalId,
        x: SignalId,
        y: SignalId,
    ) -> Result<Self, OperatorError> {
        let rows = size_of(store, y)?;
        let cols = size_of(store, x)?;
        expect_size(store, a, rows * cols)?;
        Ok(Self {
            name: label("DotInc", store, y),
            a,
            x,
            y,
            rows,
            cols,
            access: AccessSet::new().read(a).read(x).increment(y),
        })
    }

    /// Override the operator name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl Operator for DotInc {
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
        for (row, yi) in a.chunks_exact(self.cols.max(1)).zip(y.iter_mut()).take(self.rows) {
            *yi += row.iter().zip(&x).map(|(aij, xj)| aij * xj).sum::<f64>();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sigflow_core::Dtype;
    use sigflow_store::Initial;
    use sigflow_test_utils::{run_once, vector};

    #[test]
    fn matrix_vector_product() {
        let mut store = SignalStore::new();
        let a = store
            .allocate(
                "w",
                &[2, 3],
                Dtype::F64,
                Initial::Values(vec![1.0, 0.0, 2.0, 0.0, 1.0, -1.0]),
            )
            .unwrap();
        let x = vector(&mut store, "x", &[1.0, 2.0, 3.0]);
        let y = vector(&mut store, "y", &[10.0, 10.0]);
        let op = DotInc::new(&store, a, x, y).unwrap();
        assert_eq!(op.name(), "DotInc[y]");
        assert!(op.fuse_key(&store).is_none());
        let data = run_once(&op, &store).unwrap();
        assert_eq!(data.read(y).unwrap(), &[17.0, 9.0]);
    }

    #[test]
    fn wrong_matrix_size_rejected() {
        let mut store = SignalStore::new();
        let a = vector(&mut store, "w", &[1.0; 5]);
        let x = vector(&mut store, "x", &[1.0; 3]);
        let y = vector(&mut store, "y", &[0.0; 2]);
        assert_eq!(
            DotInc::new(&store, a, x, y).unwrap_err(),
            OperatorError::ShapeMismatch {
                signal: a,
                expected: 6,
                actual: 5
            }
        );
    }
}
