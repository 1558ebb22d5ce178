//! Closure-backed operators for host extensions.
//!
//! ```
//! use sigflow_core::{AccessSet, Dtype};
//! use sigflow_graph::Operator;
//! use sigflow_ops::FnOperator;
//! use sigflow_store::{Initial, SignalStore};
//!
//! let mut store = SignalStore::new();
//! let x = store.allocate("x", &[2], Dtype::F64, Initial::Zeros).unwrap();
//! let square = FnOperator::new("square", AccessSet::new().update(x), move |ctx| {
//!     for v in ctx.write(x)?.iter_mut() {
//!         *v *= *v;
//!     }
//!     Ok(())
//! });
//! assert_eq!(square.name(), "square");
//! ```

use std::fmt;

use sigflow_core::{AccessSet, OperatorError};
use sigflow_graph::{Operator, StepContext};

type StepFn = dyn Fn(&mut StepContext<'_>) -> Result<(), OperatorError> + Send + Sync;

/// An operator whose step is an arbitrary closure. Never fuses.
///
/// The closure must touch only the signals in `access`; the step context
/// rejects anything else.
pub struct FnOperator {
    name: String,
    access: AccessSet,
    func: Box<StepFn>,
}

impl FnOperator {
    /// Wrap `func` as an operator with the given accesses.
    pub fn new<F>(name: impl Into<String>, access: AccessSet, func: F) -> Self
    where
        F: Fn(&mut StepContext<'_>) -> Result<(), OperatorError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            access,
            func: Box::new(func),
        }
    }
}

impl fmt::Debug for FnOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnOperator")
            .field("name", &self.name)
            .field("access", &self.access)
            .finish_non_exhaustive()
    }
}

impl Operator for FnOperator {
    fn name(&self) -> &str {
        &self.name
    }

    fn access(&self) -> &AccessSet {
        &self.access
    }

    fn step(&self, ctx: &mut StepContext<'_>) -> Result<(), OperatorError> {
        (self.func)(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sigflow_test_utils::{run_once, scalar};

    #[test]
    fn closure_runs_with_context() {
        let mut store = sigflow_store::SignalStore::new();
        let t = scalar(&mut store, "t", 0.0);
        let op = FnOperator::new("stamp", AccessSet::new().set(t), move |ctx| {
            let stamp = ctx.step_id().0 as f64 * ctx.dt();
            ctx.write(t)?[0] = stamp;
            Ok(())
        });
        let data = run_once(&op, &store).unwrap();
        assert_eq!(data.read(t).unwrap(), &[0.001]);
        assert!(op.fuse_key(&store).is_none());
    }

    #[test]
    fn closure_errors_propagate() {
        let mut store = sigflow_store::SignalStore::new();
        let t = scalar(&mut store, "t", 0.0);
        let op = FnOperator::new("boom", AccessSet::new().set(t), |_| {
            Err(OperatorError::ExecutionFailed {
                reason: "boom".into(),
            })
        });
        assert!(run_once(&op, &store).is_err());
        assert!(format!("{op:?}").contains("boom"));
    }
}
