//! Sets a signal to a constant every step.
//!
//! # Construction
//!
//! ```
//! use sigflow_core::Dtype;
//! use sigflow_ops::Reset;
//! use sigflow_store::{Initial, SignalStore};
//!
//! let mut store = SignalStore::new();
//! let x = store.allocate("x", &[3], Dtype::F64, Initial::Zeros).unwrap();
//! let op = Reset::new(&store, x, 0.5).unwrap();
//! assert_eq!(op.value(), 0.5);
//! ```

use sigflow_core::{AccessSet, OperatorError, SignalId};
use sigflow_graph::{FuseKey, Operator, StepContext};
use sigflow_store::SignalStore;

use crate::support::{batch, downcast_all, dtype_of, fused_label, label, size_of};

/// Fills `dst` with `value`.
#[derive(Debug)]
pub struct Reset {
    name: String,
    dst: SignalId,
    value: f64,
    access: AccessSet,
    fused: usize,
}

impl Reset {
    /// Create a `Reset` of `dst`.
    ///
    /// # Errors
    ///
    /// [`OperatorError::SignalUnavailable`] if `dst` is unknown.
    pub fn new(store: &SignalStore, dst: SignalId, value: f64) -> Result<Self, OperatorError> {
        size_of(store, dst)?;
        Ok(Self {
            name: label("Reset", store, dst),
            dst,
            value,
            access: AccessSet::new().set(dst),
            fused: 1,
        })
    }

    /// Override the operator name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// The target signal.
    pub fn dst(&self) -> SignalId {
        self.dst
    }

    /// The fill value.
    pub fn value(&self) -> f64 {
        self.value
    }
}

impl Operator for Reset {
    fn name(&self) -> &str {
        &self.name
    }

    fn access(&self) -> &AccessSet {
        &self.access
    }

    fn step(&self, ctx: &mut StepContext<'_>) -> Result<(), OperatorError> {
        ctx.write(self.dst)?.fill(self.value);
        Ok(())
    }

    fn fuse_key(&self, store: &SignalStore) -> Option<FuseKey> {
        let dtype = dtype_of(store, self.dst)?;
        Some(FuseKey::new("Reset", dtype).with_param(self.value))
    }

    fn fuse(&self, members: &[&dyn Operator], store: &mut SignalStore) -> Option<Box<dyn Operator>> {
        let resets = downcast_all::<Reset>(members)?;
        let dst = batch(store, &resets, |r| r.dst)?;
        Some(Box::new(Reset {
            name: fused_label(&self.name, members.len()),
            dst,
            value: self.value,
            access: AccessSet::new().set(dst),
            fused: resets.iter().map(|r| r.fused).sum(),
        }))
    }

    fn fused_count(&self) -> usize {
        self.fused
    }
}
