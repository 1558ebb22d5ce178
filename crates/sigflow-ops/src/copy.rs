//! Copies one signal into another.

use std::fmt;

use sigflow_core::{AccessSet, OperatorError, SignalId};
use sigflow_graph::{FuseKey, Operator, StepContext};
use sigflow_store::SignalStore;

use crate::support::{batch, downcast_all, dtype_of, expect_size, fused_label, label, size_of};

/// How [`CopySignal`] writes its destination.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CopyMode {
    /// Overwrite: `dst = src`.
    Set,
    /// Accumulate: `dst += src`.
    Increment,
}

impl fmt::Display for CopyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Set => write!(f, "set"),
            Self::Increment => write!(f, "inc"),
        }
    }
}

/// Copies `src` into `dst`, either overwriting or accumulating.
///
/// Both signals must hold the same number of elements; shapes may differ.
#[derive(Debug)]
pub struct CopySignal {
    name: String,
    src: SignalId,
    dst: SignalId,
    mode: CopyMode,
    access: AccessSet,
    fused: usize,
}

impl CopySignal {
    /// Create a copy from `src` to `dst`.
    ///
    /// # Errors
    ///
    /// [`OperatorError::ShapeMismatch`] if the element counts differ.
    pub fn new(
        store: &SignalStore,
        src: SignalId,
        dst: SignalId,
        mode: CopyMode,
    ) -> Result<Self, OperatorError> {
        expect_size(store, dst, size_of(store, src)?)?;
        Ok(Self::assemble(label("Copy", store, dst), src, dst, mode, 1))
    }

    fn assemble(name: String, src: SignalId, dst: SignalId, mode: CopyMode, fused: usize) -> Self {
        let access = match mode {
            CopyMode::Set => AccessSet::new().read(src).set(dst),
            CopyMode::Increment => AccessSet::new().read(src).increment(dst),
        };
        Self {
            name,
            src,
            dst,
            mode,
            access,
            fused,
        }
    }

    /// Override the operator name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Source signal.
    pub fn src(&self) -> SignalId {
        self.src
    }

    /// Destination signal.
    pub fn dst(&self) -> SignalId {
        self.dst
    }

    /// Write mode.
    pub fn mode(&self) -> CopyMode {
        self.mode
    }
}

impl Operator for CopySignal {
    fn name(&self) -> &str {
        &self.name
    }

    fn access(&self) -> &AccessSet {
        &self.access
    }

    fn step(&self, ctx: &mut StepContext<'_>) -> Result<(), OperatorError> {
        let src = ctx.read(self.src)?.to_vec();
        let dst = ctx.write(self.dst)?;
        match self.mode {
            CopyMode::Set => dst.copy_from_slice(&src),
            CopyMode::Increment => {
                for (d, s) in dst.iter_mut().zip(&src) {
                    *d += s;
                }
            }
        }
        Ok(())
    }

    fn fuse_key(&self, store: &SignalStore) -> Option<FuseKey> {
        let dtype = dtype_of(store, self.dst)?;
        let tag = match self.mode {
            CopyMode::Set => 0,
            CopyMode::Increment => 1,
        };
        Some(FuseKey::new("Copy", dtype).with_tag(tag))
    }

    fn fuse(&self, members: &[&dyn Operator], store: &mut SignalStore) -> Option<Box<dyn Operator>> {
        let copies = downcast_all::<CopySignal>(members)?;
        let src = batch(store, &copies, |c| c.src)?;
        let dst = batch(store, &copies, |c| c.dst)?;
        Some(Box::new(Self::assemble(
            fused_label(&self.name, members.len()),
            src,
            dst,
            self.mode,
            copies.iter().map(|c| c.fused).sum(),
        )))
    }

    fn fused_count(&self) -> usize {
        self.fused
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sigflow_core::Dtype;
    use sigflow_store::Initial;
    use sigflow_test_utils::{run_once, vector};

    #[test]
    fn set_overwrites_destination() {
        let mut store = SignalStore::new();
        let a = vector(&mut store, "a", &[1.0, 2.0]);
        let b = vector(&mut store, "b", &[9.0, 9.0]);
        let op = CopySignal::new(&store, a, b, CopyMode::Set).unwrap();
        assert_eq!(op.access().sets(), &[b]);
        let data = run_once(&op, &store).unwrap();
        assert_eq!(data.read(b).unwrap(), &[1.0, 2.0]);
    }

    #[test]
    fn increment_accumulates() {
        let mut store = SignalStore::new();
        let a = vector(&mut store, "a", &[1.0, 2.0]);
        let b = vector(&mut store, "b", &[10.0, 20.0]);
        let op = CopySignal::new(&store, a, b, CopyMode::Increment).unwrap();
        assert_eq!(op.access().increments(), &[b]);
        let data = run_once(&op, &store).unwrap();
        assert_eq!(data.read(b).unwrap(), &[11.0, 22.0]);
    }

    #[test]
    fn reshaping_copy_allowed_size_mismatch_rejected() {
        let mut store = SignalStore::new();
        let a = store.allocate("a", &[2, 2], Dtype::F64, Initial::Zeros).unwrap();
        let b = store.allocate("b", &[4], Dtype::F64, Initial::Zeros).unwrap();
        let c = store.allocate("c", &[3], Dtype::F64, Initial::Zeros).unwrap();
        assert!(CopySignal::new(&store, a, b, CopyMode::Set).is_ok());
        assert_eq!(
            CopySignal::new(&store, a, c, CopyMode::Set).unwrap_err(),
            OperatorError::ShapeMismatch {
                signal: c,
                expected: 4,
                actual: 3
            }
        );
    }

    #[test]
    fn modes_do_not_share_a_key() {
        let mut store = SignalStore::new();
        let a = vector(&mut store, "a", &[0.0]);
        let b = vector(&mut store, "b", &[0.0]);
        let set = CopySignal::new(&store, a, b, CopyMode::Set).unwrap();
        let inc = CopySignal::new(&store, a, b, CopyMode::Increment).unwrap();
        assert_ne!(set.fuse_key(&store), inc.fuse_key(&store));
    }
}
