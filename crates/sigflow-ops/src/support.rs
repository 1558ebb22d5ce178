//! Shared helpers for constructing and fusing reference operators.

use sigflow_core::{Dtype, OperatorError, SignalId};
use sigflow_graph::{downcast_ref, Operator};
use sigflow_store::SignalStore;

/// Element count of a signal known to `store`.
pub(crate) fn size_of(store: &SignalStore, signal: SignalId) -> Result<usize, OperatorError> {
    store
        .meta(signal)
        .map(|m| m.size())
        .map_err(|_| OperatorError::SignalUnavailable { signal })
}

/// Fail unless `signal` holds exactly `expected` elements.
pub(crate) fn expect_size(
    store: &SignalStore,
    signal: SignalId,
    expected: usize,
) -> Result<(), OperatorError> {
    let actual = size_of(store, signal)?;
    if actual != expected {
        return Err(OperatorError::ShapeMismatch {
            signal,
            expected,
            actual,
        });
    }
    Ok(())
}

pub(crate) fn dtype_of(store: &SignalStore, signal: SignalId) -> Option<Dtype> {
    store.meta(signal).ok().map(|m| m.dtype)
}

/// Default operator name: `Kind[target]`.
pub(crate) fn label(kind: &str, store: &SignalStore, target: SignalId) -> String {
    format!("{kind}[{}]", store.name(target))
}

/// Name of a fused operator standing in for `members` operators.
pub(crate) fn fused_label(leader: &str, members: usize) -> String {
    format!("{leader}+{}", members.saturating_sub(1))
}

/// Downcast every fusion member, or `None` if any has another type.
pub(crate) fn downcast_all<'a, T: Operator>(members: &[&'a dyn Operator]) -> Option<Vec<&'a T>> {
    members.iter().map(|&m| downcast_ref::<T>(m)).collect()
}

/// Batch one signal per member into a single covering view.
pub(crate) fn batch<T>(
    store: &mut SignalStore,
    members: &[&T],
    pick: impl Fn(&T) -> SignalId,
) -> Option<SignalId> {
    let ids: Vec<SignalId> = members.iter().map(|&m| pick(m)).collect();
    store.concat(&ids)
}
