//! The [`Operator`] trait and fusion keys.
//!
//! Operators are stateless units of work executed in schedule order each
//! step. They declare their signal accesses once, at build time, and the
//! resolver derives the execution order from those declarations.

use std::any::Any;

use smallvec::SmallVec;

use sigflow_core::{AccessSet, Dtype, OperatorError};
use sigflow_store::SignalStore;

use crate::context::StepContext;

/// Upcast to [`Any`] so fusion can recover the concrete operator type.
///
/// Implemented for every `'static` type; operators never implement it
/// by hand.
pub trait AsAny {
    /// `self` as `&dyn Any`.
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Recover the concrete type of an operator.
///
/// Takes `&dyn Operator` rather than a box so the call dispatches
/// through the operator's vtable.
pub fn downcast_ref<T: Operator>(op: &dyn Operator) -> Option<&T> {
    op.as_any().downcast_ref::<T>()
}

/// Compatibility class of a fusable operator.
///
/// Two operators are candidates for fusion only if their keys are equal:
/// same kind, same dtype, and bit-identical parameters.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FuseKey {
    kind: &'static str,
    dtype: Dtype,
    params: SmallVec<[u64; 4]>,
}

impl FuseKey {
    /// A key for the given operator kind and dtype, with no parameters.
    pub fn new(kind: &'static str, dtype: Dtype) -> Self {
        Self {
            kind,
            dtype,
            params: SmallVec::new(),
        }
    }

    /// Add a floating-point parameter, compared bit for bit.
    pub fn with_param(mut self, value: f64) -> Self {
        self.params.push(value.to_bits());
        self
    }

    /// Add a discrete parameter.
    pub fn with_tag(mut self, tag: u64) -> Self {
        self.params.push(tag);
        self
    }

    /// The operator kind.
    pub fn kind(&self) -> &'static str {
        self.kind
    }
}

/// An atomic computation over signals.
///
/// # Contract
///
/// - `step()` MUST be deterministic and touch only the signals declared in
///   [`access()`](Operator::access); the [`StepContext`] refuses anything else.
/// - `&self`: operators hold signal ids, never buffers. Mutable state lives
///   in signals (usually as an *update* target).
/// - `access()` is consulted at build time; it must not change afterwards.
///
/// # Examples
///
/// ```
/// use sigflow_core::{AccessSet, OperatorError, SignalId};
/// use sigflow_graph::{Operator, StepContext};
///
/// struct Fill {
///     access: AccessSet,
///     value: f64,
/// }
///
/// impl Operator for Fill {
///     fn name(&self) -> &str { "fill" }
///     fn access(&self) -> &AccessSet { &self.access }
///     fn step(&self, ctx: &mut StepContext<'_>) -> Result<(), OperatorError> {
///         let dst = self.access.sets()[0];
///         ctx.write(dst)?.fill(self.value);
///         Ok(())
///     }
/// }
///
/// let op = Fill { access: AccessSet::new().set(SignalId(0)), value: 1.0 };
/// assert_eq!(op.name(), "fill");
/// assert!(op.fuse_key(&Default::default()).is_none());
/// ```
pub trait Operator: AsAny + Send + Sync + 'static {
    /// Human-readable name for error reporting and logs.
    fn name(&self) -> &str;

    /// The signals this operator reads, sets, increments and updates.
    fn access(&self) -> &AccessSet;

    /// Execute the operator for one step.
    fn step(&self, ctx: &mut StepContext<'_>) -> Result<(), OperatorError>;

    /// Fusion class, or `None` if the operator never fuses.
    fn fuse_key(&self, _store: &SignalStore) -> Option<FuseKey> {
        None
    }

    /// Build one operator doing the work of `members`.
    ///
    /// Called on `members[0]`. Every member has the same [`FuseKey`] and
    /// the members are mutually independent. Implementations batch member
    /// buffers with [`SignalStore::concat`] and return `None` when the
    /// buffers cannot be batched.
    fn fuse(&self, _members: &[&dyn Operator], _store: &mut SignalStore) -> Option<Box<dyn Operator>> {
        None
    }

    /// Number of declared operators this operator stands for.
    fn fused_count(&self) -> usize {
        1
    }
}
