//! Reusable operator fixtures.
//!
//! - [`IdentityOperator`]: reads one signal and sets another to it.
//! - [`ConstOperator`]: sets a signal to a constant.
//! - [`IncrementOperator`]: adds a constant into a signal.
//! - [`CounterOperator`]: updates a signal to its previous value plus one.
//! - [`FailingOperator`]: fails deterministically after N calls.
//! - [`NanOperator`]: sets a signal to NaN.

use std::sync::atomic::{AtomicUsize, Ordering};

use sigflow_core::{AccessSet, OperatorError, SignalId};
use sigflow_graph::{Operator, StepContext};

/// Sets `output` to the current value of `input`.
pub struct IdentityOperator {
    pub name: String,
    pub input: SignalId,
    pub output: SignalId,
    access: AccessSet,
}

impl IdentityOperator {
    pub fn new(name: impl Into<String>, input: SignalId, output: SignalId) -> Self {
        Self {
            name: name.into(),
            input,
            output,
            access: AccessSet::new().read(input).set(output),
        }
    }
}

impl Operator for IdentityOperator {
    fn name(&self) -> &str {
        &self.name
    }

    fn access(&self) -> &AccessSet {
        &self.access
    }

    fn step(&self, ctx: &mut StepContext<'_>) -> Result<(), OperatorError> {
        let input = ctx.read(self.input)?.to_vec();
        let output = ctx.write(self.output)?;
        if output.len() != input.len() {
            return Err(OperatorError::ShapeMismatch {
                signal: self.output,
                expected: input.len(),
                actual: output.len(),
            });
        }
        output.copy_from_slice(&input);
        Ok(())
    }
}

/// Sets every element of `output` to `value` (no reads).
pub struct ConstOperator {
    pub name: String,
    pub output: SignalId,
    pub value: f64,
    access: AccessSet,
}

impl ConstOperator {
    pub fn new(name: impl Into<String>, output: SignalId, value: f64) -> Self {
        Self {
            name: name.into(),
            output,
            value,
            access: AccessSet::new().set(output),
        }
    }
}

impl Operator for ConstOperator {
    fn name(&self) -> &str {
        &self.name
    }

    fn access(&self) -> &AccessSet {
        &self.access
    }

    fn step(&self, ctx: &mut StepContext<'_>) -> Result<(), OperatorError> {
        ctx.write(self.output)?.fill(self.value);
        Ok(())
    }
}

/// Adds `amount` to every element of `target`.
pub struct IncrementOperator {
    pub name: String,
    pub target: SignalId,
    pub amount: f64,
    access: AccessSet,
}

impl IncrementOperator {
    pub fn new(name: impl Into<String>, target: SignalId, amount: f64) -> Self {
        Self {
            name: name.into(),
            target,
            amount,
            access: AccessSet::new().increment(target),
        }
    }
}

impl Operator for IncrementOperator {
    fn name(&self) -> &str {
        &self.name
    }

    fn access(&self) -> &AccessSet {
        &self.access
    }

    fn step(&self, ctx: &mut StepContext<'_>) -> Result<(), OperatorError> {
        for v in ctx.write(self.target)?.iter_mut() {
            *v += self.amount;
        }
        Ok(())
    }
}

/// Updates `target` to its previous-step value plus one.
pub struct CounterOperator {
    pub name: String,
    pub target: SignalId,
    access: AccessSet,
}

impl CounterOperator {
    pub fn new(name: impl Into<String>, target: SignalId) -> Self {
        Self {
            name: name.into(),
            target,
            access: AccessSet::new().update(target),
        }
    }
}

impl Operator for CounterOperator {
    fn name(&self) -> &str {
        &self.name
    }

    fn access(&self) -> &AccessSet {
        &self.access
    }

    fn step(&self, ctx: &mut StepContext<'_>) -> Result<(), OperatorError> {
        for v in ctx.write(self.target)?.iter_mut() {
            *v += 1.0;
        }
        Ok(())
    }
}

/// Fails deterministically after a configurable number of successful calls.
///
/// On success, sets `output` to the call index. Uses `AtomicUsize` for the
/// call counter so it satisfies `Sync`.
pub struct FailingOperator {
    pub name: String,
    pub output: SignalId,
    pub succeed_count: usize,
    call_count: AtomicUsize,
    access: AccessSet,
}

impl FailingOperator {
    /// An operator that succeeds `succeed_count` times then fails.
    pub fn new(name: impl Into<String>, output: SignalId, succeed_count: usize) -> Self {
        Self {
            name: name.into(),
            output,
            succeed_count,
            call_count: AtomicUsize::new(0),
            access: AccessSet::new().set(output),
        }
    }

    /// How many times `step()` has been called.
    pub fn calls(&self) -> usize {
        self.call_count.load(Ordering::Relaxed)
    }
}

impl Operator for FailingOperator {
    fn name(&self) -> &str {
        &self.name
    }

    fn access(&self) -> &AccessSet {
        &self.access
    }

    fn step(&self, ctx: &mut StepContext<'_>) -> Result<(), OperatorError> {
        let n = self.call_count.fetch_add(1, Ordering::Relaxed);
        if n >= self.succeed_count {
            return Err(OperatorError::ExecutionFailed {
                reason: format!(
                    "deliberate failure after {} successful calls",
                    self.succeed_count
                ),
            });
        }
        ctx.write(self.output)?.fill(n as f64);
        Ok(())
    }
}

/// Sets `output` to NaN from step `from_step` onwards, zero before.
pub struct NanOperator {
    pub name: String,
    pub output: SignalId,
    pub from_step: u64,
    access: AccessSet,
}

impl NanOperator {
    pub fn new(name: impl Into<String>, output: SignalId, from_step: u64) -> Self {
        Self {
            name: name.into(),
            output,
            from_step,
            access: AccessSet::new().set(output),
        }
    }
}

impl Operator for NanOperator {
    fn name(&self) -> &str {
        &self.name
    }

    fn access(&self) -> &AccessSet {
        &self.access
    }

    fn step(&self, ctx: &mut StepContext<'_>) -> Result<(), OperatorError> {
        let value = if ctx.step_id().0 >= self.from_step {
            f64::NAN
        } else {
            0.0
        };
        ctx.write(self.output)?.fill(value);
        Ok(())
    }
}
