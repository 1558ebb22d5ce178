//! Execution context passed to operators during a step.

use sigflow_core::{AccessSet, OperatorError, SignalId, StepId};
use sigflow_store::SignalData;

/// Execution context passed to each operator's `step()` method.
///
/// Access is checked against the operator's declared [`AccessSet`]:
/// [`read`](Self::read) accepts any declared signal, [`write`](Self::write)
/// only signals declared as set, increment or update. Update targets hold
/// the previous step's value when the operator runs.
///
/// Reads and writes borrow the context, so an operator copies its inputs
/// before taking a write slice.
pub struct StepContext<'a> {
    data: &'a mut SignalData,
    access: &'a AccessSet,
    step: StepId,
    time: f64,
    dt: f64,
}

impl<'a> StepContext<'a> {
    /// Construct a new step context.
    ///
    /// Called by the stepper; tests build one over a store's
    /// [`instantiate`](sigflow_store::SignalStore::instantiate)d buffers.
    pub fn new(
        data: &'a mut SignalData,
        access: &'a AccessSet,
        step: StepId,
        time: f64,
        dt: f64,
    ) -> Self {
        Self {
            data,
            access,
            step,
            time,
            dt,
        }
    }

    /// Current contents of a declared signal.
    pub fn read(&self, signal: SignalId) -> Result<&[f64], OperatorError> {
        if self.access.kind_of(signal).is_none() {
            return Err(OperatorError::SignalUnavailable { signal });
        }
        self.data
            .read(signal)
            .ok_or(OperatorError::SignalUnavailable { signal })
    }

    /// Mutable contents of a signal declared as set, increment or update.
    pub fn write(&mut self, signal: SignalId) -> Result<&mut [f64], OperatorError> {
        match self.access.kind_of(signal) {
            Some(kind) if kind.is_write() => {}
            _ => return Err(OperatorError::SignalUnavailable { signal }),
        }
        self.data
            .write(signal)
            .ok_or(OperatorError::SignalUnavailable { signal })
    }

    /// Step being executed (the first executed step is 1).
    pub fn step_id(&self) -> StepId {
        self.step
    }

    /// Simulation time at the start of this step, in seconds.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Step duration in seconds.
    pub fn dt(&self) -> f64 {
        self.dt
    }
}
