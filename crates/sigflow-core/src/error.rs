//! Step-time error types.
//!
//! Compile-time failures live next to the code that detects them
//! (`sigflow-store`, `sigflow-graph`, `sigflow-engine`); this module holds
//! the errors that every operator and the stepper share at run time.

use thiserror::Error;

use crate::id::SignalId;

/// Errors raised by an individual operator, either while it is built or by
/// its `step()`.
///
/// Step-time errors are wrapped in [`StepError::OperatorFailed`] by the
/// stepper.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum OperatorError {
    /// The operator's computation failed.
    #[error("execution failed: {reason}")]
    ExecutionFailed {
        /// Human-readable description of the failure.
        reason: String,
    },
    /// A construction parameter is outside the operator's domain.
    #[error("invalid parameter: {reason}")]
    InvalidParameter {
        /// Which parameter was rejected and why.
        reason: String,
    },
    /// A signal the operator needs is not present in the step context.
    #[error("signal {signal} is not available")]
    SignalUnavailable {
        /// The missing signal.
        signal: SignalId,
    },
    /// A signal has a different element count than the operator expects.
    #[error("signal {signal} has {actual} elements, expected {expected}")]
    ShapeMismatch {
        /// The mismatched signal.
        signal: SignalId,
        /// Element count the operator expected.
        expected: usize,
        /// Element count found.
        actual: usize,
    },
    /// The operator produced a value outside its domain.
    #[error("non-finite value in signal {signal} at element {index}")]
    NonFinite {
        /// The signal holding the value.
        signal: SignalId,
        /// Element index of the first offending value.
        index: usize,
    },
}

/// Errors surfaced by `Stepper::step()`.
///
/// Every variant is fatal for the current run: writes applied before the
/// failure are not rolled back.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum StepError {
    /// An operator returned an error.
    #[error("operator '{operator}' (schedule position {position}) failed: {reason}")]
    OperatorFailed {
        /// Name of the failing operator.
        operator: String,
        /// Position of the operator in the schedule.
        position: usize,
        /// The underlying operator error.
        #[source]
        reason: OperatorError,
    },
    /// Finite-value checking found a NaN or infinity after an operator ran.
    #[error("operator '{operator}' wrote non-finite value to signal '{signal}' at element {index}")]
    NonFinite {
        /// Name of the operator that wrote the value.
        operator: String,
        /// Name of the offending signal.
        signal: String,
        /// Element index of the first offending value.
        index: usize,
    },
    /// The stepper has been closed (or halted by a previous failure).
    #[error("stepper is halted")]
    Halted,
    /// The stepper has not finished initialization.
    #[error("stepper is not initialized")]
    Uninitialized,
    /// A run duration was negative or not finite.
    #[error("run duration must be finite and >= 0, got {duration}")]
    InvalidDuration {
        /// The rejected duration in seconds.
        duration: f64,
    },
}
