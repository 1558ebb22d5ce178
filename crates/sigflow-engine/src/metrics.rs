//! Per-step performance metrics.
//!
//! [`StepMetrics`] captures timing and memory data for a single step.

use sigflow_core::StepId;

/// Timing and memory metrics collected during a single step.
///
/// All durations are in microseconds. The stepper returns these from each
/// `step()` call and keeps the most recent set.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StepMetrics {
    /// The step these metrics describe.
    pub step: StepId,
    /// Wall-clock time for the entire step, in microseconds.
    pub total_us: u64,
    /// Per-operator execution times in schedule order: `(name, microseconds)`.
    pub operator_us: Vec<(String, u64)>,
    /// Time spent recording probes, in microseconds.
    pub probe_us: u64,
    /// Bytes held by signal buffers.
    pub memory_bytes: usize,
}

impl StepMetrics {
    /// Sum of per-operator times, in microseconds.
    pub fn operators_total_us(&self) -> u64 {
        self.operator_us.iter().map(|(_, us)| us).sum()
    }
}
