//! Strongly-typed identifiers.

use std::fmt;

/// Identifies a signal within a signal store.
///
/// Signals are allocated sequentially; `SignalId(n)` is the n-th signal
/// (base buffer or view) declared on the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SignalId(pub u32);

impl SignalId {
    /// The id as a `usize` index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SignalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for SignalId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Identifies an operator by its insertion position in the builder.
///
/// Insertion order is the deterministic tie-breaker of the resolver, so
/// this id doubles as the operator's priority.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OperatorId(pub u32);

impl OperatorId {
    /// The id as a `usize` index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for OperatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for OperatorId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Identifies a probe registered on a model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProbeId(pub u32);

impl ProbeId {
    /// The id as a `usize` index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ProbeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonically increasing step counter.
///
/// `StepId(0)` is the initial state; each executed step increments it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StepId(pub u64);

impl StepId {
    /// The step that follows this one.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for StepId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_display_their_number() {
        assert_eq!(SignalId(7).to_string(), "7");
        assert_eq!(OperatorId(3).to_string(), "3");
        assert_eq!(ProbeId(1).to_string(), "1");
        assert_eq!(StepId(42).to_string(), "42");
    }

    #[test]
    fn step_next_increments() {
        assert_eq!(StepId(0).next(), StepId(1));
        assert_eq!(StepId::default(), StepId(0));
    }
}
