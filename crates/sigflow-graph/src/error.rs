//! Compile-time graph validity errors.
//!
//! Every variant is fatal for the model being compiled. Operators and
//! signals are named so the authoring model can be diagnosed.

use thiserror::Error;

use sigflow_core::SignalId;

/// Errors from dependency resolution.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum GraphError {
    /// No operators were declared.
    #[error("model has no operators")]
    EmptyGraph,

    /// An operator references a signal the store does not know.
    #[error("operator '{operator}' references unknown signal {signal}")]
    UnknownSignal {
        /// The referencing operator.
        operator: String,
        /// The unknown id.
        signal: SignalId,
    },

    /// An operator declares the same signal more than once.
    #[error("operator '{operator}' declares signal '{signal}' under more than one access kind")]
    InvalidAccess {
        /// The offending operator.
        operator: String,
        /// The duplicated signal.
        signal: String,
    },

    /// An operator writes a readonly signal.
    #[error("operator '{operator}' writes readonly signal '{signal}'")]
    ReadonlyWrite {
        /// The offending operator.
        operator: String,
        /// The readonly signal.
        signal: String,
    },

    /// Two operators set overlapping memory.
    #[error("signal '{signal}' is set by both '{first}' and '{second}'")]
    MultipleSetter {
        /// The contested signal (as declared by the second setter).
        signal: String,
        /// Earlier setter in declaration order.
        first: String,
        /// Later setter in declaration order.
        second: String,
    },

    /// Two operators update overlapping memory.
    #[error("signal '{signal}' is updated by both '{first}' and '{second}'")]
    MultipleUpdater {
        /// The contested signal (as declared by the second updater).
        signal: String,
        /// Earlier updater in declaration order.
        first: String,
        /// Later updater in declaration order.
        second: String,
    },

    /// One operator sets memory that another updates.
    #[error("signal '{signal}' is set by '{setter}' and updated by '{updater}'")]
    SetUpdateConflict {
        /// The contested signal.
        signal: String,
        /// The setting operator.
        setter: String,
        /// The updating operator.
        updater: String,
    },

    /// A writable signal is read but nothing sets, increments or updates it.
    #[error("operator '{operator}' reads signal '{signal}' which no operator writes")]
    UnsetRead {
        /// The reading operator.
        operator: String,
        /// The never-written signal.
        signal: String,
    },

    /// Same-step reads and writes form a cycle.
    #[error("cyclic dependency among operators: {}", .cycle.join(" -> "))]
    CyclicDependency {
        /// Operators on the cycle, in dependency order.
        cycle: Vec<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_message_lists_operators() {
        let err = GraphError::CyclicDependency {
            cycle: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(
            err.to_string(),
            "cyclic dependency among operators: a -> b -> a"
        );
    }

    #[test]
    fn multiple_setter_message() {
        let err = GraphError::MultipleSetter {
            signal: "x".into(),
            first: "p".into(),
            second: "q".into(),
        };
        assert_eq!(err.to_string(), "signal 'x' is set by both 'p' and 'q'");
    }
}
