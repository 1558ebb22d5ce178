//! Store-specific error types.

use thiserror::Error;

use sigflow_core::{Shape, SignalId};

/// Errors that can occur while declaring signals.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A view would extend past the end of its base buffer.
    #[error(
        "view of '{base}' covers elements {offset}..{end} but the base holds {base_len}",
        end = .offset + .len
    )]
    Alias {
        /// Name of the base signal.
        base: String,
        /// Element count of the base buffer.
        base_len: usize,
        /// Requested offset in elements.
        offset: usize,
        /// Requested view length in elements.
        len: usize,
    },
    /// A shape contains a zero-sized dimension.
    #[error("signal '{name}' has invalid shape {shape:?}: dimensions must be positive")]
    InvalidShape {
        /// Name of the signal.
        name: String,
        /// The rejected shape.
        shape: Shape,
    },
    /// The initial value does not match the signal's element count.
    #[error("signal '{name}' holds {expected} elements but {actual} initial values were given")]
    InitialValueMismatch {
        /// Name of the signal.
        name: String,
        /// Element count of the shape.
        expected: usize,
        /// Number of values supplied.
        actual: usize,
    },
    /// A signal id that was never allocated on this store.
    #[error("unknown signal: {signal}")]
    UnknownSignal {
        /// The unrecognised id.
        signal: SignalId,
    },
    /// The store ran out of 32-bit signal ids.
    #[error("signal count exceeds u32::MAX")]
    TooManySignals,
}
