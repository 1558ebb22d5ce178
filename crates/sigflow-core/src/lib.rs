//! Core types for the sigflow dataflow simulator.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! vocabulary shared by every other crate in the workspace: strongly-typed
//! identifiers, signal shapes and element types, the four operator access
//! kinds, and the step-time error types.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod access;
pub mod error;
pub mod id;
pub mod signal;

pub use access::{AccessKind, AccessSet};
pub use error::{OperatorError, StepError};
pub use id::{OperatorId, ProbeId, SignalId, StepId};
pub use signal::{shape_size, Dtype, Shape};
