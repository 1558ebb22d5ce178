//! Operator trait, dependency resolution and operator fusion.
//!
//! Operators declare which signals they read, set, increment and update.
//! [`resolve`] derives the dependency edges from those declarations and
//! produces one fixed [`Schedule`]; [`merge_operators`] is an optional
//! rewrite pass that batches independent, compatible operators.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod context;
pub mod error;
pub mod graph;
pub mod merge;
pub mod operator;
mod opset;
pub mod resolve;

pub use context::StepContext;
pub use error::GraphError;
pub use graph::DependencyGraph;
pub use merge::{merge_operators, MergeReport};
pub use operator::{downcast_ref, AsAny, FuseKey, Operator};
pub use resolve::{resolve, Schedule};
