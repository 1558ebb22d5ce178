//! Reference operators for sigflow.
//!
//! A small library of operators that exercise every access kind and the
//! fusion pass end to end. Models needing other transfer functions
//! implement [`Operator`](sigflow_graph::Operator) directly or wrap a
//! closure in [`FnOperator`].
//!
//! | Operator | Access | Fuses |
//! |---|---|---|
//! | [`Reset`] | set `dst` | equal values |
//! | [`CopySignal`] | read `src`; set or increment `dst` | equal modes |
//! | [`ElementwiseInc`] | read `a`, `x`; increment `y` | non-broadcast |
//! | [`DotInc`] | read `a`, `x`; increment `y` | never |
//! | [`Integrate`] | read `input`; update `state` | equal scales |
//! | [`Lowpass`] | read `input`; update `output` | equal time constants |
//! | [`NoiseInc`] | increment `dst` | never |
//! | [`FnOperator`] | any | never |
//!
//! Constructors validate signal sizes against the
//! [`SignalStore`](sigflow_store::SignalStore) and name the operator after
//! its target.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod copy;
pub mod dot;
pub mod elementwise;
pub mod func;
pub mod integrate;
pub mod lowpass;
pub mod noise;
pub mod reset;
mod support;

pub use copy::{CopyMode, CopySignal};
pub use dot::DotInc;
pub use elementwise::ElementwiseInc;
pub use func::FnOperator;
pub use integrate::Integrate;
pub use lowpass::Lowpass;
pub use noise::{NoiseInc, NoiseKind};
pub use reset::Reset;
