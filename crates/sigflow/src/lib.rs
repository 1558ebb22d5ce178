//! sigflow: deterministic signal-flow simulation.
//!
//! Declare shaped numeric signals and the operators that read, set,
//! increment or update them. sigflow derives one fixed execution order
//! from those declarations, optionally fuses compatible operators, and
//! steps the model while probes record time series.
//!
//! This is the facade crate re-exporting the public API of the sigflow
//! sub-crates.
//!
//! # Quick start
//!
//! ```rust
//! use std::sync::Arc;
//! use sigflow::prelude::*;
//!
//! let mut b = ModelBuilder::new(ModelConfig::default().with_dt(0.001));
//! let stim = b.declare_signal("stim", &[4], Dtype::F64, Initial::Zeros).unwrap();
//! let out = b.declare_signal("out", &[4], Dtype::F64, Initial::Zeros).unwrap();
//!
//! let drive = Reset::new(b.store(), stim, 1.0).unwrap();
//! let filter = Lowpass::new(b.store(), stim, out, 0.005).unwrap();
//! b.declare_operator(Box::new(drive));
//! b.declare_operator(Box::new(filter));
//! let probe = b.declare_probe(ProbeConfig::new(out).every(10));
//!
//! let mut stepper = Stepper::new(Arc::new(b.finalize().unwrap()));
//! stepper.run(0.1).unwrap();
//!
//! let data = stepper.probe_data(probe).unwrap();
//! assert_eq!(data.len(), 11);
//! assert!(data.last().unwrap()[0] > 0.99);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `sigflow-core` | IDs, dtypes, access sets, step errors |
//! | [`store`] | `sigflow-store` | Signal allocation, views, runtime buffers |
//! | [`graph`] | `sigflow-graph` | Operator trait, resolver, fusion pass |
//! | [`ops`] | `sigflow-ops` | Reference operators |
//! | [`engine`] | `sigflow-engine` | Builder, stepper, probes, checkpoints |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types and IDs (`sigflow-core`).
pub use sigflow_core as types;

/// Signal allocation and alias bookkeeping (`sigflow-store`).
pub use sigflow_store as store;

/// Operator trait, dependency resolution and fusion (`sigflow-graph`).
///
/// Implement [`graph::Operator`] to add custom operators.
pub use sigflow_graph as graph;

/// Reference operators (`sigflow-ops`).
pub use sigflow_ops as ops;

/// Model compilation and execution (`sigflow-engine`).
pub use sigflow_engine as engine;

/// Common imports for typical sigflow usage.
///
/// ```rust
/// use sigflow::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use sigflow_core::{AccessKind, AccessSet, Dtype, OperatorError, SignalId, StepError};

    // Store
    pub use sigflow_store::{Initial, SignalStore};

    // Operators
    pub use sigflow_graph::{GraphError, Operator, StepContext};
    pub use sigflow_ops::{
        CopyMode, CopySignal, DotInc, ElementwiseInc, FnOperator, Integrate, Lowpass, NoiseInc,
        NoiseKind, Reset,
    };

    // Engine
    pub use sigflow_engine::{
        Checkpoint, CompileError, CompiledModel, ModelBuilder, ModelConfig, ProbeConfig,
        ProbeData, StepMetrics, Stepper, StepperState,
    };
}
