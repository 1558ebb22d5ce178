//! Model compilation and execution for sigflow.
//!
//! [`ModelBuilder`] turns declared signals, operators and probes into a
//! validated [`CompiledModel`]; a [`Stepper`] executes it one step at a
//! time, recording probes and producing [`StepMetrics`]. Steppers can be
//! saved and restored through [`Checkpoint`]s.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod builder;
pub mod checkpoint;
pub mod config;
pub mod metrics;
pub mod probe;
pub mod stepper;

pub use builder::{CompiledModel, ModelBuilder, OperatorHandle, ProbeHandle, TIME_SIGNAL};
pub use checkpoint::{Checkpoint, CheckpointError, Manifest, SignalEntry, FORMAT_VERSION};
pub use config::{CompileError, ConfigError, ModelConfig};
pub use metrics::StepMetrics;
pub use probe::{ProbeConfig, ProbeData};
pub use stepper::{Stepper, StepperState};
