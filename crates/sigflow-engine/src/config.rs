//! Model configuration, validation, and compile errors.
//!
//! [`ModelConfig`] is the builder input controlling time discretization,
//! the fusion pass, and runtime checks. [`validate()`](ModelConfig::validate)
//! runs first thing in [`ModelBuilder::finalize`](crate::ModelBuilder::finalize).

use thiserror::Error;

use sigflow_core::SignalId;
use sigflow_graph::GraphError;
use sigflow_store::StoreError;

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected during [`ModelConfig::validate()`].
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ConfigError {
    /// `dt` is NaN, infinite, zero, or negative.
    #[error("dt must be finite and positive, got {value}")]
    InvalidDt {
        /// The invalid value.
        value: f64,
    },
}

// ── CompileError ───────────────────────────────────────────────────

/// Errors from [`ModelBuilder::finalize`](crate::ModelBuilder::finalize).
///
/// All are fatal: no [`CompiledModel`](crate::CompiledModel) is produced.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum CompileError {
    /// Configuration validation failed.
    #[error("config: {0}")]
    Config(#[from] ConfigError),
    /// Signal declaration failed.
    #[error("store: {0}")]
    Store(#[from] StoreError),
    /// Dependency resolution or fusion failed.
    #[error("graph: {0}")]
    Graph(#[from] GraphError),
    /// A probe targets an unknown signal.
    #[error("probe {probe} targets unknown signal {signal}")]
    UnknownProbeTarget {
        /// Index of the probe in declaration order.
        probe: usize,
        /// The unknown signal.
        signal: SignalId,
    },
    /// A probe has a zero period or an invalid filter constant.
    #[error("probe {probe}: {reason}")]
    InvalidProbe {
        /// Index of the probe in declaration order.
        probe: usize,
        /// What was wrong.
        reason: String,
    },
}

// ── ModelConfig ────────────────────────────────────────────────────

/// Complete configuration for compiling a model.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelConfig {
    /// Simulation step in seconds. Default: 0.001.
    pub dt: f64,
    /// Run the operator fusion pass. Default: true.
    pub fuse: bool,
    /// Scan every written signal for NaN or infinity after each operator.
    /// Default: false.
    pub check_finite: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            dt: 0.001,
            fuse: true,
            check_finite: false,
        }
    }
}

impl ModelConfig {
    /// Validate all structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.dt.is_finite() || self.dt <= 0.0 {
            return Err(ConfigError::InvalidDt { value: self.dt });
        }
        Ok(())
    }

    /// Set `dt`.
    pub fn with_dt(mut self, dt: f64) -> Self {
        self.dt = dt;
        self
    }

    /// Enable or disable the fusion pass.
    pub fn with_fusion(mut self, fuse: bool) -> Self {
        self.fuse = fuse;
        self
    }

    /// Enable or disable finite-value checking.
    pub fn with_finite_check(mut self, check: bool) -> Self {
        self.check_finite = check;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn default_config_is_valid() {
        let cfg = ModelConfig::default();
        assert!(cfg.validate().is_ok());
        assert!(cfg.fuse);
        assert!(!cfg.check_finite);
    }

    #[test]
    fn invalid_dt_rejected() {
        for dt in [0.0, -0.1, f64::NAN, f64::INFINITY] {
            let cfg = ModelConfig::default().with_dt(dt);
            assert!(
                matches!(cfg.validate(), Err(ConfigError::InvalidDt { .. })),
                "dt {dt} accepted"
            );
        }
    }

    #[test]
    fn compile_error_wraps_sources() {
        let err: CompileError = GraphError::EmptyGraph.into();
        assert_eq!(err.to_string(), "graph: model has no operators");
        assert!(err.source().is_some());

        let err: CompileError = ConfigError::InvalidDt { value: 0.0 }.into();
        assert!(matches!(err, CompileError::Config(_)));
    }
}
