//! Model declaration and compilation.
//!
//! [`ModelBuilder`] collects signals, operators and probes, then
//! [`finalize`](ModelBuilder::finalize) validates them and produces an
//! immutable [`CompiledModel`]:
//!
//! 1. validate the [`ModelConfig`] and every probe;
//! 2. resolve the declared operators (all graph errors surface here);
//! 3. if enabled, run the fusion pass and resolve the fused list again.
//!
//! Every model owns a reserved scalar `time` signal. Operators may read it
//! but never write it; the stepper advances it after each step.

use indexmap::IndexMap;
use tracing::{debug, info, instrument};

use sigflow_core::{Dtype, OperatorId, ProbeId, SignalId};
use sigflow_graph::{merge_operators, resolve, Operator, Schedule};
use sigflow_store::{Initial, SignalStore, StoreError};

use crate::config::{CompileError, ModelConfig};
use crate::probe::ProbeConfig;

/// Handle to a declared operator (its declaration index).
pub type OperatorHandle = OperatorId;

/// Handle to a declared probe.
pub type ProbeHandle = ProbeId;

/// Name of the reserved time signal.
pub const TIME_SIGNAL: &str = "time";

// ── ModelBuilder ───────────────────────────────────────────────────

/// Collects the pieces of a model before compilation.
///
/// ```
/// use sigflow_core::Dtype;
/// use sigflow_engine::{ModelBuilder, ModelConfig, ProbeConfig};
/// use sigflow_ops::{Integrate, Reset};
/// use sigflow_store::Initial;
///
/// let mut b = ModelBuilder::new(ModelConfig::default());
/// let drive = b.declare_signal("drive", &[], Dtype::F64, Initial::Zeros).unwrap();
/// let x = b.declare_signal("x", &[], Dtype::F64, Initial::Zeros).unwrap();
/// let reset = Reset::new(b.store(), drive, 1.0).unwrap();
/// let integrate = Integrate::new(b.store(), x, drive, 1.0).unwrap();
/// b.declare_operator(Box::new(reset));
/// b.declare_operator(Box::new(integrate));
/// b.declare_probe(ProbeConfig::new(x));
///
/// let model = b.finalize().unwrap();
/// assert_eq!(model.operators().len(), 2);
/// ```
pub struct ModelBuilder {
    config: ModelConfig,
    store: SignalStore,
    operators: Vec<Box<dyn Operator>>,
    probes: Vec<ProbeConfig>,
    time: SignalId,
}

impl ModelBuilder {
    /// An empty model holding only the reserved `time` signal.
    pub fn new(config: ModelConfig) -> Self {
        let (store, time) = SignalStore::with_readonly_scalar(TIME_SIGNAL);
        Self {
            config,
            store,
            operators: Vec::new(),
            probes: Vec::new(),
            time,
        }
    }

    /// Declare a writable signal.
    pub fn declare_signal(
        &mut self,
        name: impl Into<String>,
        shape: &[usize],
        dtype: Dtype,
        initial: Initial,
    ) -> Result<SignalId, StoreError> {
        self.store.allocate(name, shape, dtype, initial)
    }

    /// Declare a signal operators may read but never write.
    pub fn declare_readonly(
        &mut self,
        name: impl Into<String>,
        shape: &[usize],
        dtype: Dtype,
        initial: Initial,
    ) -> Result<SignalId, StoreError> {
        self.store.allocate_readonly(name, shape, dtype, initial)
    }

    /// Declare a view over `size(shape)` elements of `base` from `offset`.
    pub fn declare_view(
        &mut self,
        base: SignalId,
        shape: &[usize],
        offset: usize,
    ) -> Result<SignalId, StoreError> {
        self.store.view(base, shape, offset)
    }

    /// Add an operator.
    pub fn declare_operator(&mut self, op: Box<dyn Operator>) -> OperatorHandle {
        let handle = OperatorId(self.operators.len() as u32);
        debug!(operator = op.name(), index = handle.0, "operator declared");
        self.operators.push(op);
        handle
    }

    /// Add a probe. Validated by [`finalize`](Self::finalize).
    pub fn declare_probe(&mut self, probe: ProbeConfig) -> ProbeHandle {
        let handle = ProbeId(self.probes.len() as u32);
        self.probes.push(probe);
        handle
    }

    /// The reserved time signal (scalar, F64, seconds).
    pub fn time_signal(&self) -> SignalId {
        self.time
    }

    /// The signals declared so far, for constructing operators.
    pub fn store(&self) -> &SignalStore {
        &self.store
    }

    /// The configuration this model will compile with.
    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Validate, resolve and optionally fuse.
    ///
    /// # Errors
    ///
    /// Any [`CompileError`]; compilation stops at the first failure.
    #[instrument(skip_all, fields(operators = self.operators.len(), fuse = self.config.fuse))]
    pub fn finalize(self) -> Result<CompiledModel, CompileError> {
        let Self {
            config,
            mut store,
            operators,
            probes,
            time,
        } = self;

        config.validate()?;
        for (index, probe) in probes.iter().enumerate() {
            if !store.contains(probe.target) {
                return Err(CompileError::UnknownProbeTarget {
                    probe: index,
                    signal: probe.target,
                });
            }
            probe
                .validate()
                .map_err(|reason| CompileError::InvalidProbe {
                    probe: index,
                    reason,
                })?;
        }

        let declared = operators.len();
        let mut schedule = resolve(&operators, &store)?;
        let mut operators = operators;
        if config.fuse {
            let (merged, report) = merge_operators(operators, &mut store)?;
            operators = merged;
            if report.groups > 0 {
                schedule = resolve(&operators, &store)?;
            }
            debug!(
                before = report.before,
                after = report.after,
                groups = report.groups,
                "fusion pass complete"
            );
        }

        let names = store
            .iter()
            .map(|(id, meta)| (meta.name.clone(), id))
            .collect();

        info!(
            signals = store.len(),
            declared,
            scheduled = operators.len(),
            levels = schedule.levels().len(),
            probes = probes.len(),
            "model compiled"
        );

        Ok(CompiledModel {
            config,
            store,
            operators,
            schedule,
            probes,
            time,
            declared,
            names,
        })
    }
}

// ── CompiledModel ──────────────────────────────────────────────────

/// An immutable, validated model.
///
/// Shared read-only (usually behind an `Arc`) by every stepper created
/// from it. Operator indices in [`schedule`](Self::schedule) refer to
/// [`operators`](Self::operators), which is the fused list when fusion
/// ran.
pub struct CompiledModel {
    config: ModelConfig,
    store: SignalStore,
    operators: Vec<Box<dyn Operator>>,
    schedule: Schedule,
    probes: Vec<ProbeConfig>,
    time: SignalId,
    declared: usize,
    names: IndexMap<String, SignalId>,
}

impl CompiledModel {
    /// The configuration used to compile.
    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Signal metadata and initial values.
    pub fn store(&self) -> &SignalStore {
        &self.store
    }

    /// The executed operators.
    pub fn operators(&self) -> &[Box<dyn Operator>] {
        &self.operators
    }

    /// The resolved execution order.
    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    /// Declared probes, indexed by [`ProbeHandle`].
    pub fn probes(&self) -> &[ProbeConfig] {
        &self.probes
    }

    /// The reserved time signal.
    pub fn time_signal(&self) -> SignalId {
        self.time
    }

    /// Number of operators declared before fusion.
    pub fn declared_operators(&self) -> usize {
        self.declared
    }

    /// Look up a signal by name. Later declarations shadow earlier ones.
    pub fn signal_named(&self, name: &str) -> Option<SignalId> {
        self.names.get(name).copied()
    }

    /// Operators in execution order.
    pub fn scheduled(&self) -> impl Iterator<Item = &dyn Operator> + '_ {
        self.schedule
            .order()
            .iter()
            .map(|&i| self.operators[i].as_ref())
    }
}

impl std::fmt::Debug for CompiledModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledModel")
            .field("config", &self.config)
            .field("signals", &self.store.len())
            .field("operators", &self.operators.len())
            .field("declared", &self.declared)
            .field("probes", &self.probes.len())
            .finish()
    }
}
