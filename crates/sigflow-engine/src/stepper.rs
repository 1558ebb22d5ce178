//! The run-time driver of a compiled model.
//!
//! A [`Stepper`] owns one set of signal buffers and executes the resolved
//! schedule against them, one step at a time. Several steppers may share
//! the same [`CompiledModel`] through an `Arc`.
//!
//! # States
//!
//! ```text
//! Uninitialized ──initial samples──▶ Ready ──step()──▶ Running ──close()/failure──▶ Halted
//!                                      ▲                                              │
//!                                      └──────────────────reset()─────────────────────┘
//! ```
//!
//! [`Stepper::new`] allocates buffers in `Uninitialized` and takes the
//! initial probe samples before returning, so callers first observe
//! `Ready`.
//!
//! Errors are fatal for the current run. Writes made by operators before a
//! failure are kept; call [`reset`](Stepper::reset) to start over.

use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info, trace, warn};

use sigflow_core::{Dtype, ProbeId, SignalId, StepError, StepId};
use sigflow_graph::StepContext;
use sigflow_store::SignalData;

use crate::builder::CompiledModel;
use crate::checkpoint::{Checkpoint, CheckpointError};
use crate::metrics::StepMetrics;
use crate::probe::{ProbeData, ProbeRecorder};

// Compile-time assertion: steppers move between threads, models are shared.
const _: () = {
    #[allow(dead_code)]
    fn assert_send<T: Send>() {}
    #[allow(dead_code)]
    fn assert_sync<T: Send + Sync>() {}
    #[allow(dead_code)]
    fn check() {
        assert_send::<Stepper>();
        assert_sync::<CompiledModel>();
    }
};

/// Lifecycle state of a [`Stepper`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepperState {
    /// Buffers hold their initial values but probes have not sampled
    /// them. Steps are refused.
    Uninitialized,
    /// Initial values loaded; no step taken.
    Ready,
    /// At least one step has completed.
    Running,
    /// Closed, or stopped by a failure. Only `reset()` or `restore()` leave
    /// this state.
    Halted,
}

// ── Stepper ────────────────────────────────────────────────────────

/// Executes a [`CompiledModel`].
///
/// ```
/// use std::sync::Arc;
/// use sigflow_core::Dtype;
/// use sigflow_engine::{ModelBuilder, ModelConfig, ProbeConfig, Stepper};
/// use sigflow_ops::Reset;
/// use sigflow_store::Initial;
///
/// let mut b = ModelBuilder::new(ModelConfig::default().with_dt(0.1));
/// let x = b.declare_signal("x", &[], Dtype::F64, Initial::Zeros).unwrap();
/// let reset = Reset::new(b.store(), x, 2.0).unwrap();
/// b.declare_operator(Box::new(reset));
/// let probe = b.declare_probe(ProbeConfig::new(x));
///
/// let mut stepper = Stepper::new(Arc::new(b.finalize().unwrap()));
/// stepper.run(0.3).unwrap();
/// assert_eq!(stepper.step_count().0, 3);
/// assert_eq!(stepper.probe_data(probe).unwrap().values(), &[0.0, 2.0, 2.0, 2.0]);
/// ```
pub struct Stepper {
    model: Arc<CompiledModel>,
    data: SignalData,
    probes: ProbeRecorder,
    state: StepperState,
    step: StepId,
    last_metrics: StepMetrics,
}

impl Stepper {
    /// Allocate buffers, take the initial probe samples and enter `Ready`.
    pub fn new(model: Arc<CompiledModel>) -> Self {
        let data = model.store().instantiate();
        let probes = ProbeRecorder::new(model.probes(), &data);
        let mut stepper = Self {
            model,
            data,
            probes,
            state: StepperState::Uninitialized,
            step: StepId(0),
            last_metrics: StepMetrics::default(),
        };
        stepper.initialize();
        info!(
            operators = stepper.model.operators().len(),
            memory_bytes = stepper.data.memory_bytes(),
            "stepper initialized"
        );
        stepper
    }

    /// Sample the current (initial) buffers at step 0 and enter `Ready`.
    fn initialize(&mut self) {
        self.step = StepId(0);
        self.probes.restart(&self.data, self.step);
        self.last_metrics = StepMetrics::default();
        self.state = StepperState::Ready;
    }

    /// Execute one step.
    ///
    /// # Errors
    ///
    /// [`StepError::Halted`] or [`StepError::Uninitialized`] outside
    /// `Ready`/`Running`. An operator failure or a non-finite write (with
    /// [`check_finite`](crate::ModelConfig::check_finite)) halts the
    /// stepper.
    pub fn step(&mut self) -> Result<StepMetrics, StepError> {
        match self.state {
            StepperState::Halted => return Err(StepError::Halted),
            StepperState::Uninitialized => return Err(StepError::Uninitialized),
            StepperState::Ready | StepperState::Running => {}
        }

        let step_start = Instant::now();
        let model = Arc::clone(&self.model);
        let dt = model.config().dt;
        let next = self.step.next();
        let time = self.step.0 as f64 * dt;

        let order = model.schedule().order();
        let mut operator_us = Vec::with_capacity(order.len());
        for (position, &index) in order.iter().enumerate() {
            let op = model.operators()[index].as_ref();
            let op_start = Instant::now();
            let mut ctx = StepContext::new(&mut self.data, op.access(), next, time, dt);
            if let Err(reason) = op.step(&mut ctx) {
                error!(operator = op.name(), position, %reason, "operator failed; stepper halted");
                self.state = StepperState::Halted;
                return Err(StepError::OperatorFailed {
                    operator: op.name().to_string(),
                    position,
                    reason,
                });
            }

            for signal in op.access().writes() {
                if self.data.dtype(signal) == Some(Dtype::F32) {
                    if let Some(values) = self.data.write(signal) {
                        for v in values.iter_mut() {
                            *v = Dtype::F32.quantize(*v);
                        }
                    }
                }
                if model.config().check_finite {
                    if let Some(index) = self.data.first_non_finite(signal) {
                        let signal_name = model.store().name(signal).to_string();
                        error!(operator = op.name(), signal = %signal_name, index, "non-finite value; stepper halted");
                        self.state = StepperState::Halted;
                        return Err(StepError::NonFinite {
                            operator: op.name().to_string(),
                            signal: signal_name,
                            index,
                        });
                    }
                }
            }
            operator_us.push((op.name().to_string(), op_start.elapsed().as_micros() as u64));
        }

        if let Some(t) = self.data.write(model.time_signal()) {
            t[0] = next.0 as f64 * dt;
        }
        self.step = next;
        self.state = StepperState::Running;

        let probe_start = Instant::now();
        self.probes.record(&self.data, next, dt);
        let probe_us = probe_start.elapsed().as_micros() as u64;

        let metrics = StepMetrics {
            step: next,
            total_us: step_start.elapsed().as_micros() as u64,
            operator_us,
            probe_us,
            memory_bytes: self.data.memory_bytes(),
        };
        trace!(step = next.0, total_us = metrics.total_us, "step complete");
        self.last_metrics = metrics.clone();
        Ok(metrics)
    }

    /// Advance by `duration` seconds: `ceil(duration / dt)` steps, where a
    /// ratio within `1e-9` of an integer counts as that integer.
    ///
    /// Returns the number of steps taken.
    pub fn run(&mut self, duration: f64) -> Result<u64, StepError> {
        if !duration.is_finite() || duration < 0.0 {
            return Err(StepError::InvalidDuration { duration });
        }
        let ratio = duration / self.model.config().dt;
        let nearest = ratio.round();
        let steps = if (ratio - nearest).abs() < 1e-9 {
            nearest
        } else {
            ratio.ceil()
        };
        self.run_steps(steps as u64)
    }

    /// Execute `n` steps. Returns `n`.
    pub fn run_steps(&mut self, n: u64) -> Result<u64, StepError> {
        match self.state {
            StepperState::Halted => return Err(StepError::Halted),
            StepperState::Uninitialized => return Err(StepError::Uninitialized),
            StepperState::Ready | StepperState::Running => {}
        }
        for _ in 0..n {
            self.step()?;
        }
        Ok(n)
    }

    /// Samples recorded by a probe.
    pub fn probe_data(&self, probe: ProbeId) -> Option<&ProbeData> {
        self.probes.data(probe)
    }

    /// Current contents of a signal.
    pub fn signal(&self, signal: SignalId) -> Option<&[f64]> {
        self.data.read(signal)
    }

    /// Current contents of a signal looked up by name.
    pub fn signal_named(&self, name: &str) -> Option<&[f64]> {
        self.model
            .signal_named(name)
            .and_then(|id| self.data.read(id))
    }

    /// Simulation time in seconds.
    pub fn time(&self) -> f64 {
        self.step.0 as f64 * self.model.config().dt
    }

    /// Steps completed since the last reset.
    pub fn step_count(&self) -> StepId {
        self.step
    }

    /// Current lifecycle state.
    pub fn state(&self) -> StepperState {
        self.state
    }

    /// Metrics from the most recent successful step.
    pub fn last_metrics(&self) -> &StepMetrics {
        &self.last_metrics
    }

    /// The model this stepper executes.
    pub fn model(&self) -> &Arc<CompiledModel> {
        &self.model
    }

    /// Stop the stepper. Further steps fail with [`StepError::Halted`].
    pub fn close(&mut self) {
        if self.state != StepperState::Halted {
            info!(step = self.step.0, "stepper closed");
        }
        self.state = StepperState::Halted;
    }

    /// Restore initial values, clear probe data and return to `Ready`.
    pub fn reset(&mut self) {
        self.model.store().restore_initial(&mut self.data);
        self.state = StepperState::Uninitialized;
        self.initialize();
        info!("stepper reset");
    }

    /// Capture every signal and the step counter.
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint::capture(self.model.store(), &self.data, self.step, self.time())
    }

    /// Load a checkpoint taken from a stepper of the same model.
    ///
    /// Probe history restarts at the restored step. On error nothing
    /// changes.
    pub fn restore(&mut self, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
        self.step = checkpoint.apply(self.model.store(), &mut self.data)?;
        let expected = self.time();
        if (checkpoint.time() - expected).abs() > 1e-9 * expected.abs().max(1.0) {
            warn!(
                recorded = checkpoint.time(),
                expected,
                "checkpoint time does not match step * dt; time follows the step count"
            );
        }
        self.probes.restart(&self.data, self.step);
        self.last_metrics = StepMetrics::default();
        self.state = if self.step.0 == 0 {
            StepperState::Ready
        } else {
            StepperState::Running
        };
        info!(step = self.step.0, "stepper restored");
        Ok(())
    }
}

impl std::fmt::Debug for Stepper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stepper")
            .field("state", &self.state)
            .field("step", &self.step)
            .finish_non_exhaustive()
    }
}
