//! Probe configuration and the per-step recorder.
//!
//! A probe observes one signal. Each step, after every operator has run,
//! the recorder advances each probe's optional lowpass filter exactly once
//! and, on steps that are a multiple of the probe's period, appends the
//! (filtered) value to the probe's time series. Probes never write
//! simulation signals.
//!
//! The value at step 0 (the initial state) is always recorded. After a
//! restore at step `k`, the restored value is recorded only if `k` is a
//! multiple of the period.

use sigflow_core::{ProbeId, SignalId, StepId};
use sigflow_store::SignalData;

/// Declaration of a probe.
///
/// ```
/// use sigflow_core::SignalId;
/// use sigflow_engine::ProbeConfig;
///
/// let probe = ProbeConfig::new(SignalId(3)).every(10).filtered(0.005);
/// assert_eq!(probe.period, 10);
/// assert_eq!(probe.tau, Some(0.005));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct ProbeConfig {
    /// The observed signal.
    pub target: SignalId,
    /// Sample every `period` steps. Must be at least 1.
    pub period: u64,
    /// Lowpass time constant in seconds, if filtered.
    pub tau: Option<f64>,
}

impl ProbeConfig {
    /// An unfiltered probe sampling every step.
    pub fn new(target: SignalId) -> Self {
        Self {
            target,
            period: 1,
            tau: None,
        }
    }

    /// Sample every `period` steps.
    pub fn every(mut self, period: u64) -> Self {
        self.period = period;
        self
    }

    /// Smooth samples with a lowpass filter of time constant `tau`.
    pub fn filtered(mut self, tau: f64) -> Self {
        self.tau = Some(tau);
        self
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        if self.period == 0 {
            return Err("sampling period must be at least 1 step".to_string());
        }
        if let Some(tau) = self.tau {
            if !tau.is_finite() || tau < 0.0 {
                return Err(format!("filter time constant must be finite and >= 0, got {tau}"));
            }
        }
        Ok(())
    }
}

/// Time series recorded by one probe.
///
/// Samples are stored flat: sample `i` occupies
/// `values[i * sample_len .. (i + 1) * sample_len]`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProbeData {
    sample_len: usize,
    steps: Vec<StepId>,
    values: Vec<f64>,
}

impl ProbeData {
    fn new(sample_len: usize) -> Self {
        Self {
            sample_len,
            steps: Vec::new(),
            values: Vec::new(),
        }
    }

    fn push(&mut self, step: StepId, sample: &[f64]) {
        self.steps.push(step);
        self.values.extend_from_slice(sample);
    }

    fn clear(&mut self) {
        self.steps.clear();
        self.values.clear();
    }

    /// Elements per sample (the target's size).
    pub fn sample_len(&self) -> usize {
        self.sample_len
    }

    /// Number of recorded samples.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Step at which each sample was taken.
    pub fn steps(&self) -> &[StepId] {
        &self.steps
    }

    /// All samples, flattened in recording order.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Sample `i`.
    pub fn sample(&self, i: usize) -> Option<&[f64]> {
        let start = i.checked_mul(self.sample_len)?;
        self.values.get(start..start + self.sample_len)
    }

    /// Iterate over samples in recording order.
    pub fn samples(&self) -> impl Iterator<Item = &[f64]> + '_ {
        self.values.chunks_exact(self.sample_len.max(1))
    }

    /// The most recent sample.
    pub fn last(&self) -> Option<&[f64]> {
        self.len().checked_sub(1).and_then(|i| self.sample(i))
    }
}

struct ProbeState {
    config: ProbeConfig,
    filter: Option<Vec<f64>>,
    data: ProbeData,
}

/// Records every probe of a model.
pub(crate) struct ProbeRecorder {
    probes: Vec<ProbeState>,
}

impl ProbeRecorder {
    /// Create an empty recorder sized from `data`. Call
    /// [`restart`](Self::restart) to take the first samples.
    pub(crate) fn new(configs: &[ProbeConfig], data: &SignalData) -> Self {
        let probes = configs
            .iter()
            .map(|config| {
                let sample_len = data.read(config.target).map_or(0, <[f64]>::len);
                ProbeState {
                    config: config.clone(),
                    filter: None,
                    data: ProbeData::new(sample_len),
                }
            })
            .collect();
        Self { probes }
    }

    /// Drop all samples, seed filters from the current values and record
    /// them if `step` is due.
    pub(crate) fn restart(&mut self, data: &SignalData, step: StepId) {
        for probe in &mut self.probes {
            probe.data.clear();
            let current = data.read(probe.config.target).unwrap_or(&[]);
            probe.filter = probe.config.tau.map(|_| current.to_vec());
            if step.0 % probe.config.period == 0 {
                probe.data.push(step, current);
            }
        }
    }

    /// Advance filters and append due samples after `step` completed.
    pub(crate) fn record(&mut self, data: &SignalData, step: StepId, dt: f64) {
        for probe in &mut self.probes {
            let current = data.read(probe.config.target).unwrap_or(&[]);
            if let (Some(state), Some(tau)) = (probe.filter.as_mut(), probe.config.tau) {
                let alpha = if tau <= 0.0 {
                    1.0
                } else {
                    1.0 - (-dt / tau).exp()
                };
                for (y, x) in state.iter_mut().zip(current) {
                    *y += alpha * (x - *y);
                }
            }
            if step.0 % probe.config.period == 0 {
                match &probe.filter {
                    Some(state) => probe.data.push(step, state),
                    None => probe.data.push(step, current),
                }
            }
        }
    }

    pub(crate) fn data(&self, probe: ProbeId) -> Option<&ProbeData> {
        self.probes.get(probe.index()).map(|p| &p.data)
    }
}
