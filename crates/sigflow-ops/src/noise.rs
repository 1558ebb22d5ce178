//! Seeded additive noise.
//!
//! Deterministic: the RNG is a ChaCha8 stream seeded from `seed XOR step`
//! each step, so identical seeds replay identical noise.
//!
//! Constructed via the builder pattern: [`NoiseInc::builder`].
//!
//! ```
//! use sigflow_core::Dtype;
//! use sigflow_ops::noise::{NoiseInc, NoiseKind};
//! use sigflow_store::{Initial, SignalStore};
//!
//! let mut store = SignalStore::new();
//! let x = store.allocate("x", &[8], Dtype::F64, Initial::Zeros).unwrap();
//! let op = NoiseInc::builder()
//!     .dst(x)
//!     .kind(NoiseKind::Gaussian)
//!     .scale(0.5)
//!     .seed(42)
//!     .build(&store)
//!     .unwrap();
//! assert_eq!(op.scale(), 0.5);
//! ```

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use sigflow_core::{AccessSet, OperatorError, SignalId};
use sigflow_graph::{Operator, StepContext};
use sigflow_store::SignalStore;

use crate::support::{label, size_of};

/// Distribution of the added noise.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NoiseKind {
    /// `v += scale * U(-1, 1)`.
    #[default]
    Uniform,
    /// `v += scale * N(0, 1)` (Box-Muller transform).
    Gaussian,
}

/// Increments `dst` with seeded noise every step. Never fuses.
#[derive(Debug)]
pub struct NoiseInc {
    name: String,
    dst: SignalId,
    kind: NoiseKind,
    scale: f64,
    seed: u64,
    access: AccessSet,
}

/// Builder for [`NoiseInc`].
///
/// Required: `dst`.
#[derive(Debug, Default)]
pub struct NoiseIncBuilder {
    dst: Option<SignalId>,
    kind: NoiseKind,
    scale: Option<f64>,
    seed: u64,
}

impl NoiseInc {
    /// A builder with uniform noise, scale 1 and seed 0.
    pub fn builder() -> NoiseIncBuilder {
        NoiseIncBuilder::default()
    }

    /// Noise amplitude.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Base seed.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    fn gaussian(rng: &mut ChaCha8Rng) -> f64 {
        let u1: f64 = rng.random::<f64>().max(1e-300);
        let u2: f64 = rng.random();
        (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
    }
}

impl NoiseIncBuilder {
    /// Signal receiving the noise.
    pub fn dst(mut self, dst: SignalId) -> Self {
        self.dst = Some(dst);
        self
    }

    /// Noise distribution (default: uniform).
    pub fn kind(mut self, kind: NoiseKind) -> Self {
        self.kind = kind;
        self
    }

    /// Amplitude (default: 1). Half-range for uniform noise, standard
    /// deviation for Gaussian.
    pub fn scale(mut self, scale: f64) -> Self {
        self.scale = Some(scale);
        self
    }

    /// Base seed (default: 0).
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Build the operator.
    ///
    /// # Errors
    ///
    /// [`OperatorError::InvalidParameter`] if `dst` is missing or `scale`
    /// is negative or not finite; [`OperatorError::SignalUnavailable`] if
    /// `dst` is unknown to `store`.
    pub fn build(self, store: &SignalStore) -> Result<NoiseInc, OperatorError> {
        let dst = self.dst.ok_or_else(|| OperatorError::InvalidParameter {
            reason: "noise target is required".to_string(),
        })?;
        let scale = self.scale.unwrap_or(1.0);
        if !scale.is_finite() || scale < 0.0 {
            return Err(OperatorError::InvalidParameter {
                reason: format!("noise scale must be finite and >= 0, got {scale}"),
            });
        }
        size_of(store, dst)?;
        Ok(NoiseInc {
            name: label("NoiseInc", store, dst),
            dst,
            kind: self.kind,
            scale,
            seed: self.seed,
            access: AccessSet::new().increment(dst),
        })
    }
}

impl Operator for NoiseInc {
    fn name(&self) -> &str {
        &self.name
    }

    fn access(&self) -> &AccessSet {
        &self.access
    }

    fn step(&self, ctx: &mut StepContext<'_>) -> Result<(), OperatorError> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed ^ ctx.step_id().0);
        let out = ctx.write(self.dst)?;
        match self.kind {
            NoiseKind::Uniform => {
                for v in out.iter_mut() {
                    *v += self.scale * (rng.random::<f64>() * 2.0 - 1.0);
                }
            }
            NoiseKind::Gaussian => {
                for v in out.iter_mut() {
                    *v += self.scale * Self::gaussian(&mut rng);
                }
            }
        }
        Ok(())
    }
}
