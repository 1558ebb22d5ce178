//! Persisted stepper state.
//!
//! A [`Checkpoint`] is a JSON [`Manifest`] describing every base signal plus
//! a flat little-endian blob of their values. `F64` signals take 8 bytes
//! per element, `F32` signals 4. The blob is covered by a CRC32.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use sigflow_core::{Dtype, StepId};
use sigflow_store::{SignalData, SignalStore};

/// Manifest format written by this version.
pub const FORMAT_VERSION: u32 = 1;

// ── CheckpointError ────────────────────────────────────────────────

/// Errors from encoding, decoding, or restoring a checkpoint.
#[derive(Debug, Error)]
pub enum CheckpointError {
    /// The JSON encoding could not be produced or parsed.
    #[error("manifest: {0}")]
    Json(#[from] serde_json::Error),
    /// The manifest was written by an unknown format version.
    #[error("unsupported checkpoint format {found}")]
    UnsupportedFormat {
        /// Version found in the manifest.
        found: u32,
    },
    /// The checkpoint holds a different number of base signals.
    #[error("checkpoint has {found} signals, model has {expected}")]
    SignalCountMismatch {
        /// Base signals in the model.
        expected: usize,
        /// Entries in the manifest.
        found: usize,
    },
    /// A manifest entry does not describe the model's signal.
    #[error("checkpoint entry {index} ('{found}') does not match signal '{expected}'")]
    SignalMismatch {
        /// Position in the manifest.
        index: usize,
        /// Name of the model's signal.
        expected: String,
        /// Name recorded in the manifest.
        found: String,
    },
    /// The blob is shorter or longer than the manifest describes.
    #[error("checkpoint blob is {found} bytes, expected {expected}")]
    Truncated {
        /// Bytes described by the manifest.
        expected: usize,
        /// Bytes present.
        found: usize,
    },
    /// The blob does not match its checksum.
    #[error("checkpoint checksum mismatch: expected {expected:#010x}, computed {computed:#010x}")]
    ChecksumMismatch {
        /// Checksum recorded in the manifest.
        expected: u32,
        /// Checksum of the blob present.
        computed: u32,
    },
}

// ── Manifest ───────────────────────────────────────────────────────

/// One base signal in the blob.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SignalEntry {
    /// Signal name.
    pub name: String,
    /// Signal shape.
    pub shape: Vec<usize>,
    /// `"f32"` or `"f64"`.
    pub dtype: String,
    /// Byte offset into the blob.
    pub offset: usize,
    /// Element count.
    pub len: usize,
}

/// Describes the contents of a checkpoint blob.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Format version.
    pub format: u32,
    /// Steps completed when the checkpoint was taken.
    pub step: u64,
    /// Simulation time in seconds.
    pub time: f64,
    /// Base signals in declaration order.
    pub signals: Vec<SignalEntry>,
    /// Blob length in bytes.
    pub blob_len: usize,
    /// CRC32 of the blob.
    pub checksum: u32,
}

// ── Checkpoint ─────────────────────────────────────────────────────

/// A snapshot of every base signal plus the step counter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Blob description.
    pub manifest: Manifest,
    /// Little-endian signal values.
    pub blob: Vec<u8>,
}

impl Checkpoint {
    pub(crate) fn capture(store: &SignalStore, data: &SignalData, step: StepId, time: f64) -> Self {
        let mut blob = Vec::with_capacity(data.memory_bytes());
        let mut signals = Vec::new();
        for (id, values) in data.bases() {
            let (name, shape, dtype) = match store.meta(id) {
                Ok(meta) => (meta.name.clone(), meta.shape.to_vec(), meta.dtype),
                Err(_) => continue,
            };
            signals.push(SignalEntry {
                name,
                shape,
                dtype: dtype.to_string(),
                offset: blob.len(),
                len: values.len(),
            });
            match dtype {
                Dtype::F32 => {
                    for &v in values {
                        blob.extend_from_slice(&(v as f32).to_le_bytes());
                    }
                }
                Dtype::F64 => {
                    for &v in values {
                        blob.extend_from_slice(&v.to_le_bytes());
                    }
                }
            }
        }
        Self {
            manifest: Manifest {
                format: FORMAT_VERSION,
                step: step.0,
                time,
                signals,
                blob_len: blob.len(),
                checksum: crc32fast::hash(&blob),
            },
            blob,
        }
    }

    /// Validate against `store` and overwrite `data`. Returns the step.
    ///
    /// Nothing is written unless every check passes.
    pub(crate) fn apply(
        &self,
        store: &SignalStore,
        data: &mut SignalData,
    ) -> Result<StepId, CheckpointError> {
        let m = &self.manifest;
        if m.format != FORMAT_VERSION {
            return Err(CheckpointError::UnsupportedFormat { found: m.format });
        }
        if self.blob.len() != m.blob_len {
            return Err(CheckpointError::Truncated {
                expected: m.blob_len,
                found: self.blob.len(),
            });
        }
        let computed = crc32fast::hash(&self.blob);
        if computed != m.checksum {
            return Err(CheckpointError::ChecksumMismatch {
                expected: m.checksum,
                computed,
            });
        }

        let bases: Vec<_> = store.bases().collect();
        if bases.len() != m.signals.len() {
            return Err(CheckpointError::SignalCountMismatch {
                expected: bases.len(),
                found: m.signals.len(),
            });
        }

        let mut decoded = Vec::with_capacity(bases.len());
        let mut expected_len = 0;
        for (index, (&id, entry)) in bases.iter().zip(&m.signals).enumerate() {
            let meta = store.meta(id).map_err(|_| CheckpointError::SignalMismatch {
                index,
                expected: String::new(),
                found: entry.name.clone(),
            })?;
            let matches = meta.name == entry.name
                && meta.shape.as_slice() == entry.shape.as_slice()
                && meta.dtype.to_string() == entry.dtype
                && meta.size() == entry.len
                && entry.offset == expected_len;
            if !matches {
                return Err(CheckpointError::SignalMismatch {
                    index,
                    expected: meta.name.clone(),
                    found: entry.name.clone(),
                });
            }
            let width = meta.dtype.width();
            let end = entry.offset + entry.len * width;
            let bytes = self
                .blob
                .get(entry.offset..end)
                .ok_or(CheckpointError::Truncated {
                    expected: end,
                    found: self.blob.len(),
                })?;
            decoded.push((id, decode(meta.dtype, bytes)));
            expected_len = end;
        }
        if expected_len != self.blob.len() {
            return Err(CheckpointError::Truncated {
                expected: expected_len,
                found: self.blob.len(),
            });
        }

        for (id, values) in decoded {
            if let Some(buf) = data.base_mut(id) {
                buf.copy_from_slice(&values);
            }
        }
        Ok(StepId(m.step))
    }

    /// Steps completed when the checkpoint was taken.
    pub fn step(&self) -> StepId {
        StepId(self.manifest.step)
    }

    /// Simulation time when the checkpoint was taken.
    pub fn time(&self) -> f64 {
        self.manifest.time
    }

    /// Encode as a single JSON document.
    pub fn to_json(&self) -> Result<String, CheckpointError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode a document produced by [`to_json`](Self::to_json).
    ///
    /// Only the encoding is checked here; the contents are validated by
    /// [`Stepper::restore`](crate::Stepper::restore).
    pub fn from_json(json: &str) -> Result<Self, CheckpointError> {
        Ok(serde_json::from_str(json)?)
    }
}

fn decode(dtype: Dtype, bytes: &[u8]) -> Vec<f64> {
    match dtype {
        Dtype::F32 => bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]) as f64)
            .collect(),
        Dtype::F64 => bytes
            .chunks_exact(8)
            .map(|c| {
                let mut b = [0u8; 8];
                b.copy_from_slice(c);
                f64::from_le_bytes(b)
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sigflow_store::Initial;

    fn store() -> SignalStore {
        let mut store = SignalStore::new();
        store
            .allocate("a", &[3], Dtype::F64, Initial::Values(vec![1.0, 2.0, 3.0]))
            .unwrap();
        store
            .allocate("b", &[2], Dtype::F32, Initial::Values(vec![0.5, 0.25]))
            .unwrap();
        store
    }

    #[test]
    fn layout_uses_dtype_widths() {
        let store = store();
        let data = store.instantiate();
        let cp = Checkpoint::capture(&store, &data, StepId(7), 0.7);
        assert_eq!(cp.blob.len(), 3 * 8 + 2 * 4);
        assert_eq!(cp.manifest.signals[1].offset, 24);
        assert_eq!(cp.manifest.signals[1].dtype, "f32");
        assert_eq!(cp.step(), StepId(7));
    }

    #[test]
    fn apply_restores_values() {
        let store = store();
        let data = store.instantiate();
        let cp = Checkpoint::capture(&store, &data, StepId(2), 0.2);

        let mut other = store.instantiate();
        other.base_mut(sigflow_core::SignalId(0)).unwrap().fill(9.0);
        assert_eq!(cp.apply(&store, &mut other).unwrap(), StepId(2));
        assert_eq!(
            other.read(sigflow_core::SignalId(0)).unwrap(),
            &[1.0, 2.0, 3.0]
        );
    }

    #[test]
    fn corrupted_blob_rejected() {
        let store = store();
        let mut data = store.instantiate();
        let mut cp = Checkpoint::capture(&store, &data, StepId(0), 0.0);
        cp.blob[0] ^= 0xff;
        assert!(matches!(
            cp.apply(&store, &mut data),
            Err(CheckpointError::ChecksumMismatch { .. })
        ));

        let mut cp = Checkpoint::capture(&store, &data, StepId(0), 0.0);
        cp.blob.pop();
        assert!(matches!(
            cp.apply(&store, &mut data),
            Err(CheckpointError::Truncated { .. })
        ));
    }

    #[test]
    fn other_model_rejected() {
        let store = store();
        let data = store.instantiate();
        let cp = Checkpoint::capture(&store, &data, StepId(0), 0.0);

        let mut renamed = SignalStore::new();
        renamed
            .allocate("z", &[3], Dtype::F64, Initial::Zeros)
            .unwrap();
        renamed
            .allocate("b", &[2], Dtype::F32, Initial::Zeros)
            .unwrap();
        let mut target = renamed.instantiate();
        assert!(matches!(
            cp.apply(&renamed, &mut target),
            Err(CheckpointError::SignalMismatch { index: 0, .. })
        ));

        let mut smaller = SignalStore::new();
        smaller.allocate("a", &[3], Dtype::F64, Initial::Zeros).unwrap();
        let mut target = smaller.instantiate();
        assert!(matches!(
            cp.apply(&smaller, &mut target),
            Err(CheckpointError::SignalCountMismatch {
                expected: 1,
                found: 2
            })
        ));
    }

    #[test]
    fn json_encoding_and_version_check() {
        let store = store();
        let mut data = store.instantiate();
        let cp = Checkpoint::capture(&store, &data, StepId(1), 0.1);
        let decoded = Checkpoint::from_json(&cp.to_json().unwrap()).unwrap();
        assert_eq!(decoded, cp);

        let mut future = cp;
        future.manifest.format = FORMAT_VERSION + 1;
        assert!(matches!(
            future.apply(&store, &mut data),
            Err(CheckpointError::UnsupportedFormat { .. })
        ));
        assert!(Checkpoint::from_json("{not json").is_err());
    }
}
