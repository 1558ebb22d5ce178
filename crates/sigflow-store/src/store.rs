//! The build-time [`SignalStore`].

use indexmap::IndexMap;
use smallvec::smallvec;

use sigflow_core::{shape_size, Dtype, Shape, SignalId};

use crate::data::SignalData;
use crate::error::StoreError;
use crate::meta::{Initial, Location, SignalMeta};

/// Allocator for base buffers and the alias table for their views.
///
/// Signals are never resized or freed. A view shares its base's storage:
/// writing through the view is visible through the base and through every
/// other overlapping view.
///
/// # Examples
///
/// ```
/// use sigflow_core::Dtype;
/// use sigflow_store::{Initial, SignalStore};
///
/// let mut store = SignalStore::new();
/// let base = store.allocate("x", &[4], Dtype::F64, Initial::Fill(1.0)).unwrap();
/// let tail = store.view(base, &[2], 2).unwrap();
/// assert!(store.may_share_memory(base, tail));
/// assert_eq!(store.read(tail).unwrap(), &[1.0, 1.0]);
/// assert!(store.view(base, &[3], 2).is_err());
/// ```
#[derive(Clone, Debug, Default)]
pub struct SignalStore {
    metas: Vec<SignalMeta>,
    /// Initial contents, keyed by base signal.
    initial: IndexMap<SignalId, Vec<f64>>,
}

impl SignalStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store holding a single readonly F64 scalar, zero-initialized.
    ///
    /// The scalar is always [`SignalId`] 0.
    pub fn with_readonly_scalar(name: impl Into<String>) -> (Self, SignalId) {
        let id = SignalId(0);
        let mut store = Self::new();
        store.metas.push(SignalMeta {
            name: name.into(),
            shape: Shape::new(),
            dtype: Dtype::F64,
            readonly: true,
            location: Location {
                base: id,
                range: 0..1,
            },
        });
        store.initial.insert(id, vec![0.0]);
        (store, id)
    }

    /// Allocate a new writable base buffer.
    pub fn allocate(
        &mut self,
        name: impl Into<String>,
        shape: &[usize],
        dtype: Dtype,
        initial: Initial,
    ) -> Result<SignalId, StoreError> {
        self.allocate_base(name.into(), shape, dtype, initial, false)
    }

    /// Allocate a base buffer that operators may only read.
    pub fn allocate_readonly(
        &mut self,
        name: impl Into<String>,
        shape: &[usize],
        dtype: Dtype,
        initial: Initial,
    ) -> Result<SignalId, StoreError> {
        self.allocate_base(name.into(), shape, dtype, initial, true)
    }

    fn allocate_base(
        &mut self,
        name: String,
        shape: &[usize],
        dtype: Dtype,
        initial: Initial,
        readonly: bool,
    ) -> Result<SignalId, StoreError> {
        if shape.contains(&0) {
            return Err(StoreError::InvalidShape {
                name,
                shape: Shape::from_slice(shape),
            });
        }
        let len = shape_size(shape);
        let values = match initial {
            Initial::Zeros => vec![0.0; len],
            Initial::Fill(v) => vec![dtype.quantize(v); len],
            Initial::Values(values) => {
                if values.len() != len {
                    return Err(StoreError::InitialValueMismatch {
                        name,
                        expected: len,
                        actual: values.len(),
                    });
                }
                values.into_iter().map(|v| dtype.quantize(v)).collect()
            }
        };
        let id = self.next_id()?;
        self.metas.push(SignalMeta {
            name,
            shape: Shape::from_slice(shape),
            dtype,
            readonly,
            location: Location {
                base: id,
                range: 0..len,
            },
        });
        self.initial.insert(id, values);
        Ok(id)
    }

    /// Declare a contiguous view aliasing `size(shape)` elements of `base`
    /// starting at element `offset`.
    ///
    /// `base` may itself be a view; the new view is flattened onto the
    /// underlying base buffer. Views inherit dtype and readonly flag.
    ///
    /// # Errors
    ///
    /// [`StoreError::Alias`] if the view would exceed the extent of
    /// `base`, [`StoreError::InvalidShape`] for a zero-sized dimension.
    pub fn view(
        &mut self,
        base: SignalId,
        shape: &[usize],
        offset: usize,
    ) -> Result<SignalId, StoreError> {
        let parent = self.meta(base)?.clone();
        let len = shape_size(shape);
        if shape.contains(&0) {
            return Err(StoreError::InvalidShape {
                name: format!("{}[view]", parent.name),
                shape: Shape::from_slice(shape),
            });
        }
        if offset + len > parent.size() {
            return Err(StoreError::Alias {
                base: parent.name.clone(),
                base_len: parent.size(),
                offset,
                len,
            });
        }
        let start = parent.location.range.start + offset;
        let location = Location {
            base: parent.location.base,
            range: start..start + len,
        };
        let id = self.next_id()?;
        self.metas.push(SignalMeta {
            name: format!("{}[{}..{}]", parent.name, offset, offset + len),
            shape: Shape::from_slice(shape),
            dtype: parent.dtype,
            readonly: parent.readonly,
            location,
        });
        Ok(id)
    }

    /// A 1-D view covering `signals` if they tile one contiguous range of a
    /// single base buffer, in the given order.
    ///
    /// A single signal is returned unchanged. An existing 1-D signal with
    /// the same location is reused rather than declared twice.
    pub fn concat(&mut self, signals: &[SignalId]) -> Option<SignalId> {
        let (&first, rest) = signals.split_first()?;
        if rest.is_empty() {
            return Some(first);
        }
        let first_loc = self.location(first).ok()?.clone();
        let mut end = first_loc.range.end;
        for &s in rest {
            let loc = self.location(s).ok()?;
            if loc.base != first_loc.base || loc.range.start != end {
                return None;
            }
            end = loc.range.end;
        }
        let covering = Location {
            base: first_loc.base,
            range: first_loc.range.start..end,
        };
        if let Some(existing) = self.find_flat(&covering) {
            return Some(existing);
        }
        let base = first_loc.base;
        let shape: Shape = smallvec![covering.len()];
        self.view(base, &shape, covering.range.start).ok()
    }

    fn find_flat(&self, location: &Location) -> Option<SignalId> {
        self.metas
            .iter()
            .position(|m| m.location == *location && m.shape.len() == 1)
            .map(|i| SignalId(i as u32))
    }

    fn next_id(&self) -> Result<SignalId, StoreError> {
        u32::try_from(self.metas.len())
            .map(SignalId)
            .map_err(|_| StoreError::TooManySignals)
    }

    /// Metadata for a signal.
    pub fn meta(&self, signal: SignalId) -> Result<&SignalMeta, StoreError> {
        self.metas
            .get(signal.index())
            .ok_or(StoreError::UnknownSignal { signal })
    }

    /// Where a signal's elements live.
    pub fn location(&self, signal: SignalId) -> Result<&Location, StoreError> {
        self.meta(signal).map(|m| &m.location)
    }

    /// The base signal owning `signal`'s storage (itself for bases).
    pub fn base_of(&self, signal: SignalId) -> Result<SignalId, StoreError> {
        self.location(signal).map(|l| l.base)
    }

    /// Whether two signals alias at least one common element.
    ///
    /// Unknown ids never share memory.
    pub fn may_share_memory(&self, a: SignalId, b: SignalId) -> bool {
        match (self.location(a), self.location(b)) {
            (Ok(la), Ok(lb)) => la.overlaps(lb),
            _ => false,
        }
    }

    /// Initial contents of a signal.
    pub fn read(&self, signal: SignalId) -> Result<&[f64], StoreError> {
        let loc = self.location(signal)?;
        let buf = self
            .initial
            .get(&loc.base)
            .ok_or(StoreError::UnknownSignal { signal })?;
        Ok(&buf[loc.range.clone()])
    }

    /// Mutable initial contents of a signal, for builders that compute
    /// initial values after allocation.
    pub fn write_initial(&mut self, signal: SignalId) -> Result<&mut [f64], StoreError> {
        let loc = self.location(signal)?.clone();
        let buf = self
            .initial
            .get_mut(&loc.base)
            .ok_or(StoreError::UnknownSignal { signal })?;
        Ok(&mut buf[loc.range])
    }

    /// Name of a signal, or `"<unknown>"`.
    pub fn name(&self, signal: SignalId) -> &str {
        self.meta(signal).map_or("<unknown>", |m| m.name.as_str())
    }

    /// Whether the store knows this id.
    pub fn contains(&self, signal: SignalId) -> bool {
        signal.index() < self.metas.len()
    }

    /// Number of signals, views included.
    pub fn len(&self) -> usize {
        self.metas.len()
    }

    /// Whether no signal has been declared.
    pub fn is_empty(&self) -> bool {
        self.metas.is_empty()
    }

    /// All signals with their metadata, in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (SignalId, &SignalMeta)> {
        self.metas
            .iter()
            .enumerate()
            .map(|(i, m)| (SignalId(i as u32), m))
    }

    /// Base signals in declaration order.
    pub fn bases(&self) -> impl Iterator<Item = SignalId> + '_ {
        self.initial.keys().copied()
    }

    /// Total bytes held by base buffers.
    pub fn memory_bytes(&self) -> usize {
        self.initial.values().map(|v| v.len()).sum::<usize>() * std::mem::size_of::<f64>()
    }

    /// Fresh runtime buffers holding every signal's initial value.
    pub fn instantiate(&self) -> SignalData {
        let locations = self.metas.iter().map(|m| m.location.clone()).collect();
        let dtypes = self.metas.iter().map(|m| m.dtype).collect();
        SignalData::new(self.initial.clone(), locations, dtypes)
    }

    /// Overwrite runtime buffers with every signal's initial value.
    pub fn restore_initial(&self, data: &mut SignalData) {
        for (base, values) in &self.initial {
            if let Some(buf) = data.base_mut(*base) {
                buf.copy_from_slice(values);
            }
        }
    }
}
