//! Runtime signal buffers.

use indexmap::IndexMap;

use sigflow_core::{Dtype, SignalId};

use crate::meta::Location;

/// The mutable buffers a stepper runs against.
///
/// Created by [`SignalStore::instantiate`](crate::SignalStore::instantiate).
/// Every view resolves to a slice of its base buffer, so writes through a
/// view are visible through the base and every overlapping view.
#[derive(Clone, Debug)]
pub struct SignalData {
    buffers: IndexMap<SignalId, Vec<f64>>,
    locations: Vec<Location>,
    dtypes: Vec<Dtype>,
}

impl SignalData {
    pub(crate) fn new(
        buffers: IndexMap<SignalId, Vec<f64>>,
        locations: Vec<Location>,
        dtypes: Vec<Dtype>,
    ) -> Self {
        Self {
            buffers,
            locations,
            dtypes,
        }
    }

    /// Current contents of a signal.
    pub fn read(&self, signal: SignalId) -> Option<&[f64]> {
        let loc = self.locations.get(signal.index())?;
        let buf = self.buffers.get(&loc.base)?;
        Some(&buf[loc.range.clone()])
    }

    /// Mutable contents of a signal.
    pub fn write(&mut self, signal: SignalId) -> Option<&mut [f64]> {
        let loc = self.locations.get(signal.index())?;
        let range = loc.range.clone();
        let buf = self.buffers.get_mut(&loc.base)?;
        Some(&mut buf[range])
    }

    /// Declared dtype of a signal.
    pub fn dtype(&self, signal: SignalId) -> Option<Dtype> {
        self.dtypes.get(signal.index()).copied()
    }

    /// Location of a signal.
    pub fn location(&self, signal: SignalId) -> Option<&Location> {
        self.locations.get(signal.index())
    }

    /// A whole base buffer.
    pub fn base(&self, base: SignalId) -> Option<&[f64]> {
        self.buffers.get(&base).map(Vec::as_slice)
    }

    /// A whole base buffer, mutably.
    pub fn base_mut(&mut self, base: SignalId) -> Option<&mut [f64]> {
        self.buffers.get_mut(&base).map(Vec::as_mut_slice)
    }

    /// Base buffers in declaration order.
    pub fn bases(&self) -> impl Iterator<Item = (SignalId, &[f64])> {
        self.buffers.iter().map(|(&id, buf)| (id, buf.as_slice()))
    }

    /// Index of the first NaN or infinity in a signal.
    pub fn first_non_finite(&self, signal: SignalId) -> Option<usize> {
        self.read(signal)?.iter().position(|v| !v.is_finite())
    }

    /// Total bytes held by base buffers.
    pub fn memory_bytes(&self) -> usize {
        self.buffers.values().map(Vec::len).sum::<usize>() * std::mem::size_of::<f64>()
    }
}

#[cfg(test)]
mod tests {
    use crate::{Initial, SignalStore};
    use sigflow_core::Dtype;

    #[test]
    fn writes_through_view_visible_in_base() {
        let mut store = SignalStore::new();
        let base = store.allocate("b", &[4], Dtype::F64, Initial::Zeros).unwrap();
        let view = store.view(base, &[2], 1).unwrap();
        let mut data = store.instantiate();
        data.write(view).unwrap().copy_from_slice(&[5.0, 6.0]);
        assert_eq!(data.read(base).unwrap(), &[0.0, 5.0, 6.0, 0.0]);
        // The store keeps its initial values.
        assert_eq!(store.read(base).unwrap(), &[0.0; 4]);
    }

    #[test]
    fn restore_initial_resets_buffers() {
        let mut store = SignalStore::new();
        let s = store.allocate("s", &[2], Dtype::F64, Initial::Fill(1.5)).unwrap();
        let mut data = store.instantiate();
        data.write(s).unwrap().fill(-3.0);
        store.restore_initial(&mut data);
        assert_eq!(data.read(s).unwrap(), &[1.5, 1.5]);
    }

    #[test]
    fn non_finite_detection() {
        let mut store = SignalStore::new();
        let s = store.allocate("s", &[3], Dtype::F64, Initial::Zeros).unwrap();
        let mut data = store.instantiate();
        assert_eq!(data.first_non_finite(s), None);
        data.write(s).unwrap()[2] = f64::NAN;
        assert_eq!(data.first_non_finite(s), Some(2));
    }

    #[test]
    fn unknown_signal_is_none() {
        let store = SignalStore::new();
        let data = store.instantiate();
        assert!(data.read(sigflow_core::SignalId(0)).is_none());
        assert_eq!(data.memory_bytes(), 0);
    }
}
