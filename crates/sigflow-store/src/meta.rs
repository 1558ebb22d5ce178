//! Signal metadata and alias locations.

use std::fmt;
use std::ops::Range;

use sigflow_core::{shape_size, Dtype, Shape, SignalId};

/// Initial contents of a freshly allocated signal.
#[derive(Clone, Debug, PartialEq)]
pub enum Initial {
    /// Every element starts at zero.
    Zeros,
    /// Every element starts at the given value.
    Fill(f64),
    /// Explicit row-major values; the count must match the shape.
    Values(Vec<f64>),
}

/// Physical location of a signal: its base buffer plus an element range.
///
/// Base signals map to `0..len` of themselves. Views of views are
/// flattened, so `base` is always a base signal.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Location {
    /// The base signal that owns the storage.
    pub base: SignalId,
    /// Element range within the base buffer.
    pub range: Range<usize>,
}

impl Location {
    /// Whether two locations share at least one element.
    ///
    /// Empty ranges never overlap anything.
    pub fn overlaps(&self, other: &Location) -> bool {
        self.base == other.base
            && !self.range.is_empty()
            && !other.range.is_empty()
            && self.range.start < other.range.end
            && other.range.start < self.range.end
    }

    /// Number of elements covered.
    pub fn len(&self) -> usize {
        self.range.len()
    }

    /// Whether the location covers no elements.
    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}..{}]", self.base, self.range.start, self.range.end)
    }
}

/// Everything the store knows about one signal.
#[derive(Clone, Debug, PartialEq)]
pub struct SignalMeta {
    /// Human-readable name used in error messages and logs.
    pub name: String,
    /// Buffer shape.
    pub shape: Shape,
    /// Declared element type.
    pub dtype: Dtype,
    /// Readonly signals may be read but never written by operators.
    pub readonly: bool,
    /// Where the signal's elements live.
    pub location: Location,
}

impl SignalMeta {
    /// Number of elements.
    pub fn size(&self) -> usize {
        shape_size(&self.shape)
    }

    /// Whether this signal aliases another signal's storage.
    pub fn is_view(&self, id: SignalId) -> bool {
        self.location.base != id
    }
}
