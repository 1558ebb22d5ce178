//! Signal shapes and element types.

use smallvec::SmallVec;
use std::fmt;

/// Shape of a signal buffer.
///
/// `SmallVec<[usize; 4]>` avoids heap allocation for up to four
/// dimensions. The empty shape is a scalar holding one element.
pub type Shape = SmallVec<[usize; 4]>;

/// Number of elements held by a buffer of the given shape.
///
/// The empty shape is a scalar and holds exactly one element.
pub fn shape_size(shape: &[usize]) -> usize {
    shape.iter().product()
}

/// Declared element type of a signal.
///
/// Every buffer is stored as `f64` at runtime. The dtype decides fusion
/// compatibility and checkpoint encoding, and writers targeting an `F32`
/// signal round their results through `f32`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Dtype {
    /// Single precision.
    F32,
    /// Double precision.
    #[default]
    F64,
}

impl Dtype {
    /// Bytes per element in the checkpoint encoding.
    pub fn width(self) -> usize {
        match self {
            Self::F32 => 4,
            Self::F64 => 8,
        }
    }

    /// Round a value to the precision of this dtype.
    pub fn quantize(self, value: f64) -> f64 {
        match self {
            Self::F32 => value as f32 as f64,
            Self::F64 => value,
        }
    }
}

impl fmt::Display for Dtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::F32 => write!(f, "f32"),
            Self::F64 => write!(f, "f64"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    #[test]
    fn scalar_shape_has_one_element() {
        let s: Shape = smallvec![];
        assert_eq!(shape_size(&s), 1);
    }

    #[test]
    fn matrix_shape_size() {
        let s: Shape = smallvec![3, 4];
        assert_eq!(shape_size(&s), 12);
    }

    #[test]
    fn f32_quantize_rounds() {
        let v = 0.1_f64;
        assert_ne!(Dtype::F32.quantize(v), v);
        assert_eq!(Dtype::F64.quantize(v), v);
        assert_eq!(Dtype::F32.width(), 4);
        assert_eq!(Dtype::F64.width(), 8);
    }
}
