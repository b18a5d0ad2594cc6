//! Array shapes and the broadcasting rule.
//!
//! # Broadcasting
//!
//! Broadcasting combines arrays of different but compatible shapes by virtually
//! replicating dimensions of size 1.
//!
//! **Rules:**
//! 1. Dimensions are aligned from the right (last dimension).
//! 2. The shorter shape is padded on the left with size-1 dimensions.
//! 3. Two aligned dimensions are compatible if they are equal, or one of them is 1.
//!
//! ```rust
//! use ndmat::Shape;
//!
//! let a = Shape::from([2, 3, 1]);
//! let b = Shape::from([4]);
//! assert_eq!(a.broadcast(&b).unwrap(), Shape::from([2, 3, 4]));
//! ```

use super::{ArrayError, Result};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// Dimensions of an array, outermost first. Rank 0 (no dimensions) is a scalar.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Shape(Vec<usize>);

impl Shape {
    pub fn new(dims: Vec<usize>) -> Self {
        Self(dims)
    }

    /// The rank-0 shape.
    pub fn scalar() -> Self {
        Self(Vec::new())
    }

    pub fn rank(&self) -> usize {
        self.0.len()
    }

    pub fn dims(&self) -> &[usize] {
        &self.0
    }

    /// Total number of elements; the empty product is 1.
    ///
    /// Saturates at `usize::MAX`. Every array's shape has a count that fits, so this
    /// is exact for `NDArray::shape()`.
    pub fn numel(&self) -> usize {
        ndmat_kernels::numel(&self.0)
    }

    /// Total number of elements, failing if it does not fit in `usize`.
    ///
    /// Any zero dimension makes the count 0, however large the other dimensions are.
    ///
    /// # Errors
    ///
    /// Returns `ArrayError::Overflow` if the product of the dimensions overflows.
    pub fn checked_numel(&self) -> Result<usize> {
        ndmat_kernels::checked_numel(&self.0).ok_or_else(|| ArrayError::Overflow {
            shape: self.clone(),
        })
    }

    pub fn is_scalar(&self) -> bool {
        self.0.is_empty()
    }

    /// Row-major strides: the last dimension varies fastest.
    pub fn strides(&self) -> Vec<usize> {
        ndmat_kernels::contiguous_strides(&self.0)
    }

    /// Computes the shape two operands broadcast to.
    ///
    /// Where one aligned dimension is 1 the result takes the other dimension, so a
    /// size-1 dimension stretches to match (including to 0).
    ///
    /// # Errors
    ///
    /// - `ArrayError::Broadcast` naming both shapes if any aligned pair of dimensions is
    ///   incompatible.
    /// - `ArrayError::Overflow` if the broadcast shape has more elements than fit in
    ///   `usize`.
    pub fn broadcast(&self, other: &Shape) -> Result<Shape> {
        let rank = self.rank().max(other.rank());
        let mut dims = vec![0; rank];

        for (i, dim) in dims.iter_mut().rev().enumerate() {
            let a = self.dim_from_end(i);
            let b = other.dim_from_end(i);
            *dim = if a == b || b == 1 {
                a
            } else if a == 1 {
                b
            } else {
                return Err(ArrayError::Broadcast {
                    lhs: self.clone(),
                    rhs: other.clone(),
                });
            };
        }

        let out = Shape(dims);
        out.checked_numel()?;
        Ok(out)
    }

    /// Size of the `i`-th dimension counted from the right, 1 past the left edge.
    fn dim_from_end(&self, i: usize) -> usize {
        if i < self.rank() {
            self.0[self.rank() - 1 - i]
        } else {
            1
        }
    }

    /// Splits a matrix shape into its batch dimensions and the trailing two.
    pub(crate) fn split_batch(&self) -> (Shape, usize, usize) {
        let rank = self.rank();
        debug_assert!(rank >= 2, "split_batch requires rank >= 2");
        (
            Shape(self.0[..rank - 2].to_vec()),
            self.0[rank - 2],
            self.0[rank - 1],
        )
    }
}

impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Self(dims)
    }
}

impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Self(dims.to_vec())
    }
}

impl<const N: usize> From<[usize; N]> for Shape {
    fn from(dims: [usize; N]) -> Self {
        Self(dims.to_vec())
    }
}

impl AsRef<[usize]> for Shape {
    fn as_ref(&self) -> &[usize] {
        &self.0
    }
}

impl PartialEq<[usize]> for Shape {
    fn eq(&self, other: &[usize]) -> bool {
        self.0 == other
    }
}

impl<const N: usize> PartialEq<[usize; N]> for Shape {
    fn eq(&self, other: &[usize; N]) -> bool {
        self.0 == other
    }
}

impl Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, dim) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", dim)?;
        }
        // Single-dimension shapes keep the trailing comma, like a 1-tuple.
        if self.0.len() == 1 {
            write!(f, ",")?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numel_and_rank() {
        assert_eq!(Shape::scalar().numel(), 1);
        assert_eq!(Shape::scalar().rank(), 0);
        assert!(Shape::scalar().is_scalar());
        assert_eq!(Shape::from([2, 3, 4]).numel(), 24);
        assert_eq!(Shape::from([2, 0]).numel(), 0);
    }

    #[test]
    fn test_checked_numel() {
        assert_eq!(Shape::from([2, usize::MAX, 0]).checked_numel(), Ok(0));
        assert_eq!(Shape::from([2, usize::MAX, 0]).numel(), 0);

        let huge = Shape::from([1 << 32, 1 << 32]);
        assert_eq!(
            huge.checked_numel(),
            Err(ArrayError::Overflow {
                shape: huge.clone(),
            })
        );
        assert_eq!(huge.numel(), usize::MAX);
    }

    #[test]
    fn test_broadcast_overflow() {
        let a = Shape::from([1 << 32, 1]);
        let b = Shape::from([1, 1 << 32]);
        assert!(matches!(a.broadcast(&b), Err(ArrayError::Overflow { .. })));

        // Stretching to 0 stays representable.
        let c = Shape::from([usize::MAX, 1]);
        let d = Shape::from([1, 0]);
        assert_eq!(c.broadcast(&d).unwrap(), [usize::MAX, 0]);
    }

    #[test]
    fn test_strides() {
        assert_eq!(Shape::from([2, 3, 4]).strides(), vec![12, 4, 1]);
        assert!(Shape::scalar().strides().is_empty());
    }

    #[test]
    fn test_broadcast_same() {
        let a = Shape::from([2, 3]);
        assert_eq!(a.broadcast(&a).unwrap(), a);
    }

    #[test]
    fn test_broadcast_pad_left() {
        let a = Shape::from([2, 2]);
        let b = Shape::from([2]);
        assert_eq!(a.broadcast(&b).unwrap(), [2, 2]);

        let c = Shape::from([1, 2]);
        assert_eq!(a.broadcast(&c).unwrap(), [2, 2]);
    }

    #[test]
    fn test_broadcast_stretch_both() {
        let a = Shape::from([3, 1]);
        let b = Shape::from([1, 4]);
        assert_eq!(a.broadcast(&b).unwrap(), [3, 4]);
        assert_eq!(b.broadcast(&a).unwrap(), [3, 4]);
    }

    #[test]
    fn test_broadcast_scalar() {
        let a = Shape::from([5, 6]);
        assert_eq!(a.broadcast(&Shape::scalar()).unwrap(), a);
        assert_eq!(Shape::scalar().broadcast(&Shape::scalar()).unwrap(), Shape::scalar());
    }

    #[test]
    fn test_broadcast_zero_dim() {
        let a = Shape::from([0, 3]);
        let b = Shape::from([1, 3]);
        assert_eq!(a.broadcast(&b).unwrap(), [0, 3]);
    }

    #[test]
    fn test_broadcast_incompatible() {
        let a = Shape::from([2, 3]);
        let b = Shape::from([4, 3]);
        let err = a.broadcast(&b).unwrap_err();
        assert_eq!(
            err,
            ArrayError::Broadcast {
                lhs: a.clone(),
                rhs: b.clone()
            }
        );

        let c = Shape::from([3, 2]);
        assert!(matches!(
            a.broadcast(&c),
            Err(ArrayError::Broadcast { .. })
        ));
    }

    #[test]
    fn test_broadcast_rank_is_max() {
        let a = Shape::from([7, 1, 5]);
        let b = Shape::from([4, 1]);
        let out = a.broadcast(&b).unwrap();
        assert_eq!(out.rank(), 3);
        assert_eq!(out, [7, 4, 5]);
    }

    #[test]
    fn test_split_batch() {
        let (batch, m, n) = Shape::from([2, 5, 3, 4]).split_batch();
        assert_eq!(batch, [2, 5]);
        assert_eq!((m, n), (3, 4));
    }

    #[test]
    fn test_display() {
        assert_eq!(Shape::from([2, 3]).to_string(), "(2, 3)");
        assert_eq!(Shape::from([4]).to_string(), "(4,)");
        assert_eq!(Shape::scalar().to_string(), "()");
    }
}
