//! CPU kernels for `ndmat`.
//!
//! Kernels work on flat row-major slices plus shapes and know nothing about the
//! array type built on top of them.

use num_traits::{FromPrimitive, Num, ToPrimitive, Zero};
use std::fmt::Debug;
use thiserror::Error;

pub mod cpu_broadcast;
pub mod cpu_matmul;
pub mod cpu_transpose;

pub use cpu_broadcast::{broadcast_strides, cpu_binary_broadcast, cpu_broadcast_to};
pub use cpu_matmul::cpu_matmul;
pub use cpu_transpose::{cpu_permute, cpu_transpose};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KernelError {
    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
    },
    #[error("Kernel requires rank >= {required}, got shape {shape:?}")]
    Rank { required: usize, shape: Vec<usize> },
    #[error("Element count of shape {shape:?} overflows usize")]
    Overflow { shape: Vec<usize> },
}

pub type Result<T> = std::result::Result<T, KernelError>;

/// Trait bound for elements that can be processed by kernels.
///
/// The arithmetic methods pin down overflow behaviour per element type:
/// integers wrap, floats follow IEEE-754.
pub trait KernelElem:
    Num + Copy + Clone + Debug + Send + Sync + FromPrimitive + ToPrimitive + PartialOrd
{
    fn add_elem(self, rhs: Self) -> Self;
    fn sub_elem(self, rhs: Self) -> Self;
    fn mul_elem(self, rhs: Self) -> Self;

    /// Raises `self` to the power `rhs`.
    ///
    /// Integer types return zero for a negative exponent; callers are expected to
    /// reject negative integer exponents before reaching the kernel.
    fn pow_elem(self, rhs: Self) -> Self;

    /// Divides `self` by `rhs`.
    ///
    /// Integer types return zero for a zero divisor; callers are expected to reject
    /// zero divisors for integers before reaching the kernel.
    fn div_elem(self, rhs: Self) -> Self;
}

macro_rules! impl_int_elem {
    ($($t:ty),*) => {
        $(
            impl KernelElem for $t {
                #[inline]
                fn add_elem(self, rhs: Self) -> Self {
                    self.wrapping_add(rhs)
                }
                #[inline]
                fn sub_elem(self, rhs: Self) -> Self {
                    self.wrapping_sub(rhs)
                }
                #[inline]
                fn mul_elem(self, rhs: Self) -> Self {
                    self.wrapping_mul(rhs)
                }
                #[inline]
                fn div_elem(self, rhs: Self) -> Self {
                    if rhs.is_zero() {
                        Self::zero()
                    } else {
                        self.wrapping_div(rhs)
                    }
                }
                #[inline]
                fn pow_elem(self, rhs: Self) -> Self {
                    if rhs < 0 {
                        return Self::zero();
                    }
                    // Square-and-multiply over the exponent bits, wrapping like `mul_elem`.
                    let mut base = self;
                    let mut exp = rhs;
                    let mut acc: $t = 1;
                    while exp > 0 {
                        if exp & 1 == 1 {
                            acc = acc.wrapping_mul(base);
                        }
                        base = base.wrapping_mul(base);
                        exp >>= 1;
                    }
                    acc
                }
            }
        )*
    };
}

macro_rules! impl_float_elem {
    ($($t:ty),*) => {
        $(
            impl KernelElem for $t {
                #[inline]
                fn add_elem(self, rhs: Self) -> Self {
                    self + rhs
                }
                #[inline]
                fn sub_elem(self, rhs: Self) -> Self {
                    self - rhs
                }
                #[inline]
                fn mul_elem(self, rhs: Self) -> Self {
                    self * rhs
                }
                #[inline]
                fn div_elem(self, rhs: Self) -> Self {
                    self / rhs
                }
                #[inline]
                fn pow_elem(self, rhs: Self) -> Self {
                    self.powf(rhs)
                }
            }
        )*
    };
}

impl_int_elem!(i32, i64);
impl_float_elem!(f32, f64);

/// Number of elements described by `shape`, or `None` if it overflows `usize`.
///
/// The empty product is 1. Any zero dimension makes the count 0, however large the
/// other dimensions are.
pub fn checked_numel(shape: &[usize]) -> Option<usize> {
    if shape.contains(&0) {
        return Some(0);
    }
    shape.iter().try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
}

/// Number of elements described by `shape`, saturating at `usize::MAX`.
pub fn numel(shape: &[usize]) -> usize {
    checked_numel(shape).unwrap_or(usize::MAX)
}

/// Row-major strides for `shape`.
///
/// Strides that do not fit in `usize` saturate. That only happens left of a zero
/// dimension, where no element is ever addressed.
pub fn contiguous_strides(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![0; shape.len()];
    let mut stride: usize = 1;
    for (s, &dim) in strides.iter_mut().zip(shape).rev() {
        *s = stride;
        stride = stride.saturating_mul(dim);
    }
    strides
}

/// Element count of an output shape, failing instead of overflowing.
pub(crate) fn out_len(shape: &[usize]) -> Result<usize> {
    checked_numel(shape).ok_or_else(|| KernelError::Overflow {
        shape: shape.to_vec(),
    })
}

pub(crate) fn check_len(data_len: usize, shape: &[usize]) -> Result<()> {
    let expected = out_len(shape)?;
    if data_len != expected {
        return Err(KernelError::ShapeMismatch {
            expected: vec![expected],
            got: vec![data_len],
        });
    }
    Ok(())
}
