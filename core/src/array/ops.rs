//! Array operations.
//!
//! # Overview
//!
//! This module implements the arithmetic of `ndmat`:
//! - **Element-wise Arithmetic**: `+`, `-`, `*`, `/` and `pow` with broadcasting.
//! - **Matrix Multiplication**: dot products, vector-matrix products and batched matmuls
//!   with broadcasting over the batch dimensions.
//! - **Axis Reordering**: `transpose` (last two axes) and `permute` (any order).
//! - **Parallelism**: large outputs are computed across CPU cores with `rayon`.
//!
//! Every operation validates shapes (and divisors) first and only then computes the
//! output, so a failing call never produces a partial result.
//!
//! # Examples
//!
//! ```rust
//! use ndmat::NDArray;
//!
//! let a = NDArray::new(vec![1.0, 2.0, 3.0, 4.0], [2, 2]).unwrap();
//! let row = NDArray::new(vec![7.0, 8.0], [1, 2]).unwrap();
//!
//! // The single row is broadcast across both rows of `a`.
//! let c = (&a - &row).unwrap();
//! assert_eq!(c.data(), &[-6.0, -6.0, -4.0, -4.0]);
//! ```

use super::{ArrayError, Element, NDArray, Result, Shape};
use crate::config::{Config, DivisionPolicy};

use ndmat_kernels::{KernelElem, KernelError};
use num_traits::Zero;
use rayon::prelude::*;
use std::fmt;
use std::ops::{Add, Div, Mul, Sub};

/// The element-wise binary operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl BinaryOp {
    /// Applies the operation to a pair of elements.
    #[inline]
    pub fn apply<T: Element>(self, a: T, b: T) -> T {
        match self {
            BinaryOp::Add => a.add_elem(b),
            BinaryOp::Sub => a.sub_elem(b),
            BinaryOp::Mul => a.mul_elem(b),
            BinaryOp::Div => a.div_elem(b),
            BinaryOp::Pow => a.pow_elem(b),
        }
    }

    pub const fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Pow => "**",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Implements a binary arithmetic operator trait (e.g., `Add`, `Sub`) for `&NDArray`.
///
/// The operators broadcast and return a `Result`, since shapes are only known at
/// runtime.
macro_rules! impl_bin_op {
    ($trait:ident, $method:ident, $op:expr) => {
        impl<T> $trait for &NDArray<T>
        where
            T: Element,
        {
            type Output = Result<NDArray<T>>;

            fn $method(self, rhs: Self) -> Self::Output {
                self.binary_op(rhs, $op)
            }
        }
    };
}

impl_bin_op!(Add, add, BinaryOp::Add);
impl_bin_op!(Sub, sub, BinaryOp::Sub);
impl_bin_op!(Mul, mul, BinaryOp::Mul);
impl_bin_op!(Div, div, BinaryOp::Div);

impl<T> NDArray<T>
where
    T: Element,
{
    /// Applies `op` element-wise with broadcasting, using [`Config::global`].
    ///
    /// # Errors
    ///
    /// - `ArrayError::Broadcast` if the shapes are incompatible.
    /// - `ArrayError::DivisionByZero` for `Div` with a zero divisor on an integer array,
    ///   or on any array under [`DivisionPolicy::Error`].
    /// - `ArrayError::NegativeExponent` for `Pow` with a negative exponent on an integer
    ///   array.
    pub fn binary_op(&self, rhs: &Self, op: BinaryOp) -> Result<Self> {
        self.binary_op_with(rhs, op, Config::global())
    }

    /// Applies `op` element-wise with broadcasting under an explicit configuration.
    pub fn binary_op_with(&self, rhs: &Self, op: BinaryOp, config: &Config) -> Result<Self> {
        let out_shape = self.shape.broadcast(&rhs.shape)?;
        match op {
            BinaryOp::Div => self.check_divisor(rhs, &out_shape, config)?,
            BinaryOp::Pow => self.check_exponent(rhs, &out_shape)?,
            _ => {}
        }

        let parallel = config.parallel_for(out_shape.numel());
        log::debug!(
            "{} {} {} -> {} ({}, parallel={})",
            self.shape,
            op,
            rhs.shape,
            out_shape,
            T::DTYPE,
            parallel
        );

        let data = ndmat_kernels::cpu_binary_broadcast(
            &self.data,
            &rhs.data,
            self.shape.dims(),
            rhs.shape.dims(),
            out_shape.dims(),
            parallel,
            move |a, b| op.apply(a, b),
        )
        .map_err(|e| ArrayError::from_kernel(e, "binary op", &self.shape, &rhs.shape))?;

        Ok(NDArray::from_parts(data, out_shape))
    }

    /// Rejects or reports zero divisors before any element is computed.
    fn check_divisor(&self, rhs: &Self, out_shape: &Shape, config: &Config) -> Result<()> {
        // Every divisor element reaches the output unless the output is empty.
        if out_shape.numel() == 0 || !rhs.data.iter().any(|x| x.is_zero()) {
            return Ok(());
        }

        if !T::DTYPE.is_float() || config.division == DivisionPolicy::Error {
            return Err(ArrayError::DivisionByZero {
                dividend: self.shape.clone(),
                divisor: rhs.shape.clone(),
            });
        }

        log::warn!(
            "division by zero in {} / {}: result contains inf or NaN",
            self.shape,
            rhs.shape
        );
        Ok(())
    }

    /// Rejects negative integer exponents, whose results are not integers.
    fn check_exponent(&self, rhs: &Self, out_shape: &Shape) -> Result<()> {
        if T::DTYPE.is_float() || out_shape.numel() == 0 {
            return Ok(());
        }
        if rhs.data.iter().any(|&x| x < T::zero()) {
            return Err(ArrayError::NegativeExponent {
                base: self.shape.clone(),
                exponent: rhs.shape.clone(),
            });
        }
        Ok(())
    }

    /// Element-wise addition with broadcasting.
    pub fn add(&self, rhs: &Self) -> Result<Self> {
        self.binary_op(rhs, BinaryOp::Add)
    }

    /// Element-wise subtraction with broadcasting.
    pub fn sub(&self, rhs: &Self) -> Result<Self> {
        self.binary_op(rhs, BinaryOp::Sub)
    }

    /// Element-wise multiplication with broadcasting.
    pub fn mul(&self, rhs: &Self) -> Result<Self> {
        self.binary_op(rhs, BinaryOp::Mul)
    }

    /// Element-wise division with broadcasting.
    ///
    /// Floating-point division by zero yields `inf`/`NaN` under the default
    /// [`DivisionPolicy::Propagate`]; integer division by zero is always an error.
    pub fn div(&self, rhs: &Self) -> Result<Self> {
        self.binary_op(rhs, BinaryOp::Div)
    }

    /// Element-wise power with broadcasting: `self[i] ** rhs[i]`.
    ///
    /// Floats follow `powf`. Integer powers wrap on overflow, and negative integer
    /// exponents are rejected with `ArrayError::NegativeExponent`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ndmat::NDArray;
    /// let a = NDArray::from_vec(vec![1, 2, 3]);
    /// let squared = a.pow_scalar(2).unwrap();
    /// assert_eq!(squared.data(), &[1, 4, 9]);
    /// ```
    pub fn pow(&self, rhs: &Self) -> Result<Self> {
        self.binary_op(rhs, BinaryOp::Pow)
    }

    pub fn add_scalar(&self, value: T) -> Result<Self> {
        self.binary_op(&NDArray::scalar(value), BinaryOp::Add)
    }

    pub fn sub_scalar(&self, value: T) -> Result<Self> {
        self.binary_op(&NDArray::scalar(value), BinaryOp::Sub)
    }

    pub fn mul_scalar(&self, value: T) -> Result<Self> {
        self.binary_op(&NDArray::scalar(value), BinaryOp::Mul)
    }

    pub fn div_scalar(&self, value: T) -> Result<Self> {
        self.binary_op(&NDArray::scalar(value), BinaryOp::Div)
    }

    pub fn pow_scalar(&self, value: T) -> Result<Self> {
        self.binary_op(&NDArray::scalar(value), BinaryOp::Pow)
    }

    /// Applies a function element-wise to the array.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ndmat::NDArray;
    /// let a = NDArray::from_vec(vec![1.0, 2.0, 3.0]);
    /// let squared = a.map(|x| x * x);
    /// assert_eq!(squared.data(), &[1.0, 4.0, 9.0]);
    /// ```
    pub fn map<F>(&self, f: F) -> Self
    where
        F: Fn(T) -> T + Sync + Send,
    {
        let data = if Config::global().parallel_for(self.size()) {
            self.data.par_iter().map(|&x| f(x)).collect()
        } else {
            self.data.iter().map(|&x| f(x)).collect()
        };
        NDArray::from_parts(data, self.shape.clone())
    }

    /// Materialises the array at a larger, broadcast-compatible shape.
    ///
    /// # Errors
    ///
    /// Returns `ArrayError::Broadcast` unless broadcasting this array's shape with
    /// `target` yields exactly `target`.
    pub fn broadcast_to(&self, target: impl Into<Shape>) -> Result<Self> {
        let target = target.into();
        let out_shape = self.shape.broadcast(&target)?;
        if out_shape != target {
            return Err(ArrayError::Broadcast {
                lhs: self.shape.clone(),
                rhs: target,
            });
        }

        let parallel = Config::global().parallel_for(target.numel());
        let data = ndmat_kernels::cpu_broadcast_to(
            &self.data,
            self.shape.dims(),
            target.dims(),
            parallel,
        )
        .map_err(|e| ArrayError::from_kernel(e, "broadcast_to", &self.shape, &target))?;

        Ok(NDArray::from_parts(data, target))
    }

    /// Matrix multiplication, using [`Config::global`].
    ///
    /// Supports, in order of precedence:
    /// - 1D x 1D: `[K] x [K] -> []` (dot product, a rank-0 result)
    /// - 1D x ND: `[K] x [..., K, N] -> [..., N]` (vector treated as a `1 x K` row)
    /// - ND x 1D: `[..., M, K] x [K] -> [..., M]` (vector treated as a `K x 1` column)
    /// - ND x ND: `[..., M, K] x [..., K, N] -> [..., M, N]`
    ///
    /// Leading (batch) dimensions broadcast against each other, so a single matrix can
    /// be multiplied against a whole stack.
    ///
    /// # Mathematical Definition
    ///
    /// For each batch slice, `out[i, j] = sum_p a[i, p] * b[p, j]`, summed in order of `p`.
    ///
    /// # Errors
    ///
    /// - `ArrayError::Rank` if either operand is a scalar.
    /// - `ArrayError::InnerDim` if the contracted dimensions differ. This is checked
    ///   before the batch dimensions.
    /// - `ArrayError::Broadcast` if the batch dimensions are incompatible.
    /// - `ArrayError::Overflow` if the output has more elements than fit in `usize`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ndmat::NDArray;
    ///
    /// let v = NDArray::from_vec(vec![1, 2, 3]);
    /// let m = NDArray::new(vec![4, 5, 6, 7, 8, 9], [3, 2]).unwrap();
    /// let out = v.matmul(&m).unwrap();
    /// assert_eq!(out.shape(), &[2]);
    /// assert_eq!(out.data(), &[40, 46]);
    /// ```
    pub fn matmul(&self, rhs: &Self) -> Result<Self> {
        self.matmul_with(rhs, Config::global())
    }

    /// Matrix multiplication under an explicit configuration.
    pub fn matmul_with(&self, rhs: &Self, config: &Config) -> Result<Self> {
        let lhs_rank = self.rank();
        let rhs_rank = rhs.rank();
        for operand in [self, rhs] {
            if operand.rank() == 0 {
                return Err(ArrayError::Rank {
                    op: "matmul",
                    required: 1,
                    got: operand.shape.clone(),
                });
            }
        }

        // Promote vectors: lhs to a `1 x K` row, rhs to a `K x 1` column.
        let lhs_shape = if lhs_rank == 1 {
            Shape::from([1, self.dims()[0]])
        } else {
            self.shape.clone()
        };
        let rhs_shape = if rhs_rank == 1 {
            Shape::from([rhs.dims()[0], 1])
        } else {
            rhs.shape.clone()
        };

        let (lhs_batch, m, k) = lhs_shape.split_batch();
        let (rhs_batch, rhs_k, n) = rhs_shape.split_batch();

        if k != rhs_k {
            return Err(ArrayError::InnerDim {
                lhs: self.shape.clone(),
                rhs: rhs.shape.clone(),
                lhs_inner: k,
                rhs_inner: rhs_k,
            });
        }

        let batch = lhs_batch.broadcast(&rhs_batch).map_err(|e| match e {
            ArrayError::Broadcast { .. } => ArrayError::Broadcast {
                lhs: self.shape.clone(),
                rhs: rhs.shape.clone(),
            },
            other => other,
        })?;

        let mut out_dims = batch.dims().to_vec();
        out_dims.extend([m, n]);
        let out_numel = Shape::from(out_dims.as_slice()).checked_numel()?;
        let parallel = config.parallel_for(out_numel);
        log::debug!(
            "matmul {} @ {} (as {} @ {}), batch {} -> {} elements, parallel={}",
            self.shape,
            rhs.shape,
            lhs_shape,
            rhs_shape,
            batch,
            out_numel,
            parallel
        );

        let data = ndmat_kernels::cpu_matmul(
            &self.data,
            &rhs.data,
            lhs_shape.dims(),
            rhs_shape.dims(),
            batch.dims(),
            parallel,
        )
        .map_err(|e| ArrayError::from_kernel(e, "matmul", &self.shape, &rhs.shape))?;

        // Drop the dimensions inserted by vector promotion.
        if rhs_rank == 1 {
            out_dims.pop();
        }
        if lhs_rank == 1 {
            out_dims.remove(batch.rank());
        }

        Ok(NDArray::from_parts(data, Shape::from(out_dims)))
    }

    /// Swaps the last two axes, treating leading axes as a stack of matrices.
    ///
    /// To reverse all axes (NumPy's `a.T`), or for any other order, use
    /// [`NDArray::permute`].
    ///
    /// # Errors
    ///
    /// Returns `ArrayError::Rank` if the array has rank < 2.
    pub fn transpose(&self) -> Result<Self> {
        let rank = self.rank();
        if rank < 2 {
            return Err(ArrayError::Rank {
                op: "transpose",
                required: 2,
                got: self.shape.clone(),
            });
        }

        let parallel = Config::global().parallel_for(self.size());
        let data = ndmat_kernels::cpu_transpose(&self.data, self.shape.dims(), parallel)
            .map_err(|e| ArrayError::from_kernel(e, "transpose", &self.shape, &self.shape))?;

        let mut dims = self.dims().to_vec();
        dims.swap(rank - 1, rank - 2);
        Ok(NDArray::from_parts(data, Shape::from(dims)))
    }

    /// Reorders the axes: axis `i` of the result is axis `axes[i]` of `self`.
    ///
    /// # Errors
    ///
    /// Returns `ArrayError::Permutation` unless `axes` contains each of
    /// `0..self.rank()` exactly once.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ndmat::NDArray;
    /// let a = NDArray::new((0..6).collect::<Vec<i32>>(), [1, 2, 3]).unwrap();
    /// let p = a.permute(&[2, 0, 1]).unwrap();
    /// assert_eq!(p.shape(), &[3, 1, 2]);
    /// assert_eq!(p.data(), &[0, 3, 1, 4, 2, 5]);
    /// ```
    pub fn permute(&self, axes: &[usize]) -> Result<Self> {
        let parallel = Config::global().parallel_for(self.size());
        let data = ndmat_kernels::cpu_permute(&self.data, self.shape.dims(), axes, parallel)
            .map_err(|e| match e {
                KernelError::ShapeMismatch { .. } => ArrayError::Permutation {
                    shape: self.shape.clone(),
                    axes: axes.to_vec(),
                },
                other => ArrayError::from_kernel(other, "permute", &self.shape, &self.shape),
            })?;

        let dims: Vec<usize> = axes.iter().map(|&axis| self.dims()[axis]).collect();
        Ok(NDArray::from_parts(data, Shape::from(dims)))
    }
}
