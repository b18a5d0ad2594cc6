//! Core NDArray implementation.
//!
//! # What is an NDArray?
//!
//! An **NDArray** is an N-dimensional grid of numbers of a single element type.
//!
//! - **Rank 0 (Scalar)**: A single number.
//! - **Rank 1 (Vector)**: A list of numbers.
//! - **Rank 2 (Matrix)**: A grid of numbers.
//! - **Rank 3+**: A stack of matrices (e.g., a batch of matrices `[Batch, Rows, Cols]`).
//!
//! # How `ndmat` Arrays Work
//!
//! An `NDArray` is defined by:
//! 1. **Data**: A flat vector of elements.
//! 2. **Shape**: The size of each dimension (e.g., `(2, 3)`).
//! 3. **Strides**: How to step through the flat data to traverse dimensions.
//!
//! Arrays are immutable: every operation returns a new array and leaves its inputs
//! untouched.
//!
//! ```rust
//! use ndmat::NDArray;
//!
//! // Create a 2x3 matrix (Rank 2 array)
//! let a = NDArray::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], [2, 3]).unwrap();
//!
//! assert_eq!(a.shape(), &[2, 3]);
//! assert_eq!(a.data(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
//! ```
//!
//! > [!TIP]
//! > **Memory Layout**
//! > `ndmat` uses **Row-Major** (C-style) layout. The last dimension changes the fastest
//! > in memory.

use ndmat_kernels::KernelError;
use std::fmt::Debug;
use thiserror::Error;

pub mod display;
pub mod element;
pub mod ops;
pub mod shape;

pub use element::{DType, Element};
pub use ops::BinaryOp;
pub use shape::Shape;

/// Coarse classification of an [`ArrayError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The operation is undefined for the given shapes or ranks.
    Shape,
    /// Two shapes (or their batch dimensions) cannot be broadcast together.
    Broadcast,
    /// A divisor contained an exact zero under a policy that rejects it.
    DivisionByZero,
    /// An element value lies outside the domain of the operation.
    Domain,
}

/// Error type for array operations.
///
/// Every error is raised before any output element is computed and carries the shapes
/// involved.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ArrayError {
    /// The number of data elements does not match the product of the shape.
    #[error("Shape mismatch: shape {shape} holds {expected} elements, got {got}")]
    DataLength {
        shape: Shape,
        expected: usize,
        got: usize,
    },
    /// The target shape of a reshape has a different element count.
    #[error("Shape mismatch: cannot reshape array of shape {from} into shape {to}")]
    Reshape { from: Shape, to: Shape },
    /// An operand has too low a rank for the operation.
    #[error("Shape mismatch: {op} requires rank >= {required}, got shape {got}")]
    Rank {
        op: &'static str,
        required: usize,
        got: Shape,
    },
    /// The contracted dimensions of a matrix product differ.
    #[error(
        "Shape mismatch: matmul inner dimensions differ ({lhs_inner} vs {rhs_inner}) for shapes {lhs} and {rhs}"
    )]
    InnerDim {
        lhs: Shape,
        rhs: Shape,
        lhs_inner: usize,
        rhs_inner: usize,
    },
    /// The element count of a shape does not fit in `usize`.
    #[error("Shape mismatch: element count of shape {shape} overflows usize")]
    Overflow { shape: Shape },
    /// The axes passed to `permute` are not a permutation of the array's axes.
    #[error("Shape mismatch: axes {axes:?} are not a permutation of the axes of shape {shape}")]
    Permutation { shape: Shape, axes: Vec<usize> },
    /// The shapes cannot be broadcast together.
    #[error("Broadcast error: cannot broadcast shape {lhs} with shape {rhs}")]
    Broadcast { lhs: Shape, rhs: Shape },
    /// The divisor contains an exact zero.
    #[error("Division by zero: divisor of shape {divisor} contains a zero (dividend shape {dividend})")]
    DivisionByZero { dividend: Shape, divisor: Shape },
    /// An integer exponent is negative.
    #[error("Negative exponent: exponent of shape {exponent} contains a negative integer (base shape {base})")]
    NegativeExponent { base: Shape, exponent: Shape },
}

impl ArrayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ArrayError::DataLength { .. }
            | ArrayError::Reshape { .. }
            | ArrayError::Rank { .. }
            | ArrayError::InnerDim { .. }
            | ArrayError::Overflow { .. }
            | ArrayError::Permutation { .. } => ErrorKind::Shape,
            ArrayError::Broadcast { .. } => ErrorKind::Broadcast,
            ArrayError::DivisionByZero { .. } => ErrorKind::DivisionByZero,
            ArrayError::NegativeExponent { .. } => ErrorKind::Domain,
        }
    }

    /// Lifts a kernel precondition failure into an array error for `lhs op rhs`.
    ///
    /// Kernels only fail when the caller skipped validation, so the mapping is coarse.
    pub(crate) fn from_kernel(err: KernelError, op: &'static str, lhs: &Shape, rhs: &Shape) -> Self {
        match err {
            KernelError::ShapeMismatch { .. } => ArrayError::Broadcast {
                lhs: lhs.clone(),
                rhs: rhs.clone(),
            },
            KernelError::Rank { required, shape } => ArrayError::Rank {
                op,
                required,
                got: Shape::from(shape),
            },
            KernelError::Overflow { shape } => ArrayError::Overflow {
                shape: Shape::from(shape),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, ArrayError>;

/// An immutable N-dimensional array.
///
/// # Generics
///
/// - `T`: The element type (one of `i32`, `i64`, `f32`, `f64`).
///
/// The rank is a runtime property. Operations such as `reshape` and `matmul` change the
/// rank of their result, so shape mismatches are caught at runtime and reported as an
/// [`ArrayError`].
#[derive(Clone, PartialEq)]
pub struct NDArray<T>
where
    T: Element,
{
    shape: Shape,
    strides: Vec<usize>,
    data: Vec<T>,
}

impl<T> NDArray<T>
where
    T: Element,
{
    /// Creates a new array from a flat row-major vector and a shape.
    ///
    /// # Errors
    ///
    /// - `ArrayError::Overflow` if the element count of `shape` does not fit in `usize`.
    /// - `ArrayError::DataLength` if the length of `data` does not match the product of
    ///   `shape`.
    pub fn new(data: Vec<T>, shape: impl Into<Shape>) -> Result<Self> {
        let shape = shape.into();
        let expected = shape.checked_numel()?;
        if data.len() != expected {
            return Err(ArrayError::DataLength {
                shape,
                expected,
                got: data.len(),
            });
        }
        Ok(Self::from_parts(data, shape))
    }

    /// Builds an array whose element count is already known to match.
    pub(crate) fn from_parts(data: Vec<T>, shape: Shape) -> Self {
        debug_assert_eq!(data.len(), shape.numel());
        let strides = shape.strides();
        Self {
            shape,
            strides,
            data,
        }
    }

    /// Creates a rank-0 array holding `value`.
    pub fn scalar(value: T) -> Self {
        Self::from_parts(vec![value], Shape::scalar())
    }

    /// Creates a rank-1 array from a vector.
    pub fn from_vec(data: Vec<T>) -> Self {
        let shape = Shape::from([data.len()]);
        Self::from_parts(data, shape)
    }

    /// Creates an array of the given shape with every element set to `value`.
    ///
    /// # Errors
    ///
    /// Returns `ArrayError::Overflow` if the element count of `shape` does not fit in
    /// `usize`.
    pub fn full(shape: impl Into<Shape>, value: T) -> Result<Self> {
        let shape = shape.into();
        let numel = shape.checked_numel()?;
        Ok(Self::from_parts(vec![value; numel], shape))
    }

    pub fn zeros(shape: impl Into<Shape>) -> Result<Self> {
        Self::full(shape, T::zero())
    }

    pub fn ones(shape: impl Into<Shape>) -> Result<Self> {
        Self::full(shape, T::one())
    }

    /// Reshapes the array to a new shape.
    ///
    /// The number of elements must remain the same; element order is unchanged.
    ///
    /// # Errors
    ///
    /// Returns `ArrayError::Reshape` if the total number of elements in `new_shape`
    /// does not match the current size of the array.
    pub fn reshape(&self, new_shape: impl Into<Shape>) -> Result<Self> {
        let new_shape = new_shape.into();
        if new_shape.checked_numel().ok() != Some(self.size()) {
            return Err(ArrayError::Reshape {
                from: self.shape.clone(),
                to: new_shape,
            });
        }
        Ok(Self::from_parts(self.data.clone(), new_shape))
    }

    /// Returns the shape of the array.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Returns the dimensions of the array as a slice.
    pub fn dims(&self) -> &[usize] {
        self.shape.dims()
    }

    pub fn rank(&self) -> usize {
        self.shape.rank()
    }

    /// Returns the row-major strides of the array.
    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    /// Returns the elements in row-major order.
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Returns the total number of elements in the array.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn dtype(&self) -> DType {
        T::DTYPE
    }

    /// Returns the single element of a one-element array (of any rank).
    pub fn item(&self) -> Option<T> {
        match self.data.as_slice() {
            [value] => Some(*value),
            _ => None,
        }
    }

    /// Consumes the array and returns its row-major data.
    pub fn into_vec(self) -> Vec<T> {
        self.data
    }
}

impl<T> Debug for NDArray<T>
where
    T: Element,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NDArray")
            .field("shape", &self.shape)
            .field("dtype", &T::DTYPE)
            .field("data", &self.data)
            .finish()
    }
}
