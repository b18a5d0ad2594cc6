//! # ndmat
//!
//! `ndmat` is a pure Rust N-dimensional array library with NumPy-style broadcasting and
//! batched matrix multiplication.
//!
//! It runs on the **CPU only**. Large operations are spread across cores with `rayon`;
//! see [`Config`] for the threshold.
//!
//! ## Modules
//!
//! - [`array`]: The `NDArray` type, shapes, broadcasting, arithmetic (including `pow`) and axis permutation.
//! - [`config`]: Execution settings (parallelism, division-by-zero policy), read once from the environment by [`Config::global`].
//!
//! ## Example
//!
//! ```rust
//! use ndmat::NDArray;
//!
//! let a = NDArray::new(vec![1.0, 2.0, 3.0, 4.0], [2, 2]).unwrap();
//! let b = NDArray::new(vec![5.0, 6.0, 7.0, 8.0], [2, 2]).unwrap();
//!
//! let c = a.matmul(&b).unwrap();
//! assert_eq!(c.data(), &[19.0, 22.0, 43.0, 50.0]);
//!
//! let d = (&a + &NDArray::scalar(1.0)).unwrap();
//! println!("{}", d);
//! ```

/// Macro for creating an NDArray with compile-time shape checking.
///
/// # Examples
///
/// ```rust
/// use ndmat::ndarray;
///
/// // Works
/// let a = ndarray!([1.0, 2.0, 3.0, 4.0], [2, 2]);
/// assert_eq!(a.shape(), &[2, 2]);
///
/// // A single argument builds a vector.
/// let v = ndarray!([1, 2, 3]);
/// assert_eq!(v.shape(), &[3]);
///
/// // Fails to compile:
/// // let a = ndarray!([1.0, 2.0, 3.0], [2, 2]);
/// ```
#[macro_export]
macro_rules! ndarray {
    ($data:expr) => {
        $crate::NDArray::from_vec($data.to_vec())
    };
    ($data:expr, $shape:expr) => {{
        // Constants to force compile-time evaluation
        const DATA_LEN: usize = (&$data as &[_]).len();
        const SHAPE: [usize; (&$shape as &[_]).len()] = $shape;
        const EXPECTED_SIZE: usize = {
            let mut size = 1;
            let mut i = 0;
            while i < SHAPE.len() {
                size *= SHAPE[i];
                i += 1;
            }
            size
        };

        // This assertion triggers a compile-time error if false
        const _: () = assert!(
            DATA_LEN == EXPECTED_SIZE,
            "Shape mismatch: data length does not match shape product"
        );

        match $crate::NDArray::new($data.to_vec(), SHAPE) {
            Ok(array) => array,
            Err(_) => unreachable!("length checked at compile time"),
        }
    }};
}

pub mod array;
pub mod config;

pub use array::{ArrayError, BinaryOp, DType, Element, ErrorKind, NDArray, Result, Shape};
pub use config::{Config, ConfigError, DivisionPolicy};
