//! Element types.
//!
//! An `NDArray` holds exactly one element type for its whole lifetime. The set of
//! supported types is closed: two integer widths and two floating-point widths. There is
//! no promotion between them; mixing types is a compile error rather than a runtime
//! conversion.

use ndmat_kernels::KernelElem;
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display};

/// Runtime tag for an element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    I32,
    I64,
    F32,
    F64,
}

impl DType {
    /// Size of one element in bytes.
    pub const fn size(&self) -> usize {
        match self {
            DType::I32 | DType::F32 => 4,
            DType::I64 | DType::F64 => 8,
        }
    }

    pub const fn is_float(&self) -> bool {
        matches!(self, DType::F32 | DType::F64)
    }
}

impl Display for DType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DType::I32 => "i32",
            DType::I64 => "i64",
            DType::F32 => "f32",
            DType::F64 => "f64",
        };
        f.write_str(name)
    }
}

/// Trait bound for elements that can be stored in an `NDArray`.
///
/// # Requirements
/// - `KernelElem`: arithmetic with fixed overflow semantics, shared with the kernels.
/// - `Display`: used when rendering arrays.
/// - `Send + Sync` (via `KernelElem`): required for parallel execution via `rayon`.
///
/// The trait is sealed; only `i32`, `i64`, `f32` and `f64` implement it.
pub trait Element: KernelElem + Display + Debug + sealed::Sealed + 'static {
    const DTYPE: DType;
}

mod sealed {
    pub trait Sealed {}
}

macro_rules! impl_element {
    ($($t:ty => $dtype:ident),*) => {
        $(
            impl sealed::Sealed for $t {}
            impl Element for $t {
                const DTYPE: DType = DType::$dtype;
            }
        )*
    };
}

impl_element!(i32 => I32, i64 => I64, f32 => F32, f64 => F64);
