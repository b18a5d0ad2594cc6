//! Human-readable rendering of arrays.
//!
//! Arrays print as nested brackets, one row per line, with elements right-aligned to a
//! common width:
//!
//! ```rust
//! use ndmat::NDArray;
//!
//! let a = NDArray::new(vec![1, 20, 3, 4], [2, 2]).unwrap();
//! assert_eq!(a.to_string(), "[[ 1, 20],\n [ 3,  4]]");
//! ```

use super::{Element, NDArray};
use std::fmt::{self, Display, Formatter};

impl<T> Display for NDArray<T>
where
    T: Element,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.rank() == 0 {
            return write!(f, "{}", self.data[0]);
        }
        if self.size() == 0 {
            return f.write_str("[]");
        }

        let cells: Vec<String> = self.data.iter().map(|x| x.to_string()).collect();
        let width = cells.iter().map(String::len).max().unwrap_or(0);
        write_block(f, &cells, self.dims(), 0, width)
    }
}

fn write_block(
    f: &mut Formatter<'_>,
    cells: &[String],
    dims: &[usize],
    depth: usize,
    width: usize,
) -> fmt::Result {
    f.write_str("[")?;

    if let [_] = dims {
        for (i, cell) in cells.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{:>width$}", cell, width = width)?;
        }
        return f.write_str("]");
    }

    // Blocks of rank r are separated by r - 1 blank lines.
    let separator = format!(",{}{}", "\n".repeat(dims.len() - 1), " ".repeat(depth + 1));
    let chunk = cells.len() / dims[0];
    for (i, block) in cells.chunks(chunk).enumerate() {
        if i > 0 {
            f.write_str(&separator)?;
        }
        write_block(f, block, &dims[1..], depth + 1, width)?;
    }

    f.write_str("]")
}
