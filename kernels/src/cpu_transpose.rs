use crate::cpu_broadcast::project;
use crate::{KernelElem, KernelError, Result, check_len, contiguous_strides};
use rayon::prelude::*;

/// CPU Implementation of Transpose.
///
/// Swaps the last two dimensions of the input data. Leading dimensions are treated as
/// a stack of independent matrices.
///
/// Optimized transpose operations often use tiling (blocking) to improve cache usage.
/// Libraries like `hptt` (High Performance Tensor Transpose) can be used here.
pub fn cpu_transpose<T>(data: &[T], shape: &[usize], parallel: bool) -> Result<Vec<T>>
where
    T: KernelElem,
{
    let rank = shape.len();
    if rank < 2 {
        return Err(KernelError::Rank {
            required: 2,
            shape: shape.to_vec(),
        });
    }
    check_len(data.len(), shape)?;

    let m = shape[rank - 2];
    let n = shape[rank - 1];
    let size = data.len();
    let mut out_data = vec![T::zero(); size];
    if size == 0 {
        return Ok(out_data);
    }

    // The output has shape [Batch..., N, M], viewed as `batch_size * N` rows of length M.
    let row = |(i, out_row): (usize, &mut [T])| {
        let batch_idx = i / n;
        let col_idx = i % n;
        let input_batch_offset = batch_idx * m * n;

        // Input is [M, N]; element (r, col_idx) lands in column r of this output row.
        for (r, out_elem) in out_row.iter_mut().enumerate() {
            *out_elem = data[input_batch_offset + r * n + col_idx];
        }
    };

    if parallel {
        out_data.par_chunks_mut(m).enumerate().for_each(row);
    } else {
        out_data.chunks_mut(m).enumerate().for_each(row);
    }

    Ok(out_data)
}

/// Reorders the axes of `data`: output axis `i` is input axis `axes[i]`.
///
/// Each output element is gathered from the input through the permuted input strides.
///
/// # Errors
///
/// Returns `KernelError::ShapeMismatch` if `axes` is not a permutation of
/// `0..shape.len()`, or if `data` does not match `shape`.
pub fn cpu_permute<T>(data: &[T], shape: &[usize], axes: &[usize], parallel: bool) -> Result<Vec<T>>
where
    T: KernelElem,
{
    let rank = shape.len();
    let mut seen = vec![false; rank];
    let valid = axes.len() == rank
        && axes
            .iter()
            .all(|&axis| axis < rank && !std::mem::replace(&mut seen[axis], true));
    if !valid {
        return Err(KernelError::ShapeMismatch {
            expected: (0..rank).collect(),
            got: axes.to_vec(),
        });
    }
    check_len(data.len(), shape)?;

    let in_strides = contiguous_strides(shape);
    let out_shape: Vec<usize> = axes.iter().map(|&axis| shape[axis]).collect();
    let strides: Vec<usize> = axes.iter().map(|&axis| in_strides[axis]).collect();

    let mut out_data = vec![T::zero(); data.len()];
    if out_data.is_empty() {
        return Ok(out_data);
    }
    log::trace!(
        "permute kernel: {:?} by {:?} -> {:?}",
        shape,
        axes,
        out_shape
    );

    let elem = |(i, o): (usize, &mut T)| *o = data[project(i, &out_shape, &strides)];
    if parallel {
        out_data.par_iter_mut().enumerate().for_each(elem);
    } else {
        out_data.iter_mut().enumerate().for_each(elem);
    }
    Ok(out_data)
}
