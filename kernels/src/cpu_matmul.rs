use crate::cpu_broadcast::{broadcast_strides, project};
use crate::{KernelElem, KernelError, Result, check_len, numel, out_len};
use rayon::prelude::*;

/// CPU Implementation of batched Matrix Multiplication.
///
/// `lhs_shape` is `[..., M, K]` and `rhs_shape` is `[..., K, N]`. The leading (batch)
/// dimensions of both operands are broadcast to `batch_shape`, which the caller has
/// already resolved. The output has shape `batch_shape ++ [M, N]`.
///
/// Every output element is an independent dot product summed left to right over `K`,
/// so the parallel and sequential paths are bit-identical.
///
/// # SOTA Integration Guide
///
/// To integrate a library like `cblas` or `matrixmultiply`:
/// 1. Replace the per-row loop with a call to the library's `sgemm` or `dgemm`.
/// 2. Ensure the memory layout matches (Row-Major vs Column-Major).
/// 3. Handle batching by looping over the broadcast batch offsets computed here.
pub fn cpu_matmul<T>(
    lhs_data: &[T],
    rhs_data: &[T],
    lhs_shape: &[usize],
    rhs_shape: &[usize],
    batch_shape: &[usize],
    parallel: bool,
) -> Result<Vec<T>>
where
    T: KernelElem,
{
    for shape in [lhs_shape, rhs_shape] {
        if shape.len() < 2 {
            return Err(KernelError::Rank {
                required: 2,
                shape: shape.to_vec(),
            });
        }
    }
    check_len(lhs_data.len(), lhs_shape)?;
    check_len(rhs_data.len(), rhs_shape)?;

    let lhs_rank = lhs_shape.len();
    let rhs_rank = rhs_shape.len();
    let m = lhs_shape[lhs_rank - 2];
    let k = lhs_shape[lhs_rank - 1];
    let n = rhs_shape[rhs_rank - 1];

    if k != rhs_shape[rhs_rank - 2] {
        return Err(KernelError::ShapeMismatch {
            expected: vec![k],
            got: vec![rhs_shape[rhs_rank - 2]],
        });
    }

    // Batch strides count whole matrices; size-1 and missing batch dims get stride 0.
    let lhs_batch_strides = broadcast_strides(&lhs_shape[..lhs_rank - 2], batch_shape)?;
    let rhs_batch_strides = broadcast_strides(&rhs_shape[..rhs_rank - 2], batch_shape)?;

    let mut out_shape = batch_shape.to_vec();
    out_shape.extend([m, n]);
    let size = out_len(&out_shape)?;
    let mut out_data = vec![T::zero(); size];
    if size == 0 {
        return Ok(out_data);
    }

    log::trace!(
        "matmul kernel: {} batch(es) of [{}, {}] x [{}, {}], parallel={}",
        numel(batch_shape),
        m,
        k,
        k,
        n,
        parallel
    );

    // rhs is [..., K, N]; transposing to [..., N, K] makes both dot product operands
    // contiguous.
    let rhs_t_data = crate::cpu_transpose(rhs_data, rhs_shape, parallel)?;

    // Output is [Batch..., M, N], viewed as `batch * M` rows of length N.
    let row = |(global_row_idx, out_row): (usize, &mut [T])| {
        let batch_idx = global_row_idx / m;
        let row_in_matrix = global_row_idx % m;

        let a_batch_offset = project(batch_idx, batch_shape, &lhs_batch_strides) * m * k;
        let b_t_batch_offset = project(batch_idx, batch_shape, &rhs_batch_strides) * n * k;

        let a_row_start = a_batch_offset + row_in_matrix * k;
        let a_slice = &lhs_data[a_row_start..a_row_start + k];

        for (col_in_matrix, out_elem) in out_row.iter_mut().enumerate() {
            let b_t_row_start = b_t_batch_offset + col_in_matrix * k;
            let b_t_slice = &rhs_t_data[b_t_row_start..b_t_row_start + k];

            let mut sum = T::zero();
            for (&val_a, &val_b) in a_slice.iter().zip(b_t_slice.iter()) {
                sum = sum.add_elem(val_a.mul_elem(val_b));
            }
            *out_elem = sum;
        }
    };

    if parallel {
        out_data.par_chunks_mut(n).enumerate().for_each(row);
    } else {
        out_data.chunks_mut(n).enumerate().for_each(row);
    }

    Ok(out_data)
}
