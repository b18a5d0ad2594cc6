use crate::{KernelElem, KernelError, Result, check_len, contiguous_strides, out_len};
use rayon::prelude::*;

/// Strides that project an index of `out_shape` onto a source of `src_shape`.
///
/// The source is aligned with the output at the trailing dimension. Dimensions the
/// source lacks (left padding) and dimensions where the source has size 1 get stride
/// 0, so every output index along them maps to index 0 of the source.
///
/// # Errors
///
/// Returns `KernelError::ShapeMismatch` if `src_shape` cannot be broadcast to
/// `out_shape`.
pub fn broadcast_strides(src_shape: &[usize], out_shape: &[usize]) -> Result<Vec<usize>> {
    let mismatch = || KernelError::ShapeMismatch {
        expected: out_shape.to_vec(),
        got: src_shape.to_vec(),
    };
    if src_shape.len() > out_shape.len() {
        return Err(mismatch());
    }

    let pad = out_shape.len() - src_shape.len();
    let src_strides = contiguous_strides(src_shape);
    let mut strides = vec![0; out_shape.len()];
    for (i, (&dim, &stride)) in src_shape.iter().zip(&src_strides).enumerate() {
        let out_dim = out_shape[pad + i];
        if dim == out_dim {
            strides[pad + i] = if dim == 1 { 0 } else { stride };
        } else if dim != 1 {
            return Err(mismatch());
        }
    }
    Ok(strides)
}

/// Maps a flat output index to a flat source offset using projected strides.
#[inline]
pub(crate) fn project(mut flat: usize, out_shape: &[usize], strides: &[usize]) -> usize {
    let mut offset = 0;
    for (&dim, &stride) in out_shape.iter().zip(strides).rev() {
        offset += (flat % dim) * stride;
        flat /= dim;
    }
    offset
}

/// Materialises `data` (of `src_shape`) at the broadcast-compatible `out_shape`.
pub fn cpu_broadcast_to<T>(
    data: &[T],
    src_shape: &[usize],
    out_shape: &[usize],
    parallel: bool,
) -> Result<Vec<T>>
where
    T: KernelElem,
{
    check_len(data.len(), src_shape)?;
    let strides = broadcast_strides(src_shape, out_shape)?;
    let mut out_data = vec![T::zero(); out_len(out_shape)?];

    let elem = |(i, o): (usize, &mut T)| *o = data[project(i, out_shape, &strides)];
    if parallel {
        out_data.par_iter_mut().enumerate().for_each(elem);
    } else {
        out_data.iter_mut().enumerate().for_each(elem);
    }
    Ok(out_data)
}

/// CPU implementation of a broadcasting binary operation.
///
/// Computes `f(lhs[proj(i)], rhs[proj(i)])` for every flat index `i` of `out_shape`.
/// When both operands already have `out_shape` the projection is skipped and the
/// inputs are zipped directly.
///
/// `parallel` selects the `rayon` path. Each output element is written by exactly one
/// closure call, so both paths produce identical results.
pub fn cpu_binary_broadcast<T, F>(
    lhs_data: &[T],
    rhs_data: &[T],
    lhs_shape: &[usize],
    rhs_shape: &[usize],
    out_shape: &[usize],
    parallel: bool,
    f: F,
) -> Result<Vec<T>>
where
    T: KernelElem,
    F: Fn(T, T) -> T + Sync + Send,
{
    check_len(lhs_data.len(), lhs_shape)?;
    check_len(rhs_data.len(), rhs_shape)?;

    let size = out_len(out_shape)?;
    let mut out_data = vec![T::zero(); size];

    if lhs_shape == out_shape && rhs_shape == out_shape {
        log::trace!("binary kernel: same-shape fast path over {} elements", size);
        let elem = |((o, a), b): ((&mut T, &T), &T)| *o = f(*a, *b);
        if parallel {
            out_data
                .par_iter_mut()
                .zip(lhs_data.par_iter())
                .zip(rhs_data.par_iter())
                .for_each(elem);
        } else {
            out_data
                .iter_mut()
                .zip(lhs_data.iter())
                .zip(rhs_data.iter())
                .for_each(elem);
        }
        return Ok(out_data);
    }

    let lhs_strides = broadcast_strides(lhs_shape, out_shape)?;
    let rhs_strides = broadcast_strides(rhs_shape, out_shape)?;
    log::trace!(
        "binary kernel: broadcasting {:?} x {:?} -> {:?} (strides {:?}, {:?})",
        lhs_shape,
        rhs_shape,
        out_shape,
        lhs_strides,
        rhs_strides
    );

    let elem = |(i, o): (usize, &mut T)| {
        let a = lhs_data[project(i, out_shape, &lhs_strides)];
        let b = rhs_data[project(i, out_shape, &rhs_strides)];
        *o = f(a, b);
    };
    if parallel {
        out_data.par_iter_mut().enumerate().for_each(elem);
    } else {
        out_data.iter_mut().enumerate().for_each(elem);
    }

    Ok(out_data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broadcast_strides() {
        // [2] against [3, 2]: row vector repeated down the rows
        assert_eq!(broadcast_strides(&[2], &[3, 2]).unwrap(), vec![0, 1]);
        // [3, 1] against [3, 4]: column repeated across
        assert_eq!(broadcast_strides(&[3, 1], &[3, 4]).unwrap(), vec![1, 0]);
        // Scalar
        assert_eq!(broadcast_strides(&[], &[2, 2]).unwrap(), vec![0, 0]);
        // Identity
        assert_eq!(broadcast_strides(&[2, 3], &[2, 3]).unwrap(), vec![3, 1]);
    }

    #[test]
    fn test_broadcast_strides_mismatch() {
        let err = broadcast_strides(&[3], &[2, 2]);
        assert!(matches!(err, Err(KernelError::ShapeMismatch { .. })));

        let err = broadcast_strides(&[1, 2, 2], &[2, 2]);
        assert!(matches!(err, Err(KernelError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_project() {
        let strides = broadcast_strides(&[1, 3], &[2, 3]).unwrap();
        let offsets: Vec<usize> = (0..6).map(|i| project(i, &[2, 3], &strides)).collect();
        assert_eq!(offsets, vec![0, 1, 2, 0, 1, 2]);
    }

    #[test]
    fn test_broadcast_to() {
        let out = cpu_broadcast_to(&[1, 2, 3], &[3], &[2, 3], false).unwrap();
        assert_eq!(out, vec![1, 2, 3, 1, 2, 3]);

        let out = cpu_broadcast_to(&[1.0, 2.0], &[2, 1], &[2, 2], true).unwrap();
        assert_eq!(out, vec![1.0, 1.0, 2.0, 2.0]);

        let err = cpu_broadcast_to(&[1, 2], &[2], &[3], false);
        assert!(matches!(err, Err(KernelError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_binary_same_shape() {
        let a = vec![1.0, 2.0, 3.0];
        let b = vec![4.0, 5.0, 6.0];
        let out = cpu_binary_broadcast(&a, &b, &[3], &[3], &[3], false, |x, y| x + y).unwrap();
        assert_eq!(out, vec![5.0, 7.0, 9.0]);
    }

    #[test]
    fn test_binary_row_broadcast() {
        // [[1, 2], [3, 4]] - [[7, 8]]
        let a = vec![1, 2, 3, 4];
        let b = vec![7, 8];
        let out =
            cpu_binary_broadcast(&a, &b, &[2, 2], &[1, 2], &[2, 2], false, |x, y| x - y).unwrap();
        assert_eq!(out, vec![-6, -6, -4, -4]);
    }

    #[test]
    fn test_binary_outer_broadcast() {
        // [3, 1] * [1, 2] -> [3, 2]
        let a = vec![1.0, 2.0, 3.0];
        let b = vec![10.0, 100.0];
        let out =
            cpu_binary_broadcast(&a, &b, &[3, 1], &[1, 2], &[3, 2], false, |x, y| x * y).unwrap();
        assert_eq!(out, vec![10.0, 100.0, 20.0, 200.0, 30.0, 300.0]);
    }

    #[test]
    fn test_binary_parallel_matches_sequential() {
        let a: Vec<f64> = (0..24).map(|i| i as f64 * 0.5).collect();
        let b: Vec<f64> = (0..4).map(|i| i as f64 + 1.0).collect();
        let seq =
            cpu_binary_broadcast(&a, &b, &[2, 3, 4], &[4], &[2, 3, 4], false, |x, y| x / y)
                .unwrap();
        let par = cpu_binary_broadcast(&a, &b, &[2, 3, 4], &[4], &[2, 3, 4], true, |x, y| x / y)
            .unwrap();
        assert_eq!(seq, par);
    }

    #[test]
    fn test_binary_empty_output() {
        let a: Vec<f32> = vec![];
        let b = vec![1.0f32];
        let out = cpu_binary_broadcast(&a, &b, &[0, 3], &[1], &[0, 3], true, |x, y| x + y).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_binary_output_overflow() {
        let err = cpu_binary_broadcast(
            &[1.0f32],
            &[1.0f32],
            &[1],
            &[1],
            &[1 << 32, 1 << 32],
            false,
            |x, y| x + y,
        );
        assert!(matches!(err, Err(KernelError::Overflow { .. })));
    }

    #[test]
    fn test_binary_data_length_mismatch() {
        let a = vec![1.0, 2.0];
        let b = vec![1.0, 2.0];
        let err = cpu_binary_broadcast(&a, &b, &[3], &[2], &[3], false, |x, y| x + y);
        assert!(matches!(err, Err(KernelError::ShapeMismatch { .. })));
    }
}
