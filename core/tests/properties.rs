//! Randomised checks of the algebraic properties of the array operations.

use ndmat::{BinaryOp, Config, NDArray};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const TRIALS: usize = 50;

fn random_shape(rng: &mut StdRng, max_rank: usize) -> Vec<usize> {
    let rank = rng.gen_range(0..=max_rank);
    (0..rank).map(|_| rng.gen_range(1..=4)).collect()
}

fn random_array(rng: &mut StdRng, shape: &[usize]) -> NDArray<f64> {
    let n: usize = shape.iter().product();
    let data = (0..n).map(|_| rng.gen_range(-10.0..10.0)).collect();
    NDArray::new(data, shape).unwrap()
}

/// A shape compatible with `shape`: some trailing dims kept, some set to 1.
fn compatible_shape(rng: &mut StdRng, shape: &[usize]) -> Vec<usize> {
    let keep = rng.gen_range(0..=shape.len());
    shape[shape.len() - keep..]
        .iter()
        .map(|&d| if rng.gen_bool(0.3) { 1 } else { d })
        .collect()
}

#[test]
fn test_broadcast_add_commutes() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..TRIALS {
        let lhs_shape = random_shape(&mut rng, 4);
        let rhs_shape = compatible_shape(&mut rng, &lhs_shape);
        let a = random_array(&mut rng, &lhs_shape);
        let b = random_array(&mut rng, &rhs_shape);

        let ab = a.add(&b).unwrap();
        let ba = b.add(&a).unwrap();
        assert_eq!(ab.shape(), &lhs_shape[..]);
        assert_eq!(ab, ba);

        let ab = a.mul(&b).unwrap();
        let ba = b.mul(&a).unwrap();
        assert_eq!(ab, ba);
    }
}

#[test]
fn test_broadcast_shape_commutes() {
    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..TRIALS {
        let a = ndmat::Shape::from(random_shape(&mut rng, 4));
        let b = ndmat::Shape::from(random_shape(&mut rng, 4));
        match (a.broadcast(&b), b.broadcast(&a)) {
            (Ok(x), Ok(y)) => assert_eq!(x, y),
            (Err(_), Err(_)) => {}
            (x, y) => panic!("asymmetric broadcast of {} and {}: {:?} vs {:?}", a, b, x, y),
        }
    }
}

/// A random factorisation of `n` into `parts` dimensions.
fn random_factorisation(rng: &mut StdRng, n: usize, parts: usize) -> Vec<usize> {
    let mut dims = Vec::with_capacity(parts);
    let mut rest = n;
    for _ in 1..parts {
        let divisors: Vec<usize> = (1..=rest).filter(|d| rest % d == 0).collect();
        let d = divisors[rng.gen_range(0..divisors.len())];
        dims.push(d);
        rest /= d;
    }
    dims.push(rest);
    dims
}

#[test]
fn test_reshape_roundtrip() {
    let mut rng = StdRng::seed_from_u64(3);
    for _ in 0..TRIALS {
        let shape = random_shape(&mut rng, 4);
        let a = random_array(&mut rng, &shape);
        let flat = a.reshape([a.size()]).unwrap();
        assert_eq!(flat.data(), a.data());
        let back = flat.reshape(shape.as_slice()).unwrap();
        assert_eq!(back, a);

        for parts in [2, 3] {
            let target = random_factorisation(&mut rng, a.size(), parts);
            let reshaped = a.reshape(target.as_slice()).unwrap();
            assert_eq!(reshaped.shape(), &target[..]);
            assert_eq!(reshaped.data(), a.data());
            assert_eq!(reshaped.reshape(shape.as_slice()).unwrap(), a);
        }
    }
}

#[test]
fn test_reshape_rejects_mismatched_count() {
    let mut rng = StdRng::seed_from_u64(23);
    for _ in 0..TRIALS {
        let shape = random_shape(&mut rng, 3);
        let a = random_array(&mut rng, &shape);
        let mut target = random_factorisation(&mut rng, a.size(), 2);
        target[0] += 1;
        assert!(a.reshape(target.as_slice()).is_err());
    }
}

#[test]
fn test_sub_then_add_restores() {
    let mut rng = StdRng::seed_from_u64(5);
    for _ in 0..TRIALS {
        let shape = random_shape(&mut rng, 3);
        let a = random_array(&mut rng, &shape);
        let b = random_array(&mut rng, &shape);
        let restored = a.sub(&b).unwrap().add(&b).unwrap();
        for (x, y) in restored.data().iter().zip(a.data()) {
            assert!((x - y).abs() < 1e-9);
        }
    }
}

#[test]
fn test_matmul_associative() {
    let mut rng = StdRng::seed_from_u64(13);
    for _ in 0..TRIALS {
        let a = random_array(&mut rng, &[2, 2]);
        let b = random_array(&mut rng, &[2, 2]);
        let c = random_array(&mut rng, &[2, 2]);

        let left = a.matmul(&b).unwrap().matmul(&c).unwrap();
        let right = a.matmul(&b.matmul(&c).unwrap()).unwrap();
        for (x, y) in left.data().iter().zip(right.data()) {
            assert!((x - y).abs() <= 1e-9 * x.abs().max(1.0), "{} vs {}", x, y);
        }
    }
}

#[test]
fn test_matmul_identity() {
    let mut rng = StdRng::seed_from_u64(17);
    for _ in 0..TRIALS {
        let n = rng.gen_range(1..=5);
        let m = rng.gen_range(1..=5);
        let a = random_array(&mut rng, &[m, n]);
        let mut eye = vec![0.0; n * n];
        for i in 0..n {
            eye[i * n + i] = 1.0;
        }
        let eye = NDArray::new(eye, [n, n]).unwrap();
        assert_eq!(a.matmul(&eye).unwrap(), a);
    }
}

#[test]
fn test_parallel_matches_sequential() {
    let sequential = Config::default().with_parallel_threshold(usize::MAX);
    let parallel = Config::default().with_parallel_threshold(0);

    let mut rng = StdRng::seed_from_u64(19);
    for _ in 0..TRIALS {
        let lhs_shape = random_shape(&mut rng, 4);
        let rhs_shape = compatible_shape(&mut rng, &lhs_shape);
        let a = random_array(&mut rng, &lhs_shape);
        let b = random_array(&mut rng, &rhs_shape);

        for op in [
            BinaryOp::Add,
            BinaryOp::Sub,
            BinaryOp::Mul,
            BinaryOp::Div,
            BinaryOp::Pow,
        ] {
            let seq = a.binary_op_with(&b, op, &sequential).unwrap();
            let par = a.binary_op_with(&b, op, &parallel).unwrap();
            assert_eq!(seq.data().len(), par.data().len());
            for (x, y) in seq.data().iter().zip(par.data()) {
                assert!(x == y || (x.is_nan() && y.is_nan()));
            }
        }

        let batch = rng.gen_range(1..=3);
        let (m, k, n) = (rng.gen_range(1..=4), rng.gen_range(1..=4), rng.gen_range(1..=4));
        let x = random_array(&mut rng, &[batch, m, k]);
        let y = random_array(&mut rng, &[k, n]);
        assert_eq!(
            x.matmul_with(&y, &sequential).unwrap(),
            x.matmul_with(&y, &parallel).unwrap()
        );
    }
}
