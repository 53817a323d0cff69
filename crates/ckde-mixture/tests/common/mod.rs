//! Shared utilities for integration tests
#![allow(dead_code)]

pub use approx::assert_relative_eq;

use ckde_space::{CircularSpace, EuclideanSpace, Space};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

pub const EPSILON: f64 = 1e-10;

/// Seeded generator so failures reproduce
pub fn rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Two-dimensional space: linear position and circular heading
pub fn position_heading() -> Space {
    let position: Space = EuclideanSpace::gaussian("position", 0.5).unwrap().into();
    let heading: Space = CircularSpace::new("heading", 8.0).unwrap().into();
    Space::product(vec![position, heading]).unwrap()
}

/// Samples from a two-cluster mixture in (position, heading)
pub fn clustered_samples(n: usize, seed: u64) -> Vec<[f64; 2]> {
    let mut rng = rng(seed);
    let left = Normal::new(-3.0, 0.7).unwrap();
    let right = Normal::new(4.0, 1.1).unwrap();
    let heading = Normal::<f64>::new(1.0, 0.4).unwrap();
    (0..n)
        .map(|i| {
            let x = if i % 3 == 0 { right.sample(&mut rng) } else { left.sample(&mut rng) };
            let h = heading.sample(&mut rng).rem_euclid(std::f64::consts::TAU);
            [x, h]
        })
        .collect()
}

/// Assert two vectors are equal within tolerance
pub fn assert_vectors_equal(actual: &[f64], expected: &[f64], context: &str) {
    assert_eq!(actual.len(), expected.len(), "length mismatch for {}", context);

    for (&a, &e) in actual.iter().zip(expected.iter()) {
        assert_relative_eq!(a, e, epsilon = EPSILON, max_relative = 1e-9);
    }
}
