//! Shared utilities for integration tests
#![allow(dead_code)]

pub use approx::assert_relative_eq;

pub const EPSILON: f64 = 1e-10;

/// Assert two vectors are equal within tolerance
pub fn assert_vectors_equal(actual: &[f64], expected: &[f64], context: &str) {
    assert_eq!(actual.len(), expected.len(), "length mismatch for {}", context);

    for (&a, &e) in actual.iter().zip(expected.iter()) {
        assert_relative_eq!(a, e, epsilon = EPSILON);
    }
}

/// Evenly spaced points covering `[lo, hi]`
pub fn linspace(lo: f64, hi: f64, n: usize) -> Vec<f64> {
    if n < 2 {
        return vec![lo; n];
    }
    let step = (hi - lo) / (n - 1) as f64;
    (0..n).map(|i| lo + i as f64 * step).collect()
}
