//! Mathematical utilities shared by the density and decoding crates
//!
//! Log-domain reductions, special functions needed by kernel normalizers,
//! and periodic wrapping.

use num_traits::Float;
use statrs::function::{erf, factorial};

/// Numerically stable `ln(sum(exp(x)))`
///
/// Returns negative infinity for an empty slice or when every term is
/// negative infinity.
pub fn log_sum_exp<T: Float>(values: &[T]) -> T {
    let max = values
        .iter()
        .copied()
        .fold(T::neg_infinity(), |acc, v| if v > acc { v } else { acc });

    if max == T::neg_infinity() {
        return max;
    }
    if max == T::infinity() {
        return max;
    }

    let sum = values
        .iter()
        .fold(T::zero(), |acc, &v| acc + (v - max).exp());
    max + sum.ln()
}

/// Convert log-weights into probabilities summing to one.
///
/// The maximum is subtracted before exponentiating. If every entry is
/// negative infinity the result is uniform.
pub fn normalize_log_weights(log_weights: &[f64]) -> Vec<f64> {
    if log_weights.is_empty() {
        return Vec::new();
    }

    let lse = log_sum_exp(log_weights);
    if !lse.is_finite() {
        let uniform = 1.0 / log_weights.len() as f64;
        return vec![uniform; log_weights.len()];
    }

    log_weights.iter().map(|&v| (v - lse).exp()).collect()
}

/// Exponentially scaled modified Bessel function of the first kind, order zero.
///
/// Computes `I0(x) * exp(-|x|)` using the polynomial approximations of
/// Abramowitz and Stegun (9.8.1 and 9.8.2), relative error below 2e-7.
pub fn bessel_i0e(x: f64) -> f64 {
    let ax = x.abs();
    if ax < 3.75 {
        let t = (x / 3.75).powi(2);
        let i0 = 1.0
            + t * (3.5156229
                + t * (3.0899424
                    + t * (1.2067492 + t * (0.2659732 + t * (0.0360768 + t * 0.0045813)))));
        i0 * (-ax).exp()
    } else {
        let t = 3.75 / ax;
        let poly = 0.39894228
            + t * (0.01328592
                + t * (0.00225319
                    + t * (-0.00157565
                        + t * (0.00916281
                            + t * (-0.02057706
                                + t * (0.02635537 + t * (-0.01647633 + t * 0.00392377)))))));
        poly / ax.sqrt()
    }
}

/// Natural log of `n!`
#[inline]
pub fn ln_factorial(n: u64) -> f64 {
    factorial::ln_factorial(n)
}

/// Probability mass of a standard normal inside `[-cutoff, cutoff]`.
///
/// An infinite cutoff gives exactly 1.
pub fn gaussian_truncated_mass(cutoff: f64) -> f64 {
    if cutoff.is_infinite() {
        1.0
    } else {
        1.0 - erf::erfc(cutoff / std::f64::consts::SQRT_2)
    }
}

/// Wrap `x` into `[-period/2, period/2)`.
#[inline]
pub fn wrap_signed(x: f64, period: f64) -> f64 {
    let half = 0.5 * period;
    (x + half).rem_euclid(period) - half
}

/// Wrap `x` into `[0, period)`.
#[inline]
pub fn wrap_positive(x: f64, period: f64) -> f64 {
    x.rem_euclid(period)
}
