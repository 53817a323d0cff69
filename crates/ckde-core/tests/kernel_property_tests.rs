//! Property-based tests for kernel families

mod common;

use ckde_core::math::{log_sum_exp, normalize_log_weights, wrap_signed};
use ckde_core::KernelKind;
use common::{assert_vectors_equal, linspace};
use proptest::prelude::*;

fn any_kind() -> impl Strategy<Value = KernelKind> {
    prop_oneof![
        Just(KernelKind::gaussian()),
        Just(KernelKind::Gaussian { cutoff: f64::INFINITY }),
        Just(KernelKind::Epanechnikov),
        Just(KernelKind::Box),
        Just(KernelKind::VonMises),
    ]
}

proptest! {
    #[test]
    fn prop_kernel_is_non_negative_and_symmetric(
        kind in any_kind(),
        d in -10.0..10.0f64,
        bw in 0.01..5.0f64,
    ) {
        let p = kind.evaluate(d, bw);
        prop_assert!(p >= 0.0);
        prop_assert!(p.is_finite());
        prop_assert!((p - kind.evaluate(-d, bw)).abs() <= 1e-12 * p.max(1.0));
    }

    #[test]
    fn prop_kernel_peaks_at_zero(
        kind in any_kind(),
        d in -10.0..10.0f64,
        bw in 0.01..5.0f64,
    ) {
        prop_assert!(kind.evaluate(0.0, bw) >= kind.evaluate(d, bw));
    }

    #[test]
    fn prop_wrap_signed_in_range(x in -100.0..100.0f64, period in 0.5..20.0f64) {
        let w = wrap_signed(x, period);
        prop_assert!(w >= -0.5 * period - 1e-12);
        prop_assert!(w < 0.5 * period + 1e-12);
    }

    #[test]
    fn prop_normalized_weights_sum_to_one(values in prop::collection::vec(-500.0..500.0f64, 1..50)) {
        let p = normalize_log_weights(&values);
        let total: f64 = p.iter().sum();
        prop_assert!((total - 1.0).abs() < 1e-9);
        prop_assert!(log_sum_exp(&values).is_finite());
    }
}

#[test]
fn test_gaussian_cutoff_renormalizes() {
    let truncated = KernelKind::gaussian();
    let full = KernelKind::Gaussian { cutoff: f64::INFINITY };
    // Inside the cutoff the truncated kernel is a constant multiple of the full one
    let xs = linspace(-1.4, 1.4, 15);
    let ratios: Vec<f64> = xs
        .iter()
        .map(|&x| truncated.evaluate(x, 0.5) / full.evaluate(x, 0.5))
        .collect();
    let expected = vec![ratios[0]; ratios.len()];
    assert_vectors_equal(&ratios, &expected, "cutoff ratio");
    assert!(ratios[0] > 1.0);
}
