//! Property-based tests for space metrics and grids

mod common;

use ckde_space::{AxisSpec, CircularSpace, EuclideanSpace, Grid, Space, SpaceMetric};
use common::assert_relative_eq;
use proptest::prelude::*;

proptest! {
    #[test]
    fn prop_circular_distance_symmetric_and_bounded(
        a in -50.0..50.0f64,
        b in -50.0..50.0f64,
        period in 0.5..20.0f64,
    ) {
        let space = CircularSpace::with_period("phase", 2.0, period).unwrap();
        let ab = space.distance(0, a, b);
        let ba = space.distance(0, b, a);
        prop_assert!((ab - ba).abs() < 1e-9);
        prop_assert!(ab >= 0.0);
        prop_assert!(ab <= 0.5 * period + 1e-9);
    }

    #[test]
    fn prop_circular_distance_is_shift_invariant(
        a in 0.0..6.28f64,
        b in 0.0..6.28f64,
        turns in -3i32..3,
    ) {
        let space = CircularSpace::new("theta", 2.0).unwrap();
        let shifted = a + turns as f64 * std::f64::consts::TAU;
        prop_assert!((space.distance(0, a, b) - space.distance(0, shifted, b)).abs() < 1e-9);
    }

    #[test]
    fn prop_euclidean_merge_stays_between(
        l1 in -10.0..10.0f64,
        l2 in -10.0..10.0f64,
        w1 in 0.1..10.0f64,
        w2 in 0.1..10.0f64,
    ) {
        let space = EuclideanSpace::gaussian("x", 1.0).unwrap();
        let (loc, bw) = space.merge(0, w1, (l1, 1.0), w2, (l2, 1.0));
        prop_assert!(loc >= l1.min(l2) - 1e-9 && loc <= l1.max(l2) + 1e-9);
        prop_assert!(bw >= 1.0 - 1e-12);
    }

    #[test]
    fn prop_grid_len_is_product_of_axes(nx in 1usize..20, nt in 1usize..20) {
        let x: Space = EuclideanSpace::gaussian("x", 1.0).unwrap().into();
        let t: Space = CircularSpace::new("t", 1.0).unwrap().into();
        let space = Space::product(vec![x, t]).unwrap();
        let grid = Grid::build(
            &space,
            &[AxisSpec::Linear { start: -1.0, stop: 1.0, count: nx }, AxisSpec::Count(nt)],
        ).unwrap();
        prop_assert_eq!(grid.len(), nx * nt);
        prop_assert_eq!(grid.points().len(), nx * nt * 2);
    }
}

#[test]
fn test_circular_distance_formula() {
    // ((a - b + P/2) mod P) - P/2, taken in absolute value
    let space = CircularSpace::with_period("hour", 1.0, 24.0).unwrap();
    assert_relative_eq!(space.distance(0, 23.0, 1.0), 2.0, epsilon = 1e-12);
    assert_relative_eq!(space.difference(0, 23.0, 1.0), -2.0, epsilon = 1e-12);
    assert_relative_eq!(space.distance(0, 6.0, 18.0), 12.0, epsilon = 1e-12);
}
