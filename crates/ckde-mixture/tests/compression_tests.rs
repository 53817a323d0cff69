//! Integration tests for ingestion, compression and marginalization

mod common;

use ckde_core::KernelKind;
use ckde_mixture::{Density, Mixture, Normalization};
use ckde_space::{AxisSpec, EuclideanSpace, Grid, Space};
use common::{assert_relative_eq, assert_vectors_equal, clustered_samples, position_heading, rng};

#[test]
fn test_compression_conserves_weight_on_clustered_data() {
    let mut m = Mixture::new(position_heading());
    m.add_samples(&clustered_samples(300, 7)).unwrap();
    let before: f64 = m.components().iter().map(|c| c.weight).sum();

    let report = m.compress(40).unwrap();
    assert_eq!(report.components_after, 40);
    assert!(!report.stopped_early);

    let after: f64 = m.components().iter().map(|c| c.weight).sum();
    assert_eq!(before, 300.0);
    assert_eq!(after, 300.0);
    assert_eq!(m.total_weight(), 300.0);
}

#[test]
fn test_compressed_density_stays_close() {
    let space = position_heading();
    let samples = clustered_samples(400, 11);
    let mut full = Mixture::new(space.clone());
    full.add_samples(&samples).unwrap();
    let mut compressed = full.clone();
    compressed.compress(60).unwrap();

    let marginal_grid = Grid::build(
        &space.subspace(&[0]).unwrap(),
        &[AxisSpec::Linear { start: -8.0, stop: 9.0, count: 69 }],
    )
    .unwrap();
    let a = full.marginalize(&[0]).unwrap().evaluate_grid(&marginal_grid).unwrap();
    let b = compressed.marginalize(&[0]).unwrap().evaluate_grid(&marginal_grid).unwrap();

    let l1: f64 = a
        .iter()
        .zip(&b)
        .zip(marginal_grid.cell_weights())
        .map(|((x, y), w)| (x - y).abs() * w)
        .sum();
    assert!(l1 < 0.2, "L1 distance after compression too large: {l1}");
}

#[test]
fn test_marginal_matches_direct_one_dimensional_mixture() {
    let samples = clustered_samples(120, 3);
    let mut joint = Mixture::new(position_heading());
    joint.add_samples(&samples).unwrap();

    let position: Space = EuclideanSpace::gaussian("position", 0.5).unwrap().into();
    let mut direct = Mixture::new(position.clone());
    let xs: Vec<[f64; 1]> = samples.iter().map(|s| [s[0]]).collect();
    direct.add_samples(&xs).unwrap();

    let grid = Grid::build(&position, &[AxisSpec::Step { start: -6.0, stop: 7.0, step: 0.25 }]).unwrap();
    let marginal = joint.marginalize_names(&["position"]).unwrap().evaluate_grid(&grid).unwrap();
    let expected = direct.evaluate_grid(&grid).unwrap();
    assert_vectors_equal(&marginal, &expected, "position marginal");
}

#[test]
fn test_density_integrates_to_one_on_grid() {
    let space = position_heading();
    let mut m = Mixture::new(space.clone());
    m.add_samples(&clustered_samples(50, 5)).unwrap();
    let grid = Grid::build(
        &space,
        &[AxisSpec::Linear { start: -12.0, stop: 12.0, count: 241 }, AxisSpec::Count(64)],
    )
    .unwrap();
    let density = m.evaluate_grid(&grid).unwrap();
    let integral: f64 = density.iter().zip(grid.cell_weights()).map(|(p, w)| p * w).sum();
    assert_relative_eq!(integral, 1.0, epsilon = 5e-3);

    let mass = m.evaluate_grid_with(&grid, Normalization::Mass).unwrap();
    let total: f64 = mass.iter().zip(grid.cell_weights()).map(|(p, w)| p * w).sum();
    assert_relative_eq!(total, 50.0, epsilon = 0.25);
}

#[test]
fn test_finite_support_grid_matches_pointwise() {
    for kind in [KernelKind::Epanechnikov, KernelKind::Box, KernelKind::gaussian()] {
        let space: Space = EuclideanSpace::new(
            vec!["a", "b"],
            ckde_core::Kernel::new(kind, vec![0.3, 0.6]).unwrap(),
        )
        .unwrap()
        .into();
        let mut m = Mixture::new(space.clone());
        m.add_samples(&[[0.0, 0.0], [1.0, 2.0], [-2.0, 0.5], [0.2, 0.1]]).unwrap();
        let grid = Grid::build(
            &space,
            &[
                AxisSpec::Linear { start: -3.0, stop: 3.0, count: 31 },
                AxisSpec::Linear { start: -1.0, stop: 3.0, count: 17 },
            ],
        )
        .unwrap();
        let on_grid = m.evaluate_grid(&grid).unwrap();
        let points: Vec<&[f64]> = (0..grid.len()).map(|i| grid.point(i)).collect();
        assert_eq!(on_grid, m.evaluate(&points).unwrap(), "kernel {}", kind.name());
    }
}

#[test]
fn test_merge_samples_is_reproducible_with_seed() {
    let samples = clustered_samples(80, 21);
    let build = |seed| {
        let mut m = Mixture::builder(position_heading())
            .merge_threshold(1.0)
            .build()
            .unwrap();
        m.merge_samples(&samples, &mut rng(seed)).unwrap();
        m
    };
    let a = build(1);
    let b = build(1);
    assert_eq!(a.components(), b.components());
    assert!(a.len() < 80);
    assert_relative_eq!(a.total_weight(), 80.0);
}

#[test]
fn test_serde_round_trip_preserves_state() {
    let mut m = Mixture::builder(position_heading())
        .compression_target(25)
        .build()
        .unwrap();
    m.add_samples(&clustered_samples(60, 9)).unwrap();

    let json = serde_json::to_string(&m).unwrap();
    let back: Mixture = serde_json::from_str(&json).unwrap();
    assert_eq!(back.components(), m.components());
    assert_eq!(back.space(), m.space());
    assert_eq!(back.config(), m.config());
    assert_eq!(back.total_weight(), m.total_weight());
    assert_eq!(back.sample_count(), 60);

    let rebuilt = Mixture::from_components(
        m.space_arc(),
        m.config().clone(),
        m.components().to_vec(),
        m.sample_count(),
    )
    .unwrap();
    assert_relative_eq!(rebuilt.total_weight(), 60.0, epsilon = 1e-9);
}
