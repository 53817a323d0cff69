//! Shared utilities for integration tests
#![allow(dead_code)]

pub use approx::assert_relative_eq;

use ckde_decode::{BaselineRate, PoissonLikelihood, Stimulus, StimulusOccupancy};
use ckde_space::{AxisSpec, CategoricalSpace, EuclideanSpace, Space};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal, Uniform};
use std::sync::Arc;

pub fn rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Categorical stimulus with the given arm labels
pub fn arms(labels: &[&str]) -> Arc<Stimulus> {
    let space: Space = CategoricalSpace::new("arm", labels.to_vec()).unwrap().into();
    Arc::new(Stimulus::new(space, &[AxisSpec::All]).unwrap())
}

/// One-dimensional track of length 100 decoded at 2-unit resolution
pub fn track() -> Arc<Stimulus> {
    let space: Space = EuclideanSpace::gaussian("position", 3.0).unwrap().into();
    Arc::new(
        Stimulus::new(space, &[AxisSpec::Linear { start: 0.0, stop: 100.0, count: 51 }]).unwrap(),
    )
}

/// Uniform occupancy over the track, sampled every `dt`
pub fn track_occupancy(stimulus: &Arc<Stimulus>, samples: usize, dt: f64, seed: u64) -> StimulusOccupancy {
    let mut rng = rng(seed);
    let uniform = Uniform::new(0.0, 100.0);
    let points: Vec<[f64; 1]> = (0..samples).map(|_| [uniform.sample(&mut rng)]).collect();
    let mut occ = StimulusOccupancy::new(Arc::clone(stimulus), dt).unwrap();
    occ.add_samples(&points).unwrap();
    occ
}

/// A place cell with a Gaussian firing field at `center`
pub fn place_cell(stimulus: &Arc<Stimulus>, center: f64, events: usize, seed: u64) -> PoissonLikelihood {
    let mut rng = rng(seed);
    let field = Normal::new(center, 4.0).unwrap();
    let points: Vec<[f64; 1]> = (0..events)
        .map(|_| [field.sample(&mut rng).clamp(0.0, 100.0)])
        .collect();
    let mut cell = PoissonLikelihood::stimulus_only(Arc::clone(stimulus), BaselineRate::Empirical).unwrap();
    cell.add_events(&points).unwrap();
    cell
}
