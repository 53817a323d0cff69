//! The decoded variable: its space, its grid and where it was observed

use ckde_core::{Error, Result};
use ckde_mixture::{CompressionReport, Density, Mixture, MixtureConfig};
use ckde_space::{AxisSpec, Grid, Space};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// A stimulus space together with the grid it is decoded on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stimulus {
    space: Space,
    grid: Grid,
}

impl Stimulus {
    /// Build the grid for `space` from one axis spec per dimension
    pub fn new(space: Space, axes: &[AxisSpec]) -> Result<Self> {
        let grid = Grid::build(&space, axes)?;
        Ok(Self { space, grid })
    }

    /// Use a prebuilt grid, which must match the space's dimensions
    pub fn from_grid(space: Space, grid: Grid) -> Result<Self> {
        grid.check_space(&space)?;
        Ok(Self { space, grid })
    }

    pub fn space(&self) -> &Space {
        &self.space
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn dimension_names(&self) -> Vec<String> {
        self.space.dimension_names()
    }

    /// Number of grid points
    pub fn len(&self) -> usize {
        self.grid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grid.is_empty()
    }
}

static NEXT_REVISION: AtomicU64 = AtomicU64::new(1);

fn next_revision() -> u64 {
    NEXT_REVISION.fetch_add(1, Ordering::Relaxed)
}

/// Where the stimulus was while events were being recorded.
///
/// Each occupancy sample stands for `stimulus_duration` units of time, so
/// the mixture's total weight converts to the total observation time
/// used by empirical rates.
///
/// [`StimulusOccupancy::revision`] identifies the occupancy state: it is
/// drawn from a process-wide counter on construction, deserialization
/// and every mutation, so two occupancies only share a revision when
/// one is an unmodified clone of the other. Likelihoods compare it to
/// detect stale intensity surfaces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StimulusOccupancy {
    stimulus: Arc<Stimulus>,
    mixture: Mixture,
    stimulus_duration: f64,
    #[serde(skip, default = "next_revision")]
    revision: u64,
    #[serde(skip)]
    cache: OnceLock<Vec<f64>>,
}

impl StimulusOccupancy {
    pub fn new(stimulus: impl Into<Arc<Stimulus>>, stimulus_duration: f64) -> Result<Self> {
        Self::with_config(stimulus, stimulus_duration, MixtureConfig::default())
    }

    /// Occupancy whose mixture uses `config` for merging, compression
    /// and attenuation
    pub fn with_config(
        stimulus: impl Into<Arc<Stimulus>>,
        stimulus_duration: f64,
        config: MixtureConfig,
    ) -> Result<Self> {
        if !(stimulus_duration > 0.0 && stimulus_duration.is_finite()) {
            return Err(Error::invalid_parameter(format!(
                "stimulus duration must be positive and finite, got {stimulus_duration}"
            )));
        }
        let stimulus = stimulus.into();
        let mixture = Mixture::with_config(stimulus.space().clone(), config)?;
        Ok(Self {
            stimulus,
            mixture,
            stimulus_duration,
            revision: next_revision(),
            cache: OnceLock::new(),
        })
    }

    /// Wrap an existing occupancy mixture, e.g. after deserialization
    pub fn from_mixture(
        stimulus: impl Into<Arc<Stimulus>>,
        mixture: Mixture,
        stimulus_duration: f64,
    ) -> Result<Self> {
        let mut occupancy = Self::with_config(stimulus, stimulus_duration, mixture.config().clone())?;
        if mixture.space() != occupancy.stimulus.space() {
            return Err(Error::invalid_parameter(
                "occupancy mixture space differs from the stimulus space",
            ));
        }
        occupancy.mixture = mixture;
        occupancy.touch();
        Ok(occupancy)
    }

    pub fn stimulus(&self) -> &Arc<Stimulus> {
        &self.stimulus
    }

    pub fn grid(&self) -> &Grid {
        self.stimulus.grid()
    }

    pub fn mixture(&self) -> &Mixture {
        &self.mixture
    }

    pub fn stimulus_duration(&self) -> f64 {
        self.stimulus_duration
    }

    /// Total time represented by the occupancy samples
    pub fn stimulus_time(&self) -> f64 {
        self.mixture.total_weight() * self.stimulus_duration
    }

    /// Identifier of the current occupancy state, unique within the process
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn add_sample(&mut self, point: &[f64]) -> Result<()> {
        self.add_samples(&[point])
    }

    pub fn add_samples<P: AsRef<[f64]>>(&mut self, points: &[P]) -> Result<()> {
        self.mixture.add_samples(points)?;
        self.touch();
        Ok(())
    }

    pub fn add_weighted_samples<P: AsRef<[f64]>>(&mut self, points: &[P], weights: &[f64]) -> Result<()> {
        self.mixture.add_weighted_samples(points, weights)?;
        self.touch();
        Ok(())
    }

    /// Add samples in random order
    pub fn merge_samples<P: AsRef<[f64]>, R: Rng + ?Sized>(&mut self, points: &[P], rng: &mut R) -> Result<()> {
        self.mixture.merge_samples(points, rng)?;
        self.touch();
        Ok(())
    }

    pub fn compress(&mut self, target: usize) -> Result<CompressionReport> {
        let report = self.mixture.compress(target)?;
        self.touch();
        Ok(report)
    }

    /// Occupancy density at every grid point, computed once per revision
    pub fn occupancy(&self) -> Result<&[f64]> {
        if let Some(values) = self.cache.get() {
            return Ok(values);
        }
        let values = self.mixture.evaluate_grid(self.stimulus.grid())?;
        debug!("Cached occupancy over {} grid points", values.len());
        Ok(self.cache.get_or_init(|| values))
    }

    /// Occupancy density at arbitrary stimulus points
    pub fn probability<P: AsRef<[f64]> + Sync>(&self, points: &[P]) -> Result<Vec<f64>> {
        self.mixture.evaluate(points)
    }

    /// Natural log of [`StimulusOccupancy::probability`]
    pub fn log_probability<P: AsRef<[f64]> + Sync>(&self, points: &[P]) -> Result<Vec<f64>> {
        Ok(self.probability(points)?.into_iter().map(f64::ln).collect())
    }

    fn touch(&mut self) {
        self.revision = next_revision();
        self.cache = OnceLock::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ckde_space::{CategoricalSpace, EuclideanSpace};

    fn arms() -> Stimulus {
        let space: Space = CategoricalSpace::new("arm", vec!["A", "B", "C"]).unwrap().into();
        Stimulus::new(space, &[AxisSpec::All]).unwrap()
    }

    #[test]
    fn test_stimulus_time_scales_with_duration() {
        let mut occ = StimulusOccupancy::new(arms(), 0.5).unwrap();
        occ.add_samples(&[[0.0], [1.0], [1.0], [2.0]]).unwrap();
        assert_relative_eq!(occ.stimulus_time(), 2.0);
        assert!(StimulusOccupancy::new(arms(), 0.0).is_err());
    }

    #[test]
    fn test_occupancy_cache_follows_mutation() {
        let mut occ = StimulusOccupancy::new(arms(), 1.0).unwrap();
        occ.add_samples(&[[0.0], [0.0]]).unwrap();
        assert_eq!(occ.occupancy().unwrap(), &[1.0, 0.0, 0.0]);

        let before = occ.revision();
        occ.add_sample(&[1.0]).unwrap();
        assert!(occ.revision() > before);
        let p = occ.occupancy().unwrap();
        assert_relative_eq!(p[0], 2.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(p[1], 1.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_failed_ingestion_keeps_revision() {
        let mut occ = StimulusOccupancy::new(arms(), 1.0).unwrap();
        let before = occ.revision();
        assert!(occ.add_sample(&[5.0]).is_err());
        assert_eq!(occ.revision(), before);
    }

    #[test]
    fn test_revisions_are_unique_across_occupancies() {
        let mut a = StimulusOccupancy::new(arms(), 1.0).unwrap();
        let mut b = StimulusOccupancy::new(arms(), 1.0).unwrap();
        assert_ne!(a.revision(), b.revision());
        a.add_sample(&[0.0]).unwrap();
        b.add_sample(&[1.0]).unwrap();
        assert_ne!(a.revision(), b.revision());

        // a clone shares the state until either side changes
        let mut c = a.clone();
        assert_eq!(c.revision(), a.revision());
        c.add_sample(&[2.0]).unwrap();
        a.add_sample(&[0.0]).unwrap();
        assert_ne!(c.revision(), a.revision());

        let json = serde_json::to_string(&a).unwrap();
        let back: StimulusOccupancy = serde_json::from_str(&json).unwrap();
        assert_ne!(back.revision(), a.revision());
    }

    #[test]
    fn test_from_grid_checks_names() {
        let x: Space = EuclideanSpace::gaussian("x", 1.0).unwrap().into();
        let y: Space = EuclideanSpace::gaussian("y", 1.0).unwrap().into();
        let grid = Grid::build(&y, &[AxisSpec::Linear { start: 0.0, stop: 1.0, count: 3 }]).unwrap();
        assert!(Stimulus::from_grid(x, grid.clone()).is_err());
        assert!(Stimulus::from_grid(y, grid).is_ok());
    }

    #[test]
    fn test_log_probability() {
        let mut occ = StimulusOccupancy::new(arms(), 1.0).unwrap();
        occ.add_samples(&[[0.0], [1.0]]).unwrap();
        let lp = occ.log_probability(&[[0.0], [2.0]]).unwrap();
        assert_relative_eq!(lp[0], 0.5_f64.ln(), epsilon = 1e-12);
        assert_eq!(lp[1], f64::NEG_INFINITY);
    }
}
