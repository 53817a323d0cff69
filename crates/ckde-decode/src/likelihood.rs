//! Per-channel Poisson encoding models
//!
//! A [`PoissonLikelihood`] stores the events of one channel as a mixture
//! over the stimulus dimensions followed by any covariates recorded with
//! each event. Together with the stimulus occupancy π(x) and a mean rate
//! μ it defines the conditional intensity
//!
//! ```text
//! λ(x, a) = μ · p(x, a) / π(x)
//! ```
//!
//! where p is the event density. Counts use the stimulus marginal p(x);
//! events with covariates use the joint evaluated at each event's
//! covariate vector.

use crate::stimulus::{Stimulus, StimulusOccupancy};
use crate::types::{BaselineRate, DecoderConfig, Observation};
use ckde_core::math::ln_factorial;
use ckde_core::{Error, Result};
use ckde_mixture::{CompressionReport, Density, Mixture, MixtureConfig, Normalization};
use ckde_space::{Space, SpaceMetric};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Poisson log-probability of `count` events given `expected` events.
///
/// `expected` is floored at `epsilon` before its log is taken; a zero
/// count contributes `-expected` alone.
#[inline]
pub fn poisson_log_pmf(count: u64, expected: f64, epsilon: f64, include_log_factorial: bool) -> f64 {
    if count == 0 {
        return -expected;
    }
    let mut lp = count as f64 * expected.max(epsilon).ln() - expected;
    if include_log_factorial {
        lp -= ln_factorial(count);
    }
    lp
}

/// Cached rate and marginal intensity of a channel over the stimulus grid
#[derive(Debug, Clone, PartialEq)]
pub struct IntensitySurface {
    occupancy_revision: u64,
    rate: f64,
    occupancy: Vec<f64>,
    intensity: Vec<f64>,
}

impl IntensitySurface {
    /// Mean event rate μ
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Occupancy density π(x) on the grid
    pub fn occupancy(&self) -> &[f64] {
        &self.occupancy
    }

    /// Marginal intensity λ(x) = μ·p(x)/π(x) on the grid, zero where π(x) is zero
    pub fn intensity(&self) -> &[f64] {
        &self.intensity
    }
}

/// Encoding model of one channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoissonLikelihood {
    stimulus: Arc<Stimulus>,
    events: Mixture,
    stimulus_dims: Vec<usize>,
    rate: BaselineRate,
    rate_scale: f64,
    #[serde(skip)]
    surface: Option<IntensitySurface>,
}

impl PoissonLikelihood {
    /// Empty model over `event_space`, which must contain every stimulus
    /// dimension by name and in the stimulus order
    pub fn new(stimulus: impl Into<Arc<Stimulus>>, event_space: Space, rate: BaselineRate) -> Result<Self> {
        Self::with_config(stimulus, event_space, rate, MixtureConfig::default())
    }

    pub fn with_config(
        stimulus: impl Into<Arc<Stimulus>>,
        event_space: Space,
        rate: BaselineRate,
        config: MixtureConfig,
    ) -> Result<Self> {
        Self::from_events(stimulus, Mixture::with_config(event_space, config)?, rate)
    }

    /// Model over the stimulus space alone, without covariates
    pub fn stimulus_only(stimulus: impl Into<Arc<Stimulus>>, rate: BaselineRate) -> Result<Self> {
        let stimulus = stimulus.into();
        let space = stimulus.space().clone();
        Self::new(stimulus, space, rate)
    }

    /// Wrap an existing event mixture
    pub fn from_events(stimulus: impl Into<Arc<Stimulus>>, events: Mixture, rate: BaselineRate) -> Result<Self> {
        rate.validate()?;
        let stimulus = stimulus.into();
        let stimulus_dims = locate_stimulus(stimulus.space(), events.space())?;
        Ok(Self {
            stimulus,
            events,
            stimulus_dims,
            rate,
            rate_scale: 1.0,
            surface: None,
        })
    }

    pub fn stimulus(&self) -> &Arc<Stimulus> {
        &self.stimulus
    }

    pub fn events(&self) -> &Mixture {
        &self.events
    }

    pub fn baseline_rate(&self) -> BaselineRate {
        self.rate
    }

    /// Channel-specific multiplier on top of the decoder's rate scale
    pub fn rate_scale(&self) -> f64 {
        self.rate_scale
    }

    pub fn set_rate_scale(&mut self, scale: f64) -> Result<()> {
        if !(scale >= 0.0 && scale.is_finite()) {
            return Err(Error::invalid_parameter(format!(
                "rate scale must be finite and non-negative, got {scale}"
            )));
        }
        self.rate_scale = scale;
        Ok(())
    }

    /// Dimensions of the event space that hold the stimulus
    pub fn stimulus_dims(&self) -> &[usize] {
        &self.stimulus_dims
    }

    /// Dimensions of the event space that hold covariates
    pub fn covariate_dims(&self) -> Vec<usize> {
        (0..self.events.space().ndim())
            .filter(|d| !self.stimulus_dims.contains(d))
            .collect()
    }

    pub fn add_event(&mut self, point: &[f64]) -> Result<()> {
        self.add_events(&[point])
    }

    /// Add events, each a full point in the event space
    pub fn add_events<P: AsRef<[f64]>>(&mut self, points: &[P]) -> Result<()> {
        self.events.add_samples(points)?;
        self.surface = None;
        Ok(())
    }

    pub fn add_weighted_events<P: AsRef<[f64]>>(&mut self, points: &[P], weights: &[f64]) -> Result<()> {
        self.events.add_weighted_samples(points, weights)?;
        self.surface = None;
        Ok(())
    }

    /// Add events in random order
    pub fn merge_events<P: AsRef<[f64]>, R: Rng + ?Sized>(&mut self, points: &[P], rng: &mut R) -> Result<()> {
        self.events.merge_samples(points, rng)?;
        self.surface = None;
        Ok(())
    }

    pub fn compress(&mut self, target: usize) -> Result<CompressionReport> {
        let report = self.events.compress(target)?;
        self.surface = None;
        Ok(report)
    }

    /// Cached surface, if it was computed for the current events
    pub fn surface(&self) -> Option<&IntensitySurface> {
        self.surface.as_ref()
    }

    /// Whether the cached surface is missing or was computed for a
    /// different occupancy revision
    pub fn is_stale(&self, occupancy: &StimulusOccupancy) -> bool {
        self.surface
            .as_ref()
            .map_or(true, |s| s.occupancy_revision != occupancy.revision())
    }

    /// Mean event rate μ relative to `occupancy`
    pub fn mean_rate(&self, occupancy: &StimulusOccupancy) -> Result<f64> {
        match self.rate {
            BaselineRate::Fixed { rate } => Ok(rate),
            BaselineRate::Empirical => {
                let time = occupancy.stimulus_time();
                if time <= 0.0 {
                    return Err(Error::InvalidInput(
                        "empirical rate needs a non-empty occupancy".to_string(),
                    ));
                }
                Ok(self.events.total_weight() / time)
            }
        }
    }

    /// Compute and cache the intensity surface against `occupancy`
    #[instrument(skip(self, occupancy), fields(components = self.events.len()))]
    pub fn precompute(&mut self, occupancy: &StimulusOccupancy) -> Result<()> {
        let surface = self.compute_surface(occupancy)?;
        self.surface = Some(surface);
        Ok(())
    }

    /// Cached surface when current, otherwise a freshly computed one
    pub fn current_surface(&self, occupancy: &StimulusOccupancy) -> Result<Cow<'_, IntensitySurface>> {
        match &self.surface {
            Some(s) if s.occupancy_revision == occupancy.revision() => Ok(Cow::Borrowed(s)),
            _ => Ok(Cow::Owned(self.compute_surface(occupancy)?)),
        }
    }

    fn compute_surface(&self, occupancy: &StimulusOccupancy) -> Result<IntensitySurface> {
        self.check_stimulus(occupancy.stimulus())?;
        let rate = self.mean_rate(occupancy)?;
        let occupancy_density = occupancy.occupancy()?.to_vec();
        let marginal = self
            .events
            .marginalize(&self.stimulus_dims)?
            .evaluate_grid(self.stimulus.grid())?;

        let intensity = intensity_ratio(rate, &marginal, &occupancy_density)?;
        debug!(
            "Intensity surface over {} grid points, rate {:.4}",
            intensity.len(),
            rate
        );
        Ok(IntensitySurface {
            occupancy_revision: occupancy.revision(),
            rate,
            occupancy: occupancy_density,
            intensity,
        })
    }

    /// Log-likelihood of `observation` at every stimulus grid point
    pub fn log_likelihood(
        &self,
        occupancy: &StimulusOccupancy,
        observation: &Observation,
        config: &DecoderConfig,
    ) -> Result<Vec<f64>> {
        let surface = self.current_surface(occupancy)?;
        let exposure = config.exposure() * self.rate_scale;

        let values: Vec<f64> = match observation {
            Observation::Count(n) => surface
                .intensity
                .iter()
                .map(|&l| poisson_log_pmf(*n, exposure * l, config.epsilon, config.include_log_factorial))
                .collect(),
            Observation::Events(points) => self.event_log_likelihood(&surface, points, config)?,
        };

        if values.iter().any(|v| v.is_nan() || *v == f64::INFINITY) {
            return Err(Error::non_finite("channel log-likelihood"));
        }
        Ok(values)
    }

    /// Log-likelihood of `count` events at grid point `index`
    pub fn log_likelihood_at(
        &self,
        occupancy: &StimulusOccupancy,
        count: u64,
        index: usize,
        config: &DecoderConfig,
    ) -> Result<f64> {
        let surface = self.current_surface(occupancy)?;
        let l = surface.intensity.get(index).ok_or_else(|| {
            Error::InvalidInput(format!(
                "grid index {index} out of range (0..{})",
                surface.intensity.len()
            ))
        })?;
        Ok(poisson_log_pmf(
            count,
            config.exposure() * self.rate_scale * l,
            config.epsilon,
            config.include_log_factorial,
        ))
    }

    fn event_log_likelihood(
        &self,
        surface: &IntensitySurface,
        points: &[Vec<f64>],
        config: &DecoderConfig,
    ) -> Result<Vec<f64>> {
        let covariates = self.covariate_dims();
        let space = self.events.space();
        for p in points {
            Error::check_dimension(covariates.len(), p.len(), "event covariates")?;
            for (&d, &v) in covariates.iter().zip(p) {
                space.validate_coordinate(d, v)?;
            }
        }

        let exposure = config.exposure() * self.rate_scale;
        let mut values: Vec<f64> = surface.intensity.iter().map(|&l| -exposure * l).collect();
        if points.is_empty() {
            return Ok(values);
        }

        let marginal = self.events.marginalize(&self.stimulus_dims)?;
        let grid = self.stimulus.grid();
        for p in points {
            let joint = marginal.evaluate_conditional(grid, p, Normalization::Density)?;
            let intensity = intensity_ratio(surface.rate, &joint, &surface.occupancy)?;
            for (v, l) in values.iter_mut().zip(intensity) {
                *v += (exposure * l).max(config.epsilon).ln();
            }
        }
        if config.include_log_factorial {
            let correction = ln_factorial(points.len() as u64);
            values.iter_mut().for_each(|v| *v -= correction);
        }
        Ok(values)
    }

    fn check_stimulus(&self, stimulus: &Arc<Stimulus>) -> Result<()> {
        if Arc::ptr_eq(&self.stimulus, stimulus) || *self.stimulus == **stimulus {
            Ok(())
        } else {
            Err(Error::InvalidInput(
                "occupancy and channel were built for different stimuli".to_string(),
            ))
        }
    }
}

/// `rate * density / occupancy`, zero where the occupancy is zero
fn intensity_ratio(rate: f64, density: &[f64], occupancy: &[f64]) -> Result<Vec<f64>> {
    let values: Vec<f64> = density
        .iter()
        .zip(occupancy)
        .map(|(&p, &pi)| if pi > 0.0 { rate * p / pi } else { 0.0 })
        .collect();
    if values.iter().any(|v| !v.is_finite() || *v < 0.0) {
        return Err(Error::non_finite("intensity surface"));
    }
    Ok(values)
}

/// Indices of the stimulus dimensions inside `event_space`
fn locate_stimulus(stimulus: &Space, event_space: &Space) -> Result<Vec<usize>> {
    let names = stimulus.dimension_names();
    let dims = event_space.select(&names)?;
    for (k, &d) in dims.iter().enumerate() {
        let event_dim = event_space.dimension(d);
        let stimulus_dim = stimulus.dimension(k);
        if event_dim != stimulus_dim {
            return Err(Error::invalid_parameter(format!(
                "event dimension {event_dim} does not match stimulus dimension {stimulus_dim}"
            )));
        }
    }
    Ok(dims)
}
