//! Observation, configuration and result types for decoding

use ckde_core::{Error, Result};
use ckde_space::Grid;
use serde::{Deserialize, Serialize};

/// Default floor applied to expected counts before taking logs
pub const DEFAULT_EPSILON: f64 = 1e-12;

/// What a channel reported during one decoding bin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Observation {
    /// Number of events, ignoring covariates
    Count(u64),
    /// One covariate vector per event
    Events(Vec<Vec<f64>>),
}

impl Observation {
    /// Number of events observed
    pub fn count(&self) -> u64 {
        match self {
            Self::Count(n) => *n,
            Self::Events(points) => points.len() as u64,
        }
    }
}

impl From<u64> for Observation {
    fn from(n: u64) -> Self {
        Self::Count(n)
    }
}

impl From<u32> for Observation {
    fn from(n: u32) -> Self {
        Self::Count(u64::from(n))
    }
}

impl From<Vec<Vec<f64>>> for Observation {
    fn from(points: Vec<Vec<f64>>) -> Self {
        Self::Events(points)
    }
}

/// Mean event rate of a channel, in events per unit of stimulus time
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BaselineRate {
    /// Explicit rate
    Fixed { rate: f64 },
    /// Total event weight divided by the occupancy's stimulus time
    #[default]
    Empirical,
}

impl BaselineRate {
    /// Fixed rate, rejecting negative or non-finite values
    pub fn fixed(rate: f64) -> Result<Self> {
        let rate = Self::Fixed { rate };
        rate.validate()?;
        Ok(rate)
    }

    pub fn validate(&self) -> Result<()> {
        if let Self::Fixed { rate } = self {
            if !rate.is_finite() || *rate < 0.0 {
                return Err(Error::invalid_parameter(format!(
                    "baseline rate must be finite and non-negative, got {rate}"
                )));
            }
        }
        Ok(())
    }
}

/// Decoder settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecoderConfig {
    /// Floor for expected counts before taking logs
    pub epsilon: f64,
    /// Length of the decoding bin, in the units of the occupancy duration
    pub bin_duration: f64,
    /// Whether to subtract ln(n!) for every channel
    pub include_log_factorial: bool,
    /// Multiplier applied to every channel's rate
    pub rate_scale: f64,
    /// Whether decoding normalizes the posterior. When off, the posterior
    /// carries the raw sum of log-prior and log-likelihoods.
    #[serde(default = "default_normalize")]
    pub normalize: bool,
}

fn default_normalize() -> bool {
    true
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_EPSILON,
            bin_duration: 1.0,
            include_log_factorial: false,
            rate_scale: 1.0,
            normalize: true,
        }
    }
}

impl DecoderConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.epsilon > 0.0 && self.epsilon.is_finite()) {
            return Err(Error::invalid_parameter(format!(
                "epsilon must be positive and finite, got {}",
                self.epsilon
            )));
        }
        if !(self.bin_duration > 0.0 && self.bin_duration.is_finite()) {
            return Err(Error::invalid_parameter(format!(
                "bin duration must be positive and finite, got {}",
                self.bin_duration
            )));
        }
        if !(self.rate_scale >= 0.0 && self.rate_scale.is_finite()) {
            return Err(Error::invalid_parameter(format!(
                "rate scale must be finite and non-negative, got {}",
                self.rate_scale
            )));
        }
        Ok(())
    }

    /// Factor turning a rate into an expected count for one bin
    pub(crate) fn exposure(&self) -> f64 {
        self.bin_duration * self.rate_scale
    }
}

/// Posterior over the stimulus grid.
///
/// A normalized posterior sums to one over its grid, or over every grid
/// of a union decode. An unnormalized one holds the raw log-prior plus
/// log-likelihood scores and their exponentials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Posterior {
    log_posterior: Vec<f64>,
    probabilities: Vec<f64>,
    channels: Vec<String>,
    #[serde(default = "default_normalize")]
    normalized: bool,
}

impl Posterior {
    pub(crate) fn new(
        log_posterior: Vec<f64>,
        probabilities: Vec<f64>,
        channels: Vec<String>,
        normalized: bool,
    ) -> Self {
        Self {
            log_posterior,
            probabilities,
            channels,
            normalized,
        }
    }

    /// Unnormalized posterior from raw log scores
    pub(crate) fn unnormalized(log_posterior: Vec<f64>, channels: Vec<String>) -> Self {
        let probabilities = log_posterior.iter().map(|v| v.exp()).collect();
        Self::new(log_posterior, probabilities, channels, false)
    }

    /// Log-probability of each grid point, or the raw log score when
    /// the posterior is unnormalized
    pub fn log_posterior(&self) -> &[f64] {
        &self.log_posterior
    }

    /// Probability of each grid point, `exp` of [`Posterior::log_posterior`]
    pub fn probabilities(&self) -> &[f64] {
        &self.probabilities
    }

    pub fn is_normalized(&self) -> bool {
        self.normalized
    }

    /// Channels that contributed evidence, in reduction order
    pub fn channels(&self) -> &[String] {
        &self.channels
    }

    pub fn len(&self) -> usize {
        self.probabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probabilities.is_empty()
    }

    /// Probability per unit volume: each probability divided by its cell weight
    pub fn density(&self, grid: &Grid) -> Result<Vec<f64>> {
        Error::check_dimension(self.len(), grid.len(), "posterior grid")?;
        Ok(self
            .probabilities
            .iter()
            .zip(grid.cell_weights())
            .map(|(p, w)| p / w)
            .collect())
    }

    /// Index of the most probable grid point; the first one on ties
    pub fn map_index(&self) -> usize {
        // log scores keep their order where raw probabilities underflow
        let mut best = 0;
        for (i, &v) in self.log_posterior.iter().enumerate() {
            if v > self.log_posterior[best] {
                best = i;
            }
        }
        best
    }

    /// Coordinates of the most probable grid point
    pub fn map_point<'g>(&self, grid: &'g Grid) -> Result<&'g [f64]> {
        Error::check_dimension(self.len(), grid.len(), "posterior grid")?;
        Ok(grid.point(self.map_index()))
    }
}
