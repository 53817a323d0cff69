//! Bayesian decoding across channels

use crate::builder::DecoderBuilder;
use crate::likelihood::PoissonLikelihood;
use crate::stimulus::{Stimulus, StimulusOccupancy};
use crate::types::{DecoderConfig, Observation, Posterior};
use ckde_core::math::log_sum_exp;
use ckde_core::{Error, Result};
use ckde_space::Grid;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, instrument, trace};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Channel {
    likelihood: PoissonLikelihood,
    enabled: bool,
}

/// Decodes the stimulus from simultaneous observations of many channels.
///
/// The log-posterior at each grid point is the optional log-prior plus
/// the sum of the log-likelihoods of every enabled channel present in
/// the input. Channels absent from the input contribute nothing; pass
/// `Observation::Count(0)` to state that a channel was silent.
///
/// Per-channel vectors are summed in ascending channel-id order, so the
/// result does not depend on input order or on the `parallel` feature.
/// With [`DecoderConfig::normalize`] off the posterior keeps the raw
/// scores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decoder {
    occupancy: StimulusOccupancy,
    channels: BTreeMap<String, Channel>,
    config: DecoderConfig,
    log_prior: Option<Vec<f64>>,
}

impl Decoder {
    /// Decoder with the default configuration and no channels
    pub fn new(occupancy: StimulusOccupancy) -> Self {
        Self {
            occupancy,
            channels: BTreeMap::new(),
            config: DecoderConfig::default(),
            log_prior: None,
        }
    }

    pub fn with_config(occupancy: StimulusOccupancy, config: DecoderConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::new(occupancy)
        })
    }

    pub fn builder(occupancy: StimulusOccupancy) -> DecoderBuilder {
        DecoderBuilder::new(occupancy)
    }

    pub fn stimulus(&self) -> &Arc<Stimulus> {
        self.occupancy.stimulus()
    }

    pub fn grid(&self) -> &Grid {
        self.occupancy.grid()
    }

    pub fn occupancy(&self) -> &StimulusOccupancy {
        &self.occupancy
    }

    /// Mutable occupancy; channel surfaces go stale after any change
    pub fn occupancy_mut(&mut self) -> &mut StimulusOccupancy {
        &mut self.occupancy
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    pub fn log_prior(&self) -> Option<&[f64]> {
        self.log_prior.as_deref()
    }

    /// Set or clear the log-prior; one finite or negative-infinite value per grid point
    pub fn set_log_prior(&mut self, log_prior: Option<Vec<f64>>) -> Result<()> {
        if let Some(prior) = &log_prior {
            validate_log_prior(prior, self.grid().len())?;
        }
        self.log_prior = log_prior;
        Ok(())
    }

    /// Register `likelihood` as channel `id`, enabled
    pub fn add_channel(&mut self, id: impl Into<String>, likelihood: PoissonLikelihood) -> Result<()> {
        let id = id.into();
        if self.channels.contains_key(&id) {
            return Err(Error::invalid_parameter(format!("channel '{id}' is already registered")));
        }
        let stimulus = likelihood.stimulus();
        if !Arc::ptr_eq(stimulus, self.stimulus()) && **stimulus != **self.stimulus() {
            return Err(Error::InvalidInput(format!(
                "channel '{id}' was built for a different stimulus grid"
            )));
        }
        debug!("Registered channel '{}'", id);
        self.channels.insert(
            id,
            Channel {
                likelihood,
                enabled: true,
            },
        );
        Ok(())
    }

    pub fn remove_channel(&mut self, id: &str) -> Result<PoissonLikelihood> {
        self.channels
            .remove(id)
            .map(|c| c.likelihood)
            .ok_or_else(|| Error::UnknownChannel(id.to_string()))
    }

    pub fn channel(&self, id: &str) -> Result<&PoissonLikelihood> {
        self.entry(id).map(|c| &c.likelihood)
    }

    /// Mutable channel model, e.g. to ingest more events
    pub fn channel_mut(&mut self, id: &str) -> Result<&mut PoissonLikelihood> {
        self.channels
            .get_mut(id)
            .map(|c| &mut c.likelihood)
            .ok_or_else(|| Error::UnknownChannel(id.to_string()))
    }

    /// Registered channel ids in ascending order
    pub fn channel_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.channels.keys().map(String::as_str)
    }

    /// Number of registered channels
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn is_enabled(&self, id: &str) -> Result<bool> {
        self.entry(id).map(|c| c.enabled)
    }

    /// Enable or disable a channel; disabled channels are ignored by decoding
    pub fn set_enabled(&mut self, id: &str, enabled: bool) -> Result<()> {
        let channel = self
            .channels
            .get_mut(id)
            .ok_or_else(|| Error::UnknownChannel(id.to_string()))?;
        channel.enabled = enabled;
        Ok(())
    }

    pub fn enable(&mut self, id: &str) -> Result<()> {
        self.set_enabled(id, true)
    }

    pub fn disable(&mut self, id: &str) -> Result<()> {
        self.set_enabled(id, false)
    }

    /// Recompute every stale channel surface; returns how many were refreshed
    #[instrument(skip(self), fields(channels = self.channels.len()))]
    pub fn refresh(&mut self) -> Result<usize> {
        let occupancy = &self.occupancy;
        let mut refreshed = 0;
        for channel in self.channels.values_mut() {
            if channel.likelihood.is_stale(occupancy) {
                channel.likelihood.precompute(occupancy)?;
                refreshed += 1;
            }
        }
        debug!("Refreshed {} channel surfaces", refreshed);
        Ok(refreshed)
    }

    /// Posterior over the stimulus grid given one observation per channel.
    ///
    /// Fails with [`Error::UnknownChannel`] if any id is not registered,
    /// before any work is done. With no enabled channel in the input the
    /// posterior is the normalized prior, uniform when there is none.
    #[instrument(skip(self, observations), fields(grid_len = self.grid().len()))]
    pub fn decode<I, K, O>(&self, observations: I) -> Result<Posterior>
    where
        I: IntoIterator<Item = (K, O)>,
        K: AsRef<str>,
        O: Into<Observation>,
    {
        let observations = collect_observations(observations)?;
        self.check_channels(&observations)?;
        let (log_posterior, channels) = self.log_scores(&observations)?;
        if !self.config.normalize {
            check_scores(&log_posterior)?;
            return Ok(Posterior::unnormalized(log_posterior, channels));
        }
        let mut posteriors = normalize_jointly(vec![(log_posterior, channels)])?;
        posteriors
            .pop()
            .ok_or_else(|| Error::InvalidInput("empty posterior".to_string()))
    }
}

impl Decoder {
    /// Fail on the first observed id that is not registered
    pub(crate) fn check_channels(&self, observations: &Observations) -> Result<()> {
        for id in observations.keys() {
            self.entry(id)?;
        }
        Ok(())
    }

    /// Log-prior plus the log-likelihoods of every enabled observed
    /// channel, and the ids that contributed, in ascending order
    pub(crate) fn log_scores(&self, observations: &Observations) -> Result<(Vec<f64>, Vec<String>)> {
        let mut inputs: Vec<(&str, &Channel, &Observation)> = Vec::with_capacity(observations.len());
        for (id, observation) in observations {
            let channel = self.entry(id)?;
            if channel.enabled {
                inputs.push((id.as_str(), channel, observation));
            }
        }

        let evaluate = |(id, channel, observation): &(&str, &Channel, &Observation)| {
            trace!("Evaluating channel '{}'", id);
            channel
                .likelihood
                .log_likelihood(&self.occupancy, observation, &self.config)
        };
        #[cfg(feature = "parallel")]
        let terms: Vec<Vec<f64>> = inputs.par_iter().map(evaluate).collect::<Result<_>>()?;
        #[cfg(not(feature = "parallel"))]
        let terms: Vec<Vec<f64>> = inputs.iter().map(evaluate).collect::<Result<_>>()?;

        let mut log_posterior = match &self.log_prior {
            Some(prior) => prior.clone(),
            None => vec![0.0; self.grid().len()],
        };
        for term in &terms {
            for (acc, v) in log_posterior.iter_mut().zip(term) {
                *acc += v;
            }
        }

        let channels = inputs.iter().map(|(id, _, _)| id.to_string()).collect();
        Ok((log_posterior, channels))
    }

    fn entry(&self, id: &str) -> Result<&Channel> {
        self.channels
            .get(id)
            .ok_or_else(|| Error::UnknownChannel(id.to_string()))
    }
}

/// Observations keyed by channel id, in reduction order
pub(crate) type Observations = BTreeMap<String, Observation>;

/// Collect observations, rejecting a channel observed twice
pub(crate) fn collect_observations<I, K, O>(observations: I) -> Result<Observations>
where
    I: IntoIterator<Item = (K, O)>,
    K: AsRef<str>,
    O: Into<Observation>,
{
    let mut collected = Observations::new();
    for (id, observation) in observations {
        let id = id.as_ref();
        if collected.insert(id.to_string(), observation.into()).is_some() {
            return Err(Error::InvalidInput(format!("channel '{id}' observed more than once")));
        }
    }
    Ok(collected)
}

fn validate_log_prior(prior: &[f64], len: usize) -> Result<()> {
    Error::check_dimension(len, prior.len(), "log prior")?;
    if prior.iter().any(|v| v.is_nan() || *v == f64::INFINITY) {
        return Err(Error::non_finite("log prior"));
    }
    Ok(())
}

fn check_scores(log_posterior: &[f64]) -> Result<()> {
    if log_posterior.iter().any(|v| v.is_nan() || *v == f64::INFINITY) {
        return Err(Error::non_finite("log posterior"));
    }
    Ok(())
}

/// Subtract one log-normaliser shared by every score vector and
/// exponentiate, so the probabilities sum to one across all of them
pub(crate) fn normalize_jointly(scores: Vec<(Vec<f64>, Vec<String>)>) -> Result<Vec<Posterior>> {
    for (log_posterior, _) in &scores {
        check_scores(log_posterior)?;
    }
    let partial: Vec<f64> = scores.iter().map(|(lp, _)| log_sum_exp(lp)).collect();
    let lse = log_sum_exp(&partial);
    let total: usize = scores.iter().map(|(lp, _)| lp.len()).sum();

    let posteriors = scores
        .into_iter()
        .map(|(mut log_posterior, channels)| {
            let probabilities = if lse.is_finite() {
                let p = log_posterior.iter().map(|&v| (v - lse).exp()).collect();
                log_posterior.iter_mut().for_each(|v| *v -= lse);
                p
            } else {
                // no grid point has support; fall back to the uniform distribution
                let uniform = -(total as f64).ln();
                log_posterior.iter_mut().for_each(|v| *v = uniform);
                vec![1.0 / total as f64; log_posterior.len()]
            };
            Posterior::new(log_posterior, probabilities, channels, true)
        })
        .collect();
    Ok(posteriors)
}
