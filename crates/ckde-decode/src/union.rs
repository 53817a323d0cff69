//! Decoding over several stimulus grids at once

use crate::decoder::{collect_observations, normalize_jointly, Decoder};
use crate::types::{Observation, Posterior};
use ckde_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;
use tracing::{debug, instrument};

/// A union of decoders that share channel ids but not stimulus grids.
///
/// Each member pairs one stimulus grid (with its own occupancy, channel
/// models and prior) with the same set of channels, for instance one
/// member per maze arm or per task epoch. Decoding sums every member's
/// evidence separately and normalizes all members jointly, so the
/// returned posteriors together sum to one and compare across grids.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "UnionRecord")]
pub struct UnionDecoder {
    members: Vec<Decoder>,
}

#[derive(Deserialize)]
struct UnionRecord {
    members: Vec<Decoder>,
}

impl TryFrom<UnionRecord> for UnionDecoder {
    type Error = Error;

    fn try_from(record: UnionRecord) -> Result<Self> {
        UnionDecoder::new(record.members)
    }
}

impl UnionDecoder {
    /// Union of `members`, which must agree on whether to normalize
    pub fn new(members: Vec<Decoder>) -> Result<Self> {
        let Some(first) = members.first() else {
            return Err(Error::invalid_parameter("a union needs at least one decoder"));
        };
        let normalize = first.config().normalize;
        if members.iter().any(|m| m.config().normalize != normalize) {
            return Err(Error::invalid_parameter(
                "union members disagree on posterior normalization",
            ));
        }
        debug!("Union of {} decoders", members.len());
        Ok(Self { members })
    }

    pub fn members(&self) -> &[Decoder] {
        &self.members
    }

    pub fn member(&self, index: usize) -> Result<&Decoder> {
        let len = self.members.len();
        self.members
            .get(index)
            .ok_or_else(|| Error::InvalidInput(format!("union index {index} out of range (0..{len})")))
    }

    /// Mutable member, e.g. to train its channels or set its prior
    pub fn member_mut(&mut self, index: usize) -> Result<&mut Decoder> {
        let len = self.members.len();
        self.members
            .get_mut(index)
            .ok_or_else(|| Error::InvalidInput(format!("union index {index} out of range (0..{len})")))
    }

    /// Number of members
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Grid sizes of the members, in member order
    pub fn grid_sizes(&self) -> Vec<usize> {
        self.members.iter().map(|m| m.grid().len()).collect()
    }

    /// Enable or disable channel `id` in every member
    pub fn set_enabled(&mut self, id: &str, enabled: bool) -> Result<()> {
        for member in &self.members {
            member.channel(id)?;
        }
        for member in &mut self.members {
            member.set_enabled(id, enabled)?;
        }
        Ok(())
    }

    /// Refresh stale channel surfaces of every member
    pub fn refresh(&mut self) -> Result<usize> {
        let mut refreshed = 0;
        for member in &mut self.members {
            refreshed += member.refresh()?;
        }
        Ok(refreshed)
    }

    /// One posterior per member given one observation per channel.
    ///
    /// Every observed channel must be registered in every member. With
    /// normalization on, the probabilities of all returned posteriors
    /// sum to one together.
    #[instrument(skip(self, observations), fields(members = self.members.len()))]
    pub fn decode<I, K, O>(&self, observations: I) -> Result<Vec<Posterior>>
    where
        I: IntoIterator<Item = (K, O)>,
        K: AsRef<str>,
        O: Into<Observation>,
    {
        let observations = collect_observations(observations)?;
        for member in &self.members {
            member.check_channels(&observations)?;
        }
        let scores = self
            .members
            .iter()
            .map(|m| m.log_scores(&observations))
            .collect::<Result<Vec<_>>>()?;

        if self.members[0].config().normalize {
            normalize_jointly(scores)
        } else {
            Ok(scores
                .into_iter()
                .map(|(log_posterior, channels)| Posterior::unnormalized(log_posterior, channels))
                .collect())
        }
    }
}
