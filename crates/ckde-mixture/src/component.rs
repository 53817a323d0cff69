//! Mixture components

use ckde_core::{Error, Result};
use ckde_space::Space;
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;

/// One kernel instance of a mixture.
///
/// Deserialization checks what can be checked without a space: matching
/// lengths, finite values and a positive weight. [`Component::validate`]
/// covers the rest once the space is known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ComponentRecord")]
pub struct Component {
    /// Kernel center, one coordinate per dimension of the space
    pub location: Vec<f64>,
    /// Per-dimension bandwidth (σ for linear and encoded, κ for circular)
    pub bandwidth: Vec<f64>,
    /// Accumulated sample mass
    pub weight: f64,
}

#[derive(Deserialize)]
struct ComponentRecord {
    location: Vec<f64>,
    bandwidth: Vec<f64>,
    weight: f64,
}

impl TryFrom<ComponentRecord> for Component {
    type Error = Error;

    fn try_from(record: ComponentRecord) -> Result<Self> {
        Error::check_dimension(record.location.len(), record.bandwidth.len(), "component bandwidth")?;
        if record.location.is_empty() {
            return Err(Error::InvalidInput("component has no dimensions".into()));
        }
        if record
            .location
            .iter()
            .chain(&record.bandwidth)
            .any(|v| !v.is_finite())
        {
            return Err(Error::InvalidInput(
                "component location and bandwidth must be finite".into(),
            ));
        }
        if !record.weight.is_finite() || record.weight <= 0.0 {
            return Err(Error::invalid_parameter(format!(
                "component weight must be positive and finite, got {}",
                record.weight
            )));
        }
        Ok(Component::new(record.location, record.bandwidth, record.weight))
    }
}

impl Component {
    pub fn new(location: Vec<f64>, bandwidth: Vec<f64>, weight: f64) -> Self {
        Self {
            location,
            bandwidth,
            weight,
        }
    }

    /// Check the component against `space`
    pub fn validate(&self, space: &Space) -> Result<()> {
        space.validate_point(&self.location)?;
        space.validate_bandwidths(&self.bandwidth)?;
        if !self.weight.is_finite() || self.weight <= 0.0 {
            return Err(Error::invalid_parameter(format!(
                "component weight must be positive and finite, got {}",
                self.weight
            )));
        }
        Ok(())
    }

    /// Weighted kernel value at `point`
    #[inline]
    pub fn mass_at(&self, space: &Space, point: &[f64]) -> Result<f64> {
        Ok(self.weight * space.kernel(&self.location, &self.bandwidth, point)?)
    }

    /// Moment-matching merge of `other` into `self`; weights add exactly
    pub fn absorb(&mut self, space: &Space, other: &Component) {
        use ckde_space::SpaceMetric;

        for d in 0..self.location.len() {
            let (loc, bw) = space.merge(
                d,
                self.weight,
                (self.location[d], self.bandwidth[d]),
                other.weight,
                (other.location[d], other.bandwidth[d]),
            );
            self.location[d] = loc;
            self.bandwidth[d] = bw;
        }
        self.weight += other.weight;
    }
}
