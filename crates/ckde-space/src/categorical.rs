//! Categorical dimensions with an indicator kernel

use crate::traits::SpaceMetric;
use crate::types::{Axis, AxisSpec, DimensionSpec, Topology};
use ckde_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Resolve a floating-point coordinate to a category index
#[inline]
pub(crate) fn category_index(value: f64, cardinality: usize) -> Option<usize> {
    if !value.is_finite() || value < -0.5 {
        return None;
    }
    let idx = value.round() as usize;
    (idx < cardinality).then_some(idx)
}

/// An unordered set of labels.
///
/// Coordinates are label indices. Two coordinates are either identical
/// (distance 0) or unrelated (distance ∞), so a component only ever
/// contributes density to its own category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalSpace {
    name: String,
    labels: Vec<String>,
}

impl CategoricalSpace {
    pub fn new<S: Into<String>>(name: impl Into<String>, labels: Vec<S>) -> Result<Self> {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        if labels.is_empty() {
            return Err(Error::invalid_parameter("categorical space needs at least one label"));
        }
        crate::check_unique_names(&labels)?;
        Ok(Self {
            name: name.into(),
            labels,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn cardinality(&self) -> usize {
        self.labels.len()
    }

    /// Coordinate of `label`
    pub fn encode(&self, label: &str) -> Result<f64> {
        self.labels
            .iter()
            .position(|l| l == label)
            .map(|i| i as f64)
            .ok_or_else(|| {
                Error::InvalidInput(format!("unknown label '{label}' for dimension '{}'", self.name))
            })
    }

    /// Label at coordinate `value`
    pub fn decode(&self, value: f64) -> Result<&str> {
        category_index(value, self.labels.len())
            .map(|i| self.labels[i].as_str())
            .ok_or_else(|| {
                Error::InvalidInput(format!(
                    "coordinate {value} is not a category of dimension '{}'",
                    self.name
                ))
            })
    }

    #[inline]
    fn same(&self, a: f64, b: f64) -> bool {
        let n = self.labels.len();
        matches!(
            (category_index(a, n), category_index(b, n)),
            (Some(i), Some(j)) if i == j
        )
    }
}

impl SpaceMetric for CategoricalSpace {
    fn ndim(&self) -> usize {
        1
    }

    fn dimension(&self, _dim: usize) -> DimensionSpec {
        DimensionSpec::new(
            self.name.clone(),
            Topology::Categorical {
                cardinality: self.labels.len(),
            },
        )
    }

    /// Placeholder, the indicator kernel has no bandwidth
    fn default_bandwidth(&self) -> Vec<f64> {
        vec![1.0]
    }

    fn difference(&self, _dim: usize, a: f64, b: f64) -> f64 {
        if self.same(a, b) {
            0.0
        } else {
            f64::INFINITY
        }
    }

    #[inline]
    fn factor(&self, _dim: usize, location: f64, _bandwidth: f64, point: f64) -> f64 {
        if self.same(location, point) {
            1.0
        } else {
            0.0
        }
    }

    #[inline]
    fn log_factor(&self, _dim: usize, location: f64, _bandwidth: f64, point: f64) -> f64 {
        if self.same(location, point) {
            0.0
        } else {
            f64::NEG_INFINITY
        }
    }

    fn scaled_squared(&self, dim: usize, reference: f64, _bandwidth: f64, point: f64) -> f64 {
        self.difference(dim, reference, point)
    }

    /// Only components in the same category are ever merged
    fn merge(&self, _dim: usize, _w1: f64, c1: (f64, f64), _w2: f64, _c2: (f64, f64)) -> (f64, f64) {
        c1
    }

    fn validate_coordinate(&self, _dim: usize, value: f64) -> Result<()> {
        match category_index(value, self.labels.len()) {
            Some(i) if (value - i as f64).abs() < 1e-9 => Ok(()),
            _ => Err(Error::InvalidInput(format!(
                "coordinate {value} is not a category index of dimension '{}' (0..{})",
                self.name,
                self.labels.len()
            ))),
        }
    }

    fn validate_bandwidth(&self, _dim: usize, _bandwidth: f64) -> Result<()> {
        Ok(())
    }

    fn scale_bandwidth(&self, _dim: usize, bandwidth: f64, _factor: f64) -> f64 {
        bandwidth
    }

    fn axis(&self, dim: usize, spec: &AxisSpec) -> Result<Axis> {
        match spec {
            AxisSpec::All => {
                let values = (0..self.labels.len()).map(|i| i as f64).collect();
                Ok(Axis::uniform(values, 1.0))
            }
            AxisSpec::Values(values) if !values.is_empty() => {
                for &v in values {
                    self.validate_coordinate(dim, v)?;
                }
                Ok(Axis::uniform(values.clone(), 1.0))
            }
            other => Err(Error::invalid_parameter(format!(
                "axis {other:?} is not valid for categorical dimension '{}'",
                self.name
            ))),
        }
    }
}
