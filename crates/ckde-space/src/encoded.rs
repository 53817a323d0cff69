//! Discrete alphabets embedded through a squared-distance lookup table

use crate::categorical::category_index;
use crate::traits::SpaceMetric;
use crate::types::{Axis, AxisSpec, DimensionSpec, Topology};
use ckde_core::{Error, KernelKind, Result};
use serde::{Deserialize, Serialize};

/// A discrete alphabet with a metric.
///
/// Coordinates are alphabet indices, as for a categorical dimension, but
/// entries are related through a square table of squared distances (for
/// example positions along a linearized maze). A continuous kernel is
/// applied to the tabulated distance, with unit spacing between entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodedSpace {
    name: String,
    labels: Vec<String>,
    lut: Vec<f64>,
    kernel: KernelKind,
    bandwidth: f64,
}

impl EncodedSpace {
    /// Create an encoded space.
    ///
    /// `lut` holds `n * n` squared distances in row-major order, where `n`
    /// is the number of labels. The table must be symmetric, non-negative
    /// and zero on the diagonal.
    pub fn new<S: Into<String>>(
        name: impl Into<String>,
        labels: Vec<S>,
        lut: Vec<f64>,
        kernel: KernelKind,
        bandwidth: f64,
    ) -> Result<Self> {
        let name = name.into();
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        let n = labels.len();
        if n == 0 {
            return Err(Error::invalid_parameter("encoded space needs at least one label"));
        }
        crate::check_unique_names(&labels)?;
        if lut.len() != n * n {
            return Err(Error::InvalidInput(format!(
                "squared distance table for '{name}' must be {n}x{n}, got {} entries",
                lut.len()
            )));
        }
        for i in 0..n {
            if lut[i * n + i] != 0.0 {
                return Err(Error::InvalidInput(format!(
                    "squared distance table for '{name}' has non-zero diagonal at {i}"
                )));
            }
            for j in 0..n {
                let d = lut[i * n + j];
                if !d.is_finite() || d < 0.0 || (d - lut[j * n + i]).abs() > 1e-12 * d.max(1.0) {
                    return Err(Error::InvalidInput(format!(
                        "squared distance table for '{name}' is invalid at ({i}, {j})"
                    )));
                }
            }
        }
        if kernel == KernelKind::VonMises {
            return Err(Error::invalid_parameter(
                "von Mises kernel is only valid on circular dimensions",
            ));
        }
        kernel.validate()?;
        kernel.validate_bandwidth(bandwidth)?;
        Ok(Self {
            name,
            labels,
            lut,
            kernel,
            bandwidth,
        })
    }

    /// Encoded space with labels `"0".."n-1"`
    pub fn from_lut(
        name: impl Into<String>,
        lut: Vec<f64>,
        kernel: KernelKind,
        bandwidth: f64,
    ) -> Result<Self> {
        let n = (lut.len() as f64).sqrt().round() as usize;
        let labels = (0..n).map(|i| i.to_string()).collect::<Vec<_>>();
        Self::new(name, labels, lut, kernel, bandwidth)
    }

    /// Encoded space for points at the given positions on a line
    pub fn from_positions(
        name: impl Into<String>,
        positions: &[f64],
        kernel: KernelKind,
        bandwidth: f64,
    ) -> Result<Self> {
        let n = positions.len();
        let mut lut = vec![0.0; n * n];
        for i in 0..n {
            for j in 0..n {
                let d = positions[i] - positions[j];
                lut[i * n + j] = d * d;
            }
        }
        Self::from_lut(name, lut, kernel, bandwidth)
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

    pub fn kernel(&self) -> KernelKind {
        self.kernel
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
                    "coordinate {value} is not an entry of dimension '{}'",
                    self.name
                ))
            })
    }

    /// Tabulated squared distance, `None` if either index is out of range
    #[inline]
    fn squared(&self, a: f64, b: f64) -> Option<f64> {
        let n = self.labels.len();
        let i = category_index(a, n)?;
        let j = category_index(b, n)?;
        Some(self.lut[i * n + j])
    }
}

impl SpaceMetric for EncodedSpace {
    fn ndim(&self) -> usize {
        1
    }

    fn dimension(&self, _dim: usize) -> DimensionSpec {
        DimensionSpec::new(
            self.name.clone(),
            Topology::Encoded {
                cardinality: self.labels.len(),
            },
        )
    }

    fn default_bandwidth(&self) -> Vec<f64> {
        vec![self.bandwidth]
    }

    /// Tabulated distances carry no sign
    fn difference(&self, _dim: usize, a: f64, b: f64) -> f64 {
        self.squared(a, b).map_or(f64::INFINITY, f64::sqrt)
    }

    #[inline]
    fn factor(&self, _dim: usize, location: f64, bandwidth: f64, point: f64) -> f64 {
        match self.squared(location, point) {
            Some(d2) => self.kernel.evaluate(d2.sqrt(), bandwidth),
            None => 0.0,
        }
    }

    #[inline]
    fn log_factor(&self, _dim: usize, location: f64, bandwidth: f64, point: f64) -> f64 {
        match self.squared(location, point) {
            Some(d2) => self.kernel.log_evaluate(d2.sqrt(), bandwidth),
            None => f64::NEG_INFINITY,
        }
    }

    fn scaled_squared(&self, _dim: usize, reference: f64, bandwidth: f64, point: f64) -> f64 {
        self.squared(reference, point)
            .map_or(f64::INFINITY, |d2| d2 / (bandwidth * bandwidth))
    }

    /// The merged location is the entry minimizing the weighted squared
    /// distance to both components (lowest index on ties).
    fn merge(&self, _dim: usize, w1: f64, c1: (f64, f64), w2: f64, c2: (f64, f64)) -> (f64, f64) {
        let n = self.labels.len();
        let (Some(i1), Some(i2)) = (category_index(c1.0, n), category_index(c2.0, n)) else {
            return c1;
        };

        let mut best = i1;
        let mut best_cost = f64::INFINITY;
        for k in 0..n {
            let cost = w1 * self.lut[i1 * n + k] + w2 * self.lut[i2 * n + k];
            if cost < best_cost {
                best_cost = cost;
                best = k;
            }
        }

        let w = w1 + w2;
        let variance = (w1 * c1.1 * c1.1 + w2 * c2.1 * c2.1) / w
            + w1 * w2 * self.lut[i1 * n + i2] / (w * w);
        (best as f64, variance.sqrt())
    }

    fn validate_coordinate(&self, _dim: usize, value: f64) -> Result<()> {
        match category_index(value, self.labels.len()) {
            Some(i) if (value - i as f64).abs() < 1e-9 => Ok(()),
            _ => Err(Error::InvalidInput(format!(
                "coordinate {value} is not an entry of dimension '{}' (0..{})",
                self.name,
                self.labels.len()
            ))),
        }
    }

    fn validate_bandwidth(&self, _dim: usize, bandwidth: f64) -> Result<()> {
        self.kernel.validate_bandwidth(bandwidth)
    }

    fn scale_bandwidth(&self, _dim: usize, bandwidth: f64, factor: f64) -> f64 {
        bandwidth * factor
    }

    fn axis(&self, dim: usize, spec: &AxisSpec) -> Result<Axis> {
        let n = self.labels.len();
        match spec {
            AxisSpec::All => Ok(Axis::uniform((0..n).map(|i| i as f64).collect(), 1.0)),
            AxisSpec::Stride(k) if *k > 0 => {
                let values = (0..n).step_by(*k).map(|i| i as f64).collect();
                Ok(Axis::uniform(values, *k as f64))
            }
            AxisSpec::Values(values) if !values.is_empty() => {
                for &v in values {
                    self.validate_coordinate(dim, v)?;
                }
                Ok(Axis::uniform(values.clone(), 1.0))
            }
            other => Err(Error::invalid_parameter(format!(
                "axis {other:?} is not valid for encoded dimension '{}'",
                self.name
            ))),
        }
    }
}
