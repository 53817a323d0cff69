//! Euclidean (linear) dimensions

use crate::traits::SpaceMetric;
use crate::types::{midpoint_widths, Axis, AxisSpec, DimensionSpec, Topology};
use ckde_core::{Error, Kernel, KernelKind, Result};
use serde::{Deserialize, Serialize};

/// One or more real-valued dimensions smoothed by a shared kernel family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EuclideanSpace {
    names: Vec<String>,
    kernel: Kernel,
}

impl EuclideanSpace {
    /// Create a space with one dimension per name.
    ///
    /// The kernel's bandwidth vector must have one entry per name.
    pub fn new<S: Into<String>>(names: Vec<S>, kernel: Kernel) -> Result<Self> {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err(Error::invalid_parameter("euclidean space needs at least one dimension"));
        }
        if kernel.kind() == KernelKind::VonMises {
            return Err(Error::invalid_parameter(
                "von Mises kernel is only valid on circular dimensions",
            ));
        }
        Error::check_dimension(names.len(), kernel.ndim(), "euclidean bandwidth")?;
        crate::check_unique_names(&names)?;
        Ok(Self { names, kernel })
    }

    /// Single dimension with a Gaussian kernel
    pub fn gaussian(name: impl Into<String>, bandwidth: f64) -> Result<Self> {
        Self::new(vec![name.into()], Kernel::scalar(KernelKind::gaussian(), bandwidth)?)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    /// Space over a subset of this space's dimensions
    pub(crate) fn restrict(&self, dims: &[usize]) -> Result<Self> {
        let names = dims.iter().map(|&d| self.names[d].clone()).collect::<Vec<_>>();
        let bandwidth = dims.iter().map(|&d| self.kernel.bandwidth()[d]).collect();
        Self::new(names, Kernel::new(self.kernel.kind(), bandwidth)?)
    }
}

impl SpaceMetric for EuclideanSpace {
    fn ndim(&self) -> usize {
        self.names.len()
    }

    fn dimension(&self, dim: usize) -> DimensionSpec {
        DimensionSpec::new(self.names[dim].clone(), Topology::Linear)
    }

    fn default_bandwidth(&self) -> Vec<f64> {
        self.kernel.bandwidth().to_vec()
    }

    #[inline]
    fn difference(&self, _dim: usize, a: f64, b: f64) -> f64 {
        a - b
    }

    #[inline]
    fn factor(&self, _dim: usize, location: f64, bandwidth: f64, point: f64) -> f64 {
        self.kernel.kind().evaluate(point - location, bandwidth)
    }

    #[inline]
    fn log_factor(&self, _dim: usize, location: f64, bandwidth: f64, point: f64) -> f64 {
        self.kernel.kind().log_evaluate(point - location, bandwidth)
    }

    #[inline]
    fn scaled_squared(&self, _dim: usize, reference: f64, bandwidth: f64, point: f64) -> f64 {
        let u = (point - reference) / bandwidth;
        u * u
    }

    fn merge(&self, _dim: usize, w1: f64, c1: (f64, f64), w2: f64, c2: (f64, f64)) -> (f64, f64) {
        let w = w1 + w2;
        let (l1, b1) = c1;
        let (l2, b2) = c2;
        let location = (w1 * l1 + w2 * l2) / w;
        let spread = l1 - l2;
        let variance = (w1 * b1 * b1 + w2 * b2 * b2) / w + w1 * w2 * spread * spread / (w * w);
        (location, variance.sqrt())
    }

    fn validate_coordinate(&self, dim: usize, value: f64) -> Result<()> {
        if !value.is_finite() {
            return Err(Error::InvalidInput(format!(
                "coordinate {value} for dimension '{}' is not finite",
                self.names[dim]
            )));
        }
        Ok(())
    }

    fn validate_bandwidth(&self, _dim: usize, bandwidth: f64) -> Result<()> {
        self.kernel.kind().validate_bandwidth(bandwidth)
    }

    fn scale_bandwidth(&self, _dim: usize, bandwidth: f64, factor: f64) -> f64 {
        bandwidth * factor
    }

    fn axis(&self, dim: usize, spec: &AxisSpec) -> Result<Axis> {
        match spec {
            AxisSpec::Linear { start, stop, count } => {
                if *count == 0 || !start.is_finite() || !stop.is_finite() || stop < start {
                    return Err(Error::invalid_parameter(format!(
                        "invalid linear axis [{start}, {stop}] with {count} points"
                    )));
                }
                if *count == 1 {
                    return Ok(Axis::uniform(vec![*start], 1.0));
                }
                let step = (stop - start) / (*count - 1) as f64;
                if step <= 0.0 {
                    return Err(Error::invalid_parameter("linear axis has zero extent"));
                }
                let values = (0..*count).map(|i| start + i as f64 * step).collect();
                Ok(Axis::uniform(values, step))
            }
            AxisSpec::Step { start, stop, step } => {
                if !(*step > 0.0) || !start.is_finite() || !stop.is_finite() || stop < start {
                    return Err(Error::invalid_parameter(format!(
                        "invalid stepped axis [{start}, {stop}] with step {step}"
                    )));
                }
                // tolerate rounding at the closed end
                let n = ((stop - start) / step + 1e-9).floor() as usize + 1;
                let values = (0..n).map(|i| start + i as f64 * step).collect();
                Ok(Axis::uniform(values, *step))
            }
            AxisSpec::Values(values) => {
                for &v in values {
                    self.validate_coordinate(dim, v)?;
                }
                if values.is_empty() || values.windows(2).any(|w| w[1] <= w[0]) {
                    return Err(Error::invalid_parameter(
                        "explicit axis values must be non-empty and strictly increasing",
                    ));
                }
                Ok(Axis::new(values.clone(), midpoint_widths(values)))
            }
            other => Err(Error::invalid_parameter(format!(
                "axis {other:?} is not valid for linear dimension '{}'",
                self.names[dim]
            ))),
        }
    }
}
