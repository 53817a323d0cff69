//! Circular (periodic) dimensions smoothed with a von Mises kernel

use crate::traits::SpaceMetric;
use crate::types::{Axis, AxisSpec, DimensionSpec, Topology};
use ckde_core::math::{wrap_positive, wrap_signed};
use ckde_core::{Error, KernelKind, Result};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

/// A periodic dimension.
///
/// Coordinates live on `[0, period)`. The bandwidth of a circular
/// dimension is the von Mises concentration κ, expressed in radians of a
/// full `2π` turn regardless of the period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircularSpace {
    name: String,
    period: f64,
    kappa: f64,
}

impl CircularSpace {
    /// Angle in radians with period `2π`
    pub fn new(name: impl Into<String>, kappa: f64) -> Result<Self> {
        Self::with_period(name, kappa, TAU)
    }

    pub fn with_period(name: impl Into<String>, kappa: f64, period: f64) -> Result<Self> {
        if !period.is_finite() || period <= 0.0 {
            return Err(Error::invalid_parameter(format!(
                "circular period must be positive and finite, got {period}"
            )));
        }
        KernelKind::VonMises.validate_bandwidth(kappa)?;
        Ok(Self {
            name: name.into(),
            period,
            kappa,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn period(&self) -> f64 {
        self.period
    }

    pub fn kappa(&self) -> f64 {
        self.kappa
    }

    #[inline]
    fn to_radians(&self) -> f64 {
        TAU / self.period
    }
}

impl SpaceMetric for CircularSpace {
    fn ndim(&self) -> usize {
        1
    }

    fn dimension(&self, _dim: usize) -> DimensionSpec {
        DimensionSpec::new(self.name.clone(), Topology::Circular { period: self.period })
    }

    fn default_bandwidth(&self) -> Vec<f64> {
        vec![self.kappa]
    }

    #[inline]
    fn difference(&self, _dim: usize, a: f64, b: f64) -> f64 {
        wrap_signed(a - b, self.period)
    }

    #[inline]
    fn factor(&self, dim: usize, location: f64, bandwidth: f64, point: f64) -> f64 {
        let scale = self.to_radians();
        let theta = self.difference(dim, point, location) * scale;
        KernelKind::VonMises.evaluate(theta, bandwidth) * scale
    }

    #[inline]
    fn log_factor(&self, dim: usize, location: f64, bandwidth: f64, point: f64) -> f64 {
        let scale = self.to_radians();
        let theta = self.difference(dim, point, location) * scale;
        KernelKind::VonMises.log_evaluate(theta, bandwidth) + scale.ln()
    }

    /// Uses the large-κ Gaussian approximation of the von Mises kernel,
    /// variance `1/κ`.
    #[inline]
    fn scaled_squared(&self, dim: usize, reference: f64, bandwidth: f64, point: f64) -> f64 {
        let theta = self.difference(dim, point, reference) * self.to_radians();
        theta * theta * bandwidth
    }

    fn merge(&self, dim: usize, w1: f64, c1: (f64, f64), w2: f64, c2: (f64, f64)) -> (f64, f64) {
        let w = w1 + w2;
        let (l1, k1) = c1;
        let (l2, k2) = c2;
        let delta = self.difference(dim, l2, l1);
        let location = wrap_positive(l1 + delta * w2 / w, self.period);
        let theta = delta * self.to_radians();
        let inv_kappa = (w1 / k1 + w2 / k2) / w + w1 * w2 * theta * theta / (w * w);
        (location, 1.0 / inv_kappa)
    }

    fn validate_coordinate(&self, _dim: usize, value: f64) -> Result<()> {
        if !value.is_finite() {
            return Err(Error::InvalidInput(format!(
                "angle {value} for dimension '{}' is not finite",
                self.name
            )));
        }
        Ok(())
    }

    fn validate_bandwidth(&self, _dim: usize, bandwidth: f64) -> Result<()> {
        KernelKind::VonMises.validate_bandwidth(bandwidth)
    }

    /// Concentration grows as the equivalent standard deviation shrinks
    fn scale_bandwidth(&self, _dim: usize, bandwidth: f64, factor: f64) -> f64 {
        bandwidth / (factor * factor)
    }

    fn axis(&self, _dim: usize, spec: &AxisSpec) -> Result<Axis> {
        match spec {
            AxisSpec::Count(n) if *n > 0 => {
                let step = self.period / *n as f64;
                let values = (0..*n).map(|k| k as f64 * step).collect();
                Ok(Axis::uniform(values, step))
            }
            AxisSpec::Values(values) if !values.is_empty() => {
                let mut wrapped: Vec<f64> = values
                    .iter()
                    .map(|&v| wrap_positive(v, self.period))
                    .collect();
                if wrapped.iter().any(|v| !v.is_finite()) {
                    return Err(Error::non_finite("circular axis values"));
                }
                wrapped.sort_by(f64::total_cmp);
                if wrapped.windows(2).any(|w| w[1] <= w[0]) {
                    return Err(Error::invalid_parameter(
                        "circular axis values must be distinct modulo the period",
                    ));
                }
                let n = wrapped.len();
                let widths = (0..n)
                    .map(|i| {
                        if n == 1 {
                            return self.period;
                        }
                        let next = wrapped[(i + 1) % n];
                        let prev = wrapped[(i + n - 1) % n];
                        let forward = wrap_positive(next - wrapped[i], self.period);
                        let backward = wrap_positive(wrapped[i] - prev, self.period);
                        0.5 * (forward + backward)
                    })
                    .collect();
                Ok(Axis::new(wrapped, widths))
            }
            other => Err(Error::invalid_parameter(format!(
                "axis {other:?} is not valid for circular dimension '{}'",
                self.name
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn test_wrapped_distance() {
        let space = CircularSpace::new("theta", 4.0).unwrap();
        assert_relative_eq!(space.distance(0, 0.1, TAU - 0.1), 0.2, epsilon = 1e-12);
        assert_relative_eq!(space.difference(0, 0.1, TAU - 0.1), 0.2, epsilon = 1e-12);
        assert_relative_eq!(space.difference(0, TAU - 0.1, 0.1), -0.2, epsilon = 1e-12);
        assert!(space.distance(0, 0.0, PI) <= PI);
    }

    #[test]
    fn test_factor_integrates_over_period() {
        let space = CircularSpace::with_period("phase", 3.0, 10.0).unwrap();
        let axis = space.axis(0, &AxisSpec::Count(2000)).unwrap();
        let total: f64 = axis
            .values
            .iter()
            .zip(&axis.widths)
            .map(|(&x, &w)| space.factor(0, 9.5, 3.0, x) * w)
            .sum();
        assert_relative_eq!(total, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_merge_across_wrap() {
        let space = CircularSpace::new("theta", 10.0).unwrap();
        let (loc, kappa) = space.merge(0, 1.0, (TAU - 0.1, 10.0), 1.0, (0.1, 10.0));
        // Mean lies on the wrap point, not at π
        assert!(loc < 1e-9 || (TAU - loc) < 1e-9);
        assert!(kappa < 10.0);
    }

    #[test]
    fn test_count_axis() {
        let space = CircularSpace::new("theta", 1.0).unwrap();
        let axis = space.axis(0, &AxisSpec::Count(4)).unwrap();
        assert_relative_eq!(axis.values[1], PI / 2.0, epsilon = 1e-12);
        assert!(axis.widths.iter().all(|&w| (w - PI / 2.0).abs() < 1e-12));
        assert!(space.axis(0, &AxisSpec::All).is_err());
        assert!(space.axis(0, &AxisSpec::Count(0)).is_err());
    }

    #[test]
    fn test_non_finite_values_rejected() {
        let space = CircularSpace::new("theta", 1.0).unwrap();
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(matches!(
                space.axis(0, &AxisSpec::Values(vec![0.5, bad])),
                Err(Error::NumericDegeneracy(_))
            ));
            assert!(matches!(space.validate_coordinate(0, bad), Err(Error::InvalidInput(_))));
        }
        let axis = space.axis(0, &AxisSpec::Values(vec![0.5, TAU + 1.0])).unwrap();
        assert_relative_eq!(axis.values[0], 0.5, epsilon = 1e-12);
        assert_relative_eq!(axis.values[1], 1.0, epsilon = 1e-12);
    }
}
