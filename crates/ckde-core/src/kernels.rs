//! Smoothing kernel families
//!
//! A [`KernelKind`] is a one-dimensional smoothing function that is
//! normalized to integrate to one over its topology's domain. A
//! [`Kernel`] pairs a kind with a validated per-dimension bandwidth and
//! evaluates multi-dimensional contributions as the product of
//! one-dimensional factors.
//!
//! Bandwidths are Gaussian-equivalent: the finite-support kernels
//! stretch their support by a fixed factor so that a given bandwidth
//! smooths by a comparable amount whichever family is chosen.

use crate::error::{Error, Result};
use crate::math::{bessel_i0e, gaussian_truncated_mass};
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;
use std::f64::consts::TAU;
use tracing::debug;

/// Support stretch of the Epanechnikov kernel relative to a Gaussian bandwidth
pub const EPANECHNIKOV_FACTOR: f64 = 2.2138043588613394;

/// Support stretch of the box kernel relative to a Gaussian bandwidth
pub const BOX_FACTOR: f64 = 1.7400570569722662;

/// Default Gaussian truncation, in bandwidths
pub const DEFAULT_GAUSSIAN_CUTOFF: f64 = 3.0;

const LN_SQRT_TAU: f64 = 0.918_938_533_204_672_7;

/// Kernel family
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum KernelKind {
    /// Gaussian truncated at `cutoff` bandwidths and renormalized.
    /// An infinite cutoff gives the untruncated Gaussian.
    Gaussian { cutoff: f64 },
    /// Parabolic kernel with finite support
    Epanechnikov,
    /// Uniform kernel with finite support
    Box,
    /// Von Mises kernel for angles; the bandwidth is the concentration κ
    VonMises,
}

impl Default for KernelKind {
    fn default() -> Self {
        Self::Gaussian {
            cutoff: DEFAULT_GAUSSIAN_CUTOFF,
        }
    }
}

impl KernelKind {
    /// Gaussian with the default cutoff
    pub fn gaussian() -> Self {
        Self::default()
    }

    /// Check that the kind's own parameters are valid
    pub fn validate(&self) -> Result<()> {
        if let Self::Gaussian { cutoff } = self {
            if cutoff.is_nan() || *cutoff <= 0.0 {
                debug!("Rejected Gaussian cutoff {}", cutoff);
                return Err(Error::invalid_parameter(format!(
                    "Gaussian cutoff must be positive, got {cutoff}"
                )));
            }
        }
        Ok(())
    }

    /// Check a single bandwidth value
    pub fn validate_bandwidth(&self, bandwidth: f64) -> Result<()> {
        if !bandwidth.is_finite() || bandwidth <= 0.0 {
            debug!("Rejected {} bandwidth {}", self.name(), bandwidth);
            return Err(Error::invalid_parameter(format!(
                "{} bandwidth must be positive and finite, got {bandwidth}",
                self.name()
            )));
        }
        Ok(())
    }

    /// Short name used in logs and error messages
    pub fn name(&self) -> &'static str {
        match self {
            Self::Gaussian { .. } => "gaussian",
            Self::Epanechnikov => "epanechnikov",
            Self::Box => "box",
            Self::VonMises => "von_mises",
        }
    }

    /// Whether the kernel is zero beyond a finite distance
    pub fn has_finite_support(&self) -> bool {
        match self {
            Self::Gaussian { cutoff } => cutoff.is_finite(),
            Self::Epanechnikov | Self::Box => true,
            Self::VonMises => false,
        }
    }

    /// Distance beyond which the kernel is zero
    pub fn support_radius(&self, bandwidth: f64) -> f64 {
        match self {
            Self::Gaussian { cutoff } => cutoff * bandwidth,
            Self::Epanechnikov => EPANECHNIKOV_FACTOR * bandwidth,
            Self::Box => BOX_FACTOR * bandwidth,
            Self::VonMises => f64::INFINITY,
        }
    }

    /// Evaluate the normalized one-dimensional kernel at `distance`.
    ///
    /// For [`KernelKind::VonMises`] the distance is an angle in radians and
    /// `bandwidth` is the concentration.
    #[inline]
    pub fn evaluate(&self, distance: f64, bandwidth: f64) -> f64 {
        match self {
            Self::Gaussian { cutoff } => {
                let u = distance / bandwidth;
                if u * u >= cutoff * cutoff {
                    return 0.0;
                }
                (-0.5 * u * u).exp()
                    / (bandwidth * TAU.sqrt() * gaussian_truncated_mass(*cutoff))
            }
            Self::Epanechnikov => {
                let h = bandwidth * EPANECHNIKOV_FACTOR;
                let u = distance / h;
                if u * u >= 1.0 {
                    return 0.0;
                }
                0.75 * (1.0 - u * u) / h
            }
            Self::Box => {
                let h = bandwidth * BOX_FACTOR;
                let u = distance / h;
                if u * u >= 1.0 {
                    return 0.0;
                }
                0.5 / h
            }
            Self::VonMises => {
                let kappa = bandwidth;
                (kappa * (distance.cos() - 1.0)).exp() / (TAU * bessel_i0e(kappa))
            }
        }
    }

    /// Natural log of [`KernelKind::evaluate`], negative infinity outside the support
    #[inline]
    pub fn log_evaluate(&self, distance: f64, bandwidth: f64) -> f64 {
        match self {
            Self::Gaussian { cutoff } => {
                let u = distance / bandwidth;
                if u * u >= cutoff * cutoff {
                    return f64::NEG_INFINITY;
                }
                -0.5 * u * u - bandwidth.ln() - LN_SQRT_TAU - gaussian_truncated_mass(*cutoff).ln()
            }
            Self::VonMises => {
                let kappa = bandwidth;
                kappa * (distance.cos() - 1.0) - (TAU * bessel_i0e(kappa)).ln()
            }
            Self::Epanechnikov | Self::Box => self.evaluate(distance, bandwidth).ln(),
        }
    }

    /// Product of one-dimensional factors over paired distances and bandwidths.
    ///
    /// Stops early once a factor is zero.
    pub fn evaluate_product(&self, distances: &[f64], bandwidths: &[f64]) -> Result<f64> {
        Error::check_dimension(bandwidths.len(), distances.len(), "kernel product")?;
        let mut p = 1.0;
        for (&d, &bw) in distances.iter().zip(bandwidths) {
            p *= self.evaluate(d, bw);
            if p == 0.0 {
                break;
            }
        }
        Ok(p)
    }
}

/// A kernel family with a validated per-dimension bandwidth
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "KernelRecord")]
pub struct Kernel {
    kind: KernelKind,
    bandwidth: Vec<f64>,
}

#[derive(Deserialize)]
struct KernelRecord {
    kind: KernelKind,
    bandwidth: Vec<f64>,
}

impl TryFrom<KernelRecord> for Kernel {
    type Error = Error;

    fn try_from(record: KernelRecord) -> Result<Self> {
        Kernel::new(record.kind, record.bandwidth)
    }
}

impl Kernel {
    /// Create a kernel, rejecting non-positive or non-finite bandwidths
    pub fn new(kind: KernelKind, bandwidth: Vec<f64>) -> Result<Self> {
        kind.validate()?;
        if bandwidth.is_empty() {
            return Err(Error::invalid_parameter("kernel needs at least one bandwidth"));
        }
        for &bw in &bandwidth {
            kind.validate_bandwidth(bw)?;
        }
        Ok(Self { kind, bandwidth })
    }

    /// One-dimensional kernel with a scalar bandwidth
    pub fn scalar(kind: KernelKind, bandwidth: f64) -> Result<Self> {
        Self::new(kind, vec![bandwidth])
    }

    /// Gaussian kernel with the default cutoff
    pub fn gaussian(bandwidth: Vec<f64>) -> Result<Self> {
        Self::new(KernelKind::gaussian(), bandwidth)
    }

    pub fn kind(&self) -> KernelKind {
        self.kind
    }

    pub fn bandwidth(&self) -> &[f64] {
        &self.bandwidth
    }

    pub fn ndim(&self) -> usize {
        self.bandwidth.len()
    }

    /// Evaluate a one-dimensional factor using this kernel's bandwidth for `dim`
    pub fn evaluate(&self, dim: usize, distance: f64) -> Result<f64> {
        let bw = self
            .bandwidth
            .get(dim)
            .ok_or_else(|| Error::dimension_mismatch(self.ndim(), dim + 1, "kernel dimension"))?;
        Ok(self.kind.evaluate(distance, *bw))
    }

    /// Evaluate the product kernel at per-dimension distances
    pub fn evaluate_product(&self, distances: &[f64]) -> Result<f64> {
        self.kind.evaluate_product(distances, &self.bandwidth)
    }
}
