//! Configuration and result types for mixtures

use serde::{Deserialize, Serialize};

/// Whether evaluation divides by the total mixture weight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Normalization {
    /// Probability density, integrates to one
    #[default]
    Density,
    /// Unnormalized mass, proportional to the number of samples
    Mass,
}

/// How the bandwidth of a newly ingested sample is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BandwidthPolicy {
    /// Always the space's configured bandwidth
    #[default]
    Fixed,
    /// The space's bandwidth scaled by `(n + 1)^(-1 / (d + 4))`, where `n`
    /// is the number of samples ingested so far and `d` the number of
    /// smoothed dimensions
    Scott,
}

/// Explicit construction parameters of a [`crate::Mixture`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixtureConfig {
    /// Mahalanobis radius within which a new sample is merged into its
    /// nearest component instead of appended; zero disables merging
    pub merge_threshold: f64,
    /// Compress back to this many components whenever ingestion exceeds it
    pub compression_target: Option<usize>,
    pub bandwidth_policy: BandwidthPolicy,
    /// Factor applied to existing weights before each ingestion call
    pub attenuation: f64,
}

impl Default for MixtureConfig {
    fn default() -> Self {
        Self {
            merge_threshold: 0.0,
            compression_target: None,
            bandwidth_policy: BandwidthPolicy::Fixed,
            attenuation: 1.0,
        }
    }
}

/// Outcome of a compression pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionReport {
    pub components_before: usize,
    pub components_after: usize,
    pub merges: usize,
    /// True when no finitely-distant pair was left before reaching the target
    pub stopped_early: bool,
}
