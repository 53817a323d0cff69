use crate::mixture::{validate_config, Mixture};
use crate::types::{BandwidthPolicy, MixtureConfig};
use ckde_core::Result;
use ckde_space::Space;
use std::sync::Arc;

/// Builder for configuring and creating mixtures.
pub struct MixtureBuilder {
    space: Arc<Space>,
    config: MixtureConfig,
}

impl MixtureBuilder {
    /// Creates a builder with the default configuration: no insertion
    /// merging, manual compression only, fixed bandwidth, no attenuation.
    pub fn new(space: impl Into<Arc<Space>>) -> Self {
        Self {
            space: space.into(),
            config: MixtureConfig::default(),
        }
    }

    /// Sets the Mahalanobis radius for merging new samples into their
    /// nearest component. Negative values are clamped to zero, which
    /// disables merging.
    pub fn merge_threshold(mut self, threshold: f64) -> Self {
        self.config.merge_threshold = threshold.max(0.0);
        self
    }

    /// Compress back to `target` components whenever ingestion exceeds it.
    ///
    /// The target is clamped to at least one component.
    pub fn compression_target(mut self, target: usize) -> Self {
        self.config.compression_target = Some(target.max(1));
        self
    }

    pub fn bandwidth_policy(mut self, policy: BandwidthPolicy) -> Self {
        self.config.bandwidth_policy = policy;
        self
    }

    /// Sets the forgetting factor applied to existing weights before each
    /// ingestion call, clamped to (0, 1].
    pub fn attenuation(mut self, attenuation: f64) -> Self {
        self.config.attenuation = attenuation.clamp(f64::MIN_POSITIVE, 1.0);
        self
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: MixtureConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the configured, empty mixture.
    pub fn build(self) -> Result<Mixture> {
        validate_config(&self.config)?;
        Mixture::with_config(self.space, self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ckde_space::EuclideanSpace;

    fn line() -> Space {
        EuclideanSpace::gaussian("x", 1.0).unwrap().into()
    }

    #[test]
    fn test_builder_pattern() {
        let m = MixtureBuilder::new(line())
            .merge_threshold(2.0)
            .compression_target(100)
            .bandwidth_policy(BandwidthPolicy::Scott)
            .attenuation(0.9)
            .build()
            .unwrap();
        let config = m.config();
        assert_eq!(config.merge_threshold, 2.0);
        assert_eq!(config.compression_target, Some(100));
        assert_eq!(config.bandwidth_policy, BandwidthPolicy::Scott);
        assert_eq!(config.attenuation, 0.9);
    }

    #[test]
    fn test_builder_clamps() {
        let m = MixtureBuilder::new(line())
            .merge_threshold(-1.0)
            .compression_target(0)
            .attenuation(3.0)
            .build()
            .unwrap();
        assert_eq!(m.config().merge_threshold, 0.0);
        assert_eq!(m.config().compression_target, Some(1));
        assert_eq!(m.config().attenuation, 1.0);
    }

    #[test]
    fn test_explicit_config_is_validated() {
        let config = MixtureConfig {
            attenuation: 0.0,
            ..MixtureConfig::default()
        };
        assert!(MixtureBuilder::new(line()).config(config).build().is_err());
    }
}
