use crate::decoder::Decoder;
use crate::likelihood::PoissonLikelihood;
use crate::stimulus::StimulusOccupancy;
use crate::types::DecoderConfig;
use ckde_core::Result;

/// Builder for configuring and creating decoders.
pub struct DecoderBuilder {
    occupancy: StimulusOccupancy,
    config: DecoderConfig,
    log_prior: Option<Vec<f64>>,
    channels: Vec<(String, PoissonLikelihood)>,
    precompute: bool,
}

impl DecoderBuilder {
    /// Creates a builder with the default configuration: unit bins, no
    /// factorial term, unit rate scale and a flat prior.
    pub fn new(occupancy: StimulusOccupancy) -> Self {
        Self {
            occupancy,
            config: DecoderConfig::default(),
            log_prior: None,
            channels: Vec::new(),
            precompute: false,
        }
    }

    /// Sets the floor applied to expected counts before taking logs.
    ///
    /// Clamped to the smallest positive normal value.
    pub fn epsilon(mut self, epsilon: f64) -> Self {
        self.config.epsilon = epsilon.max(f64::MIN_POSITIVE);
        self
    }

    /// Sets the length of one decoding bin
    pub fn bin_duration(mut self, duration: f64) -> Self {
        self.config.bin_duration = duration;
        self
    }

    pub fn include_log_factorial(mut self, include: bool) -> Self {
        self.config.include_log_factorial = include;
        self
    }

    /// Sets the multiplier applied to every channel's rate.
    ///
    /// Negative values are clamped to zero.
    pub fn rate_scale(mut self, scale: f64) -> Self {
        self.config.rate_scale = scale.max(0.0);
        self
    }

    /// Whether decoding normalizes the posterior; on by default
    pub fn normalize(mut self, normalize: bool) -> Self {
        self.config.normalize = normalize;
        self
    }

    pub fn config(mut self, config: DecoderConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the log-prior, one value per grid point
    pub fn log_prior(mut self, log_prior: Vec<f64>) -> Self {
        self.log_prior = Some(log_prior);
        self
    }

    /// Registers a channel at build time
    pub fn channel(mut self, id: impl Into<String>, likelihood: PoissonLikelihood) -> Self {
        self.channels.push((id.into(), likelihood));
        self
    }

    /// Compute every channel's intensity surface during `build`
    pub fn precompute(mut self, precompute: bool) -> Self {
        self.precompute = precompute;
        self
    }

    /// Builds the decoder, validating the configuration, prior and channels.
    pub fn build(self) -> Result<Decoder> {
        let mut decoder = Decoder::with_config(self.occupancy, self.config)?;
        decoder.set_log_prior(self.log_prior)?;
        for (id, likelihood) in self.channels {
            decoder.add_channel(id, likelihood)?;
        }
        if self.precompute {
            decoder.refresh()?;
        }
        Ok(decoder)
    }
}
