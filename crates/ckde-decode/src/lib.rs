//! Bayesian Poisson decoding with compressed kernel density encoding models
//!
//! Each channel's events are stored in a [`ckde_mixture::Mixture`] over the
//! stimulus dimensions and any per-event covariates. Combined with the
//! [`StimulusOccupancy`] this gives a conditional event intensity over the
//! stimulus [`ckde_space::Grid`], and a [`Decoder`] turns simultaneous
//! observations of many channels into a [`Posterior`] over that grid.
//! A [`UnionDecoder`] decodes over several grids at once and normalizes
//! the posteriors jointly.
//!
//! # Example
//!
//! ```rust
//! use ckde_decode::{BaselineRate, Decoder, PoissonLikelihood, Stimulus, StimulusOccupancy};
//! use ckde_space::{AxisSpec, EuclideanSpace, Space};
//! use std::sync::Arc;
//!
//! let space: Space = EuclideanSpace::gaussian("position", 2.0).unwrap().into();
//! let stimulus = Arc::new(
//!     Stimulus::new(space, &[AxisSpec::Linear { start: 0.0, stop: 100.0, count: 51 }]).unwrap(),
//! );
//!
//! // where the animal was, sampled every 20 ms
//! let mut occupancy = StimulusOccupancy::new(Arc::clone(&stimulus), 0.02).unwrap();
//! let path: Vec<[f64; 1]> = (0..500).map(|i| [i as f64 * 0.2]).collect();
//! occupancy.add_samples(&path).unwrap();
//!
//! // a cell that fires around 30
//! let mut cell = PoissonLikelihood::stimulus_only(Arc::clone(&stimulus), BaselineRate::Empirical).unwrap();
//! cell.add_events(&[[29.0], [30.0], [30.5], [31.0]]).unwrap();
//!
//! let decoder = Decoder::builder(occupancy)
//!     .bin_duration(0.25)
//!     .channel("cell", cell)
//!     .build()
//!     .unwrap();
//!
//! let posterior = decoder.decode([("cell", 3u64)]).unwrap();
//! let map = posterior.map_point(decoder.grid()).unwrap();
//! assert!((map[0] - 30.0).abs() <= 4.0);
//! ```

pub mod builder;
pub mod decoder;
pub mod likelihood;
pub mod stimulus;
pub mod types;
pub mod union;

pub use builder::DecoderBuilder;
pub use decoder::Decoder;
pub use likelihood::{poisson_log_pmf, IntensitySurface, PoissonLikelihood};
pub use stimulus::{Stimulus, StimulusOccupancy};
pub use types::{BaselineRate, DecoderConfig, Observation, Posterior, DEFAULT_EPSILON};
pub use union::UnionDecoder;

pub use ckde_core::Result;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        BaselineRate, Decoder, DecoderBuilder, Observation, PoissonLikelihood, Posterior, Stimulus,
        StimulusOccupancy, UnionDecoder,
    };
}
