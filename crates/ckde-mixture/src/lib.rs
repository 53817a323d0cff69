//! Compressed kernel mixtures
//!
//! A [`Mixture`] approximates a density over a [`ckde_space::Space`] by a
//! weighted sum of product-kernel components. Samples are ingested
//! incrementally; [`Mixture::compress`] merges the closest component
//! pairs to keep the representation bounded while conserving total
//! weight exactly. A [`PartialMixture`] evaluates the marginal over a
//! subset of dimensions without copying components.
//!
//! # Example
//!
//! ```rust
//! use ckde_mixture::{Density, Mixture};
//! use ckde_space::{EuclideanSpace, Space};
//!
//! let space: Space = EuclideanSpace::gaussian("x", 0.5).unwrap().into();
//! let mut mixture = Mixture::new(space);
//! mixture.add_samples(&[[1.0], [1.1], [5.0]]).unwrap();
//!
//! mixture.compress(2).unwrap();
//! assert_eq!(mixture.len(), 2);
//! assert_eq!(mixture.total_weight(), 3.0);
//!
//! let density = mixture.evaluate(&[[1.05]]).unwrap();
//! assert!(density[0] > 0.0);
//! ```

pub mod builder;
pub mod component;
pub mod compress;
pub mod mixture;
pub mod partial;
pub mod traits;
pub mod types;

pub use builder::MixtureBuilder;
pub use component::Component;
pub use compress::{compress_components, pair_cost};
pub use mixture::Mixture;
pub use partial::PartialMixture;
pub use traits::Density;
pub use types::{BandwidthPolicy, CompressionReport, MixtureConfig, Normalization};

pub use ckde_core::Result;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{Density, Mixture, MixtureBuilder, MixtureConfig, Normalization, PartialMixture};
}
