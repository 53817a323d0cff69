//! Compressed kernel density estimation and Bayesian decoding
//!
//! Facade over the workspace crates:
//!
//! - [`ckde_core`]: errors, kernels and numeric helpers
//! - [`ckde_space`]: mixed-topology spaces and evaluation grids
//! - [`ckde_mixture`]: compressed kernel mixtures and marginal views
//! - [`ckde_decode`]: Poisson encoding models and the multi-channel decoder
//!
//! # Example
//!
//! ```rust
//! use compressed_kde::prelude::*;
//!
//! let space: Space = EuclideanSpace::gaussian("x", 0.5).unwrap().into();
//! let mut mixture = Mixture::new(space);
//! mixture.add_samples(&[[1.0], [1.1], [5.0]]).unwrap();
//! mixture.compress(2).unwrap();
//! assert_eq!(mixture.len(), 2);
//! ```

pub use ckde_core;
pub use ckde_decode;
pub use ckde_mixture;
pub use ckde_space;

pub use ckde_core::{Error, Result};

/// Prelude module for convenient imports
pub mod prelude {
    pub use ckde_core::prelude::*;
    pub use ckde_decode::prelude::*;
    pub use ckde_mixture::prelude::*;
    pub use ckde_space::prelude::*;
}
