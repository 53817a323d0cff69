//! Core types for compressed kernel density estimation
//!
//! This crate provides the pieces every other ckde crate builds on:
//!
//! - [`Error`] and [`Result`], the shared error surface
//! - [`KernelKind`] and [`Kernel`], normalized one-dimensional smoothing
//!   kernels combined into product kernels
//! - [`math`], log-domain reductions and special functions used by the
//!   kernel normalizers and the decoder
//!
//! # Example
//!
//! ```rust
//! use ckde_core::{Kernel, KernelKind};
//!
//! let kernel = Kernel::new(KernelKind::Epanechnikov, vec![0.5, 1.0]).unwrap();
//! let weight = kernel.evaluate_product(&[0.1, -0.2]).unwrap();
//! assert!(weight > 0.0);
//!
//! // Non-positive bandwidths are rejected at construction
//! assert!(Kernel::gaussian(vec![0.0]).is_err());
//! ```

pub mod error;
pub mod kernels;
pub mod math;

pub use error::{Error, Result};
pub use kernels::{
    Kernel, KernelKind, BOX_FACTOR, DEFAULT_GAUSSIAN_CUTOFF, EPANECHNIKOV_FACTOR,
};
pub use math::{log_sum_exp, normalize_log_weights};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::Error;
    pub use crate::{Kernel, KernelKind, Result};
}
