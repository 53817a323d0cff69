//! Per-dimension metric operations shared by every space kind

use crate::types::{Axis, AxisSpec, DimensionSpec};
use ckde_core::Result;

/// Operations a space provides for each of its dimensions.
///
/// Every kernel in this crate family is a product of one-dimensional
/// factors, so spaces expose their metric one dimension at a time and
/// the mixture combines factors. `dim` is always local to the space;
/// per-dimension methods panic when `dim >= ndim()`, like slice indexing.
pub trait SpaceMetric {
    /// Number of dimensions
    fn ndim(&self) -> usize;

    /// Name and topology of dimension `dim`
    fn dimension(&self, dim: usize) -> DimensionSpec;

    /// Bandwidth assigned to new components, one value per dimension
    fn default_bandwidth(&self) -> Vec<f64>;

    /// Signed difference `a - b` respecting the topology
    fn difference(&self, dim: usize, a: f64, b: f64) -> f64;

    /// Non-negative distance between `a` and `b`
    fn distance(&self, dim: usize, a: f64, b: f64) -> f64 {
        self.difference(dim, a, b).abs()
    }

    /// Normalized kernel factor of a component at `location` with
    /// `bandwidth`, evaluated at `point`
    fn factor(&self, dim: usize, location: f64, bandwidth: f64, point: f64) -> f64;

    /// Natural log of [`SpaceMetric::factor`]
    fn log_factor(&self, dim: usize, location: f64, bandwidth: f64, point: f64) -> f64 {
        self.factor(dim, location, bandwidth, point).ln()
    }

    /// Squared distance from `reference` to `point` in units of the
    /// reference bandwidth (Mahalanobis contribution of this dimension)
    fn scaled_squared(&self, dim: usize, reference: f64, bandwidth: f64, point: f64) -> f64;

    /// Moment-matching merge of two weighted `(location, bandwidth)` pairs
    fn merge(&self, dim: usize, w1: f64, c1: (f64, f64), w2: f64, c2: (f64, f64)) -> (f64, f64);

    /// Reject coordinates that cannot be a sample location
    fn validate_coordinate(&self, dim: usize, value: f64) -> Result<()>;

    /// Reject bandwidths the dimension cannot use
    fn validate_bandwidth(&self, dim: usize, bandwidth: f64) -> Result<()>;

    /// Shrink a bandwidth by `factor` (< 1 means less smoothing)
    fn scale_bandwidth(&self, dim: usize, bandwidth: f64, factor: f64) -> f64;

    /// Build a grid axis for dimension `dim`
    fn axis(&self, dim: usize, spec: &AxisSpec) -> Result<Axis>;
}
