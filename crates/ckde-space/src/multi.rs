//! Product spaces

use crate::space::Space;
use crate::traits::SpaceMetric;
use crate::types::{Axis, AxisSpec, DimensionSpec};
use ckde_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Cartesian product of leaf spaces.
///
/// Dimension order is the concatenation of the children's dimensions.
/// Nested products are flattened on construction, so children are never
/// themselves products.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiSpace {
    children: Vec<Space>,
}

impl MultiSpace {
    /// Build a product, rejecting an empty list and duplicate dimension names
    pub fn new(spaces: Vec<Space>) -> Result<Self> {
        if spaces.is_empty() {
            return Err(Error::invalid_parameter(
                "product space needs at least one sub-space",
            ));
        }

        let mut children = Vec::with_capacity(spaces.len());
        for space in spaces {
            match space {
                Space::Multi(multi) => children.extend(multi.children),
                leaf => children.push(leaf),
            }
        }

        let names: Vec<String> = children
            .iter()
            .flat_map(|c| (0..c.ndim()).map(move |d| c.dimension(d).name))
            .collect();
        crate::check_unique_names(&names)?;

        Ok(Self { children })
    }

    pub fn children(&self) -> &[Space] {
        &self.children
    }

    /// Child space holding global dimension `dim` and the child-local index.
    ///
    /// Panics when `dim >= ndim()`, like slice indexing.
    #[inline]
    pub(crate) fn locate(&self, dim: usize) -> (&Space, usize) {
        let original = dim;
        let mut dim = dim;
        for child in &self.children {
            let n = child.ndim();
            if dim < n {
                return (child, dim);
            }
            dim -= n;
        }
        panic!(
            "dimension {} out of range for a {}-dimensional product space",
            original,
            self.ndim()
        )
    }
}

impl SpaceMetric for MultiSpace {
    fn ndim(&self) -> usize {
        self.children.iter().map(|c| c.ndim()).sum()
    }

    fn dimension(&self, dim: usize) -> DimensionSpec {
        let (child, d) = self.locate(dim);
        child.dimension(d)
    }

    fn default_bandwidth(&self) -> Vec<f64> {
        self.children
            .iter()
            .flat_map(|c| c.default_bandwidth())
            .collect()
    }

    fn difference(&self, dim: usize, a: f64, b: f64) -> f64 {
        let (child, d) = self.locate(dim);
        child.difference(d, a, b)
    }

    #[inline]
    fn factor(&self, dim: usize, location: f64, bandwidth: f64, point: f64) -> f64 {
        let (child, d) = self.locate(dim);
        child.factor(d, location, bandwidth, point)
    }

    #[inline]
    fn log_factor(&self, dim: usize, location: f64, bandwidth: f64, point: f64) -> f64 {
        let (child, d) = self.locate(dim);
        child.log_factor(d, location, bandwidth, point)
    }

    fn scaled_squared(&self, dim: usize, reference: f64, bandwidth: f64, point: f64) -> f64 {
        let (child, d) = self.locate(dim);
        child.scaled_squared(d, reference, bandwidth, point)
    }

    fn merge(&self, dim: usize, w1: f64, c1: (f64, f64), w2: f64, c2: (f64, f64)) -> (f64, f64) {
        let (child, d) = self.locate(dim);
        child.merge(d, w1, c1, w2, c2)
    }

    fn validate_coordinate(&self, dim: usize, value: f64) -> Result<()> {
        let (child, d) = self.locate(dim);
        child.validate_coordinate(d, value)
    }

    fn validate_bandwidth(&self, dim: usize, bandwidth: f64) -> Result<()> {
        let (child, d) = self.locate(dim);
        child.validate_bandwidth(d, bandwidth)
    }

    fn scale_bandwidth(&self, dim: usize, bandwidth: f64, factor: f64) -> f64 {
        let (child, d) = self.locate(dim);
        child.scale_bandwidth(d, bandwidth, factor)
    }

    fn axis(&self, dim: usize, spec: &AxisSpec) -> Result<Axis> {
        let (child, d) = self.locate(dim);
        child.axis(d, spec)
    }
}
