//! The closed set of space kinds and whole-point operations

use crate::categorical::CategoricalSpace;
use crate::circular::CircularSpace;
use crate::encoded::EncodedSpace;
use crate::euclidean::EuclideanSpace;
use crate::multi::MultiSpace;
use crate::traits::SpaceMetric;
use crate::types::{Axis, AxisSpec, DimensionSpec, Topology};
use ckde_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// A topology descriptor over which mixtures are defined
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Space {
    Euclidean(EuclideanSpace),
    Circular(CircularSpace),
    Categorical(CategoricalSpace),
    Encoded(EncodedSpace),
    Multi(MultiSpace),
}

macro_rules! dispatch {
    ($self:expr, $space:ident => $body:expr) => {
        match $self {
            Space::Euclidean($space) => $body,
            Space::Circular($space) => $body,
            Space::Categorical($space) => $body,
            Space::Encoded($space) => $body,
            Space::Multi($space) => $body,
        }
    };
}

impl Space {
    /// Product of `spaces`, flattening nested products
    pub fn product(spaces: Vec<Space>) -> Result<Space> {
        Ok(Space::Multi(MultiSpace::new(spaces)?))
    }

    /// Product of this space followed by `others`
    pub fn merge_into_product(&self, others: &[Space]) -> Result<Space> {
        let mut spaces = Vec::with_capacity(others.len() + 1);
        spaces.push(self.clone());
        spaces.extend(others.iter().cloned());
        Self::product(spaces)
    }

    /// Short name of the space kind
    pub fn kind(&self) -> &'static str {
        match self {
            Space::Euclidean(_) => "euclidean",
            Space::Circular(_) => "circular",
            Space::Categorical(_) => "categorical",
            Space::Encoded(_) => "encoded",
            Space::Multi(_) => "multi",
        }
    }

    pub fn dimensions(&self) -> Vec<DimensionSpec> {
        (0..self.ndim()).map(|d| self.dimension(d)).collect()
    }

    pub fn dimension_names(&self) -> Vec<String> {
        (0..self.ndim()).map(|d| self.dimension(d).name).collect()
    }

    /// Index of the dimension called `name`
    pub fn dimension_index(&self, name: &str) -> Result<usize> {
        (0..self.ndim())
            .find(|&d| self.dimension(d).name == name)
            .ok_or_else(|| Error::InvalidInput(format!("space has no dimension '{name}'")))
    }

    /// Sorted indices of the named dimensions
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<usize>> {
        let mut dims = names
            .iter()
            .map(|n| self.dimension_index(n.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        dims.sort_unstable();
        dims.dedup();
        Ok(dims)
    }

    /// Boolean membership mask for a set of dimension indices
    pub fn selection_mask(&self, dims: &[usize]) -> Result<Vec<bool>> {
        self.check_selection(dims)?;
        let mut mask = vec![false; self.ndim()];
        for &d in dims {
            mask[d] = true;
        }
        Ok(mask)
    }

    /// Reject empty, unsorted, duplicated or out-of-range selections
    pub fn check_selection(&self, dims: &[usize]) -> Result<()> {
        if dims.is_empty() {
            return Err(Error::invalid_parameter("dimension selection is empty"));
        }
        if dims.windows(2).any(|w| w[1] <= w[0]) {
            return Err(Error::invalid_parameter(
                "dimension selection must be strictly increasing",
            ));
        }
        if let Some(&last) = dims.last() {
            if last >= self.ndim() {
                return Err(Error::dimension_mismatch(self.ndim(), last + 1, "dimension selection"));
            }
        }
        Ok(())
    }

    /// Space spanned by the selected dimensions, in their original order
    pub fn subspace(&self, dims: &[usize]) -> Result<Space> {
        self.check_selection(dims)?;
        match self {
            Space::Euclidean(e) => Ok(Space::Euclidean(e.restrict(dims)?)),
            Space::Multi(m) => {
                let mut pieces: Vec<Space> = Vec::new();
                let mut offset = 0;
                for child in m.children() {
                    let n = child.ndim();
                    let local: Vec<usize> = dims
                        .iter()
                        .filter(|&&d| d >= offset && d < offset + n)
                        .map(|&d| d - offset)
                        .collect();
                    if !local.is_empty() {
                        pieces.push(child.subspace(&local)?);
                    }
                    offset += n;
                }
                if pieces.len() == 1 {
                    Ok(pieces.remove(0))
                } else {
                    Self::product(pieces)
                }
            }
            // one-dimensional leaves
            leaf => Ok(leaf.clone()),
        }
    }

    /// Fail unless `point` has one coordinate per dimension
    #[inline]
    pub fn check_point(&self, point: &[f64], context: &str) -> Result<()> {
        Error::check_dimension(self.ndim(), point.len(), context)
    }

    /// Check dimensionality and that every coordinate is a valid location
    pub fn validate_point(&self, point: &[f64]) -> Result<()> {
        self.check_point(point, "sample location")?;
        for (d, &x) in point.iter().enumerate() {
            self.validate_coordinate(d, x)?;
        }
        Ok(())
    }

    /// Check dimensionality and positivity of a bandwidth vector
    pub fn validate_bandwidths(&self, bandwidth: &[f64]) -> Result<()> {
        Error::check_dimension(self.ndim(), bandwidth.len(), "bandwidth")?;
        for (d, &bw) in bandwidth.iter().enumerate() {
            self.validate_bandwidth(d, bw)?;
        }
        Ok(())
    }

    /// Signed per-dimension differences `a - b`
    pub fn differences(&self, a: &[f64], b: &[f64]) -> Result<Vec<f64>> {
        self.check_point(a, "difference")?;
        self.check_point(b, "difference")?;
        Ok((0..self.ndim())
            .map(|d| self.difference(d, a[d], b[d]))
            .collect())
    }

    /// Non-negative per-dimension distances between `a` and `b`
    pub fn distances(&self, a: &[f64], b: &[f64]) -> Result<Vec<f64>> {
        self.check_point(a, "distance")?;
        self.check_point(b, "distance")?;
        Ok((0..self.ndim())
            .map(|d| self.distance(d, a[d], b[d]))
            .collect())
    }

    /// Check that a component location and bandwidth both span the space
    fn check_component(&self, location: &[f64], bandwidth: &[f64]) -> Result<()> {
        self.check_point(location, "component location")?;
        Error::check_dimension(self.ndim(), bandwidth.len(), "component bandwidth")
    }

    /// Squared distance from `reference` to `point` scaled by the reference bandwidth
    #[inline]
    pub fn mahalanobis_squared(&self, reference: &[f64], bandwidth: &[f64], point: &[f64]) -> Result<f64> {
        self.check_component(reference, bandwidth)?;
        self.check_point(point, "distance")?;
        let mut total = 0.0;
        for d in 0..reference.len() {
            total += self.scaled_squared(d, reference[d], bandwidth[d], point[d]);
            if total == f64::INFINITY {
                break;
            }
        }
        Ok(total)
    }

    /// Product kernel of a component evaluated at `point`
    #[inline]
    pub fn kernel(&self, location: &[f64], bandwidth: &[f64], point: &[f64]) -> Result<f64> {
        self.check_component(location, bandwidth)?;
        self.check_point(point, "evaluation point")?;
        let mut p = 1.0;
        for d in 0..location.len() {
            p *= self.factor(d, location[d], bandwidth[d], point[d]);
            if p == 0.0 {
                break;
            }
        }
        Ok(p)
    }

    /// Product kernel restricted to the dimensions in `dims`; `point`
    /// holds one coordinate per selected dimension
    #[inline]
    pub fn partial_kernel(&self, dims: &[usize], location: &[f64], bandwidth: &[f64], point: &[f64]) -> Result<f64> {
        self.check_component(location, bandwidth)?;
        Error::check_dimension(dims.len(), point.len(), "evaluation point")?;
        if let Some(&d) = dims.iter().find(|&&d| d >= self.ndim()) {
            return Err(Error::dimension_mismatch(self.ndim(), d + 1, "dimension selection"));
        }
        let mut p = 1.0;
        for (k, &d) in dims.iter().enumerate() {
            p *= self.factor(d, location[d], bandwidth[d], point[k]);
            if p == 0.0 {
                break;
            }
        }
        Ok(p)
    }

    /// Coordinate of `label` on categorical or encoded dimension `dim`
    pub fn encode_label(&self, dim: usize, label: &str) -> Result<f64> {
        match self {
            Space::Categorical(c) => c.encode(label),
            Space::Encoded(e) => e.encode(label),
            Space::Multi(m) if dim < self.ndim() => {
                let (child, d) = m.locate(dim);
                child.encode_label(d, label)
            }
            _ => Err(Error::InvalidInput(format!(
                "dimension {dim} of a {} space has no labels",
                self.kind()
            ))),
        }
    }

    /// Whether every dimension is categorical
    pub fn is_discrete(&self) -> bool {
        self.dimensions()
            .iter()
            .all(|d| matches!(d.topology, Topology::Categorical { .. }))
    }
}

impl SpaceMetric for Space {
    fn ndim(&self) -> usize {
        dispatch!(self, s => s.ndim())
    }

    fn dimension(&self, dim: usize) -> DimensionSpec {
        dispatch!(self, s => s.dimension(dim))
    }

    fn default_bandwidth(&self) -> Vec<f64> {
        dispatch!(self, s => s.default_bandwidth())
    }

    #[inline]
    fn difference(&self, dim: usize, a: f64, b: f64) -> f64 {
        dispatch!(self, s => s.difference(dim, a, b))
    }

    #[inline]
    fn distance(&self, dim: usize, a: f64, b: f64) -> f64 {
        dispatch!(self, s => s.distance(dim, a, b))
    }

    #[inline]
    fn factor(&self, dim: usize, location: f64, bandwidth: f64, point: f64) -> f64 {
        dispatch!(self, s => s.factor(dim, location, bandwidth, point))
    }

    #[inline]
    fn log_factor(&self, dim: usize, location: f64, bandwidth: f64, point: f64) -> f64 {
        dispatch!(self, s => s.log_factor(dim, location, bandwidth, point))
    }

    #[inline]
    fn scaled_squared(&self, dim: usize, reference: f64, bandwidth: f64, point: f64) -> f64 {
        dispatch!(self, s => s.scaled_squared(dim, reference, bandwidth, point))
    }

    fn merge(&self, dim: usize, w1: f64, c1: (f64, f64), w2: f64, c2: (f64, f64)) -> (f64, f64) {
        dispatch!(self, s => s.merge(dim, w1, c1, w2, c2))
    }

    fn validate_coordinate(&self, dim: usize, value: f64) -> Result<()> {
        dispatch!(self, s => s.validate_coordinate(dim, value))
    }

    fn validate_bandwidth(&self, dim: usize, bandwidth: f64) -> Result<()> {
        dispatch!(self, s => s.validate_bandwidth(dim, bandwidth))
    }

    fn scale_bandwidth(&self, dim: usize, bandwidth: f64, factor: f64) -> f64 {
        dispatch!(self, s => s.scale_bandwidth(dim, bandwidth, factor))
    }

    fn axis(&self, dim: usize, spec: &AxisSpec) -> Result<Axis> {
        dispatch!(self, s => s.axis(dim, spec))
    }
}

impl From<EuclideanSpace> for Space {
    fn from(space: EuclideanSpace) -> Self {
        Space::Euclidean(space)
    }
}

impl From<CircularSpace> for Space {
    fn from(space: CircularSpace) -> Self {
        Space::Circular(space)
    }
}

impl From<CategoricalSpace> for Space {
    fn from(space: CategoricalSpace) -> Self {
        Space::Categorical(space)
    }
}

impl From<EncodedSpace> for Space {
    fn from(space: EncodedSpace) -> Self {
        Space::Encoded(space)
    }
}

impl From<MultiSpace> for Space {
    fn from(space: MultiSpace) -> Self {
        Space::Multi(space)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ckde_core::{Kernel, KernelKind};

    fn xy() -> Space {
        EuclideanSpace::new(vec!["x", "y"], Kernel::gaussian(vec![1.0, 2.0]).unwrap())
            .unwrap()
            .into()
    }

    fn heading() -> Space {
        CircularSpace::new("heading", 5.0).unwrap().into()
    }

    #[test]
    fn test_product_concatenates_dimensions() {
        let arm: Space = CategoricalSpace::new("arm", vec!["A", "B"]).unwrap().into();
        let product = xy().merge_into_product(&[heading(), arm]).unwrap();
        assert_eq!(product.ndim(), 4);
        assert_eq!(product.dimension_names(), vec!["x", "y", "heading", "arm"]);
        assert_eq!(product.default_bandwidth(), vec![1.0, 2.0, 5.0, 1.0]);

        let d = product
            .distances(&[0.0, 0.0, 0.1, 0.0], &[1.0, -2.0, std::f64::consts::TAU - 0.1, 1.0])
            .unwrap();
        assert_relative_eq!(d[0], 1.0);
        assert_relative_eq!(d[1], 2.0);
        assert_relative_eq!(d[2], 0.2, epsilon = 1e-12);
        assert_eq!(d[3], f64::INFINITY);
    }

    #[test]
    fn test_nested_products_flatten() {
        let inner = Space::product(vec![xy(), heading()]).unwrap();
        let outer = Space::product(vec![inner, CircularSpace::new("phase", 1.0).unwrap().into()]).unwrap();
        match &outer {
            Space::Multi(m) => assert_eq!(m.children().len(), 3),
            _ => panic!("expected product"),
        }
        assert_eq!(outer.ndim(), 4);
    }

    #[test]
    fn test_product_rejects_empty_and_duplicates() {
        assert!(matches!(Space::product(vec![]), Err(Error::InvalidParameter(_))));
        assert!(Space::product(vec![heading(), heading()]).is_err());
    }

    #[test]
    fn test_select_and_subspace() {
        let product = xy().merge_into_product(&[heading()]).unwrap();
        let dims = product.select(&["heading", "x"]).unwrap();
        assert_eq!(dims, vec![0, 2]);
        let sub = product.subspace(&dims).unwrap();
        assert_eq!(sub.dimension_names(), vec!["x", "heading"]);
        assert_eq!(sub.default_bandwidth(), vec![1.0, 5.0]);

        let single = product.subspace(&[1]).unwrap();
        assert!(matches!(single, Space::Euclidean(_)));
        assert_eq!(single.dimension_names(), vec!["y"]);

        assert!(product.select(&["z"]).is_err());
        assert!(product.subspace(&[2, 0]).is_err());
        assert!(product.subspace(&[3]).is_err());
    }

    #[test]
    fn test_dimension_mismatch() {
        let space = xy();
        assert!(matches!(
            space.distances(&[0.0], &[0.0, 1.0]),
            Err(Error::DimensionMismatch { expected: 2, actual: 1, .. })
        ));
        assert!(space.validate_point(&[0.0, f64::NAN]).is_err());
    }

    #[test]
    fn test_kernel_is_product_of_factors() {
        let space = xy().merge_into_product(&[heading()]).unwrap();
        let loc = [0.0, 0.0, 1.0];
        let bw = space.default_bandwidth();
        let point = [0.5, -1.0, 1.3];
        let expected: f64 = (0..3).map(|d| space.factor(d, loc[d], bw[d], point[d])).product();
        assert_relative_eq!(space.kernel(&loc, &bw, &point).unwrap(), expected, epsilon = 1e-15);
        // dropping a dimension drops its factor
        let partial = space.partial_kernel(&[0, 2], &loc, &bw, &[0.5, 1.3]).unwrap();
        let expected = space.factor(0, 0.0, 1.0, 0.5) * space.factor(2, 1.0, 5.0, 1.3);
        assert_relative_eq!(partial, expected, epsilon = 1e-15);
    }

    #[test]
    fn test_whole_point_kernels_check_lengths() {
        let space = xy().merge_into_product(&[heading()]).unwrap();
        let bw = space.default_bandwidth();
        let short = [0.0, 0.0];
        assert!(matches!(
            space.kernel(&short, &bw, &[0.0, 0.0, 0.0]),
            Err(Error::DimensionMismatch { expected: 3, actual: 2, .. })
        ));
        assert!(matches!(
            space.kernel(&[0.0, 0.0, 1.0], &bw[..2], &[0.0, 0.0, 0.0]),
            Err(Error::DimensionMismatch { expected: 3, actual: 2, .. })
        ));
        assert!(matches!(
            space.mahalanobis_squared(&[0.0, 0.0, 1.0], &bw, &short),
            Err(Error::DimensionMismatch { .. })
        ));
        assert!(matches!(
            space.partial_kernel(&[0, 5], &[0.0, 0.0, 1.0], &bw, &[0.5, 1.3]),
            Err(Error::DimensionMismatch { expected: 3, actual: 6, .. })
        ));
        assert!(space.partial_kernel(&[0, 2], &[0.0, 0.0, 1.0], &bw, &[0.5]).is_err());
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_product_dimension_overrun_panics() {
        let space = xy().merge_into_product(&[heading()]).unwrap();
        let _ = space.dimension(7);
    }

    #[test]
    fn test_encode_label_through_product() {
        let arm: Space = CategoricalSpace::new("arm", vec!["A", "B"]).unwrap().into();
        let track: Space = EncodedSpace::from_positions("track", &[0.0, 1.0, 2.0], KernelKind::Box, 1.0)
            .unwrap()
            .into();
        let product = Space::product(vec![xy(), arm, track]).unwrap();
        assert_eq!(product.encode_label(2, "B").unwrap(), 1.0);
        assert_eq!(product.encode_label(3, "2").unwrap(), 2.0);
        assert!(product.encode_label(0, "A").is_err());
    }

    #[test]
    fn test_serde_round_trip() {
        let arm: Space = CategoricalSpace::new("arm", vec!["A", "B"]).unwrap().into();
        let product = Space::product(vec![xy(), heading(), arm]).unwrap();
        let json = serde_json::to_string(&product).unwrap();
        let back: Space = serde_json::from_str(&json).unwrap();
        assert_eq!(product, back);
    }
}
