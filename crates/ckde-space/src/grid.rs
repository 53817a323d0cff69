//! Fixed discretizations of a space
//!
//! A [`Grid`] is the Cartesian product of one [`Axis`] per dimension.
//! Points are stored in row-major order (last dimension varies fastest);
//! decoder output vectors are indexed positionally against this order.

use crate::space::Space;
use crate::traits::SpaceMetric;
use crate::types::{Axis, AxisSpec};
use ckde_core::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// An ordered set of evaluation points with per-point cell weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    dimension_names: Vec<String>,
    axes: Vec<Axis>,
    points: Vec<f64>,
    weights: Vec<f64>,
}

impl Grid {
    /// Build a grid with one axis specification per dimension of `space`
    pub fn build(space: &Space, specs: &[AxisSpec]) -> Result<Self> {
        Error::check_dimension(space.ndim(), specs.len(), "grid axis specification")?;
        let axes = specs
            .iter()
            .enumerate()
            .map(|(d, spec)| space.axis(d, spec))
            .collect::<Result<Vec<_>>>()?;
        Self::from_axes(space.dimension_names(), axes)
    }

    /// Assemble a grid from prepared axes
    pub fn from_axes(dimension_names: Vec<String>, axes: Vec<Axis>) -> Result<Self> {
        Error::check_dimension(dimension_names.len(), axes.len(), "grid axes")?;
        if axes.is_empty() || axes.iter().any(Axis::is_empty) {
            return Err(Error::invalid_parameter("grid axes must be non-empty"));
        }
        if axes.iter().any(|a| a.values.len() != a.widths.len()) {
            return Err(Error::InvalidInput("axis values and widths differ in length".into()));
        }

        let ndim = axes.len();
        let len: usize = axes.iter().map(Axis::len).product();
        let mut points = Vec::with_capacity(len * ndim);
        let mut weights = Vec::with_capacity(len);
        let mut index = vec![0usize; ndim];

        for _ in 0..len {
            let mut weight = 1.0;
            for (axis, &i) in axes.iter().zip(&index) {
                points.push(axis.values[i]);
                weight *= axis.widths[i];
            }
            weights.push(weight);

            // odometer increment, last dimension fastest
            for d in (0..ndim).rev() {
                index[d] += 1;
                if index[d] < axes[d].len() {
                    break;
                }
                index[d] = 0;
            }
        }

        debug!("Built grid with {} points over {} dimensions", len, ndim);

        Ok(Self {
            dimension_names,
            axes,
            points,
            weights,
        })
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn ndim(&self) -> usize {
        self.axes.len()
    }

    pub fn dimension_names(&self) -> &[String] {
        &self.dimension_names
    }

    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    /// Number of points along each axis
    pub fn shape(&self) -> Vec<usize> {
        self.axes.iter().map(Axis::len).collect()
    }

    /// Coordinates of point `i`
    #[inline]
    pub fn point(&self, i: usize) -> &[f64] {
        let n = self.ndim();
        &self.points[i * n..(i + 1) * n]
    }

    /// All coordinates, row-major, `len() * ndim()` values
    pub fn points(&self) -> &[f64] {
        &self.points
    }

    #[inline]
    pub fn cell_weight(&self, i: usize) -> f64 {
        self.weights[i]
    }

    pub fn cell_weights(&self) -> &[f64] {
        &self.weights
    }

    /// Sum of all cell weights
    pub fn total_volume(&self) -> f64 {
        self.weights.iter().sum()
    }

    /// Iterate over `(point, cell_weight)` pairs in grid order
    pub fn iter(&self) -> impl Iterator<Item = (&[f64], f64)> + '_ {
        self.points
            .chunks_exact(self.ndim())
            .zip(self.weights.iter().copied())
    }

    /// Per-axis indices of flat point index `i`
    pub fn unravel(&self, mut i: usize) -> Vec<usize> {
        let mut index = vec![0; self.ndim()];
        for d in (0..self.ndim()).rev() {
            let n = self.axes[d].len();
            index[d] = i % n;
            i /= n;
        }
        index
    }

    /// Fail unless `space` has the same dimensions as this grid
    pub fn check_space(&self, space: &Space) -> Result<()> {
        Error::check_dimension(self.ndim(), space.ndim(), "grid space")?;
        if space.dimension_names() != self.dimension_names {
            return Err(Error::InvalidInput(format!(
                "grid dimensions {:?} do not match space dimensions {:?}",
                self.dimension_names,
                space.dimension_names()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CategoricalSpace, CircularSpace, EuclideanSpace};
    use approx::assert_relative_eq;

    #[test]
    fn test_row_major_order() {
        let x: Space = EuclideanSpace::gaussian("x", 1.0).unwrap().into();
        let arm: Space = CategoricalSpace::new("arm", vec!["A", "B", "C"]).unwrap().into();
        let space = Space::product(vec![x, arm]).unwrap();
        let grid = Grid::build(
            &space,
            &[AxisSpec::Linear { start: 0.0, stop: 1.0, count: 2 }, AxisSpec::All],
        )
        .unwrap();

        assert_eq!(grid.len(), 6);
        assert_eq!(grid.shape(), vec![2, 3]);
        assert_eq!(grid.point(0), &[0.0, 0.0]);
        assert_eq!(grid.point(1), &[0.0, 1.0]);
        assert_eq!(grid.point(3), &[1.0, 0.0]);
        assert_eq!(grid.unravel(5), vec![1, 2]);
        // linear width 1.0 times categorical width 1
        assert!(grid.cell_weights().iter().all(|&w| w == 1.0));
    }

    #[test]
    fn test_cell_weights_integrate_volume() {
        let theta: Space = CircularSpace::new("theta", 1.0).unwrap().into();
        let grid = Grid::build(&theta, &[AxisSpec::Count(16)]).unwrap();
        assert_relative_eq!(grid.total_volume(), std::f64::consts::TAU, epsilon = 1e-12);
        assert_eq!(grid.iter().count(), 16);
    }

    #[test]
    fn test_build_validates() {
        let x: Space = EuclideanSpace::gaussian("x", 1.0).unwrap().into();
        assert!(matches!(
            Grid::build(&x, &[]),
            Err(Error::DimensionMismatch { .. })
        ));
        assert!(Grid::build(&x, &[AxisSpec::All]).is_err());

        let grid = Grid::build(&x, &[AxisSpec::Linear { start: 0.0, stop: 1.0, count: 3 }]).unwrap();
        assert!(grid.check_space(&x).is_ok());
        let y: Space = EuclideanSpace::gaussian("y", 1.0).unwrap().into();
        assert!(grid.check_space(&y).is_err());
    }
}
