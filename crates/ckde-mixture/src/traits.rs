//! Density evaluation shared by full mixtures and marginal views

use crate::types::Normalization;
use ckde_core::Result;
use ckde_space::Grid;

/// A density that can be evaluated at points and over grids
pub trait Density {
    /// Number of coordinates per query point
    fn ndim(&self) -> usize;

    /// Evaluate at each of `points`
    fn evaluate_with<P: AsRef<[f64]> + Sync>(
        &self,
        points: &[P],
        normalization: Normalization,
    ) -> Result<Vec<f64>>;

    /// Evaluate at every point of `grid`, in grid order.
    ///
    /// Equal to [`Density::evaluate_with`] applied to the grid points.
    fn evaluate_grid_with(&self, grid: &Grid, normalization: Normalization) -> Result<Vec<f64>>;

    /// Normalized density at each of `points`
    fn evaluate<P: AsRef<[f64]> + Sync>(&self, points: &[P]) -> Result<Vec<f64>> {
        self.evaluate_with(points, Normalization::Density)
    }

    /// Normalized density over `grid`
    fn evaluate_grid(&self, grid: &Grid) -> Result<Vec<f64>> {
        self.evaluate_grid_with(grid, Normalization::Density)
    }

    /// Natural log of the normalized density; negative infinity where it vanishes
    fn log_evaluate<P: AsRef<[f64]> + Sync>(&self, points: &[P]) -> Result<Vec<f64>> {
        Ok(self.evaluate(points)?.into_iter().map(f64::ln).collect())
    }

    /// Normalized density at a single point
    fn evaluate_point(&self, point: &[f64]) -> Result<f64> {
        Ok(self.evaluate(&[point])?[0])
    }
}
