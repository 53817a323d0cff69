//! Marginal views of a mixture

use crate::mixture::Mixture;
use crate::traits::Density;
use crate::types::Normalization;
use ckde_core::{Error, Result};
use ckde_space::{Grid, Space, SpaceMetric};
use tracing::instrument;

/// A read-only view of a [`Mixture`] marginalized onto a subset of its
/// dimensions.
///
/// Every kernel is a product of normalized one-dimensional factors, so
/// integrating out a dimension drops its factor. The view stores only
/// the retained dimension indices; evaluation reads the parent's
/// components directly.
#[derive(Debug, Clone)]
pub struct PartialMixture<'a> {
    mixture: &'a Mixture,
    dims: Vec<usize>,
}

impl<'a> PartialMixture<'a> {
    pub(crate) fn new(mixture: &'a Mixture, dims: Vec<usize>) -> Result<Self> {
        mixture.space().check_selection(&dims)?;
        Ok(Self { mixture, dims })
    }

    pub fn mixture(&self) -> &'a Mixture {
        self.mixture
    }

    /// Retained dimensions, in increasing order
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Dimensions integrated out
    pub fn excluded_dims(&self) -> Vec<usize> {
        (0..self.mixture.space().ndim())
            .filter(|d| !self.dims.contains(d))
            .collect()
    }

    pub fn dimension_names(&self) -> Vec<String> {
        self.dims
            .iter()
            .map(|&d| self.mixture.space().dimension(d).name)
            .collect()
    }

    /// The space spanned by the retained dimensions, for building grids
    pub fn subspace(&self) -> Result<Space> {
        self.mixture.space().subspace(&self.dims)
    }

    /// Joint density over `grid` (spanning the retained dimensions) with
    /// every excluded dimension held at the matching entry of `fixed`.
    #[instrument(skip(self, grid, fixed), fields(grid_len = grid.len()))]
    pub fn evaluate_conditional(
        &self,
        grid: &Grid,
        fixed: &[f64],
        normalization: Normalization,
    ) -> Result<Vec<f64>> {
        let excluded = self.excluded_dims();
        if excluded.is_empty() && !fixed.is_empty() {
            return Err(Error::dimension_mismatch(0, fixed.len(), "conditioning point"));
        }
        self.mixture
            .evaluate_grid_conditional(grid, &self.dims, &excluded, fixed, normalization)
    }
}

impl Density for PartialMixture<'_> {
    fn ndim(&self) -> usize {
        self.dims.len()
    }

    fn evaluate_with<P: AsRef<[f64]> + Sync>(
        &self,
        points: &[P],
        normalization: Normalization,
    ) -> Result<Vec<f64>> {
        self.mixture
            .evaluate_points(Some(&self.dims), points, normalization)
    }

    fn evaluate_grid_with(&self, grid: &Grid, normalization: Normalization) -> Result<Vec<f64>> {
        self.mixture
            .evaluate_grid_conditional(grid, &self.dims, &[], &[], normalization)
    }
}
