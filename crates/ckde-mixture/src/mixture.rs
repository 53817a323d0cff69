//! Compressed kernel mixtures

use crate::builder::MixtureBuilder;
use crate::component::Component;
use crate::compress::{compress_in_place, merge_closest, NeighborCache};
use crate::partial::PartialMixture;
use crate::traits::Density;
use crate::types::{BandwidthPolicy, CompressionReport, MixtureConfig, Normalization};
use ckde_core::{Error, Result};
use ckde_space::{Grid, Space, SpaceMetric};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;
use std::sync::Arc;
use tracing::{debug, instrument};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// A weighted collection of kernel components over one space.
///
/// The sum of component weights always equals [`Mixture::total_weight`]:
/// ingestion adds the sample weight, compression merges pairs into a
/// component carrying the sum of their weights, and attenuation scales
/// both sides alike.
///
/// With a compression target set, the component count never exceeds
/// it after a sample is ingested, batches included.
///
/// Mutation needs `&mut self`, so ingestion and compression are
/// exclusive with evaluation on the same instance. Share a mixture
/// across threads behind an `RwLock` when readers and a writer coexist.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "MixtureRecord")]
pub struct Mixture {
    space: Arc<Space>,
    config: MixtureConfig,
    components: Vec<Component>,
    total_weight: f64,
    sample_count: u64,
    #[serde(skip)]
    neighbors: NeighborCache,
}

/// Serialized form of a [`Mixture`], validated on the way in
#[derive(Deserialize)]
struct MixtureRecord {
    space: Arc<Space>,
    config: MixtureConfig,
    components: Vec<Component>,
    total_weight: f64,
    sample_count: u64,
}

impl TryFrom<MixtureRecord> for Mixture {
    type Error = Error;

    fn try_from(record: MixtureRecord) -> Result<Self> {
        let mut mixture = Mixture::from_components(
            record.space,
            record.config,
            record.components,
            record.sample_count,
        )?;
        let sum = mixture.total_weight;
        if !record.total_weight.is_finite() || (record.total_weight - sum).abs() > 1e-9 * sum.max(1.0) {
            return Err(Error::InvalidInput(format!(
                "total weight {} does not match the component weights ({sum})",
                record.total_weight
            )));
        }
        mixture.total_weight = record.total_weight;
        Ok(mixture)
    }
}

/// Per-component kernel factors along each grid axis
struct ComponentTable {
    weight: f64,
    leading: Vec<f64>,
    rest: Vec<Vec<(usize, f64)>>,
}

impl Mixture {
    /// Empty mixture with the default configuration
    pub fn new(space: impl Into<Arc<Space>>) -> Self {
        Self {
            space: space.into(),
            config: MixtureConfig::default(),
            components: Vec::new(),
            total_weight: 0.0,
            sample_count: 0,
            neighbors: NeighborCache::default(),
        }
    }

    /// Empty mixture with an explicit configuration
    pub fn with_config(space: impl Into<Arc<Space>>, config: MixtureConfig) -> Result<Self> {
        validate_config(&config)?;
        Ok(Self {
            config,
            ..Self::new(space)
        })
    }

    pub fn builder(space: impl Into<Arc<Space>>) -> MixtureBuilder {
        MixtureBuilder::new(space)
    }

    /// Rebuild a mixture from stored components.
    ///
    /// Every component is validated against `space`; the total weight is
    /// the sum of the component weights.
    pub fn from_components(
        space: impl Into<Arc<Space>>,
        config: MixtureConfig,
        components: Vec<Component>,
        sample_count: u64,
    ) -> Result<Self> {
        let space = space.into();
        validate_config(&config)?;
        for c in &components {
            c.validate(&space)?;
        }
        let total_weight = components.iter().map(|c| c.weight).sum();
        Ok(Self {
            space,
            config,
            components,
            total_weight,
            sample_count,
            neighbors: NeighborCache::default(),
        })
    }

    pub fn space(&self) -> &Space {
        &self.space
    }

    /// Shared handle to the space
    pub fn space_arc(&self) -> Arc<Space> {
        Arc::clone(&self.space)
    }

    pub fn config(&self) -> &MixtureConfig {
        &self.config
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Number of components
    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Accumulated sample mass
    pub fn total_weight(&self) -> f64 {
        self.total_weight
    }

    /// Number of samples ingested since creation or the last [`Mixture::clear`]
    pub fn sample_count(&self) -> u64 {
        self.sample_count
    }

    /// Remove all components
    pub fn clear(&mut self) {
        self.components.clear();
        self.neighbors.clear();
        self.total_weight = 0.0;
        self.sample_count = 0;
    }

    /// Add one sample of unit weight
    pub fn add_sample(&mut self, point: &[f64]) -> Result<()> {
        self.add_weighted_samples(&[point], &[1.0])
    }

    /// Add one sample with an explicit weight
    pub fn add_weighted_sample(&mut self, point: &[f64], weight: f64) -> Result<()> {
        self.add_weighted_samples(&[point], &[weight])
    }

    /// Add a batch of unit-weight samples
    pub fn add_samples<P: AsRef<[f64]>>(&mut self, points: &[P]) -> Result<()> {
        let weights = vec![1.0; points.len()];
        self.add_weighted_samples(points, &weights)
    }

    /// Add a batch of weighted samples.
    ///
    /// The whole batch is validated before any state changes. The
    /// compression target is enforced after every sample, so the
    /// component count stays bounded while the batch is ingested.
    pub fn add_weighted_samples<P: AsRef<[f64]>>(&mut self, points: &[P], weights: &[f64]) -> Result<()> {
        Error::check_dimension(points.len(), weights.len(), "sample weights")?;
        for (p, &w) in points.iter().zip(weights) {
            self.space.validate_point(p.as_ref())?;
            if !w.is_finite() || w <= 0.0 {
                return Err(Error::invalid_parameter(format!(
                    "sample weight must be positive and finite, got {w}"
                )));
            }
        }
        if points.is_empty() {
            return Ok(());
        }

        self.attenuate();
        for (p, &w) in points.iter().zip(weights) {
            self.ingest(p.as_ref(), w)?;
        }
        Ok(())
    }

    /// Add a batch of unit-weight samples in random order.
    ///
    /// With a merge threshold the result depends on insertion order;
    /// shuffling avoids systematic drift for temporally correlated input.
    pub fn merge_samples<P: AsRef<[f64]>, R: Rng + ?Sized>(&mut self, points: &[P], rng: &mut R) -> Result<()> {
        let mut order: Vec<usize> = (0..points.len()).collect();
        order.shuffle(rng);
        let shuffled: Vec<&[f64]> = order.iter().map(|&i| points[i].as_ref()).collect();
        self.add_samples(&shuffled)
    }

    /// Merge closest component pairs until at most `target` remain.
    ///
    /// A target at or above the current count is a no-op.
    #[instrument(skip(self), fields(components = self.components.len()))]
    pub fn compress(&mut self, target: usize) -> Result<CompressionReport> {
        if target == 0 && !self.components.is_empty() {
            return Err(Error::invalid_parameter("compression target must be at least 1"));
        }
        if target < self.components.len() {
            self.sync_neighbors();
        }
        let report = compress_in_place(&self.space, &mut self.components, &mut self.neighbors, target);
        debug!(
            "Compressed {} -> {} components ({} merges)",
            report.components_before, report.components_after, report.merges
        );
        Ok(report)
    }

    /// View of the mixture marginalized onto the dimensions `dims`
    pub fn marginalize(&self, dims: &[usize]) -> Result<PartialMixture<'_>> {
        PartialMixture::new(self, dims.to_vec())
    }

    /// View of the mixture marginalized onto the named dimensions
    pub fn marginalize_names<S: AsRef<str>>(&self, names: &[S]) -> Result<PartialMixture<'_>> {
        let dims = self.space.select(names)?;
        PartialMixture::new(self, dims)
    }

    /// Joint density over a grid of the dimensions `grid_dims`, with the
    /// dimensions `fixed_dims` held at `fixed_point`.
    ///
    /// Dimensions in neither set are integrated out.
    pub fn evaluate_grid_conditional(
        &self,
        grid: &Grid,
        grid_dims: &[usize],
        fixed_dims: &[usize],
        fixed_point: &[f64],
        normalization: Normalization,
    ) -> Result<Vec<f64>> {
        self.check_grid_dims(grid, grid_dims)?;
        if !fixed_dims.is_empty() {
            self.space.check_selection(fixed_dims)?;
        }
        Error::check_dimension(fixed_dims.len(), fixed_point.len(), "conditioning point")?;
        if fixed_dims.iter().any(|d| grid_dims.contains(d)) {
            return Err(Error::invalid_parameter(
                "grid and conditioning dimensions overlap",
            ));
        }

        let fixed = (!fixed_dims.is_empty()).then_some((fixed_dims, fixed_point));
        let mut values = self.grid_sum(grid, grid_dims, fixed)?;
        self.finish(&mut values, normalization)?;
        Ok(values)
    }

    pub(crate) fn check_grid_dims(&self, grid: &Grid, dims: &[usize]) -> Result<()> {
        self.space.check_selection(dims)?;
        Error::check_dimension(dims.len(), grid.ndim(), "grid dimensions")?;
        for (k, &d) in dims.iter().enumerate() {
            let name = self.space.dimension(d).name;
            if grid.dimension_names()[k] != name {
                return Err(Error::InvalidInput(format!(
                    "grid dimension '{}' does not match mixture dimension '{name}'",
                    grid.dimension_names()[k]
                )));
            }
        }
        Ok(())
    }

    /// Unnormalized mixture mass at `point`, over all dimensions or the
    /// selected ones
    #[inline]
    pub(crate) fn mass_at(&self, dims: Option<&[usize]>, point: &[f64]) -> Result<f64> {
        let space = self.space.as_ref();
        let mut total = 0.0;
        for c in &self.components {
            let k = match dims {
                Some(dims) => space.partial_kernel(dims, &c.location, &c.bandwidth, point)?,
                None => space.kernel(&c.location, &c.bandwidth, point)?,
            };
            total += c.weight * k;
        }
        Ok(total)
    }

    pub(crate) fn evaluate_points<P: AsRef<[f64]> + Sync>(
        &self,
        dims: Option<&[usize]>,
        points: &[P],
        normalization: Normalization,
    ) -> Result<Vec<f64>> {
        let ndim = dims.map_or(self.space.ndim(), <[usize]>::len);
        for p in points {
            Error::check_dimension(ndim, p.as_ref().len(), "evaluation point")?;
        }

        #[cfg(feature = "parallel")]
        let mut values = points
            .par_iter()
            .map(|p| self.mass_at(dims, p.as_ref()))
            .collect::<Result<Vec<f64>>>()?;
        #[cfg(not(feature = "parallel"))]
        let mut values = points
            .iter()
            .map(|p| self.mass_at(dims, p.as_ref()))
            .collect::<Result<Vec<f64>>>()?;

        self.finish(&mut values, normalization)?;
        Ok(values)
    }

    /// Sum of weighted kernels over every grid point.
    ///
    /// Kernels are separable, so factors are tabulated once per axis and
    /// component; components with no support on some axis are skipped,
    /// as are grid points where any factor vanishes. Products are formed
    /// in dimension order so values match point-wise evaluation exactly.
    pub(crate) fn grid_sum(
        &self,
        grid: &Grid,
        grid_dims: &[usize],
        fixed: Option<(&[usize], &[f64])>,
    ) -> Result<Vec<f64>> {
        let axes = grid.axes();
        let len = grid.len();
        let row_len = len / axes[0].len();

        let mut tables = Vec::with_capacity(self.components.len());
        for c in &self.components {
            if let Some(table) = self.component_table(c, grid, grid_dims, fixed)? {
                tables.push(table);
            }
        }

        // row-major strides of the trailing axes within one row
        let mut strides = vec![1usize; axes.len().saturating_sub(1)];
        for k in (0..strides.len().saturating_sub(1)).rev() {
            strides[k] = strides[k + 1] * axes[k + 2].len();
        }

        let fill = |(i0, row): (usize, &mut [f64])| {
            for table in &tables {
                let f0 = table.leading[i0];
                if f0 == 0.0 {
                    continue;
                }
                accumulate_row(row, table, f0, &strides);
            }
        };

        let mut values = vec![0.0; len];
        #[cfg(feature = "parallel")]
        values.par_chunks_mut(row_len).enumerate().for_each(fill);
        #[cfg(not(feature = "parallel"))]
        values.chunks_mut(row_len).enumerate().for_each(fill);
        Ok(values)
    }

    /// Kernel factors of one component along each grid axis, `None`
    /// when the component has no support on the grid
    fn component_table(
        &self,
        c: &Component,
        grid: &Grid,
        grid_dims: &[usize],
        fixed: Option<(&[usize], &[f64])>,
    ) -> Result<Option<ComponentTable>> {
        let space = self.space.as_ref();
        let axes = grid.axes();
        let mut weight = c.weight;
        if let Some((dims, point)) = fixed {
            let f = space.partial_kernel(dims, &c.location, &c.bandwidth, point)?;
            if f == 0.0 {
                return Ok(None);
            }
            weight *= f;
        }

        let d0 = grid_dims[0];
        let leading: Vec<f64> = axes[0]
            .values
            .iter()
            .map(|&x| space.factor(d0, c.location[d0], c.bandwidth[d0], x))
            .collect();
        if leading.iter().all(|&f| f == 0.0) {
            return Ok(None);
        }

        let mut rest = Vec::with_capacity(axes.len() - 1);
        for (axis, &d) in axes.iter().zip(grid_dims).skip(1) {
            let nonzero: Vec<(usize, f64)> = axis
                .values
                .iter()
                .enumerate()
                .filter_map(|(i, &x)| {
                    let f = space.factor(d, c.location[d], c.bandwidth[d], x);
                    (f != 0.0).then_some((i, f))
                })
                .collect();
            if nonzero.is_empty() {
                return Ok(None);
            }
            rest.push(nonzero);
        }

        Ok(Some(ComponentTable {
            weight,
            leading,
            rest,
        }))
    }

    fn finish(&self, values: &mut [f64], normalization: Normalization) -> Result<()> {
        if normalization == Normalization::Density {
            if self.total_weight > 0.0 {
                for v in values.iter_mut() {
                    *v /= self.total_weight;
                }
            } else {
                values.iter_mut().for_each(|v| *v = 0.0);
            }
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(Error::non_finite("mixture evaluation"));
        }
        Ok(())
    }

    fn new_bandwidth(&self) -> Vec<f64> {
        let mut bandwidth = self.space.default_bandwidth();
        if self.config.bandwidth_policy == BandwidthPolicy::Scott {
            let smoothed: Vec<bool> = (0..self.space.ndim())
                .map(|d| self.space.dimension(d).topology.is_smoothed())
                .collect();
            let d = smoothed.iter().filter(|&&s| s).count() as f64;
            let factor = ((self.sample_count + 1) as f64).powf(-1.0 / (d + 4.0));
            for (dim, bw) in bandwidth.iter_mut().enumerate() {
                if smoothed[dim] {
                    *bw = self.space.scale_bandwidth(dim, *bw, factor);
                }
            }
        }
        bandwidth
    }

    fn attenuate(&mut self) {
        let a = self.config.attenuation;
        if a < 1.0 && !self.components.is_empty() {
            for c in &mut self.components {
                c.weight *= a;
            }
            self.total_weight *= a;
        }
    }

    /// Index of the component closest to `point` if within the merge threshold
    fn nearest_within_threshold(&self, point: &[f64]) -> Result<Option<usize>> {
        let threshold = self.config.merge_threshold;
        if threshold <= 0.0 {
            return Ok(None);
        }
        let mut best: Option<(usize, f64)> = None;
        for (i, c) in self.components.iter().enumerate() {
            let d2 = self.space.mahalanobis_squared(&c.location, &c.bandwidth, point)?;
            if best.map_or(true, |(_, b)| d2 < b) {
                best = Some((i, d2));
            }
        }
        Ok(best
            .filter(|&(_, d2)| d2 < threshold * threshold)
            .map(|(i, _)| i))
    }

    /// Rebuild the partner cache if it no longer tracks the components
    fn sync_neighbors(&mut self) {
        if !self.neighbors.tracks(&self.components) {
            self.neighbors = NeighborCache::build(&self.space, &self.components);
        }
    }

    /// Add one validated sample, then merge down to the compression target
    fn ingest(&mut self, point: &[f64], weight: f64) -> Result<()> {
        let target = self.config.compression_target;
        if target.is_some() {
            self.sync_neighbors();
        } else {
            // nothing keeps the cache current without a target
            self.neighbors.clear();
        }

        let sample = Component::new(point.to_vec(), self.new_bandwidth(), weight);
        match self.nearest_within_threshold(point)? {
            Some(i) => {
                self.components[i].absorb(&self.space, &sample);
                if target.is_some() {
                    self.neighbors.changed(&self.space, &self.components, i);
                }
            }
            None => {
                self.components.push(sample);
                if target.is_some() {
                    self.neighbors.pushed(&self.space, &self.components);
                }
            }
        }
        self.total_weight += weight;
        self.sample_count += 1;

        if let Some(target) = target {
            while self.components.len() > target {
                if !merge_closest(&self.space, &mut self.components, &mut self.neighbors) {
                    break;
                }
            }
        }
        Ok(())
    }
}

/// Add one component's contribution to a grid row
fn accumulate_row(row: &mut [f64], table: &ComponentTable, f0: f64, strides: &[usize]) {
    let rest = &table.rest;
    if rest.is_empty() {
        row[0] += table.weight * f0;
        return;
    }

    let mut pos = vec![0usize; rest.len()];
    loop {
        let mut p = f0;
        let mut offset = 0;
        for (k, factors) in rest.iter().enumerate() {
            let (idx, f) = factors[pos[k]];
            p *= f;
            offset += idx * strides[k];
        }
        row[offset] += table.weight * p;

        // odometer over the non-zero entries, last axis fastest
        let mut k = rest.len();
        loop {
            if k == 0 {
                return;
            }
            k -= 1;
            pos[k] += 1;
            if pos[k] < rest[k].len() {
                break;
            }
            pos[k] = 0;
        }
    }
}

pub(crate) fn validate_config(config: &MixtureConfig) -> Result<()> {
    if !config.merge_threshold.is_finite() || config.merge_threshold < 0.0 {
        return Err(Error::invalid_parameter(format!(
            "merge threshold must be finite and non-negative, got {}",
            config.merge_threshold
        )));
    }
    if config.compression_target == Some(0) {
        return Err(Error::invalid_parameter("compression target must be at least 1"));
    }
    if !(config.attenuation > 0.0 && config.attenuation <= 1.0) {
        return Err(Error::invalid_parameter(format!(
            "attenuation must be in (0, 1], got {}",
            config.attenuation
        )));
    }
    Ok(())
}

impl Density for Mixture {
    fn ndim(&self) -> usize {
        self.space.ndim()
    }

    fn evaluate_with<P: AsRef<[f64]> + Sync>(
        &self,
        points: &[P],
        normalization: Normalization,
    ) -> Result<Vec<f64>> {
        self.evaluate_points(None, points, normalization)
    }

    #[instrument(skip(self, grid), fields(grid_len = grid.len(), components = self.components.len()))]
    fn evaluate_grid_with(&self, grid: &Grid, normalization: Normalization) -> Result<Vec<f64>> {
        grid.check_space(&self.space)?;
        let dims: Vec<usize> = (0..self.space.ndim()).collect();
        let mut values = self.grid_sum(grid, &dims, None)?;
        self.finish(&mut values, normalization)?;
        Ok(values)
    }
}
