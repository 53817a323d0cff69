//! Closest-pair compression of component lists
//!
//! Every component caches its cheapest merge partner. Finding the
//! closest pair is a scan over those entries, and a merge only rescans
//! the components whose cached partner took part in it, so one merge
//! costs O(n) pair evaluations in the common case and memory stays
//! linear in the number of components. Ties resolve to the
//! lexicographically lowest index pair.

use crate::component::Component;
use crate::types::CompressionReport;
use ckde_space::Space;
use ordered_float::OrderedFloat;
use tracing::{debug, trace};

const NO_PARTNER: usize = usize::MAX;

/// Symmetric merge cost of two components: the mean of the Mahalanobis
/// distances measured from each side
#[inline]
pub fn pair_cost(space: &Space, a: &Component, b: &Component) -> f64 {
    // components are validated against the space on entry
    let Ok(ab) = space.mahalanobis_squared(&a.location, &a.bandwidth, &b.location) else {
        return f64::INFINITY;
    };
    if ab == f64::INFINITY {
        return ab;
    }
    let ba = space
        .mahalanobis_squared(&b.location, &b.bandwidth, &a.location)
        .unwrap_or(f64::INFINITY);
    0.5 * (ab + ba)
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Neighbor {
    cost: f64,
    partner: usize,
}

impl Neighbor {
    const NONE: Neighbor = Neighbor {
        cost: f64::INFINITY,
        partner: NO_PARTNER,
    };

    /// Whether a finite `cost` to `partner` beats the cached entry
    #[inline]
    fn improved_by(&self, cost: f64, partner: usize) -> bool {
        cost.is_finite() && (cost < self.cost || (cost == self.cost && partner < self.partner))
    }
}

/// Cheapest merge partner of every component, kept in step with the
/// component list by the mixture that owns both.
#[derive(Debug, Clone, Default)]
pub(crate) struct NeighborCache {
    entries: Vec<Neighbor>,
}

impl NeighborCache {
    /// Full rebuild, O(n²) pair evaluations
    pub(crate) fn build(space: &Space, components: &[Component]) -> Self {
        let entries = (0..components.len())
            .map(|k| scan(space, components, k))
            .collect();
        Self { entries }
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    /// Whether the cache tracks exactly `components`; a rebuild is
    /// needed otherwise
    pub(crate) fn tracks(&self, components: &[Component]) -> bool {
        self.entries.len() == components.len()
    }

    /// Register the component just appended to `components`
    pub(crate) fn pushed(&mut self, space: &Space, components: &[Component]) {
        let new = components.len() - 1;
        debug_assert_eq!(self.entries.len(), new);
        for k in 0..new {
            self.offer(space, components, k, new);
        }
        self.entries.push(scan(space, components, new));
    }

    /// Refresh after component `i` changed in place
    pub(crate) fn changed(&mut self, space: &Space, components: &[Component], i: usize) {
        for k in 0..self.entries.len() {
            if k == i || self.entries[k].partner == i {
                self.entries[k] = scan(space, components, k);
            } else {
                self.offer(space, components, k, i);
            }
        }
    }

    /// Refresh after component `j` was merged into `i < j` and removed
    fn merged(&mut self, space: &Space, components: &[Component], i: usize, j: usize) {
        self.entries.remove(j);
        for k in 0..self.entries.len() {
            let partner = self.entries[k].partner;
            if k == i || partner == i || partner == j {
                self.entries[k] = scan(space, components, k);
                continue;
            }
            if partner != NO_PARTNER && partner > j {
                self.entries[k].partner = partner - 1;
            }
            self.offer(space, components, k, i);
        }
    }

    /// Closest finite pair as `(i, j)` with `i < j`
    pub(crate) fn closest(&self) -> Option<(usize, usize)> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.cost.is_finite())
            .min_by_key(|&(k, e)| (OrderedFloat(e.cost), k))
            .map(|(k, e)| (k.min(e.partner), k.max(e.partner)))
    }

    #[inline]
    fn offer(&mut self, space: &Space, components: &[Component], k: usize, other: usize) {
        let cost = pair_cost(space, &components[k], &components[other]);
        if self.entries[k].improved_by(cost, other) {
            self.entries[k] = Neighbor { cost, partner: other };
        }
    }
}

/// Cheapest partner of component `k`, lowest index on ties
fn scan(space: &Space, components: &[Component], k: usize) -> Neighbor {
    let mut best = Neighbor::NONE;
    for (m, other) in components.iter().enumerate() {
        if m == k {
            continue;
        }
        let cost = pair_cost(space, &components[k], other);
        if best.improved_by(cost, m) {
            best = Neighbor { cost, partner: m };
        }
    }
    best
}

/// Merge the closest pair in place. Returns false when no finite pair
/// is left.
pub(crate) fn merge_closest(space: &Space, components: &mut Vec<Component>, cache: &mut NeighborCache) -> bool {
    let Some((i, j)) = cache.closest() else {
        return false;
    };
    trace!("Merging components {} and {}", i, j);
    let absorbed = components.remove(j);
    components[i].absorb(space, &absorbed);
    cache.merged(space, components, i, j);
    true
}

/// Merge closest pairs in place until at most `target` components remain
pub(crate) fn compress_in_place(
    space: &Space,
    components: &mut Vec<Component>,
    cache: &mut NeighborCache,
    target: usize,
) -> CompressionReport {
    let mut report = CompressionReport {
        components_before: components.len(),
        components_after: components.len(),
        merges: 0,
        stopped_early: false,
    };
    while components.len() > target {
        if !merge_closest(space, components, cache) {
            report.stopped_early = true;
            debug!(
                "Compression stopped at {} components, no finite pair left (target {})",
                components.len(),
                target
            );
            break;
        }
        report.merges += 1;
    }
    report.components_after = components.len();
    report
}

/// Merge closest pairs of `components` until at most `target` remain.
///
/// The input is left untouched; the merged list is returned in its
/// original relative order, the survivor of each merge keeping the lower
/// index. Merging stops early if only infinitely distant pairs remain.
pub fn compress_components(
    space: &Space,
    components: &[Component],
    target: usize,
) -> (Vec<Component>, CompressionReport) {
    let mut merged = components.to_vec();
    if target >= merged.len() {
        let report = CompressionReport {
            components_before: merged.len(),
            components_after: merged.len(),
            merges: 0,
            stopped_early: false,
        };
        return (merged, report);
    }
    let mut cache = NeighborCache::build(space, &merged);
    let report = compress_in_place(space, &mut merged, &mut cache, target);
    (merged, report)
}
