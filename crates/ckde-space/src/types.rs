//! Core types describing dimensions and grid axes

use serde::{Deserialize, Serialize};
use std::fmt;

/// Topology of a single dimension
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Topology {
    /// Unbounded real line
    Linear,
    /// Periodic coordinate
    Circular { period: f64 },
    /// Unordered set of labels, coordinates are label indices
    Categorical { cardinality: usize },
    /// Discrete alphabet embedded through a distance lookup table
    Encoded { cardinality: usize },
}

impl Topology {
    /// Whether the dimension carries a smoothing bandwidth
    pub fn is_smoothed(&self) -> bool {
        !matches!(self, Self::Categorical { .. })
    }
}

/// Name and topology of one dimension
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionSpec {
    pub name: String,
    pub topology: Topology,
}

impl DimensionSpec {
    pub fn new(name: impl Into<String>, topology: Topology) -> Self {
        Self {
            name: name.into(),
            topology,
        }
    }
}

impl fmt::Display for DimensionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.topology {
            Topology::Linear => write!(f, "{} (linear)", self.name),
            Topology::Circular { period } => write!(f, "{} (circular, period={period:.3})", self.name),
            Topology::Categorical { cardinality } => {
                write!(f, "{} (categorical, n={cardinality})", self.name)
            }
            Topology::Encoded { cardinality } => write!(f, "{} (encoded, n={cardinality})", self.name),
        }
    }
}

/// How a single grid axis is laid out
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisSpec {
    /// `count` evenly spaced points from `start` to `stop` inclusive (linear dimensions)
    Linear { start: f64, stop: f64, count: usize },
    /// Points `start, start + step, ...` not exceeding `stop` (linear dimensions)
    Step { start: f64, stop: f64, step: f64 },
    /// `n` evenly spaced points over one period starting at zero (circular dimensions)
    Count(usize),
    /// Every `k`-th entry of the alphabet starting at index zero (encoded dimensions)
    Stride(usize),
    /// Every category or alphabet entry exactly once (categorical and encoded dimensions)
    All,
    /// Explicit coordinates, any topology
    Values(Vec<f64>),
}

/// Coordinates and cell widths of one grid axis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    pub values: Vec<f64>,
    pub widths: Vec<f64>,
}

impl Axis {
    pub fn new(values: Vec<f64>, widths: Vec<f64>) -> Self {
        debug_assert_eq!(values.len(), widths.len());
        Self { values, widths }
    }

    /// Axis with a constant cell width
    pub fn uniform(values: Vec<f64>, width: f64) -> Self {
        let widths = vec![width; values.len()];
        Self { values, widths }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Cell widths for sorted, non-periodic coordinates: half the distance to
/// each neighbour, with edge cells mirroring their single neighbour gap.
pub(crate) fn midpoint_widths(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    match n {
        0 => Vec::new(),
        1 => vec![1.0],
        _ => (0..n)
            .map(|i| {
                if i == 0 {
                    values[1] - values[0]
                } else if i == n - 1 {
                    values[n - 1] - values[n - 2]
                } else {
                    0.5 * (values[i + 1] - values[i - 1])
                }
            })
            .collect(),
    }
}
