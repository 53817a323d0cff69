//! Mixed-topology spaces and evaluation grids
//!
//! A [`Space`] describes how distances and kernel contributions are
//! computed along each dimension. The closed set of kinds is:
//!
//! - [`EuclideanSpace`]: real-valued dimensions with a Gaussian,
//!   Epanechnikov or box kernel
//! - [`CircularSpace`]: a periodic dimension with a von Mises kernel
//! - [`CategoricalSpace`]: labels with an indicator kernel
//! - [`EncodedSpace`]: a discrete alphabet with a squared-distance table
//! - [`MultiSpace`]: the Cartesian product of the above
//!
//! A [`Grid`] discretizes a space for evaluation and decoding.
//!
//! # Example
//!
//! ```rust
//! use ckde_space::{AxisSpec, CircularSpace, EuclideanSpace, Grid, Space, SpaceMetric};
//!
//! let position: Space = EuclideanSpace::gaussian("position", 5.0).unwrap().into();
//! let heading: Space = CircularSpace::new("heading", 4.0).unwrap().into();
//! let space = position.merge_into_product(&[heading]).unwrap();
//! assert_eq!(space.ndim(), 2);
//!
//! let grid = Grid::build(
//!     &space,
//!     &[
//!         AxisSpec::Linear { start: 0.0, stop: 100.0, count: 51 },
//!         AxisSpec::Count(8),
//!     ],
//! )
//! .unwrap();
//! assert_eq!(grid.len(), 51 * 8);
//! ```

pub mod categorical;
pub mod circular;
pub mod encoded;
pub mod euclidean;
pub mod grid;
pub mod multi;
pub mod space;
pub mod traits;
pub mod types;

pub use categorical::CategoricalSpace;
pub use circular::CircularSpace;
pub use encoded::EncodedSpace;
pub use euclidean::EuclideanSpace;
pub use grid::Grid;
pub use multi::MultiSpace;
pub use space::Space;
pub use traits::SpaceMetric;
pub use types::{Axis, AxisSpec, DimensionSpec, Topology};

pub use ckde_core::Result;

/// Reject duplicated dimension names or labels
pub(crate) fn check_unique_names(names: &[String]) -> Result<()> {
    for (i, name) in names.iter().enumerate() {
        if names[..i].contains(name) {
            return Err(ckde_core::Error::invalid_parameter(format!(
                "duplicate name '{name}'"
            )));
        }
    }
    Ok(())
}

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        AxisSpec, CategoricalSpace, CircularSpace, EncodedSpace, EuclideanSpace, Grid, Space,
        SpaceMetric,
    };
}
