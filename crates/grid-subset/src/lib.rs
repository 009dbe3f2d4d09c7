//! Polygon Subsetting for SGRID Staggered Grids
//!
//! This crate cuts datasets laid out on SGRID staggered grids (Arakawa C
//! and friends) down to the region covering a polygon, keeping every
//! staggered location consistent:
//!
//! - **Topology resolution**: dimension pairs, padding and coordinates for
//!   the node, edge1, edge2 and face locations, read from the grid
//!   topology variable's attributes
//! - **Padding propagation**: a node index range is carried to every other
//!   location according to its padding policy
//! - **Reusable selectors**: the polygon is classified once; the resulting
//!   index ranges are cached, serialized and applied to any dataset on the
//!   same grid
//!
//! # Architecture
//!
//! ```text
//! subset_by_polygon(dataset, polygon)
//!      │
//!      ├─► GridTopology::from_dataset (all four locations)
//!      │
//!      ├─► SelectorCache lookup by content id
//!      │         │
//!      │         ├─► Hit and fits the grid: reuse
//!      │         │
//!      │         └─► Miss: classify node points, propagate padding
//!      │
//!      └─► Selector::select (one isel over every staggered dimension)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use grid_subset::{GridSubsetter, Polygon, SubsetConfig};
//!
//! let subsetter = GridSubsetter::new(SubsetConfig::default())?;
//! let polygon = Polygon::new(vec![(6.5, 37.5), (7.0, 37.5), (7.0, 38.0), (6.5, 38.0)])?;
//! let region = subsetter.subset_by_polygon(&dataset, &polygon)?;
//! ```

pub mod cache;
pub mod config;
pub mod dataset;
pub mod error;
pub mod padding;
pub mod polygon;
pub mod selector;
pub mod subset;
pub mod topology;
pub mod types;

// Re-export commonly used types at crate root
pub use cache::{SelectorCache, SelectorKey};
pub use config::SubsetConfig;
pub use dataset::{ArrayData, Attributes, CoordArray, Dataset, Variable, GRID_TOPOLOGY_ROLE};
pub use error::{Result, SubsetError};
pub use padding::{propagate, propagate_axis, IndexRange};
pub use polygon::{classify, Classification, Polygon};
pub use selector::{
    LocationSelection, PolygonSelector, Selectable, Selector, VariableNameSelector,
};
pub use subset::{subset_by_polygon, subset_by_variable_names, GridSubsetter};
pub use topology::{resolve, GridTopology, Location, LocationDescriptor, Padding};
pub use types::{BoundingBox, CacheStats};
