//! Polygon selector: one bounding index range per staggered dimension.

use std::collections::BTreeMap;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use super::{content_digest, Selectable};
use crate::dataset::{CoordArray, Dataset};
use crate::error::{Result, SubsetError};
use crate::padding::{propagate, IndexRange};
use crate::polygon::{classify, Polygon};
use crate::topology::{GridTopology, Location, Padding};

/// Index ranges chosen for one staggered location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationSelection {
    pub location: Location,
    pub dims: [String; 2],
    /// Dimension sizes of the grid the selection was computed for.
    pub sizes: [usize; 2],
    /// Padding of each dimension when the selection was computed.
    pub padding: [Padding; 2],
    pub ranges: [IndexRange; 2],
}

/// Selects the part of a staggered grid covering a polygon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolygonSelector {
    name: String,
    polygon: Polygon,
    /// Extra node indices kept around the tight bounds.
    margin: usize,
    locations: Vec<LocationSelection>,
}

impl PolygonSelector {
    /// Label used when the caller does not give one.
    pub const DEFAULT_NAME: &'static str = "polygon";

    /// Build a selector from node coordinates and grid dimension sizes.
    ///
    /// `lon`/`lat` are the node location's coordinate arrays; `sizes` must
    /// hold every dimension named by `topology`.
    pub fn construct(
        name: impl Into<String>,
        polygon: Polygon,
        topology: &GridTopology,
        lon: &CoordArray,
        lat: &CoordArray,
        sizes: &BTreeMap<String, usize>,
        margin: usize,
    ) -> Result<Self> {
        let node = topology.node();
        let classification = classify(lon, lat, &polygon, margin)?;

        let mut reference = [IndexRange::new(0, 0); 2];
        for (axis, dim) in node.dims.iter().enumerate() {
            reference[axis] = classification.bound(dim).ok_or_else(|| {
                SubsetError::topology(
                    Location::Node.as_str(),
                    format!(
                        "coordinate '{}' is laid out over {:?}, not over node dimension '{}'",
                        node.coords[0], classification.dims, dim
                    ),
                )
            })?;
        }

        let mut locations = Vec::with_capacity(Location::ALL.len());
        let mut by_dim: BTreeMap<&str, IndexRange> = BTreeMap::new();
        for descriptor in topology.iter() {
            let ranges = propagate(&reference, descriptor, sizes)?;
            for (dim, range) in descriptor.dims.iter().zip(ranges) {
                if let Some(previous) = by_dim.insert(dim, range) {
                    if previous != range {
                        return Err(SubsetError::topology(
                            descriptor.location.as_str(),
                            format!(
                                "dimension '{}' is shared with another location but selects {} there and {} here",
                                dim, previous, range
                            ),
                        ));
                    }
                }
            }
            let dim_sizes = [
                sizes.get(&descriptor.dims[0]).copied().unwrap_or_default(),
                sizes.get(&descriptor.dims[1]).copied().unwrap_or_default(),
            ];
            locations.push(LocationSelection {
                location: descriptor.location,
                dims: descriptor.dims.clone(),
                sizes: dim_sizes,
                padding: [
                    descriptor.padding_for(&descriptor.dims[0]),
                    descriptor.padding_for(&descriptor.dims[1]),
                ],
                ranges,
            });
        }

        Ok(Self {
            name: name.into(),
            polygon,
            margin,
            locations,
        })
    }

    /// Build a selector from a dataset's node coordinates and sizes.
    pub fn from_dataset(
        name: impl Into<String>,
        polygon: Polygon,
        topology: &GridTopology,
        ds: &Dataset,
        margin: usize,
    ) -> Result<Self> {
        let node = topology.node();
        let lon = ds.coords_2d(&node.coords[0])?;
        let lat = ds.coords_2d(&node.coords[1])?;
        Self::construct(name, polygon, topology, &lon, &lat, &ds.sizes(), margin)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn polygon(&self) -> &Polygon {
        &self.polygon
    }

    pub fn margin(&self) -> usize {
        self.margin
    }

    pub fn locations(&self) -> &[LocationSelection] {
        &self.locations
    }

    /// Selection for one location.
    pub fn location(&self, location: Location) -> Option<&LocationSelection> {
        self.locations.iter().find(|s| s.location == location)
    }

    /// Content identifier of the polygon criterion.
    pub fn content_id(&self) -> String {
        content_digest(&self.polygon.canonical_bytes())
    }

    /// Slice ranges keyed by dimension name.
    pub fn ranges(&self) -> BTreeMap<String, Range<usize>> {
        self.locations
            .iter()
            .flat_map(|s| {
                s.dims
                    .iter()
                    .cloned()
                    .zip(s.ranges.iter().map(IndexRange::as_range))
            })
            .collect()
    }

    /// Require every selected dimension to exist in `ds` with the size the
    /// selector was built for, and the dataset's grid topology (when it has
    /// one) to match the one the selector was built from.
    pub fn check_compatible(&self, ds: &Dataset) -> Result<()> {
        let sizes = ds.sizes();
        for selection in &self.locations {
            for (dim, &expected) in selection.dims.iter().zip(&selection.sizes) {
                let actual = sizes.get(dim).copied().unwrap_or(0);
                if actual != expected {
                    return Err(SubsetError::TopologyMismatch {
                        dim: dim.clone(),
                        expected,
                        actual,
                    });
                }
            }
        }
        if ds.topology_variable().is_some() {
            self.check_topology(&GridTopology::from_dataset(ds)?)?;
        }
        Ok(())
    }

    /// Require `topology` to lay out every location over the same
    /// dimensions with the same padding as when the selector was built.
    pub fn check_topology(&self, topology: &GridTopology) -> Result<()> {
        for selection in &self.locations {
            let descriptor = topology.location(selection.location);
            if descriptor.dims != selection.dims {
                return Err(SubsetError::topology(
                    selection.location.as_str(),
                    format!(
                        "dimensions are {:?}, selector was built for {:?}",
                        descriptor.dims, selection.dims
                    ),
                ));
            }
            for (dim, &expected) in selection.dims.iter().zip(&selection.padding) {
                let actual = descriptor.padding_for(dim);
                if actual != expected {
                    return Err(SubsetError::PaddingMismatch {
                        dim: dim.clone(),
                        expected,
                        actual,
                    });
                }
            }
        }
        Ok(())
    }
}

impl Selectable for PolygonSelector {
    fn select(&self, ds: &Dataset) -> Result<Dataset> {
        self.check_compatible(ds)?;
        ds.isel(&self.ranges())
    }
}
