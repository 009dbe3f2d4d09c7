//! Polygon criterion and point classification.
//!
//! [`classify`] runs an even-odd ray-casting test over every point of a 2-D
//! coordinate grid and reports the tight index bounds of the points inside,
//! widened by a margin so padded locations never need points outside the
//! slice. Cost is O(points × vertices); it runs once per selector.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::dataset::CoordArray;
use crate::error::{Result, SubsetError};
use crate::padding::IndexRange;
use crate::types::BoundingBox;

const CANONICAL_TAG: &[u8] = b"polygon\0";

/// An implicitly closed ring of (lon, lat) vertices.
///
/// Equality is exact on the bit patterns of the vertices, so a polygon read
/// back from bytes compares equal to the one that was written.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "Vec<(f64, f64)>", into = "Vec<(f64, f64)>")]
pub struct Polygon {
    vertices: Vec<(f64, f64)>,
}

impl Polygon {
    /// Create a polygon, rejecting rings that cannot enclose area.
    ///
    /// The closing vertex is optional.
    pub fn new(vertices: Vec<(f64, f64)>) -> Result<Self> {
        if let Some((lon, lat)) = vertices
            .iter()
            .find(|(lon, lat)| !lon.is_finite() || !lat.is_finite())
        {
            return Err(SubsetError::invalid_polygon(format!(
                "non-finite vertex ({}, {})",
                lon, lat
            )));
        }

        let distinct: BTreeSet<(u64, u64)> = vertices
            .iter()
            .map(|(lon, lat)| (lon.to_bits(), lat.to_bits()))
            .collect();
        if distinct.len() < 3 {
            return Err(SubsetError::invalid_polygon(format!(
                "{} distinct vertices, need at least 3",
                distinct.len()
            )));
        }

        let polygon = Self { vertices };
        if polygon.area() == 0.0 {
            return Err(SubsetError::invalid_polygon(format!(
                "{} encloses no area",
                polygon.summary()
            )));
        }
        Ok(polygon)
    }

    pub fn vertices(&self) -> &[(f64, f64)] {
        &self.vertices
    }

    /// Absolute shoelace area in squared coordinate units.
    ///
    /// A figure-eight whose lobes cancel reports zero.
    pub fn area(&self) -> f64 {
        let n = self.vertices.len();
        let mut twice = 0.0;
        for i in 0..n {
            let (x0, y0) = self.vertices[i];
            let (x1, y1) = self.vertices[(i + 1) % n];
            twice += x0 * y1 - x1 * y0;
        }
        (twice / 2.0).abs()
    }

    /// Bounding box of the vertices.
    pub fn bbox(&self) -> BoundingBox {
        // Construction guarantees at least three vertices.
        BoundingBox::from_points(&self.vertices).unwrap_or(BoundingBox::new(0.0, 0.0, 0.0, 0.0))
    }

    /// Even-odd ray casting test. NaN coordinates are outside.
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        if lon.is_nan() || lat.is_nan() {
            return false;
        }

        let n = self.vertices.len();
        let mut inside = false;
        let mut j = n - 1;

        for i in 0..n {
            let (xi, yi) = self.vertices[i];
            let (xj, yj) = self.vertices[j];

            if ((yi > lat) != (yj > lat)) && (lon < (xj - xi) * (lat - yi) / (yj - yi) + xi) {
                inside = !inside;
            }
            j = i;
        }

        inside
    }

    /// Short description for error messages and logs.
    pub fn summary(&self) -> String {
        let bbox = self.bbox();
        format!(
            "polygon of {} vertices within [{}, {}, {}, {}]",
            self.vertices.len(),
            bbox.min_lon,
            bbox.min_lat,
            bbox.max_lon,
            bbox.max_lat
        )
    }

    /// Order-stable byte form used for content digests.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(CANONICAL_TAG.len() + 8 + self.vertices.len() * 16);
        out.extend_from_slice(CANONICAL_TAG);
        out.extend_from_slice(&(self.vertices.len() as u64).to_le_bytes());
        for (lon, lat) in &self.vertices {
            out.extend_from_slice(&lon.to_le_bytes());
            out.extend_from_slice(&lat.to_le_bytes());
        }
        out
    }
}

impl PartialEq for Polygon {
    fn eq(&self, other: &Self) -> bool {
        self.vertices.len() == other.vertices.len()
            && self
                .vertices
                .iter()
                .zip(&other.vertices)
                .all(|(a, b)| a.0.to_bits() == b.0.to_bits() && a.1.to_bits() == b.1.to_bits())
    }
}

impl Eq for Polygon {}

impl TryFrom<Vec<(f64, f64)>> for Polygon {
    type Error = SubsetError;

    fn try_from(vertices: Vec<(f64, f64)>) -> Result<Self> {
        Self::new(vertices)
    }
}

impl From<Polygon> for Vec<(f64, f64)> {
    fn from(polygon: Polygon) -> Self {
        polygon.vertices
    }
}

/// Result of classifying a coordinate grid against a polygon.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    /// Storage dimensions of the coordinate arrays (row dimension first).
    pub dims: [String; 2],
    pub shape: [usize; 2],
    /// Row-major inclusion mask.
    pub mask: Vec<bool>,
    /// Number of points inside.
    pub inside: usize,
    /// Bounding index range per dimension, margin included.
    pub bounds: BTreeMap<String, IndexRange>,
}

impl Classification {
    /// Whether the point at (row, col) is inside the polygon.
    pub fn is_inside(&self, row: usize, col: usize) -> bool {
        row < self.shape[0] && col < self.shape[1] && self.mask[row * self.shape[1] + col]
    }

    pub fn bound(&self, dim: &str) -> Option<IndexRange> {
        self.bounds.get(dim).copied()
    }
}

/// Classify every grid point against `polygon`.
///
/// `margin` extra indices are kept on each side of the tight bounds where the
/// grid allows.
pub fn classify(
    lon: &CoordArray,
    lat: &CoordArray,
    polygon: &Polygon,
    margin: usize,
) -> Result<Classification> {
    if lon.dims != lat.dims || lon.shape != lat.shape {
        return Err(SubsetError::dataset(format!(
            "longitude {:?}{:?} and latitude {:?}{:?} grids differ",
            lon.dims, lon.shape, lat.dims, lat.shape
        )));
    }

    let [rows, cols] = lon.shape;
    let bbox = polygon.bbox();
    let mut mask = vec![false; rows * cols];
    let mut inside = 0usize;
    let (mut min_row, mut max_row) = (usize::MAX, 0usize);
    let (mut min_col, mut max_col) = (usize::MAX, 0usize);

    for row in 0..rows {
        for col in 0..cols {
            let k = row * cols + col;
            let (x, y) = (lon.values[k], lat.values[k]);
            if bbox.contains(x, y) && polygon.contains(x, y) {
                mask[k] = true;
                inside += 1;
                min_row = min_row.min(row);
                max_row = max_row.max(row);
                min_col = min_col.min(col);
                max_col = max_col.max(col);
            }
        }
    }

    if inside == 0 {
        return Err(SubsetError::EmptySelection {
            polygon: polygon.summary(),
        });
    }

    let widen = |lo: usize, hi: usize, n: usize| {
        IndexRange::new(
            lo.saturating_sub(margin),
            hi.saturating_add(1).saturating_add(margin).min(n),
        )
    };
    let mut bounds = BTreeMap::new();
    bounds.insert(lon.dims[0].clone(), widen(min_row, max_row, rows));
    bounds.insert(lon.dims[1].clone(), widen(min_col, max_col, cols));

    tracing::debug!(
        inside,
        total = rows * cols,
        bounds = ?bounds,
        "classified grid against polygon"
    );

    Ok(Classification {
        dims: lon.dims.clone(),
        shape: lon.shape,
        mask,
        inside,
        bounds,
    })
}
