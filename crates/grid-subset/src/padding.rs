//! Padding-aware index propagation.
//!
//! A selection is computed once against the node (corner) location. The
//! other locations take their index ranges from it, axis by axis, using the
//! padding policy of their own dimension at the same position:
//!
//! | policy | target range     |
//! |--------|------------------|
//! | none   | `[lo, hi)`       |
//! | both   | `[lo, hi + 1)`   |
//! | low    | `[lo - 1, hi)`, or `[lo, hi)` when `lo == 0` |
//! | high   | `[lo, hi + 1)`   |
//!
//! Results are clamped to the target dimension; a range that ends up empty
//! is an error, never a silent empty slice.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SubsetError};
use crate::topology::{LocationDescriptor, Padding};

/// Half-open index interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexRange {
    pub start: usize,
    pub end: usize,
}

impl IndexRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn as_range(&self) -> Range<usize> {
        self.start..self.end
    }
}

impl fmt::Display for IndexRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Map one reference-axis range onto a target axis.
pub fn propagate_axis(
    reference: IndexRange,
    padding: Padding,
    target_dim: &str,
    target_size: usize,
) -> Result<IndexRange> {
    let IndexRange { start: lo, end: hi } = reference;
    let (start, end) = match padding {
        Padding::None => (lo, hi),
        Padding::Both | Padding::High => (lo, hi + 1),
        Padding::Low => (lo.saturating_sub(1), hi),
    };

    let clamped = IndexRange::new(start.min(target_size), end.min(target_size));
    if clamped.is_empty() {
        return Err(SubsetError::degenerate(
            target_dim,
            format!(
                "reference range {} with padding '{}' leaves {} inside a dimension of size {}",
                reference,
                padding,
                clamped,
                target_size
            ),
        ));
    }
    Ok(clamped)
}

/// Map the node selection onto every axis of `target`.
///
/// `reference` holds one range per node dimension, in node dimension order;
/// axis `i` of `target` takes `reference[i]`. `sizes` holds the length of
/// every target dimension.
pub fn propagate(
    reference: &[IndexRange; 2],
    target: &LocationDescriptor,
    sizes: &BTreeMap<String, usize>,
) -> Result<[IndexRange; 2]> {
    let mut out = [IndexRange::new(0, 0); 2];
    for axis in 0..2 {
        let dim = &target.dims[axis];
        let size = sizes.get(dim).copied().ok_or_else(|| {
            SubsetError::topology(
                target.location.as_str(),
                format!("dimension '{}' is not present in the dataset", dim),
            )
        })?;
        out[axis] = propagate_axis(reference[axis], target.padding_for(dim), dim, size)?;

        tracing::trace!(
            location = %target.location,
            axis,
            dim = %dim,
            range = %out[axis],
            "propagated index range"
        );
    }
    Ok(out)
}
