//! Error types for grid subsetting.

use thiserror::Error;

use crate::topology::Padding;

/// Errors that can occur while resolving topology, building selectors or
/// subsetting a dataset.
#[derive(Error, Debug)]
pub enum SubsetError {
    /// Missing or malformed grid topology metadata.
    #[error("grid topology error at location '{location}': {message}")]
    Topology { location: String, message: String },

    /// The polygon cannot enclose any area.
    #[error("invalid polygon: {0}")]
    InvalidPolygon(String),

    /// A valid polygon that contains no reference grid points.
    #[error("no grid points fall inside polygon {polygon}")]
    EmptySelection { polygon: String },

    /// Padding propagation collapsed an index range.
    #[error("selection along '{dim}' collapsed: {message}")]
    DegenerateSelection { dim: String, message: String },

    /// A selector was applied to a dataset with a different grid shape.
    #[error("dimension '{dim}' has size {actual}, selector was built for size {expected}")]
    TopologyMismatch {
        dim: String,
        expected: usize,
        actual: usize,
    },

    /// A selector was applied to a grid whose padding differs from the one
    /// it was built for.
    #[error("dimension '{dim}' has padding '{actual}', selector was built for '{expected}'")]
    PaddingMismatch {
        dim: String,
        expected: Padding,
        actual: Padding,
    },

    /// A selector could not be encoded.
    #[error("failed to serialize selector: {0}")]
    Serialization(String),

    /// Bytes that do not encode a selector.
    #[error("failed to deserialize selector: {0}")]
    Deserialization(String),

    /// A requested variable does not exist in the dataset.
    #[error("variable not found: {0}")]
    UnknownVariable(String),

    /// Inconsistent dataset construction or slicing.
    #[error("dataset error: {0}")]
    Dataset(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Selector cache storage error.
    #[error("cache error: {0}")]
    Cache(String),
}

impl SubsetError {
    /// Create a Topology error for a staggered location.
    pub fn topology(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Topology {
            location: location.into(),
            message: message.into(),
        }
    }

    /// Create an InvalidPolygon error.
    pub fn invalid_polygon(msg: impl Into<String>) -> Self {
        Self::InvalidPolygon(msg.into())
    }

    /// Create a DegenerateSelection error.
    pub fn degenerate(dim: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DegenerateSelection {
            dim: dim.into(),
            message: message.into(),
        }
    }

    /// Create a Dataset error.
    pub fn dataset(msg: impl Into<String>) -> Self {
        Self::Dataset(msg.into())
    }

    /// Create a Deserialization error.
    pub fn deserialization(msg: impl Into<String>) -> Self {
        Self::Deserialization(msg.into())
    }
}

impl From<std::io::Error> for SubsetError {
    fn from(err: std::io::Error) -> Self {
        Self::Cache(err.to_string())
    }
}

/// Result type for grid subsetting operations.
pub type Result<T> = std::result::Result<T, SubsetError>;
