//! Reusable, serializable selections.
//!
//! Building a selection can be expensive (polygon classification walks the
//! whole reference grid) while applying one is a cheap slice. A [`Selector`]
//! holds the criterion together with everything derived from it, so it can
//! be computed once, cached, written to bytes and applied to any number of
//! datasets that share the same grid.
//!
//! # Byte format
//!
//! ```text
//! b"XSGS" | postcard(Selector)
//! ```
//!
//! The enum tag inside the postcard payload picks the concrete variant; there
//! is no version field and no compatibility promise across builds.

mod polygon;
mod variables;

pub use polygon::{LocationSelection, PolygonSelector};
pub use variables::VariableNameSelector;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::dataset::Dataset;
use crate::error::{Result, SubsetError};

/// Magic prefix of serialized selectors.
const MAGIC: &[u8; 4] = b"XSGS";

/// File extension used for cached selectors.
pub const SELECTOR_FILE_EXTENSION: &str = "sel";

/// Something that can cut a dataset down.
pub trait Selectable {
    /// Return the selected part of `ds`. Never modifies `ds`.
    fn select(&self, ds: &Dataset) -> Result<Dataset>;
}

/// A selection criterion plus its precomputed, dataset-independent state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Selector {
    Polygon(PolygonSelector),
    VariableNames(VariableNameSelector),
}

impl Selector {
    /// User-facing label, used as the hashname prefix.
    pub fn name(&self) -> &str {
        match self {
            Self::Polygon(s) => s.name(),
            Self::VariableNames(s) => s.name(),
        }
    }

    /// SHA-256 hex digest of the criterion's canonical bytes.
    pub fn content_id(&self) -> String {
        match self {
            Self::Polygon(s) => s.content_id(),
            Self::VariableNames(s) => s.content_id(),
        }
    }

    /// Cache file name: `<name>_<first 8 digest chars>.sel`.
    pub fn hashname(&self) -> String {
        hashname(self.name(), &self.content_id())
    }

    /// Check that this selector can be applied to `ds`.
    pub fn check_compatible(&self, ds: &Dataset) -> Result<()> {
        match self {
            Self::Polygon(s) => s.check_compatible(ds),
            Self::VariableNames(s) => s.check_compatible(ds),
        }
    }

    /// Whether [`Selector::check_compatible`] passes.
    pub fn matches(&self, ds: &Dataset) -> bool {
        self.check_compatible(ds).is_ok()
    }

    /// Serialize to the opaque byte format.
    pub fn to_bytes(&self) -> Result<Bytes> {
        let payload =
            postcard::to_allocvec(self).map_err(|e| SubsetError::Serialization(e.to_string()))?;
        let mut out = Vec::with_capacity(MAGIC.len() + payload.len());
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&payload);
        Ok(Bytes::from(out))
    }

    /// Rebuild a selector from [`Selector::to_bytes`] output.
    ///
    /// Anything else, including a valid selector followed by extra bytes,
    /// is rejected.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let payload = bytes
            .strip_prefix(MAGIC.as_slice())
            .ok_or_else(|| SubsetError::deserialization("missing selector header"))?;
        let (selector, rest) = postcard::take_from_bytes::<Selector>(payload)
            .map_err(|e| SubsetError::deserialization(e.to_string()))?;
        if !rest.is_empty() {
            return Err(SubsetError::deserialization(format!(
                "{} trailing bytes after selector",
                rest.len()
            )));
        }
        Ok(selector)
    }
}

impl Selectable for Selector {
    fn select(&self, ds: &Dataset) -> Result<Dataset> {
        match self {
            Self::Polygon(s) => s.select(ds),
            Self::VariableNames(s) => s.select(ds),
        }
    }
}

impl From<PolygonSelector> for Selector {
    fn from(s: PolygonSelector) -> Self {
        Self::Polygon(s)
    }
}

impl From<VariableNameSelector> for Selector {
    fn from(s: VariableNameSelector) -> Self {
        Self::VariableNames(s)
    }
}

/// SHA-256 of canonical criterion bytes, hex encoded.
pub fn content_digest(canonical: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical);
    hex::encode(hasher.finalize())
}

/// Cache file name for a selector label and content id.
pub fn hashname(name: &str, content_id: &str) -> String {
    let short = content_id.get(..8).unwrap_or(content_id);
    format!("{}_{}.{}", name, short, SELECTOR_FILE_EXTENSION)
}
