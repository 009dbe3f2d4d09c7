//! Variable-name selector.

use serde::{Deserialize, Serialize};

use super::{content_digest, Selectable};
use crate::dataset::Dataset;
use crate::error::{Result, SubsetError};

const CANONICAL_TAG: &[u8] = b"variables\0";

/// Keeps a fixed set of data variables; dimensions are left alone.
///
/// Coordinates and the grid topology variable always survive, so the result
/// can still be subset by polygon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableNameSelector {
    name: String,
    /// Sorted and deduplicated.
    variables: Vec<String>,
}

impl VariableNameSelector {
    pub const DEFAULT_NAME: &'static str = "variables";

    pub fn new<S: Into<String>>(name: impl Into<String>, variables: impl IntoIterator<Item = S>) -> Self {
        let mut variables: Vec<String> = variables.into_iter().map(Into::into).collect();
        variables.sort();
        variables.dedup();
        Self {
            name: name.into(),
            variables,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// Content identifier of the name set.
    pub fn content_id(&self) -> String {
        let mut canonical = CANONICAL_TAG.to_vec();
        canonical.extend_from_slice(&(self.variables.len() as u64).to_le_bytes());
        for name in &self.variables {
            canonical.extend_from_slice(&(name.len() as u64).to_le_bytes());
            canonical.extend_from_slice(name.as_bytes());
        }
        content_digest(&canonical)
    }

    /// Every requested variable must exist.
    pub fn check_compatible(&self, ds: &Dataset) -> Result<()> {
        match self.variables.iter().find(|name| !ds.contains(name)) {
            Some(missing) => Err(SubsetError::UnknownVariable(missing.clone())),
            None => Ok(()),
        }
    }
}

impl Selectable for VariableNameSelector {
    fn select(&self, ds: &Dataset) -> Result<Dataset> {
        ds.select_variables(&self.variables)
    }
}
