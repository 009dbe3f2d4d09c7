//! Configuration for grid subsetting.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Configuration for [`crate::GridSubsetter`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubsetConfig {
    /// Number of selectors kept in memory.
    pub selector_cache_capacity: usize,

    /// Directory for serialized selectors. `None` keeps the cache in memory.
    pub selector_cache_dir: Option<PathBuf>,

    /// Node indices kept on each side of the points inside a polygon.
    pub bounding_margin: usize,
}

impl Default for SubsetConfig {
    fn default() -> Self {
        Self {
            selector_cache_capacity: 64,
            selector_cache_dir: None,
            bounding_margin: 1,
        }
    }
}

impl SubsetConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("SELECTOR_CACHE_CAPACITY") {
            if let Ok(capacity) = val.parse() {
                config.selector_cache_capacity = capacity;
            }
        }

        if let Ok(val) = std::env::var("SELECTOR_CACHE_DIR") {
            if !val.trim().is_empty() {
                config.selector_cache_dir = Some(PathBuf::from(val));
            }
        }

        if let Ok(val) = std::env::var("SUBSET_BOUNDING_MARGIN") {
            if let Ok(margin) = val.parse() {
                config.bounding_margin = margin;
            }
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.selector_cache_capacity == 0 {
            return Err("selector_cache_capacity must be > 0".to_string());
        }

        if let Some(dir) = &self.selector_cache_dir {
            if dir.as_os_str().is_empty() {
                return Err("selector_cache_dir must not be empty".to_string());
            }
        }

        Ok(())
    }

    /// Use a cache directory (builder style).
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.selector_cache_dir = Some(dir.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SubsetConfig::default();
        assert_eq!(config.selector_cache_capacity, 64);
        assert_eq!(config.selector_cache_dir, None);
        assert_eq!(config.bounding_margin, 1);
    }

    #[test]
    fn test_config_validation() {
        let mut config = SubsetConfig::default();
        assert!(config.validate().is_ok());

        config.selector_cache_capacity = 0;
        assert!(config.validate().is_err());

        config = SubsetConfig::default();
        config.selector_cache_dir = Some(PathBuf::new());
        assert!(config.validate().is_err());

        config = SubsetConfig::default().with_cache_dir("/tmp/selectors");
        assert!(config.validate().is_ok());
    }
}
