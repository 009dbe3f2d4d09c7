//! Subsetting entry points.
//!
//! [`GridSubsetter`] ties the pieces together: it resolves the grid
//! topology, builds or reuses a [`PolygonSelector`] and applies it. The
//! free functions [`subset_by_polygon`] and [`subset_by_variable_names`]
//! do the same work without a cache.

use std::sync::Arc;

use tracing::{debug, info};

use crate::cache::{SelectorCache, SelectorKey};
use crate::config::SubsetConfig;
use crate::dataset::Dataset;
use crate::error::{Result, SubsetError};
use crate::polygon::Polygon;
use crate::selector::{
    content_digest, PolygonSelector, Selectable, Selector, VariableNameSelector,
};
use crate::topology::{GridTopology, Location};
use crate::types::CacheStats;

/// Cuts SGRID datasets by polygon or by variable name.
///
/// Polygon selectors are cached by polygon content, so repeated requests for
/// the same region skip classification.
pub struct GridSubsetter {
    config: SubsetConfig,
    cache: SelectorCache,
}

impl GridSubsetter {
    /// Create a subsetter from a validated configuration.
    pub fn new(config: SubsetConfig) -> Result<Self> {
        config.validate().map_err(SubsetError::Config)?;
        let cache = SelectorCache::from_config(&config)?;
        Ok(Self { config, cache })
    }

    /// Create a subsetter configured from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(SubsetConfig::from_env())
    }

    pub fn config(&self) -> &SubsetConfig {
        &self.config
    }

    pub fn cache(&self) -> &SelectorCache {
        &self.cache
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Return the selector for `polygon` over `ds`, building it on a cache
    /// miss.
    ///
    /// A cached selector is only reused if it was built for the same
    /// polygon and margin, over the same dimension sizes and padding;
    /// otherwise it is rebuilt and replaces the cached entry.
    pub fn polygon_selector(&self, ds: &Dataset, polygon: &Polygon) -> Result<Arc<Selector>> {
        let topology = GridTopology::from_dataset(ds)?;
        let key = SelectorKey::new(
            PolygonSelector::DEFAULT_NAME,
            content_digest(&polygon.canonical_bytes()),
        );

        if let Some(cached) = self.cache.get(&key) {
            if self.is_reusable(&cached, ds, &topology, polygon) {
                return Ok(cached);
            }
            debug!(key = %key.file_name(), "cached selector does not fit dataset, rebuilding");
        }

        let selector = build_polygon_selector(ds, &topology, polygon, self.config.bounding_margin)?;
        let selector = Arc::new(Selector::from(selector));
        self.cache.insert(&key, Arc::clone(&selector));
        Ok(selector)
    }

    /// Return the part of `ds` covering `polygon`.
    ///
    /// Every staggered dimension is sliced consistently; variables without
    /// a staggered dimension are carried over unchanged.
    pub fn subset_by_polygon(&self, ds: &Dataset, polygon: &Polygon) -> Result<Dataset> {
        self.polygon_selector(ds, polygon)?.select(ds)
    }

    /// Keep only the named data variables (plus coordinates and the grid
    /// topology variable).
    pub fn subset_by_variable_names<S: AsRef<str>>(
        &self,
        ds: &Dataset,
        names: &[S],
    ) -> Result<Dataset> {
        subset_by_variable_names(ds, names)
    }

    fn is_reusable(
        &self,
        cached: &Selector,
        ds: &Dataset,
        topology: &GridTopology,
        polygon: &Polygon,
    ) -> bool {
        match cached {
            Selector::Polygon(s) => {
                s.polygon() == polygon
                    && s.margin() == self.config.bounding_margin
                    && s.check_topology(topology).is_ok()
                    && s.check_compatible(ds).is_ok()
            }
            Selector::VariableNames(_) => false,
        }
    }
}

/// Subset `ds` by polygon without caching, using the default margin.
pub fn subset_by_polygon(ds: &Dataset, polygon: &Polygon) -> Result<Dataset> {
    let topology = GridTopology::from_dataset(ds)?;
    let margin = SubsetConfig::default().bounding_margin;
    build_polygon_selector(ds, &topology, polygon, margin)?.select(ds)
}

/// Keep only the named data variables of `ds`; dimensions are unchanged.
pub fn subset_by_variable_names<S: AsRef<str>>(ds: &Dataset, names: &[S]) -> Result<Dataset> {
    VariableNameSelector::new(
        VariableNameSelector::DEFAULT_NAME,
        names.iter().map(|n| n.as_ref().to_string()),
    )
    .select(ds)
}

fn build_polygon_selector(
    ds: &Dataset,
    topology: &GridTopology,
    polygon: &Polygon,
    margin: usize,
) -> Result<PolygonSelector> {
    let selector = PolygonSelector::from_dataset(
        PolygonSelector::DEFAULT_NAME,
        polygon.clone(),
        topology,
        ds,
        margin,
    )?;

    if let Some(node) = selector.location(Location::Node) {
        info!(
            vertices = polygon.vertices().len(),
            content_id = %selector.content_id(),
            node_dims = ?node.dims,
            node_ranges = %format!("{} x {}", node.ranges[0], node.ranges[1]),
            "built polygon selector"
        );
    }
    Ok(selector)
}
