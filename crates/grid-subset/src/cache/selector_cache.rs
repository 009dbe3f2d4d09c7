//! LRU cache for constructed selectors, optionally backed by a directory.

use std::io::Write;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use lru::LruCache;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::config::SubsetConfig;
use crate::error::{Result, SubsetError};
use crate::selector::{hashname, Selector};
use crate::types::CacheStats;

/// Identifies a cache entry.
///
/// Memory entries are keyed by the full content id. The hashname
/// (`<name>_<digest8>.sel`) only names the backing file, so two criteria
/// sharing a short digest get separate memory entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SelectorKey {
    content_id: String,
    file_name: String,
}

impl SelectorKey {
    pub fn new(name: &str, content_id: impl Into<String>) -> Self {
        let content_id = content_id.into();
        Self {
            file_name: hashname(name, &content_id),
            content_id,
        }
    }

    /// Key under which `selector` would be stored.
    pub fn for_selector(selector: &Selector) -> Self {
        Self::new(selector.name(), selector.content_id())
    }

    pub fn content_id(&self) -> &str {
        &self.content_id
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }
}

/// Selector cache keyed by content id.
///
/// Entries are shared as `Arc<Selector>`; a selector is immutable once
/// built, so any number of callers may apply the same entry at once.
/// With a directory configured, every insert is also written to
/// `<dir>/<hashname>` and memory misses fall back to reading that file.
pub struct SelectorCache {
    memory: Mutex<LruCache<String, Arc<Selector>>>,
    dir: Option<PathBuf>,
    hits: AtomicU64,
    misses: AtomicU64,
    disk_hits: AtomicU64,
    evictions: AtomicU64,
}

impl SelectorCache {
    /// Create a memory-only cache holding up to `capacity` selectors.
    pub fn new(capacity: usize) -> Self {
        Self {
            memory: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
            )),
            dir: None,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            disk_hits: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Create a cache that also persists selectors under `dir`.
    ///
    /// The directory is created if needed.
    pub fn with_dir(capacity: usize, dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| {
            SubsetError::Cache(format!("cannot create {}: {}", dir.display(), e))
        })?;
        Ok(Self {
            dir: Some(dir),
            ..Self::new(capacity)
        })
    }

    pub fn from_config(config: &SubsetConfig) -> Result<Self> {
        match &config.selector_cache_dir {
            Some(dir) => Self::with_dir(config.selector_cache_capacity, dir),
            None => Ok(Self::new(config.selector_cache_capacity)),
        }
    }

    /// Backing directory, if any.
    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// Look up a selector by key, trying memory first and then the
    /// directory. A file that cannot be decoded, or that holds a selector
    /// with another content id, counts as a miss.
    pub fn get(&self, key: &SelectorKey) -> Option<Arc<Selector>> {
        if let Some(selector) = self.lock().get(key.content_id()) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!(key = %key.file_name(), "selector cache hit");
            return Some(Arc::clone(selector));
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let selector = Arc::new(self.read_file(key)?);
        self.disk_hits.fetch_add(1, Ordering::Relaxed);
        debug!(key = %key.file_name(), "selector loaded from disk");
        self.put_memory(key.content_id().to_string(), Arc::clone(&selector));
        Some(selector)
    }

    /// Insert a selector under `key`, replacing any previous entry.
    ///
    /// Failing to write the backing file is logged and otherwise ignored:
    /// the entry still lives in memory and the next run recomputes it.
    pub fn insert(&self, key: &SelectorKey, selector: Arc<Selector>) {
        if let Err(e) = self.write_file(key, &selector) {
            warn!(key = %key.file_name(), error = %e, "failed to persist selector");
        }
        self.put_memory(key.content_id().to_string(), selector);
    }

    /// Drop an entry from memory and disk.
    pub fn remove(&self, key: &SelectorKey) {
        self.lock().pop(key.content_id());
        if let Some(path) = self.path_for(key) {
            if let Err(e) = std::fs::remove_file(&path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %path.display(), error = %e, "failed to remove selector file");
                }
            }
        }
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            disk_hits: self.disk_hits.load(Ordering::Relaxed),
            entries: self.len(),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    /// Clear the in-memory entries. Files on disk are kept.
    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<String, Arc<Selector>>> {
        // Entries are replaced whole, so a poisoned map is still consistent.
        self.memory.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn put_memory(&self, key: String, selector: Arc<Selector>) {
        if let Some((evicted, _)) = self.lock().push(key.clone(), selector) {
            if evicted != key {
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    fn path_for(&self, key: &SelectorKey) -> Option<PathBuf> {
        self.dir.as_ref().map(|dir| dir.join(key.file_name()))
    }

    fn read_file(&self, key: &SelectorKey) -> Option<Selector> {
        let path = self.path_for(key)?;
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "unreadable selector file");
                return None;
            }
        };
        match Selector::from_bytes(&bytes) {
            Ok(selector) if selector.content_id() == key.content_id() => Some(selector),
            Ok(_) => {
                debug!(path = %path.display(), "selector file holds another criterion");
                None
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "corrupt selector file, ignoring");
                None
            }
        }
    }

    /// Write through a temp file in the same directory and rename it into
    /// place. Concurrent writers of the same key both succeed; the last
    /// rename wins and both wrote equal bytes.
    fn write_file(&self, key: &SelectorKey, selector: &Selector) -> Result<()> {
        let (Some(dir), Some(path)) = (self.dir.as_ref(), self.path_for(key)) else {
            return Ok(());
        };
        let bytes = selector.to_bytes()?;
        let mut file = NamedTempFile::new_in(dir)?;
        file.write_all(&bytes)?;
        file.persist(&path).map_err(|e| e.error)?;
        Ok(())
    }
}
