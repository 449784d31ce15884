use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::ViewComputeError;
use crate::view::{Artifact, ViewRequest};

// ---------------------------------------------------------------------------
// Cache key
// ---------------------------------------------------------------------------

/// Identity of one memoized artifact: base dataset version, hash of the
/// ordered transform list, and the view request itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub dataset_version: u64,
    pub steps_hash: u64,
    pub request: ViewRequest,
}

// ---------------------------------------------------------------------------
// ViewCache – memoized artifacts with LRU eviction
// ---------------------------------------------------------------------------

struct CacheEntry {
    artifact: Arc<Artifact>,
    last_access: u64,
}

struct Inner {
    entries: HashMap<CacheKey, CacheEntry>,
    tick: u64,
    capacity: usize,
}

/// Maps cache keys to computed artifacts. Interior mutability behind a
/// `Mutex`, held across the compute closure, so at most one computation
/// runs per key even when the cache is shared with a worker thread.
/// Failed computations are never stored; a retry recomputes.
pub struct ViewCache {
    inner: Mutex<Inner>,
}

impl ViewCache {
    /// A cache holding at most `capacity` artifacts (minimum 1).
    pub fn new(capacity: usize) -> Self {
        ViewCache {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                tick: 0,
                capacity: capacity.max(1),
            }),
        }
    }

    /// Return the cached artifact for `key`, computing and storing it on
    /// a miss. Least-recently-used entries are evicted once the size
    /// bound is exceeded.
    pub fn get_or_compute<F>(&self, key: CacheKey, compute: F) -> Result<Arc<Artifact>, ViewComputeError>
    where
        F: FnOnce() -> Result<Artifact, ViewComputeError>,
    {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.tick += 1;
        let tick = inner.tick;

        if let Some(entry) = inner.entries.get_mut(&key) {
            entry.last_access = tick;
            log::debug!("cache hit for {}", key.request);
            return Ok(Arc::clone(&entry.artifact));
        }

        log::debug!("cache miss for {}", key.request);
        let artifact = Arc::new(compute()?);
        inner.entries.insert(
            key,
            CacheEntry {
                artifact: Arc::clone(&artifact),
                last_access: tick,
            },
        );
        inner.evict();
        Ok(artifact)
    }

    /// Eagerly drop every entry for a dataset version older than
    /// `version`. Called when a new load supersedes prior versions.
    pub fn invalidate_before(&self, version: u64) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let before = inner.entries.len();
        inner.entries.retain(|k, _| k.dataset_version >= version);
        let dropped = before - inner.entries.len();
        if dropped > 0 {
            log::info!("dropped {dropped} cache entries for superseded dataset versions");
        }
    }

    /// Number of cached artifacts.
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entries
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Inner {
    fn evict(&mut self) {
        while self.entries.len() > self.capacity {
            let Some(oldest) = self
                .entries
                .iter()
                .min_by_key(|(_, e)| e.last_access)
                .map(|(k, _)| k.clone())
            else {
                break;
            };
            log::debug!("evicting {}", oldest.request);
            self.entries.remove(&oldest);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::artifact::MissingReport;

    fn key(version: u64, name: &str) -> CacheKey {
        CacheKey {
            dataset_version: version,
            steps_hash: 0,
            request: ViewRequest::DistributionPlot {
                column: name.to_string(),
                buckets: 10,
            },
        }
    }

    fn artifact() -> Artifact {
        Artifact::MissingReport(MissingReport {
            rows: 0,
            columns: vec![],
        })
    }

    #[test]
    fn second_request_hits_without_recompute() {
        let cache = ViewCache::new(8);
        let mut computed = 0;
        for _ in 0..2 {
            cache
                .get_or_compute(key(1, "x"), || {
                    computed += 1;
                    Ok(artifact())
                })
                .unwrap();
        }
        assert_eq!(computed, 1);
    }

    #[test]
    fn failures_are_not_cached() {
        let cache = ViewCache::new(8);
        let result = cache.get_or_compute(key(1, "x"), || {
            Err(ViewComputeError::UnknownColumn("x".into()))
        });
        assert!(result.is_err());
        assert!(cache.is_empty());

        // A retry recomputes and may now succeed.
        cache.get_or_compute(key(1, "x"), || Ok(artifact())).unwrap();
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn lru_entry_is_evicted_at_capacity() {
        let cache = ViewCache::new(2);
        cache.get_or_compute(key(1, "a"), || Ok(artifact())).unwrap();
        cache.get_or_compute(key(1, "b"), || Ok(artifact())).unwrap();
        // Touch "a" so "b" becomes least recently used.
        cache.get_or_compute(key(1, "a"), || Ok(artifact())).unwrap();
        cache.get_or_compute(key(1, "c"), || Ok(artifact())).unwrap();

        let mut recomputed = false;
        cache
            .get_or_compute(key(1, "b"), || {
                recomputed = true;
                Ok(artifact())
            })
            .unwrap();
        assert!(recomputed);
    }

    #[test]
    fn superseded_versions_are_dropped_eagerly() {
        let cache = ViewCache::new(8);
        cache.get_or_compute(key(1, "a"), || Ok(artifact())).unwrap();
        cache.get_or_compute(key(2, "a"), || Ok(artifact())).unwrap();
        cache.invalidate_before(2);
        assert_eq!(cache.len(), 1);

        let mut recomputed = false;
        cache
            .get_or_compute(key(1, "a"), || {
                recomputed = true;
                Ok(artifact())
            })
            .unwrap();
        assert!(recomputed);
    }
}
