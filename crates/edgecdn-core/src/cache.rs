//! Concurrent object cache keyed by fully-qualified object path.
//!
//! The cache is the only shared mutable structure on the request hot
//! path. It is a single map from path to a whole [`CacheEntry`] record,
//! so content and metadata are always created and removed together;
//! a caller can never observe one without the other.
//!
//! Two deletion mechanisms keep it coherent:
//!
//! - [`ObjectCache::reset`] empties everything, driven by a periodic
//!   task owned by the instance. This is the only bound on memory
//!   growth; there is no per-entry TTL or size policy.
//! - [`ObjectCache::invalidate`] removes entries made obsolete by a
//!   tenant configuration change and runs concurrently with ordinary
//!   reads and writes. An entry may be served once more while the scan
//!   is in flight; eventual consistency is the accepted contract.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::store::{ObjectMetadata, StoredObject};
use crate::tenant::{TenantConfig, VersioningMode};

/// A cached object: content bytes plus the store metadata that was
/// fetched alongside them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// The object content.
    pub content: Bytes,
    /// Store metadata for the object.
    pub metadata: ObjectMetadata,
}

impl From<StoredObject> for CacheEntry {
    fn from(obj: StoredObject) -> Self {
        Self {
            content: obj.content,
            metadata: obj.metadata,
        }
    }
}

/// Thread-safe cache-aside store of objects by path.
///
/// Uses [`DashMap`] for per-key atomicity under unbounded concurrent
/// callers; no cross-key transaction is provided or needed.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use bytes::Bytes;
/// use chrono::Utc;
/// use edgecdn_core::cache::{CacheEntry, ObjectCache};
/// use edgecdn_core::store::ObjectMetadata;
///
/// let cache = ObjectCache::new();
/// let entry = Arc::new(CacheEntry {
///     content: Bytes::from_static(b"hello"),
///     metadata: ObjectMetadata {
///         content_length: 5,
///         last_modified: Utc::now(),
///         content_type: None,
///     },
/// });
/// cache.put("f1/1.0.0/index.html", entry);
/// assert!(cache.get("f1/1.0.0/index.html").is_some());
/// ```
#[derive(Debug, Default)]
pub struct ObjectCache {
    entries: DashMap<String, Arc<CacheEntry>>,
    reset_task: Mutex<Option<JoinHandle<()>>>,
}

impl ObjectCache {
    /// Create a new empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an entry by object path.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<Arc<CacheEntry>> {
        let entry = self.entries.get(path).map(|e| Arc::clone(e.value()));
        debug!(path, hit = entry.is_some(), "cache lookup");
        entry
    }

    /// Upsert an entry for the given object path.
    pub fn put(&self, path: impl Into<String>, entry: Arc<CacheEntry>) {
        let path = path.into();
        debug!(path, size = entry.metadata.content_length, "cache store");
        self.entries.insert(path, entry);
    }

    /// Unconditionally empty the cache.
    pub fn reset(&self) {
        info!(entries = self.entries.len(), "resetting object cache");
        self.entries.clear();
    }

    /// Remove entries made obsolete by the given tenant list.
    ///
    /// Builds a keep-set of path prefixes, one per tenant that is both
    /// active and cache-enabled:
    ///
    /// - [`VersioningMode::Path`]: keep `"{storage_folder}/"`. Every
    ///   version of the tenant may legitimately be requested, and the
    ///   path itself disambiguates the version, so a version bump purges
    ///   nothing.
    /// - [`VersioningMode::Header`]: keep
    ///   `"{storage_folder}/{current_version}"`. Entries of a superseded
    ///   version are stale and get removed.
    ///
    /// Every cached key matching no kept prefix is removed.
    pub fn invalidate(&self, tenants: &[Arc<TenantConfig>]) {
        let keep: Vec<String> = tenants
            .iter()
            .filter(|t| t.is_cacheable())
            .map(|t| match t.versioning_mode {
                VersioningMode::Path => format!("{}/", t.storage_folder),
                VersioningMode::Header => {
                    format!("{}/{}", t.storage_folder, t.current_version)
                }
            })
            .collect();

        info!(prefixes = keep.len(), "invalidating object cache");

        self.entries.retain(|path, _| {
            let kept = keep.iter().any(|prefix| path.starts_with(prefix));
            if !kept {
                debug!(path, "removing stale cache entry");
            }
            kept
        });
    }

    /// Number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Start the periodic full-reset task, owned by this instance.
    ///
    /// Replaces any previously spawned task. The task holds a reference
    /// to the cache and runs until [`shutdown`](Self::shutdown) is
    /// called or the cache is dropped with the handle aborted.
    pub fn spawn_reset(self: &Arc<Self>, interval: Duration) {
        let cache = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick fires immediately; an immediate reset of an
            // empty cache is harmless but noisy, so skip it.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                cache.reset();
            }
        });
        if let Some(previous) = self.reset_task.lock().replace(handle) {
            previous.abort();
        }
    }

    /// Stop the periodic reset task, if one is running.
    pub fn shutdown(&self) {
        if let Some(handle) = self.reset_task.lock().take() {
            handle.abort();
        }
    }
}

impl Drop for ObjectCache {
    fn drop(&mut self) {
        self.shutdown();
    }
}
