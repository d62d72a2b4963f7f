//! Tenant registry: the current tenant snapshot and its refresh loop.
//!
//! The registry holds the last successfully fetched tenant list as an
//! immutable snapshot. Readers see either the previous or the next full
//! list, never an in-place mutation. The initial fetch happens during
//! construction and is fatal if it fails; after boot, refresh failures
//! only log and the stale snapshot keeps serving (availability over
//! freshness).
//!
//! Each successful refresh hands the new list to
//! [`ObjectCache::invalidate`] so cached objects of removed, disabled,
//! or version-bumped tenants are purged.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::cache::ObjectCache;
use crate::source::{SourceError, TenantSource};
use crate::tenant::TenantConfig;

/// Holder of the current tenant configuration snapshot.
///
/// The refresh timer is owned by the instance:
/// [`spawn_refresh`](Self::spawn_refresh) starts it,
/// [`shutdown`](Self::shutdown) stops it, and two registries never
/// share one.
pub struct TenantRegistry {
    source: Arc<dyn TenantSource>,
    cache: Arc<ObjectCache>,
    tenants: RwLock<Arc<Vec<Arc<TenantConfig>>>>,
    refresh_task: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for TenantRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantRegistry")
            .field("tenants", &self.tenants.read().len())
            .finish_non_exhaustive()
    }
}

impl TenantRegistry {
    /// Create a registry, performing the initial tenant fetch.
    ///
    /// # Errors
    ///
    /// Fails if the initial fetch fails; the process should not come up
    /// without a tenant list.
    pub async fn new(
        source: Arc<dyn TenantSource>,
        cache: Arc<ObjectCache>,
    ) -> Result<Arc<Self>, SourceError> {
        let tenants = fetch_snapshot(source.as_ref()).await?;
        info!(tenants = tenants.len(), "loaded initial tenant list");

        Ok(Arc::new(Self {
            source,
            cache,
            tenants: RwLock::new(tenants),
            refresh_task: Mutex::new(None),
        }))
    }

    /// Look a tenant up by its subdomain.
    #[must_use]
    pub fn lookup(&self, domain: &str) -> Option<Arc<TenantConfig>> {
        let snapshot = self.tenants.read();
        snapshot.iter().find(|t| t.domain == domain).cloned()
    }

    /// Number of tenants in the current snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tenants.read().len()
    }

    /// Whether the current snapshot is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tenants.read().is_empty()
    }

    /// Fetch the tenant list and, on success, swap the snapshot and
    /// invalidate the object cache against it.
    ///
    /// # Errors
    ///
    /// Returns the fetch error; the previous snapshot is left untouched.
    /// Refresh failures are never fatal after startup.
    pub async fn refresh(&self) -> Result<(), SourceError> {
        let tenants = fetch_snapshot(self.source.as_ref()).await?;
        info!(tenants = tenants.len(), "refreshed tenant list");

        *self.tenants.write() = Arc::clone(&tenants);
        self.cache.invalidate(&tenants);
        Ok(())
    }

    /// Start the periodic refresh task, owned by this instance.
    ///
    /// Replaces any previously spawned task.
    pub fn spawn_refresh(self: &Arc<Self>, interval: Duration) {
        let registry = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The snapshot was just loaded by the constructor; skip the
            // immediate first tick.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(err) = registry.refresh().await {
                    error!(error = %err, "tenant refresh failed, keeping previous list");
                }
            }
        });
        if let Some(previous) = self.refresh_task.lock().replace(handle) {
            previous.abort();
        }
    }

    /// Stop the periodic refresh task, if one is running.
    pub fn shutdown(&self) {
        if let Some(handle) = self.refresh_task.lock().take() {
            handle.abort();
        }
    }
}

impl Drop for TenantRegistry {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Fetch the tenant list and wrap it into a shareable snapshot.
async fn fetch_snapshot(
    source: &dyn TenantSource,
) -> Result<Arc<Vec<Arc<TenantConfig>>>, SourceError> {
    let tenants = source.fetch_tenants().await?;
    Ok(Arc::new(tenants.into_iter().map(Arc::new).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::StaticTenantSource;
    use crate::tenant::{TenantStatus, VersioningMode};

    fn tenant(domain: &str, version: &str) -> TenantConfig {
        TenantConfig {
            domain: domain.to_owned(),
            storage_folder: format!("{domain}-folder"),
            current_version: version.to_owned(),
            versioning_mode: VersioningMode::Header,
            index_page_path: "index.html".to_owned(),
            error_page_path: "error.html".to_owned(),
            caching_enabled: true,
            status: TenantStatus::Active,
            cors_rules: Vec::new(),
            response_headers: std::collections::HashMap::new(),
        }
    }

    #[tokio::test]
    async fn test_should_fail_construction_when_initial_fetch_fails() {
        let source = Arc::new(StaticTenantSource::new(Vec::new()));
        source.set_failing(true);

        let result = TenantRegistry::new(source, Arc::new(ObjectCache::new())).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_should_look_up_tenant_by_domain() {
        let source = Arc::new(StaticTenantSource::new(vec![
            tenant("acme", "1.0.0"),
            tenant("globex", "2.0.0"),
        ]));
        let registry = TenantRegistry::new(source, Arc::new(ObjectCache::new()))
            .await
            .expect("test registry");

        let t = registry.lookup("globex").expect("test lookup");
        assert_eq!(t.current_version, "2.0.0");
        assert!(registry.lookup("unknown").is_none());
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn test_should_swap_snapshot_on_successful_refresh() {
        let source = Arc::new(StaticTenantSource::new(vec![tenant("acme", "1.0.0")]));
        let registry = TenantRegistry::new(Arc::clone(&source) as _, Arc::new(ObjectCache::new()))
            .await
            .expect("test registry");

        source.set_tenants(vec![tenant("acme", "1.0.1")]);
        registry.refresh().await.expect("test refresh");

        let t = registry.lookup("acme").expect("test lookup");
        assert_eq!(t.current_version, "1.0.1");
    }

    #[tokio::test]
    async fn test_should_retain_previous_snapshot_on_failed_refresh() {
        let source = Arc::new(StaticTenantSource::new(vec![tenant("acme", "1.0.0")]));
        let registry = TenantRegistry::new(Arc::clone(&source) as _, Arc::new(ObjectCache::new()))
            .await
            .expect("test registry");

        source.set_failing(true);
        assert!(registry.refresh().await.is_err());

        // Stale but available.
        let t = registry.lookup("acme").expect("test lookup");
        assert_eq!(t.current_version, "1.0.0");
    }

    #[tokio::test]
    async fn test_should_invalidate_cache_on_refresh() {
        use crate::cache::CacheEntry;
        use crate::store::ObjectMetadata;
        use bytes::Bytes;
        use chrono::Utc;

        let cache = Arc::new(ObjectCache::new());
        cache.put(
            "acme-folder/1.0.0/app.js",
            Arc::new(CacheEntry {
                content: Bytes::from_static(b"old"),
                metadata: ObjectMetadata {
                    content_length: 3,
                    last_modified: Utc::now(),
                    content_type: None,
                },
            }),
        );

        let source = Arc::new(StaticTenantSource::new(vec![tenant("acme", "1.0.0")]));
        let registry = TenantRegistry::new(Arc::clone(&source) as _, Arc::clone(&cache))
            .await
            .expect("test registry");

        // Version bump purges the superseded version's entries.
        source.set_tenants(vec![tenant("acme", "1.0.1")]);
        registry.refresh().await.expect("test refresh");

        assert!(cache.get("acme-folder/1.0.0/app.js").is_none());
    }

    #[tokio::test]
    async fn test_should_refresh_periodically_from_spawned_task() {
        tokio::time::pause();

        let source = Arc::new(StaticTenantSource::new(vec![tenant("acme", "1.0.0")]));
        let registry = TenantRegistry::new(Arc::clone(&source) as _, Arc::new(ObjectCache::new()))
            .await
            .expect("test registry");

        source.set_tenants(vec![tenant("acme", "3.0.0")]);
        registry.spawn_refresh(Duration::from_secs(60));
        tokio::task::yield_now().await;

        tokio::time::advance(Duration::from_secs(61)).await;
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;

        let t = registry.lookup("acme").expect("test lookup");
        assert_eq!(t.current_version, "3.0.0");
        registry.shutdown();
    }
}
