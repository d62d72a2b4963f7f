//! The edge HTTP service implementing hyper's `Service` trait.
//!
//! [`EdgeHttpService`] ties the core components together into the
//! single catch-all route the edge serves:
//!
//! 1. Method gate (`GET`/`HEAD` only)
//! 2. Host → tenant domain extraction and registry lookup
//! 3. Tenant status check
//! 4. Object/error-page path resolution
//! 5. Cache-aside fetch against the cache and the object store
//! 6. Content serving (conditional GET, ranges)
//! 7. CORS decoration and per-tenant response headers
//!
//! Requests run fully in parallel; the object cache is the only shared
//! mutable state they touch.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use hyper::body::Incoming;
use hyper::service::Service;
use tracing::{debug, info, warn};
use uuid::Uuid;

use edgecdn_core::cache::{CacheEntry, ObjectCache};
use edgecdn_core::cors::match_rules;
use edgecdn_core::error::EdgeError;
use edgecdn_core::registry::TenantRegistry;
use edgecdn_core::resolve::{ResolvedPaths, resolve_paths, tenant_domain};
use edgecdn_core::store::{ObjectStore, StoreError};
use edgecdn_core::tenant::{TenantConfig, TenantStatus};

use crate::body::EdgeResponseBody;
use crate::content::{format_http_date, serve_content};
use crate::response::{
    apply_cors_headers, apply_tenant_headers, error_to_response, plain_text,
};

/// The edge HTTP service.
///
/// # Type Parameters
///
/// - `S`: the object store adapter used on cache misses.
#[derive(Debug)]
pub struct EdgeHttpService<S: ObjectStore> {
    registry: Arc<TenantRegistry>,
    cache: Arc<ObjectCache>,
    store: Arc<S>,
}

impl<S: ObjectStore> EdgeHttpService<S> {
    /// Create a service over the given registry, cache, and store.
    #[must_use]
    pub fn new(registry: Arc<TenantRegistry>, cache: Arc<ObjectCache>, store: Arc<S>) -> Self {
        Self {
            registry,
            cache,
            store,
        }
    }
}

impl<S: ObjectStore> Clone for EdgeHttpService<S> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            cache: Arc::clone(&self.cache),
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: ObjectStore> Service<http::Request<Incoming>> for EdgeHttpService<S> {
    type Response = http::Response<EdgeResponseBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<Incoming>) -> Self::Future {
        let registry = Arc::clone(&self.registry);
        let cache = Arc::clone(&self.cache);
        let store = Arc::clone(&self.store);

        Box::pin(async move {
            let request_id = Uuid::new_v4().to_string();
            // GET/HEAD requests carry no body worth reading.
            let (parts, _incoming) = req.into_parts();

            let response =
                handle_request(&registry, &cache, store.as_ref(), &parts, &request_id).await;

            Ok(add_common_headers(response, &request_id))
        })
    }
}

/// Process one request through the full edge pipeline.
pub async fn handle_request<S: ObjectStore>(
    registry: &TenantRegistry,
    cache: &ObjectCache,
    store: &S,
    parts: &http::request::Parts,
    request_id: &str,
) -> http::Response<EdgeResponseBody> {
    let started = Instant::now();
    let method = &parts.method;

    if *method != http::Method::GET && *method != http::Method::HEAD {
        return plain_text(http::StatusCode::METHOD_NOT_ALLOWED, "method-not-allowed");
    }

    let host = request_host(parts);
    let domain = tenant_domain(host);
    let Some(tenant) = registry.lookup(domain) else {
        debug!(host, domain, request_id, "tenant not found");
        return error_to_response(&EdgeError::TenantNotFound);
    };

    if tenant.status != TenantStatus::Active {
        return error_to_response(&EdgeError::TenantInactive);
    }

    let paths = resolve_paths(&tenant, parts.uri.path());
    info!(
        domain,
        folder = %tenant.storage_folder,
        version = %tenant.current_version,
        object = %paths.object_path,
        request_id,
        "routed request"
    );

    let (entry, from_cache) = match fetch_entry(cache, store, &tenant, &paths).await {
        Ok(found) => found,
        Err(err) => {
            warn!(object = %paths.object_path, error = %err, request_id, "request failed");
            return error_to_response(&err);
        }
    };

    debug!(
        object = %paths.object_path,
        from_cache,
        size = entry.metadata.content_length,
        elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        request_id,
        "served"
    );

    let mut response = serve_content(method, &parts.headers, &entry.content, &entry.metadata);
    decorate(&mut response, &parts.headers, &tenant);
    response
}

/// Cache-aside fetch of the requested object, falling back to the
/// tenant's error page when the object is missing.
///
/// The error page is served through the same 200 path as regular
/// content; only when the error page itself is missing does the request
/// fail with [`EdgeError::ObjectNotFound`].
async fn fetch_entry<S: ObjectStore>(
    cache: &ObjectCache,
    store: &S,
    tenant: &TenantConfig,
    paths: &ResolvedPaths,
) -> Result<(Arc<CacheEntry>, bool), EdgeError> {
    let caching = tenant.caching_enabled;

    if caching {
        if let Some(entry) = cache.get(&paths.object_path) {
            return Ok((entry, true));
        }
    }

    match store.get_object(&paths.object_path).await {
        Ok(obj) => {
            let entry = Arc::new(CacheEntry::from(obj));
            if caching {
                cache.put(paths.object_path.clone(), Arc::clone(&entry));
            }
            Ok((entry, false))
        }
        Err(StoreError::NotFound(_)) => {
            debug!(object = %paths.object_path, "object not found, trying error page");

            if caching {
                if let Some(entry) = cache.get(&paths.error_path) {
                    return Ok((entry, true));
                }
            }

            match store.get_object(&paths.error_path).await {
                Ok(obj) => {
                    let entry = Arc::new(CacheEntry::from(obj));
                    if caching {
                        cache.put(paths.error_path.clone(), Arc::clone(&entry));
                    }
                    Ok((entry, false))
                }
                Err(StoreError::NotFound(_)) => Err(EdgeError::ObjectNotFound),
                Err(StoreError::Other(msg)) => Err(EdgeError::Store(msg)),
            }
        }
        Err(StoreError::Other(msg)) => Err(EdgeError::Store(msg)),
    }
}

/// Apply CORS headers for the request origin and the tenant's extra
/// response headers.
fn decorate(
    response: &mut http::Response<EdgeResponseBody>,
    request_headers: &http::HeaderMap,
    tenant: &TenantConfig,
) {
    if let Some(origin) = request_headers
        .get(http::header::ORIGIN)
        .and_then(|v| v.to_str().ok())
    {
        if let Some(rule) = match_rules(&tenant.cors_rules, origin) {
            apply_cors_headers(response, rule);
        }
    }
    apply_tenant_headers(response, &tenant.response_headers);
}

/// The request host: `Host` header first, absolute-form URI second.
fn request_host(parts: &http::request::Parts) -> &str {
    parts
        .headers
        .get(http::header::HOST)
        .and_then(|v| v.to_str().ok())
        .or_else(|| parts.uri.host())
        .unwrap_or_default()
}

/// Add the common response headers every answer carries.
fn add_common_headers(
    mut response: http::Response<EdgeResponseBody>,
    request_id: &str,
) -> http::Response<EdgeResponseBody> {
    let headers = response.headers_mut();
    if let Ok(value) = http::HeaderValue::from_str(request_id) {
        headers.insert("x-request-id", value);
    }
    headers.insert(
        http::header::SERVER,
        http::HeaderValue::from_static("edgecdn"),
    );
    if let Ok(value) = http::HeaderValue::from_str(&format_http_date(&chrono::Utc::now())) {
        headers.insert(http::header::DATE, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use bytes::Bytes;
    use http_body_util::BodyExt;

    use edgecdn_core::source::StaticTenantSource;
    use edgecdn_core::store::{MemoryObjectStore, StoredObject};
    use edgecdn_core::tenant::{CorsRule, VersioningMode};

    use super::*;

    fn tenant(domain: &str) -> TenantConfig {
        TenantConfig {
            domain: domain.to_owned(),
            storage_folder: "f1".to_owned(),
            current_version: "1.0.0".to_owned(),
            versioning_mode: VersioningMode::Header,
            index_page_path: "index.html".to_owned(),
            error_page_path: "error.html".to_owned(),
            caching_enabled: true,
            status: TenantStatus::Active,
            cors_rules: Vec::new(),
            response_headers: std::collections::HashMap::new(),
        }
    }

    async fn registry_with(
        tenants: Vec<TenantConfig>,
        cache: &Arc<ObjectCache>,
    ) -> Arc<TenantRegistry> {
        TenantRegistry::new(
            Arc::new(StaticTenantSource::new(tenants)),
            Arc::clone(cache),
        )
        .await
        .expect("test registry")
    }

    fn get_parts(host: &str, path: &str) -> http::request::Parts {
        let req = http::Request::builder()
            .method(http::Method::GET)
            .uri(path)
            .header(http::header::HOST, host)
            .body(())
            .expect("test request");
        req.into_parts().0
    }

    async fn body_string(response: http::Response<EdgeResponseBody>) -> String {
        let collected = response.into_body().collect().await.expect("test body");
        String::from_utf8(collected.to_bytes().to_vec()).expect("test utf8")
    }

    #[tokio::test]
    async fn test_should_serve_object_and_populate_cache() {
        let cache = Arc::new(ObjectCache::new());
        let registry = registry_with(vec![tenant("acme")], &cache).await;
        let store = MemoryObjectStore::new();
        store.insert("f1/1.0.0/app.js", Bytes::from_static(b"let x = 1;"), "text/javascript");

        let parts = get_parts("acme.cdn.example.com", "/app.js");
        let resp = handle_request(&registry, &cache, &store, &parts, "rid").await;

        assert_eq!(resp.status(), http::StatusCode::OK);
        assert!(cache.get("f1/1.0.0/app.js").is_some());
        assert_eq!(body_string(resp).await, "let x = 1;");
    }

    #[tokio::test]
    async fn test_should_serve_from_cache_after_first_fetch() {
        let cache = Arc::new(ObjectCache::new());
        let registry = registry_with(vec![tenant("acme")], &cache).await;
        let store = MemoryObjectStore::new();
        store.insert("f1/1.0.0/app.js", Bytes::from_static(b"cached"), "text/javascript");

        let parts = get_parts("acme.cdn.example.com", "/app.js");
        let first = handle_request(&registry, &cache, &store, &parts, "rid").await;
        assert_eq!(first.status(), http::StatusCode::OK);

        // The store no longer has the object; only the cache can answer.
        store.remove("f1/1.0.0/app.js");
        let second = handle_request(&registry, &cache, &store, &parts, "rid").await;
        assert_eq!(second.status(), http::StatusCode::OK);
        assert_eq!(body_string(second).await, "cached");
    }

    #[tokio::test]
    async fn test_should_not_cache_when_caching_disabled() {
        let cache = Arc::new(ObjectCache::new());
        let mut t = tenant("acme");
        t.caching_enabled = false;
        let registry = registry_with(vec![t], &cache).await;
        let store = MemoryObjectStore::new();
        store.insert("f1/1.0.0/app.js", Bytes::from_static(b"x"), "text/javascript");

        let parts = get_parts("acme.cdn.example.com", "/app.js");
        let resp = handle_request(&registry, &cache, &store, &parts, "rid").await;

        assert_eq!(resp.status(), http::StatusCode::OK);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_should_serve_error_page_with_ok_status() {
        let cache = Arc::new(ObjectCache::new());
        let registry = registry_with(vec![tenant("acme")], &cache).await;
        let store = MemoryObjectStore::new();
        store.insert("f1/1.0.0/error.html", Bytes::from_static(b"<fallback/>"), "text/html");

        let parts = get_parts("acme.cdn.example.com", "/missing.js");
        let resp = handle_request(&registry, &cache, &store, &parts, "rid").await;

        // The fallback keeps the 200 status of a regular answer.
        assert_eq!(resp.status(), http::StatusCode::OK);
        assert!(cache.get("f1/1.0.0/error.html").is_some());
        assert_eq!(body_string(resp).await, "<fallback/>");
    }

    #[tokio::test]
    async fn test_should_answer_not_found_when_error_page_missing_too() {
        let cache = Arc::new(ObjectCache::new());
        let registry = registry_with(vec![tenant("acme")], &cache).await;
        let store = MemoryObjectStore::new();

        let parts = get_parts("acme.cdn.example.com", "/missing.js");
        let resp = handle_request(&registry, &cache, &store, &parts, "rid").await;

        assert_eq!(resp.status(), http::StatusCode::NOT_FOUND);
        assert_eq!(body_string(resp).await, "file not found");
    }

    #[tokio::test]
    async fn test_should_answer_not_found_for_unknown_tenant() {
        let cache = Arc::new(ObjectCache::new());
        let registry = registry_with(vec![tenant("acme")], &cache).await;
        let store = MemoryObjectStore::new();

        let parts = get_parts("globex.cdn.example.com", "/app.js");
        let resp = handle_request(&registry, &cache, &store, &parts, "rid").await;

        assert_eq!(resp.status(), http::StatusCode::NOT_FOUND);
        assert_eq!(body_string(resp).await, "tenant not found");
    }

    #[tokio::test]
    async fn test_should_answer_gone_for_inactive_tenant() {
        let cache = Arc::new(ObjectCache::new());
        let mut t = tenant("acme");
        t.status = TenantStatus::Inactive;
        let registry = registry_with(vec![t], &cache).await;
        let store = MemoryObjectStore::new();

        let parts = get_parts("acme.cdn.example.com", "/app.js");
        let resp = handle_request(&registry, &cache, &store, &parts, "rid").await;

        assert_eq!(resp.status(), http::StatusCode::GONE);
    }

    #[tokio::test]
    async fn test_should_surface_store_error_as_internal_error() {
        #[derive(Debug)]
        struct FailingStore;

        #[async_trait]
        impl ObjectStore for FailingStore {
            async fn get_object(&self, _path: &str) -> Result<StoredObject, StoreError> {
                Err(StoreError::Other("connection refused".to_owned()))
            }
        }

        let cache = Arc::new(ObjectCache::new());
        let registry = registry_with(vec![tenant("acme")], &cache).await;

        let parts = get_parts("acme.cdn.example.com", "/app.js");
        let resp = handle_request(&registry, &cache, &FailingStore, &parts, "rid").await;

        assert_eq!(resp.status(), http::StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_string(resp).await.contains("connection refused"));
    }

    #[tokio::test]
    async fn test_should_serve_index_page_for_root_request() {
        let cache = Arc::new(ObjectCache::new());
        let registry = registry_with(vec![tenant("acme")], &cache).await;
        let store = MemoryObjectStore::new();
        store.insert("f1/1.0.0/index.html", Bytes::from_static(b"<html/>"), "text/html");

        let parts = get_parts("acme.cdn.example.com", "/");
        let resp = handle_request(&registry, &cache, &store, &parts, "rid").await;

        assert_eq!(resp.status(), http::StatusCode::OK);
        assert_eq!(body_string(resp).await, "<html/>");
    }

    #[tokio::test]
    async fn test_should_reject_non_get_methods() {
        let cache = Arc::new(ObjectCache::new());
        let registry = registry_with(vec![tenant("acme")], &cache).await;
        let store = MemoryObjectStore::new();

        let req = http::Request::builder()
            .method(http::Method::POST)
            .uri("/app.js")
            .header(http::header::HOST, "acme.cdn.example.com")
            .body(())
            .expect("test request");
        let parts = req.into_parts().0;
        let resp = handle_request(&registry, &cache, &store, &parts, "rid").await;

        assert_eq!(resp.status(), http::StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_should_apply_exact_cors_rule_and_tenant_headers() {
        let cache = Arc::new(ObjectCache::new());
        let mut t = tenant("acme");
        t.cors_rules = vec![
            CorsRule {
                allowed_origins: vec!["*".to_owned()],
                allowed_methods: vec!["GET".to_owned()],
                ..CorsRule::default()
            },
            CorsRule {
                allowed_origins: vec!["https://a.com".to_owned()],
                allowed_methods: vec!["GET".to_owned(), "HEAD".to_owned()],
                ..CorsRule::default()
            },
        ];
        t.response_headers
            .insert("X-Frame-Options".to_owned(), "DENY".to_owned());
        let registry = registry_with(vec![t], &cache).await;
        let store = MemoryObjectStore::new();
        store.insert("f1/1.0.0/app.js", Bytes::from_static(b"x"), "text/javascript");

        let req = http::Request::builder()
            .method(http::Method::GET)
            .uri("/app.js")
            .header(http::header::HOST, "acme.cdn.example.com")
            .header(http::header::ORIGIN, "https://a.com")
            .body(())
            .expect("test request");
        let parts = req.into_parts().0;
        let resp = handle_request(&registry, &cache, &store, &parts, "rid").await;

        assert_eq!(
            resp.headers()
                .get("Access-Control-Allow-Origin")
                .expect("test header"),
            "https://a.com"
        );
        assert_eq!(
            resp.headers()
                .get("Access-Control-Allow-Methods")
                .expect("test header"),
            "GET,HEAD"
        );
        assert_eq!(
            resp.headers().get("X-Frame-Options").expect("test header"),
            "DENY"
        );
    }
}
