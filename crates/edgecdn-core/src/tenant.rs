//! Tenant configuration model.
//!
//! [`TenantConfig`] is the wire format returned by the metadata service,
//! one entry per tenant (bucket). Configurations are immutable once
//! fetched; the registry swaps the full list atomically on each refresh.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Lifecycle status of a tenant.
///
/// Anything other than `"active"` on the wire deserializes to
/// [`TenantStatus::Inactive`], so an unknown future status never serves
/// content by accident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TenantStatus {
    /// Tenant is live and may be served.
    Active,
    /// Tenant exists but must not be served (HTTP 410 at the edge).
    #[default]
    #[serde(other)]
    Inactive,
}

/// Where the version of a requested object comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersioningMode {
    /// The client embeds the version as the first path segment. Any
    /// version may be requested and cached simultaneously.
    Path,
    /// The server holds the active version; request paths carry no
    /// version segment. Only the current version is cacheable.
    #[default]
    #[serde(other)]
    Header,
}

/// Configuration of a single tenant, keyed by its subdomain.
///
/// # Examples
///
/// ```
/// use edgecdn_core::tenant::{TenantConfig, TenantStatus, VersioningMode};
///
/// let json = r#"{
///     "domain": "acme",
///     "storageFolder": "a1b2c3",
///     "currentVersion": "1.0.0",
///     "versioningMode": "header",
///     "indexPagePath": "index.html",
///     "errorPagePath": "error.html",
///     "cachingEnabled": true,
///     "status": "active"
/// }"#;
/// let tenant: TenantConfig = serde_json::from_str(json).unwrap();
/// assert_eq!(tenant.status, TenantStatus::Active);
/// assert_eq!(tenant.versioning_mode, VersioningMode::Header);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantConfig {
    /// Subdomain used to look the tenant up, e.g. `acme` for
    /// `acme.cdn.example.com`.
    pub domain: String,
    /// Folder under which the tenant's objects live in the store. Stable
    /// across domain renames.
    pub storage_folder: String,
    /// Currently active version, used when [`VersioningMode::Header`].
    pub current_version: String,
    /// How the requested version is determined.
    #[serde(default)]
    pub versioning_mode: VersioningMode,
    /// Object served when the request path is exactly `/`.
    pub index_page_path: String,
    /// Object served when the requested object does not exist. SPAs point
    /// this at their index page to get client-side routing.
    pub error_page_path: String,
    /// Whether objects of this tenant go through the edge cache.
    #[serde(default)]
    pub caching_enabled: bool,
    /// Lifecycle status; only [`TenantStatus::Active`] tenants are served.
    #[serde(default)]
    pub status: TenantStatus,
    /// Ordered CORS rules matched against the request `Origin` header.
    #[serde(default)]
    pub cors_rules: Vec<CorsRule>,
    /// Extra headers added to every successful content response.
    #[serde(default)]
    pub response_headers: HashMap<String, String>,
}

impl TenantConfig {
    /// Whether this tenant participates in caching: active and
    /// cache-enabled. Used both on the read path and by the
    /// invalidation keep-set.
    #[must_use]
    pub fn is_cacheable(&self) -> bool {
        self.status == TenantStatus::Active && self.caching_enabled
    }
}

/// A single CORS configuration rule.
///
/// Lists are emitted joined with `,`; a header is only added to the
/// response when the rule defines a value for it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorsRule {
    /// Origins the rule applies to; may contain the `"*"` wildcard.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    /// Value for `Access-Control-Allow-Methods`.
    #[serde(default)]
    pub allowed_methods: Vec<String>,
    /// Value for `Access-Control-Allow-Headers`.
    #[serde(default)]
    pub allowed_headers: Vec<String>,
    /// Value for `Access-Control-Expose-Headers`.
    #[serde(default)]
    pub expose_headers: Vec<String>,
    /// Value for `Access-Control-Max-Age`, in seconds.
    #[serde(default)]
    pub max_age_seconds: Option<u32>,
}

impl CorsRule {
    /// Whether the rule lists the wildcard origin.
    #[must_use]
    pub fn allows_any_origin(&self) -> bool {
        self.allowed_origins.iter().any(|o| o == "*")
    }

    /// Whether the rule lists this exact origin.
    #[must_use]
    pub fn allows_origin(&self, origin: &str) -> bool {
        self.allowed_origins.iter().any(|o| o == origin)
    }
}
