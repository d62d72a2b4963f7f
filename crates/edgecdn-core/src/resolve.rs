//! Host and path resolution.
//!
//! Maps the request host to a tenant domain and the request path to the
//! object path in the store, together with the companion error-page
//! path used when the object is missing.

use crate::tenant::{TenantConfig, VersioningMode};

/// Extract the tenant domain from a request host.
///
/// The domain is the first label up to (excluding) the first `.`; a
/// host without a dot, such as a local development hostname, is the
/// domain itself. A `:port` suffix is stripped first.
///
/// # Examples
///
/// ```
/// use edgecdn_core::resolve::tenant_domain;
///
/// assert_eq!(tenant_domain("acme.cdn.example.com"), "acme");
/// assert_eq!(tenant_domain("localhost"), "localhost");
/// ```
#[must_use]
pub fn tenant_domain(host: &str) -> &str {
    let host = host.split(':').next().unwrap_or(host);
    match host.find('.') {
        Some(dot) => &host[..dot],
        None => host,
    }
}

/// The object path to fetch and the error-page path to fall back to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    /// Fully-qualified path of the requested object.
    pub object_path: String,
    /// Fully-qualified path of the tenant's error page for the
    /// requested version.
    pub error_path: String,
}

/// Compute the object and error-page paths for a request.
///
/// A request path of exactly `/` is substituted with the tenant's index
/// page. In [`VersioningMode::Path`] the first path segment is the
/// requested version and is already embedded in the object path; in
/// [`VersioningMode::Header`] the tenant's current version is inserted
/// between folder and path.
#[must_use]
pub fn resolve_paths(tenant: &TenantConfig, request_path: &str) -> ResolvedPaths {
    let path = if request_path == "/" {
        format!("/{}", tenant.index_page_path)
    } else {
        request_path.to_owned()
    };

    match tenant.versioning_mode {
        VersioningMode::Path => {
            // The version is whatever the first segment happens to be.
            let version = path.split('/').nth(1).unwrap_or_default();
            ResolvedPaths {
                error_path: format!(
                    "{}/{}/{}",
                    tenant.storage_folder, version, tenant.error_page_path
                ),
                object_path: format!("{}{}", tenant.storage_folder, path),
            }
        }
        VersioningMode::Header => ResolvedPaths {
            object_path: format!(
                "{}/{}{}",
                tenant.storage_folder, tenant.current_version, path
            ),
            error_path: format!(
                "{}/{}/{}",
                tenant.storage_folder, tenant.current_version, tenant.error_page_path
            ),
        },
    }
}
