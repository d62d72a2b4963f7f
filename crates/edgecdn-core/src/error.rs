//! Request-path error taxonomy.

/// Errors the request path can surface to a client.
///
/// The HTTP layer maps these onto status codes: not-found variants to
/// 404, [`TenantInactive`](Self::TenantInactive) to 410, and
/// [`Store`](Self::Store) to 500 with the underlying message as the
/// body. Refresh failures are not part of this taxonomy; they never
/// reach a client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EdgeError {
    /// No tenant is configured for the request's subdomain.
    #[error("tenant not found")]
    TenantNotFound,

    /// The tenant exists but is not active.
    #[error("tenant not active")]
    TenantInactive,

    /// Neither the requested object nor the tenant's error page exists.
    #[error("file not found")]
    ObjectNotFound,

    /// The object store failed with something other than not-found.
    #[error("object store error: {0}")]
    Store(String),
}
