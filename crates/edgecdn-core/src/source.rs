//! Tenant metadata boundary: fetching the full tenant list.
//!
//! The registry polls a [`TenantSource`] for the authoritative tenant
//! list. [`HttpTenantSource`] talks to the metadata service over HTTP;
//! [`StaticTenantSource`] gives tests deterministic control over what a
//! refresh observes.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Deserialize;

use crate::tenant::TenantConfig;

/// Errors from the tenant metadata boundary.
///
/// These never reach a client: a failed refresh is logged and the
/// previous tenant list keeps serving.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Transport or decoding failure talking to the metadata service.
    #[error("tenant metadata request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The metadata service answered with a non-success status.
    #[error("tenant metadata service returned status {0}")]
    Status(u16),
}

/// The tenant metadata contract.
#[async_trait]
pub trait TenantSource: Send + Sync + 'static {
    /// Fetch the full tenant list.
    async fn fetch_tenants(&self) -> Result<Vec<TenantConfig>, SourceError>;
}

/// Wire envelope of the tenant list endpoint.
#[derive(Debug, Deserialize)]
struct TenantListResponse {
    #[serde(default)]
    results: Vec<TenantConfig>,
}

// ---------------------------------------------------------------------------
// HTTP source
// ---------------------------------------------------------------------------

/// Tenant source backed by the metadata service's HTTP API.
///
/// Issues `GET {api_url}/buckets` with the credential in an `api-key`
/// header and expects a JSON body of the form
/// `{"results": [TenantConfig, ...]}`.
#[derive(Debug, Clone)]
pub struct HttpTenantSource {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl HttpTenantSource {
    /// Create a source for the given metadata service URL and credential.
    #[must_use]
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl TenantSource for HttpTenantSource {
    async fn fetch_tenants(&self) -> Result<Vec<TenantConfig>, SourceError> {
        let response = self
            .client
            .get(format!("{}/buckets", self.api_url))
            .header("api-key", &self.api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status(status.as_u16()));
        }

        let body: TenantListResponse = response.json().await?;
        tracing::info!(tenants = body.results.len(), "retrieved tenant list");
        Ok(body.results)
    }
}

// ---------------------------------------------------------------------------
// Static source
// ---------------------------------------------------------------------------

/// Deterministic tenant source for tests.
///
/// Holds a tenant list behind a lock so tests can change what the next
/// refresh observes, or make it fail outright.
#[derive(Debug, Default)]
pub struct StaticTenantSource {
    tenants: RwLock<Vec<TenantConfig>>,
    failing: RwLock<bool>,
}

impl StaticTenantSource {
    /// Create a source serving the given tenant list.
    #[must_use]
    pub fn new(tenants: Vec<TenantConfig>) -> Self {
        Self {
            tenants: RwLock::new(tenants),
            failing: RwLock::new(false),
        }
    }

    /// Replace the tenant list observed by subsequent fetches.
    pub fn set_tenants(&self, tenants: Vec<TenantConfig>) {
        *self.tenants.write() = tenants;
    }

    /// Make subsequent fetches fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        *self.failing.write() = failing;
    }
}

#[async_trait]
impl TenantSource for StaticTenantSource {
    async fn fetch_tenants(&self) -> Result<Vec<TenantConfig>, SourceError> {
        if *self.failing.read() {
            return Err(SourceError::Status(503));
        }
        Ok(self.tenants.read().clone())
    }
}
