//! Application configuration.
//!
//! All configuration is driven by `EDGE_`-prefixed environment
//! variables; [`EdgeConfig::from_env`] applies them over the defaults.

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// Configuration for the edgecdn server.
///
/// # Examples
///
/// ```
/// use edgecdn_core::config::EdgeConfig;
///
/// let config = EdgeConfig::default();
/// assert_eq!(config.listen, "0.0.0.0:8080");
/// assert_eq!(config.refresh_interval_secs, 60);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct EdgeConfig {
    /// Bind address for the HTTP listener.
    #[builder(default = String::from("0.0.0.0:8080"))]
    pub listen: String,

    /// Log level filter string (e.g. `"info"`, `"debug"`).
    #[builder(default = String::from("info"))]
    pub log_level: String,

    /// Base URL of the tenant metadata service.
    #[builder(default)]
    pub api_url: String,

    /// Credential sent to the metadata service as the `api-key` header.
    #[builder(default)]
    pub api_key: String,

    /// Seconds between tenant list refreshes.
    #[builder(default = 60)]
    pub refresh_interval_secs: u64,

    /// Seconds between full cache resets.
    #[builder(default = 3600)]
    pub cache_reset_interval_secs: u64,

    /// Custom S3 endpoint (e.g. a local MinIO); unset means AWS.
    #[builder(default)]
    pub s3_endpoint: Option<String>,

    /// S3 region.
    #[builder(default = String::from("us-east-1"))]
    pub s3_region: String,

    /// S3 access key ID.
    #[builder(default)]
    pub s3_access_key_id: String,

    /// S3 secret access key.
    #[builder(default)]
    pub s3_secret_access_key: String,

    /// Bucket all tenant objects live in.
    #[builder(default = String::from("edgecdn"))]
    pub s3_bucket: String,
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self {
            listen: String::from("0.0.0.0:8080"),
            log_level: String::from("info"),
            api_url: String::new(),
            api_key: String::new(),
            refresh_interval_secs: 60,
            cache_reset_interval_secs: 3600,
            s3_endpoint: None,
            s3_region: String::from("us-east-1"),
            s3_access_key_id: String::new(),
            s3_secret_access_key: String::new(),
            s3_bucket: String::from("edgecdn"),
        }
    }
}

impl EdgeConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("EDGE_LISTEN") {
            config.listen = v;
        }
        if let Ok(v) = std::env::var("EDGE_LOG_LEVEL") {
            config.log_level = v;
        }
        if let Ok(v) = std::env::var("EDGE_API_URL") {
            config.api_url = v;
        }
        if let Ok(v) = std::env::var("EDGE_API_KEY") {
            config.api_key = v;
        }
        if let Ok(v) = std::env::var("EDGE_REFRESH_INTERVAL_SECS") {
            if let Ok(secs) = v.parse() {
                config.refresh_interval_secs = secs;
            }
        }
        if let Ok(v) = std::env::var("EDGE_CACHE_RESET_INTERVAL_SECS") {
            if let Ok(secs) = v.parse() {
                config.cache_reset_interval_secs = secs;
            }
        }
        if let Ok(v) = std::env::var("EDGE_S3_ENDPOINT") {
            config.s3_endpoint = Some(v);
        }
        if let Ok(v) = std::env::var("EDGE_S3_REGION") {
            config.s3_region = v;
        }
        if let Ok(v) = std::env::var("EDGE_S3_ACCESS_KEY_ID") {
            config.s3_access_key_id = v;
        }
        if let Ok(v) = std::env::var("EDGE_S3_SECRET_ACCESS_KEY") {
            config.s3_secret_access_key = v;
        }
        if let Ok(v) = std::env::var("EDGE_S3_BUCKET") {
            config.s3_bucket = v;
        }

        config
    }
}
