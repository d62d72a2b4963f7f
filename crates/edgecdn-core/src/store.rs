//! Object store boundary: the `GetObject` contract and its adapters.
//!
//! The edge treats the object store as a black box that either returns
//! content plus metadata, reports the object missing, or fails. The
//! [`S3ObjectStore`] adapter talks to AWS S3 or any S3-compatible
//! server such as MinIO; [`MemoryObjectStore`] backs tests and local
//! development.

use async_trait::async_trait;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::operation::get_object::GetObjectError;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::config::EdgeConfig;

/// Errors from the object store boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The requested object does not exist.
    #[error("object not found: {0}")]
    NotFound(String),
    /// Any other store failure.
    #[error("object store error: {0}")]
    Other(String),
}

/// Metadata returned by the store alongside object content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMetadata {
    /// Size of the content in bytes.
    pub content_length: u64,
    /// When the object was last written.
    pub last_modified: DateTime<Utc>,
    /// Content type as recorded by the store, if any.
    pub content_type: Option<String>,
}

/// An object fetched from the store: content plus metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// The object content.
    pub content: Bytes,
    /// Store metadata for the object.
    pub metadata: ObjectMetadata,
}

/// The object store contract used by the request path.
#[async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    /// Fetch the object at `path`.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if the object does not exist,
    /// [`StoreError::Other`] for any other failure.
    async fn get_object(&self, path: &str) -> Result<StoredObject, StoreError>;
}

// ---------------------------------------------------------------------------
// S3 adapter
// ---------------------------------------------------------------------------

/// Object store backed by AWS S3 or an S3-compatible server.
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3ObjectStore {
    /// Create a store from an existing client and bucket name.
    #[must_use]
    pub fn new(client: aws_sdk_s3::Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    /// Build a store from the application configuration.
    ///
    /// When `s3_endpoint` is set, the client is pointed at that endpoint
    /// with path-style addressing, which is what MinIO expects in
    /// development and integration tests. Otherwise the standard AWS
    /// endpoint for the configured region is used.
    pub async fn from_config(config: &EdgeConfig) -> Self {
        let credentials = aws_sdk_s3::config::Credentials::new(
            config.s3_access_key_id.clone(),
            config.s3_secret_access_key.clone(),
            None,
            None,
            "edgecdn-static",
        );

        let mut builder = aws_sdk_s3::config::Builder::new()
            .behavior_version_latest()
            .region(aws_sdk_s3::config::Region::new(config.s3_region.clone()))
            .credentials_provider(credentials);

        if let Some(endpoint) = &config.s3_endpoint {
            builder = builder.endpoint_url(endpoint.clone()).force_path_style(true);
        }

        Self::new(
            aws_sdk_s3::Client::from_conf(builder.build()),
            config.s3_bucket.clone(),
        )
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn get_object(&self, path: &str) -> Result<StoredObject, StoreError> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
            .map_err(|e| map_get_error(path, &e))?;

        let content_type = response.content_type().map(ToOwned::to_owned);
        let last_modified = response
            .last_modified()
            .and_then(|ts| DateTime::from_timestamp(ts.secs(), ts.subsec_nanos()))
            .unwrap_or_else(Utc::now);

        let collected = response
            .body
            .collect()
            .await
            .map_err(|e| StoreError::Other(format!("failed to read body stream: {e}")))?;
        let content = collected.into_bytes();

        Ok(StoredObject {
            metadata: ObjectMetadata {
                content_length: content.len() as u64,
                last_modified,
                content_type,
            },
            content,
        })
    }
}

/// Map an S3 `GetObject` failure onto [`StoreError`].
fn map_get_error(path: &str, err: &SdkError<GetObjectError>) -> StoreError {
    if let SdkError::ServiceError(service_err) = err {
        if matches!(service_err.err(), GetObjectError::NoSuchKey(_)) {
            return StoreError::NotFound(path.to_owned());
        }
    }
    StoreError::Other(format!("get object failed for {path}: {err}"))
}

// ---------------------------------------------------------------------------
// In-memory adapter
// ---------------------------------------------------------------------------

/// In-memory object store for tests and local development.
///
/// # Examples
///
/// ```
/// use edgecdn_core::store::{MemoryObjectStore, ObjectStore};
///
/// # tokio_test::block_on(async {
/// let store = MemoryObjectStore::new();
/// store.insert("f1/1.0.0/index.html", &b"<html/>"[..], "text/html");
///
/// let obj = store.get_object("f1/1.0.0/index.html").await.unwrap();
/// assert_eq!(obj.metadata.content_length, 7);
/// # });
/// ```
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: DashMap<String, StoredObject>,
}

impl MemoryObjectStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an object with the given content and content type.
    pub fn insert(&self, path: impl Into<String>, content: impl Into<Bytes>, content_type: &str) {
        let content = content.into();
        self.objects.insert(
            path.into(),
            StoredObject {
                metadata: ObjectMetadata {
                    content_length: content.len() as u64,
                    last_modified: Utc::now(),
                    content_type: Some(content_type.to_owned()),
                },
                content,
            },
        );
    }

    /// Remove an object.
    pub fn remove(&self, path: &str) {
        self.objects.remove(path);
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn get_object(&self, path: &str) -> Result<StoredObject, StoreError> {
        self.objects
            .get(path)
            .map(|o| o.value().clone())
            .ok_or_else(|| StoreError::NotFound(path.to_owned()))
    }
}
