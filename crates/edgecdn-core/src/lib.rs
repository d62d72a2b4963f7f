//! Core building blocks for the edgecdn multi-tenant edge server.
//!
//! This crate contains everything below the HTTP layer:
//!
//! - **Tenant model** ([`tenant`]): the per-tenant configuration fetched
//!   from the metadata service, including versioning mode and CORS rules.
//! - **Tenant registry** ([`registry`]): the current tenant snapshot,
//!   refreshed periodically and driving selective cache invalidation.
//! - **Object cache** ([`cache`]): a concurrent cache-aside store keyed by
//!   fully-qualified object path.
//! - **Resolution** ([`resolve`]): host → tenant domain and request path →
//!   object/error-page path computation.
//! - **CORS matching** ([`cors`]): ordered rule matching with
//!   exact-origin-over-wildcard precedence.
//! - **Object store adapter** ([`store`]): the `GetObject` boundary with an
//!   S3 implementation and an in-memory one for tests.
//! - **Metadata client** ([`source`]): the tenant-list fetch boundary.
//!
//! # Architecture
//!
//! ```text
//! EdgeHttpService (edgecdn-http)
//!        |
//!        v
//! TenantRegistry::lookup -> resolve::resolve_paths
//!        |
//!        v
//! ObjectCache::get ----miss----> ObjectStore::get_object
//!        ^                              |
//!        +---------- put ---------------+
//!
//! TenantRegistry refresh task --> ObjectCache::invalidate
//! ObjectCache reset task -------> ObjectCache::reset
//! ```

pub mod cache;
pub mod config;
pub mod cors;
pub mod error;
pub mod registry;
pub mod resolve;
pub mod source;
pub mod store;
pub mod tenant;

pub use cache::{CacheEntry, ObjectCache};
pub use config::EdgeConfig;
pub use error::EdgeError;
pub use registry::TenantRegistry;
pub use source::{HttpTenantSource, SourceError, StaticTenantSource, TenantSource};
pub use store::{
    MemoryObjectStore, ObjectMetadata, ObjectStore, S3ObjectStore, StoreError, StoredObject,
};
pub use tenant::{CorsRule, TenantConfig, TenantStatus, VersioningMode};
