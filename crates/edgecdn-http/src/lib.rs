//! HTTP layer of the edgecdn edge server.
//!
//! This crate turns the core components of `edgecdn-core` into a
//! hyper-compatible service:
//!
//! - **Body** ([`body`]): the [`EdgeResponseBody`](body::EdgeResponseBody)
//!   type supporting buffered and empty response modes.
//! - **Content serving** ([`content`]): the static-content primitive with
//!   `Last-Modified`, conditional GET, and byte-range support.
//! - **Responses** ([`response`]): plain-text errors, the error → status
//!   mapping, CORS decoration, and per-tenant extra headers.
//! - **Service** ([`service`]): the main
//!   [`EdgeHttpService`](service::EdgeHttpService) that implements
//!   hyper's `Service` trait and runs the full request pipeline.
//!
//! # Architecture
//!
//! ```text
//! HTTP Request
//!   -> EdgeHttpService (hyper Service)
//!     -> tenant lookup + status check
//!     -> path resolution
//!     -> cache-aside fetch (cache -> store -> error page)
//!     -> serve_content (200 / 206 / 304 / 416)
//!     -> CORS + tenant response headers
//!   <- HTTP Response
//! ```

pub mod body;
pub mod content;
pub mod response;
pub mod service;

pub use body::EdgeResponseBody;
pub use content::serve_content;
pub use response::error_to_response;
pub use service::EdgeHttpService;
