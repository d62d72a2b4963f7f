//! Response body type supporting buffered and empty modes.
//!
//! Cached objects are fully buffered in memory, so the body is either a
//! buffered byte payload or empty (304 responses, HEAD answers).

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use http_body_util::Full;

/// Edge response body.
///
/// Implements [`http_body::Body`] so it can be used directly with hyper
/// responses. There is no streaming mode: a cache entry is always a
/// complete payload, and range requests slice it before the body is
/// built.
///
/// # Examples
///
/// ```
/// use edgecdn_http::EdgeResponseBody;
/// use http_body::Body;
///
/// let body = EdgeResponseBody::from_bytes(&b"<html/>"[..]);
/// assert_eq!(body.size_hint().exact(), Some(7));
///
/// assert!(EdgeResponseBody::empty().is_end_stream());
/// ```
#[derive(Debug, Default)]
pub enum EdgeResponseBody {
    /// Buffered body: object content or a plain-text error message.
    Buffered(Full<Bytes>),
    /// Empty body: 304 Not Modified and HEAD responses.
    #[default]
    Empty,
}

impl EdgeResponseBody {
    /// Create a buffered body from bytes.
    #[must_use]
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        Self::Buffered(Full::new(data.into()))
    }

    /// Create a buffered body from a UTF-8 string, as used by the
    /// plain-text error responses (`tenant not found`, `file not
    /// found`, and the 500 store-error body).
    #[must_use]
    pub fn from_string(s: impl Into<String>) -> Self {
        Self::Buffered(Full::new(Bytes::from(s.into())))
    }

    /// Create an empty body.
    #[must_use]
    pub fn empty() -> Self {
        Self::Empty
    }
}

impl http_body::Body for EdgeResponseBody {
    type Data = Bytes;
    type Error = std::io::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<http_body::Frame<Self::Data>, Self::Error>>> {
        match self.get_mut() {
            Self::Buffered(full) => Pin::new(full)
                .poll_frame(cx)
                .map_err(|never| match never {}),
            Self::Empty => Poll::Ready(None),
        }
    }

    fn is_end_stream(&self) -> bool {
        match self {
            Self::Buffered(full) => full.is_end_stream(),
            Self::Empty => true,
        }
    }

    fn size_hint(&self) -> http_body::SizeHint {
        match self {
            Self::Buffered(full) => full.size_hint(),
            Self::Empty => http_body::SizeHint::with_exact(0),
        }
    }
}
