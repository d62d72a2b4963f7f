//! Content-serving primitive.
//!
//! [`serve_content`] turns a cached object into an HTTP response with
//! the standard static-content behaviors: `Last-Modified`,
//! `If-Modified-Since` (304), single byte ranges (206 with
//! `Content-Range`, 416 when invalid or unsatisfiable), and empty
//! bodies for HEAD requests.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use http::header::{
    ACCEPT_RANGES, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, IF_MODIFIED_SINCE, LAST_MODIFIED,
    RANGE,
};
use http::{HeaderMap, Method, Response, StatusCode};

use edgecdn_core::store::ObjectMetadata;

use crate::body::EdgeResponseBody;
use crate::response::fallback_response;

/// Serve object content, honoring conditional-GET and range headers.
#[must_use]
pub fn serve_content(
    method: &Method,
    headers: &HeaderMap,
    content: &Bytes,
    metadata: &ObjectMetadata,
) -> Response<EdgeResponseBody> {
    // HTTP dates have second precision; compare at that granularity so a
    // client echoing our own Last-Modified gets its 304.
    if let Some(since) = parse_http_date(headers.get(IF_MODIFIED_SINCE)) {
        if metadata.last_modified.timestamp() <= since.timestamp() {
            return build(
                StatusCode::NOT_MODIFIED,
                metadata,
                None,
                EdgeResponseBody::empty(),
            );
        }
    }

    let total = content.len() as u64;
    if let Some(range_header) = headers.get(RANGE).and_then(|v| v.to_str().ok()) {
        let Some((start, end)) = parse_range(range_header, total) else {
            return range_not_satisfiable(total);
        };

        #[allow(clippy::cast_possible_truncation)]
        let slice = content.slice(start as usize..=end as usize);
        let content_range = format!("bytes {start}-{end}/{total}");
        let body = if *method == Method::HEAD {
            EdgeResponseBody::empty()
        } else {
            EdgeResponseBody::from_bytes(slice)
        };
        return build(
            StatusCode::PARTIAL_CONTENT,
            metadata,
            Some((end - start + 1, Some(content_range))),
            body,
        );
    }

    let body = if *method == Method::HEAD {
        EdgeResponseBody::empty()
    } else {
        EdgeResponseBody::from_bytes(content.clone())
    };
    build(StatusCode::OK, metadata, Some((total, None)), body)
}

/// Assemble a response with the shared content headers.
///
/// `length` carries `(Content-Length, Content-Range)` and is absent for
/// 304 responses, which advertise neither.
fn build(
    status: StatusCode,
    metadata: &ObjectMetadata,
    length: Option<(u64, Option<String>)>,
    body: EdgeResponseBody,
) -> Response<EdgeResponseBody> {
    let mut builder = Response::builder()
        .status(status)
        .header(LAST_MODIFIED, format_http_date(&metadata.last_modified))
        .header(ACCEPT_RANGES, "bytes");

    if let Some(content_type) = &metadata.content_type {
        if let Ok(value) = http::HeaderValue::from_str(content_type) {
            builder = builder.header(CONTENT_TYPE, value);
        }
    }
    if let Some((content_length, content_range)) = length {
        builder = builder.header(CONTENT_LENGTH, content_length);
        if let Some(range) = content_range {
            builder = builder.header(CONTENT_RANGE, range);
        }
    }

    builder.body(body).unwrap_or_else(|_| fallback_response())
}

/// 416 response for an invalid or unsatisfiable range.
fn range_not_satisfiable(total: u64) -> Response<EdgeResponseBody> {
    Response::builder()
        .status(StatusCode::RANGE_NOT_SATISFIABLE)
        .header(CONTENT_RANGE, format!("bytes */{total}"))
        .body(EdgeResponseBody::empty())
        .unwrap_or_else(|_| fallback_response())
}

/// Format a timestamp as an HTTP date (IMF-fixdate).
#[must_use]
pub fn format_http_date(ts: &DateTime<Utc>) -> String {
    ts.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Parse an HTTP date header value, if present and well-formed.
fn parse_http_date(value: Option<&http::HeaderValue>) -> Option<DateTime<Utc>> {
    let s = value?.to_str().ok()?;
    DateTime::parse_from_rfc2822(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parse an HTTP `Range` header value into an inclusive byte range.
///
/// Supported forms: `bytes=N-M`, `bytes=N-`, `bytes=-N`. Returns `None`
/// for malformed, multi-part, or unsatisfiable ranges.
fn parse_range(range: &str, content_length: u64) -> Option<(u64, u64)> {
    let range = range.strip_prefix("bytes=")?;
    if content_length == 0 || range.contains(',') {
        return None;
    }

    if let Some(suffix) = range.strip_prefix('-') {
        // bytes=-N  (last N bytes)
        let n: u64 = suffix.parse().ok()?;
        if n == 0 || n > content_length {
            return None;
        }
        Some((content_length - n, content_length - 1))
    } else if let Some(prefix) = range.strip_suffix('-') {
        // bytes=N-  (from N to end)
        let start: u64 = prefix.parse().ok()?;
        if start >= content_length {
            return None;
        }
        Some((start, content_length - 1))
    } else {
        // bytes=N-M
        let (start, end) = range.split_once('-')?;
        let start: u64 = start.parse().ok()?;
        let end: u64 = end.parse().ok()?;
        if start > end || start >= content_length {
            return None;
        }
        Some((start, end.min(content_length - 1)))
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn metadata() -> ObjectMetadata {
        ObjectMetadata {
            content_length: 10,
            last_modified: Utc
                .with_ymd_and_hms(2024, 5, 1, 12, 0, 0)
                .single()
                .expect("test timestamp"),
            content_type: Some("text/plain".to_owned()),
        }
    }

    fn content() -> Bytes {
        Bytes::from_static(b"0123456789")
    }

    #[test]
    fn test_should_serve_full_content_with_headers() {
        let resp = serve_content(&Method::GET, &HeaderMap::new(), &content(), &metadata());
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get(LAST_MODIFIED).expect("test header"),
            "Wed, 01 May 2024 12:00:00 GMT"
        );
        assert_eq!(resp.headers().get(CONTENT_LENGTH).expect("test header"), "10");
        assert_eq!(
            resp.headers().get(CONTENT_TYPE).expect("test header"),
            "text/plain"
        );
        assert_eq!(
            resp.headers().get(ACCEPT_RANGES).expect("test header"),
            "bytes"
        );
    }

    #[test]
    fn test_should_answer_not_modified_for_fresh_client() {
        let mut headers = HeaderMap::new();
        headers.insert(
            IF_MODIFIED_SINCE,
            "Wed, 01 May 2024 12:00:00 GMT".parse().expect("test value"),
        );

        let resp = serve_content(&Method::GET, &headers, &content(), &metadata());
        assert_eq!(resp.status(), StatusCode::NOT_MODIFIED);
        assert!(resp.headers().get(CONTENT_LENGTH).is_none());
    }

    #[test]
    fn test_should_serve_full_content_for_stale_client() {
        let mut headers = HeaderMap::new();
        headers.insert(
            IF_MODIFIED_SINCE,
            "Wed, 01 May 2024 11:00:00 GMT".parse().expect("test value"),
        );

        let resp = serve_content(&Method::GET, &headers, &content(), &metadata());
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[test]
    fn test_should_serve_partial_content_for_range() {
        let mut headers = HeaderMap::new();
        headers.insert(RANGE, "bytes=2-4".parse().expect("test value"));

        let resp = serve_content(&Method::GET, &headers, &content(), &metadata());
        assert_eq!(resp.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(
            resp.headers().get(CONTENT_RANGE).expect("test header"),
            "bytes 2-4/10"
        );
        assert_eq!(resp.headers().get(CONTENT_LENGTH).expect("test header"), "3");
    }

    #[test]
    fn test_should_reject_unsatisfiable_range() {
        let mut headers = HeaderMap::new();
        headers.insert(RANGE, "bytes=100-".parse().expect("test value"));

        let resp = serve_content(&Method::GET, &headers, &content(), &metadata());
        assert_eq!(resp.status(), StatusCode::RANGE_NOT_SATISFIABLE);
        assert_eq!(
            resp.headers().get(CONTENT_RANGE).expect("test header"),
            "bytes */10"
        );
    }

    #[test]
    fn test_should_send_no_body_for_head() {
        use http_body::Body;

        let resp = serve_content(&Method::HEAD, &HeaderMap::new(), &content(), &metadata());
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers().get(CONTENT_LENGTH).expect("test header"), "10");
        assert!(resp.body().is_end_stream());
    }

    #[test]
    fn test_should_parse_range_forms() {
        assert_eq!(parse_range("bytes=0-4", 10), Some((0, 4)));
        assert_eq!(parse_range("bytes=5-", 10), Some((5, 9)));
        assert_eq!(parse_range("bytes=-3", 10), Some((7, 9)));
        assert_eq!(parse_range("bytes=0-999", 10), Some((0, 9)));
        assert_eq!(parse_range("0-4", 10), None);
        assert_eq!(parse_range("bytes=4-2", 10), None);
        assert_eq!(parse_range("bytes=0-1,3-4", 10), None);
        assert_eq!(parse_range("bytes=-0", 10), None);
        assert_eq!(parse_range("bytes=0-", 0), None);
    }
}
