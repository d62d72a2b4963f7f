//! Response assembly helpers: plain-text errors, CORS decoration, and
//! per-tenant response headers.

use http::header::{HeaderName, HeaderValue};
use http::{Response, StatusCode};

use edgecdn_core::error::EdgeError;
use edgecdn_core::tenant::CorsRule;

use crate::body::EdgeResponseBody;

/// Build a plain-text response with the given status and message.
#[must_use]
pub fn plain_text(status: StatusCode, message: &str) -> Response<EdgeResponseBody> {
    Response::builder()
        .status(status)
        .header(http::header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(EdgeResponseBody::from_string(message))
        .unwrap_or_else(|_| fallback_response())
}

/// Map a request-path error onto its client-visible response.
///
/// Store errors intentionally carry the backend message into the 500
/// body.
#[must_use]
pub fn error_to_response(err: &EdgeError) -> Response<EdgeResponseBody> {
    let status = match err {
        EdgeError::TenantNotFound | EdgeError::ObjectNotFound => StatusCode::NOT_FOUND,
        EdgeError::TenantInactive => StatusCode::GONE,
        EdgeError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    plain_text(status, &err.to_string())
}

/// Last-resort 500 used when response assembly itself fails.
#[must_use]
pub fn fallback_response() -> Response<EdgeResponseBody> {
    Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .body(EdgeResponseBody::empty())
        .expect("static response should be valid")
}

/// Apply the matched CORS rule's headers to a response.
///
/// Each header is emitted only when the rule defines a value for it;
/// lists are joined with `,`.
pub fn apply_cors_headers(response: &mut Response<EdgeResponseBody>, rule: &CorsRule) {
    set_list_header(
        response,
        "access-control-allow-origin",
        &rule.allowed_origins,
    );
    set_list_header(
        response,
        "access-control-allow-methods",
        &rule.allowed_methods,
    );
    set_list_header(
        response,
        "access-control-allow-headers",
        &rule.allowed_headers,
    );
    set_list_header(
        response,
        "access-control-expose-headers",
        &rule.expose_headers,
    );
    if let Some(max_age) = rule.max_age_seconds {
        if let Ok(value) = HeaderValue::from_str(&max_age.to_string()) {
            response
                .headers_mut()
                .insert("access-control-max-age", value);
        }
    }
}

/// Apply the tenant's configured extra response headers.
///
/// Invalid names or values are skipped rather than failing the
/// response.
pub fn apply_tenant_headers<'a>(
    response: &mut Response<EdgeResponseBody>,
    headers: impl IntoIterator<Item = (&'a String, &'a String)>,
) {
    for (name, value) in headers {
        let Ok(name) = name.parse::<HeaderName>() else {
            continue;
        };
        let Ok(value) = HeaderValue::from_str(value) else {
            continue;
        };
        response.headers_mut().insert(name, value);
    }
}

/// Set a comma-joined list header if the list is non-empty.
fn set_list_header(
    response: &mut Response<EdgeResponseBody>,
    name: &'static str,
    values: &[String],
) {
    if values.is_empty() {
        return;
    }
    if let Ok(value) = HeaderValue::from_str(&values.join(",")) {
        response.headers_mut().insert(name, value);
    }
}
