//! Request identification and origin detection.
//!
//! # Responsibilities
//! - Generate a UUID request ID for every request (`x-request-id`)
//! - Echo it on the response and attach it to the request span
//! - Work out the origin clients reach this proxy through
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Proxy origin comes from the request, not the bind address, so injected
//!   scripts point at whatever host the browser actually used

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderName, Request};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tracing::Span;

/// Header carrying the request ID.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

const X_FORWARDED_PROTO: &str = "x-forwarded-proto";

/// Layer assigning a fresh UUID to requests that arrive without one.
pub fn set_request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid)
}

/// Layer copying the request ID onto the response.
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::new(X_REQUEST_ID)
}

/// Request ID from headers, or `"unknown"`.
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Span for one HTTP request, tagged with its ID.
pub fn make_request_span(request: &Request<Body>) -> Span {
    tracing::info_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
        request_id = %request_id(request.headers()),
    )
}

/// `<scheme>://<host>` as seen by the client.
pub fn proxy_origin(headers: &HeaderMap, default_scheme: &str, default_host: &str) -> String {
    let scheme = headers
        .get(X_FORWARDED_PROTO)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| matches!(*v, "http" | "https"))
        .unwrap_or(default_scheme);
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .unwrap_or(default_host);
    format!("{}://{}", scheme, host)
}
