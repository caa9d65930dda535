//! `GET /proxy?url=<target>`: fetch, rewrite, re-serve.
//!
//! # Data Flow
//! ```text
//! query `url`
//!     → parse_target (http/https only)          ─ 400 on failure, nothing fetched
//!     → FetchClient::fetch                      ─ 500 on timeout/status/network
//!     → HTML?  PageRewriter::rewrite → text/html, upstream charset kept
//!       else   body as-is, original Content-Type
//! ```

use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::http::request::{proxy_origin, request_id};
use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::rewrite::{document_encoding, parse_target};

#[derive(Debug, Deserialize)]
pub struct ProxyParams {
    pub url: Option<String>,
}

/// Proxy a single page load.
pub async fn proxy_handler(
    State(state): State<AppState>,
    Query(params): Query<ProxyParams>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let request_id = request_id(&headers).to_string();

    let raw = params
        .url
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| {
            metrics::record_proxy_request("invalid");
            ApiError::InvalidUrl
        })?;
    let target = parse_target(&raw).map_err(|e| {
        tracing::debug!(request_id = %request_id, error = %e, "Rejected proxy target");
        metrics::record_proxy_request("invalid");
        ApiError::InvalidUrl
    })?;

    let page = state.fetcher.fetch(&target).await.map_err(|e| {
        tracing::warn!(
            request_id = %request_id,
            url = %target,
            kind = e.kind(),
            error = %e,
            "Upstream fetch failed"
        );
        metrics::record_proxy_request("fetch_failed");
        ApiError::ProxyFailure
    })?;

    if !page.is_html() {
        metrics::record_proxy_request("passthrough");
        let content_type = page
            .content_type
            .unwrap_or_else(|| "application/octet-stream".to_string());
        return Ok((StatusCode::OK, [(header::CONTENT_TYPE, content_type)], page.body).into_response());
    }

    let origin = proxy_origin(
        &headers,
        &state.config.listener.public_scheme,
        &state.config.listener.bind_address,
    );
    let encoding = document_encoding(page.content_type.as_deref(), &page.body);
    let rewritten = state
        .rewriter
        .rewrite(&page.body, encoding, &page.final_url, &origin)
        .map_err(|e| {
            tracing::error!(request_id = %request_id, url = %target, error = %e, "Rewrite failed");
            metrics::record_proxy_request("rewrite_failed");
            ApiError::ProxyFailure
        })?;

    tracing::info!(
        request_id = %request_id,
        url = %target,
        forms = rewritten.stats.forms,
        media = rewritten.stats.media,
        styles = rewritten.stats.styles,
        skipped = rewritten.stats.skipped,
        encoding = rewritten.encoding.name(),
        "Proxied page"
    );
    metrics::record_proxy_request("rewritten");

    let content_type = format!("text/html; charset={}", rewritten.encoding.name().to_ascii_lowercase());
    Ok((StatusCode::OK, [(header::CONTENT_TYPE, content_type)], rewritten.body).into_response())
}
