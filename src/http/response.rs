//! Client-facing error responses.
//!
//! # Design Decisions
//! - Every handler failure maps to one `ApiError` variant
//! - Bodies are `{"error": "<message>"}` with a fixed, generic message;
//!   upstream causes stay in the logs

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

/// Errors surfaced to HTTP clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Missing, malformed, or non-http(s) proxy target.
    #[error("Invalid URL provided")]
    InvalidUrl,

    /// Bookmark creation without url or title.
    #[error("URL and title are required")]
    MissingFields,

    /// Fetch or rewrite failed.
    #[error("Failed to proxy the requested URL")]
    ProxyFailure,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidUrl | ApiError::MissingFields => StatusCode::BAD_REQUEST,
            ApiError::ProxyFailure => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status(),
            Json(serde_json::json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::InvalidUrl.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::MissingFields.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::ProxyFailure.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_body_is_generic_json() {
        let response = ApiError::ProxyFailure.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "Failed to proxy the requested URL");
    }
}
