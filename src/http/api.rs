//! REST surface for bookmarks, suggestions and health.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::bookmarks::BookmarkSet;
use crate::http::response::ApiError;
use crate::http::server::AppState;

/// Minimum query length before suggestions are offered.
const MIN_QUERY_CHARS: usize = 2;

#[derive(Debug, Deserialize)]
pub struct AddBookmarkRequest {
    pub url: Option<String>,
    pub title: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Success {
    pub success: bool,
}

impl Success {
    fn ok() -> Json<Self> {
        Json(Self { success: true })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub sessions: usize,
    pub timestamp: String,
}

#[derive(Debug, Deserialize)]
pub struct AutocompleteParams {
    pub q: Option<String>,
}

/// `GET /api/bookmarks`
pub async fn list_bookmarks(State(state): State<AppState>) -> Json<BookmarkSet> {
    Json(state.store.list())
}

/// `POST /api/bookmarks` with `{url, title}`.
pub async fn add_bookmark(
    State(state): State<AppState>,
    payload: Result<Json<AddBookmarkRequest>, JsonRejection>,
) -> Result<Json<Success>, ApiError> {
    let Json(request) = payload.map_err(|e| {
        tracing::debug!(error = %e, "Rejected bookmark body");
        ApiError::MissingFields
    })?;

    let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
    match (non_empty(request.url), non_empty(request.title)) {
        (Some(url), Some(title)) => {
            state.store.add(&url, &title, None);
            Ok(Success::ok())
        }
        _ => Err(ApiError::MissingFields),
    }
}

/// `DELETE /api/bookmarks/{url}`; succeeds whether or not it existed.
pub async fn remove_bookmark(State(state): State<AppState>, Path(url): Path<String>) -> Json<Success> {
    state.store.remove(&url);
    Success::ok()
}

/// `DELETE /api/bookmarks`
pub async fn clear_bookmarks(State(state): State<AppState>) -> Json<Success> {
    state.store.clear();
    Success::ok()
}

/// `GET /api/autocomplete?q=`
pub async fn autocomplete(
    State(state): State<AppState>,
    Query(params): Query<AutocompleteParams>,
) -> Json<Vec<String>> {
    let query = params.q.unwrap_or_default();
    Json(suggest(&state.config.autocomplete.suggestions, &query))
}

/// Suggestions containing `query`; none for queries under two characters.
pub fn suggest(candidates: &[String], query: &str) -> Vec<String> {
    if query.chars().count() < MIN_QUERY_CHARS {
        return Vec::new();
    }
    candidates
        .iter()
        .filter(|candidate| candidate.contains(query))
        .cloned()
        .collect()
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "healthy".to_string(),
        sessions: state.sessions.len(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates() -> Vec<String> {
        crate::config::AutocompleteConfig::default().suggestions
    }

    #[test]
    fn test_short_query_has_no_suggestions() {
        assert!(suggest(&candidates(), "").is_empty());
        assert!(suggest(&candidates(), "g").is_empty());
    }

    #[test]
    fn test_substring_match() {
        assert_eq!(suggest(&candidates(), "git"), vec!["https://www.github.com"]);
        assert_eq!(suggest(&candidates(), "https").len(), 4);
        assert!(suggest(&candidates(), "zz").is_empty());
    }
}
