//! HTTP request handlers

use super::state::AppState;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

/// Query parameters for search
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    /// Search query
    pub q: Option<String>,
    /// Comma-separated source filter
    pub sources: Option<String>,
}

/// Search handler: `GET /search?q=...&sources=a,b`
///
/// Returns 400 when `q` is missing, 500 when every selected connector
/// failed, and otherwise a JSON array of hits (always an array, `[]`
/// when there are none).
pub async fn search(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Response {
    let Some(query) = params.q.filter(|q| !q.is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "missing required parameter: q"})),
        )
            .into_response();
    };

    // An absent or empty sources parameter means no restriction.
    let sources: Option<Vec<String>> = params
        .sources
        .filter(|s| !s.is_empty())
        .map(|s| s.split(',').map(str::to_string).collect());

    match state
        .engine
        .search_with_sources(&query, sources.as_deref())
        .await
    {
        Ok(hits) => Json(hits).into_response(),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": err.to_string()})),
        )
            .into_response(),
    }
}

/// Health check handler
pub async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": crate::VERSION
    }))
}

/// Embedded single-page web UI
pub async fn index() -> impl IntoResponse {
    Html(include_str!("index.html"))
}
