// Copyright 2026 serp-harvest Contributors
// SPDX-License-Identifier: Apache-2.0

//! HTTP REST API for the harvester.
//!
//! Every acquisition route maps 1:1 to an [`Acquirer`] call, bounded by the
//! configured request deadline. Responses are JSON arrays of stored results.

use crate::acquisition::Acquirer;
use crate::error::AcquireError;
use crate::model::SearchResult;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Keyword used when a request omits one.
pub const DEFAULT_KEYWORD: &str = "hiking";

/// State shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    pub acquirer: Arc<Acquirer>,
    pub deadline: Duration,
}

impl AppState {
    pub fn new(acquirer: Arc<Acquirer>, deadline: Duration) -> Self {
        Self { acquirer, deadline }
    }
}

/// Build the axum Router with all REST endpoints.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/scraper/search-google", get(search_api))
        .route("/scraper/google", get(search_api))
        .route("/scraper/search-browser", get(search_browser))
        .route("/scraper/all", get(list_all))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the REST API server on the given port, on all interfaces.
///
/// Runs until the process is stopped.
pub async fn start(port: u16, state: AppState) -> anyhow::Result<()> {
    let app = router(state);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("REST API listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

// ── Helpers ─────────────────────────────────────────────────────

#[derive(serde::Deserialize, Default)]
struct KeywordParams {
    keyword: Option<String>,
}

impl KeywordParams {
    fn keyword(&self) -> &str {
        match self.keyword.as_deref().map(str::trim) {
            Some(k) if !k.is_empty() => k,
            _ => DEFAULT_KEYWORD,
        }
    }
}

/// Acquisition failure rendered as `{"error": {"code", "message"}}`.
struct ApiError(AcquireError);

impl From<AcquireError> for ApiError {
    fn from(e: AcquireError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            AcquireError::InvalidKeyword => StatusCode::BAD_REQUEST,
            AcquireError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AcquireError::Cancelled => StatusCode::GATEWAY_TIMEOUT,
        };
        if status.is_server_error() {
            tracing::error!(code = self.0.code(), "request failed: {}", self.0);
        }
        let body = serde_json::json!({
            "error": { "code": self.0.code(), "message": self.0.to_string() }
        });
        (status, Json(body)).into_response()
    }
}

// ── Handlers ────────────────────────────────────────────────────

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(serde_json::json!({
        "status": "ok",
        "browser_tier": state.acquirer.has_browser_tier(),
    }))
}

async fn search_api(
    State(state): State<AppState>,
    Query(params): Query<KeywordParams>,
) -> Result<Json<Vec<SearchResult>>, ApiError> {
    let results = state
        .acquirer
        .acquire_with_deadline(params.keyword(), false, state.deadline)
        .await?;
    Ok(Json(results))
}

async fn search_browser(
    State(state): State<AppState>,
    Query(params): Query<KeywordParams>,
) -> Result<Json<Vec<SearchResult>>, ApiError> {
    let results = state
        .acquirer
        .acquire_with_deadline(params.keyword(), true, state.deadline)
        .await?;
    Ok(Json(results))
}

async fn list_all(State(state): State<AppState>) -> Result<Json<Vec<SearchResult>>, ApiError> {
    let results = state
        .acquirer
        .store()
        .list_recent(None)
        .await
        .map_err(AcquireError::from)?;
    Ok(Json(results))
}
