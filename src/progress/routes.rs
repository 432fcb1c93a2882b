//! Reference in-memory implementation of the `/guide-progress` REST surface.
//!
//! Backs local development and the HTTP integration tests; production
//! deployments point `HttpProgressApi` at their own service.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use tokio::sync::RwLock;

use super::model::{ProgressMap, ProgressPatch, is_valid_page_id};

/// Shared state for the progress routes.
#[derive(Clone, Default)]
pub struct ProgressBackend {
    pages: Arc<RwLock<ProgressMap>>,
}

impl ProgressBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything currently stored.
    pub async fn snapshot(&self) -> ProgressMap {
        self.pages.read().await.clone()
    }
}

/// GET /guide-progress
async fn list_progress(State(backend): State<ProgressBackend>) -> impl IntoResponse {
    Json(backend.snapshot().await)
}

/// PATCH /guide-progress/{page_id}
///
/// Merges `{completed?, skipped?}` into the page's entry and returns it.
async fn patch_progress(
    State(backend): State<ProgressBackend>,
    Path(page_id): Path<String>,
    Json(patch): Json<ProgressPatch>,
) -> impl IntoResponse {
    if !is_valid_page_id(&page_id) {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": "pageId must not be blank"})),
        )
            .into_response();
    }

    let entry = {
        let mut pages = backend.pages.write().await;
        let entry = pages.entry(page_id.clone()).or_default();
        entry.apply(&patch, chrono::Utc::now());
        entry.clone()
    };
    tracing::debug!(page_id = %page_id, "Progress entry patched");
    Json(entry).into_response()
}

/// DELETE /guide-progress/{page_id}
async fn delete_progress(
    State(backend): State<ProgressBackend>,
    Path(page_id): Path<String>,
) -> StatusCode {
    backend.pages.write().await.remove(&page_id);
    StatusCode::NO_CONTENT
}

/// DELETE /guide-progress
async fn delete_all_progress(State(backend): State<ProgressBackend>) -> StatusCode {
    backend.pages.write().await.clear();
    StatusCode::NO_CONTENT
}

/// Build the progress REST routes.
pub fn progress_routes(backend: ProgressBackend) -> Router {
    Router::new()
        .route(
            "/guide-progress",
            get(list_progress).delete(delete_all_progress),
        )
        .route(
            "/guide-progress/{page_id}",
            axum::routing::patch(patch_progress).delete(delete_progress),
        )
        .with_state(backend)
}
