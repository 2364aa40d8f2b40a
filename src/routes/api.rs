use crate::handlers::{
    diagnostics, doc_status, file_create, file_delete, health_check, project_create, project_get,
};
use crate::state::AppState;
use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;

/// Create API routes
pub fn create_api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health_check))
        .route("/diagnostics", get(diagnostics))
        .route("/docs/:doc_id", get(doc_status))
        .route("/projects", post(project_create))
        .route("/projects/:project_id", get(project_get))
        .route("/projects/:project_id/files", post(file_create))
        .route("/projects/:project_id/files/:file_id", delete(file_delete))
}
