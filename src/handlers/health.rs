use crate::models::HealthResponse;
use crate::state::AppState;
use axum::{extract::State, Json};
use std::sync::Arc;
use tracing::debug;

/// Health check endpoint
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    debug!("Health check requested");
    Json(HealthResponse {
        status: "ok".to_string(),
        rooms: state.registry.room_count().await,
        uptime_secs: state.uptime_secs(),
    })
}
