use crate::models::{CreateProjectRequest, ErrorResponse, ProjectResponse};
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;
use tracing::error;

/// Create a new project
pub async fn project_create(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateProjectRequest>,
) -> Result<(StatusCode, Json<ProjectResponse>), (StatusCode, Json<ErrorResponse>)> {
    let db = state.require_storage()?;

    let name = payload.name.trim();
    if name.is_empty() {
        return Err(ErrorResponse::respond(
            StatusCode::BAD_REQUEST,
            "Project name cannot be empty",
        ));
    }

    match db.insert_project(name).await {
        Ok(row) => Ok((StatusCode::CREATED, Json(row.into()))),
        Err(e) => {
            error!("Failed to create project '{}': {}", name, e);
            Err(ErrorResponse::respond(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to create project",
            ))
        }
    }
}
