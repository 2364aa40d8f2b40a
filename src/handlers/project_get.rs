use crate::models::{ErrorResponse, ProjectWithFilesResponse};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

/// Fetch a project with its file listing
pub async fn project_get(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<String>,
) -> Result<Json<ProjectWithFilesResponse>, (StatusCode, Json<ErrorResponse>)> {
    let db = state.require_storage()?;

    let project_uuid = match Uuid::parse_str(&project_id) {
        Ok(uuid) => uuid,
        Err(e) => {
            error!("Invalid project id '{}': {}", project_id, e);
            return Err(ErrorResponse::respond(
                StatusCode::BAD_REQUEST,
                format!("Invalid project id '{}'", project_id),
            ));
        }
    };

    let project = match db.get_project(project_uuid).await {
        Ok(Some(row)) => row,
        Ok(None) => {
            return Err(ErrorResponse::respond(
                StatusCode::NOT_FOUND,
                format!("Project '{}' not found", project_id),
            ));
        }
        Err(e) => {
            error!("Failed to load project '{}': {}", project_id, e);
            return Err(ErrorResponse::respond(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to load project '{}'", project_id),
            ));
        }
    };

    let files = match db.list_files(project_uuid).await {
        Ok(files) => files,
        Err(e) => {
            error!("Failed to list files of project '{}': {}", project_id, e);
            return Err(ErrorResponse::respond(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to list files of project '{}'", project_id),
            ));
        }
    };

    Ok(Json(ProjectWithFilesResponse {
        project: project.into(),
        files: files.into_iter().map(Into::into).collect(),
    }))
}
