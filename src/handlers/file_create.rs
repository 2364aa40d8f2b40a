use crate::collab::address::RoomAddress;
use crate::models::{CreateFileRequest, ErrorResponse, FileResponse};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use sqlx::error::ErrorKind;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

/// Create a file in a project and push it into the project's resident
/// file-manifest room, so connected clients observe it without a reconnect.
pub async fn file_create(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<String>,
    Json(payload): Json<CreateFileRequest>,
) -> Result<(StatusCode, Json<FileResponse>), (StatusCode, Json<ErrorResponse>)> {
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

    let name = payload.name.trim();
    if name.is_empty() {
        return Err(ErrorResponse::respond(
            StatusCode::BAD_REQUEST,
            "File name cannot be empty",
        ));
    }
    let path = payload.path.as_deref().unwrap_or(name);
    let language = payload.language.as_deref().unwrap_or("");

    match db.get_project(project_uuid).await {
        Ok(Some(_)) => {}
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
    }

    let file = match db.insert_file(project_uuid, name, path, language).await {
        Ok(row) => row,
        Err(sqlx::Error::Database(db_err))
            if matches!(db_err.kind(), ErrorKind::UniqueViolation) =>
        {
            return Err(ErrorResponse::respond(
                StatusCode::CONFLICT,
                format!("A file at path '{}' already exists in this project", path),
            ));
        }
        Err(e) => {
            error!("Failed to create file '{}' in project '{}': {}", path, project_id, e);
            return Err(ErrorResponse::respond(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to create file",
            ));
        }
    };

    // Repair the derived manifest room if it is resident; a room hydrated
    // later reads the new row from the table anyway.
    let address = RoomAddress::FileManifest {
        project_id: project_uuid.to_string(),
    };
    if let Some(session) = state.registry.get_resident(&address).await {
        match session.engine().push_manifest_entry(&file.manifest_entry()) {
            Ok(()) => {
                session.broadcast_local_delta().await;
                info!("Pushed file '{}' into manifest room '{}'", file.id, address);
            }
            Err(e) => error!("Failed to push manifest entry for '{}': {}", file.id, e),
        }
    }

    Ok((StatusCode::CREATED, Json(file.into())))
}
