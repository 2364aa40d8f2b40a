use crate::collab::address::RoomAddress;
use crate::models::ErrorResponse;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

/// Delete a file from a project and remove it from the project's resident
/// file-manifest room.
pub async fn file_delete(
    State(state): State<Arc<AppState>>,
    Path((project_id, file_id)): Path<(String, String)>,
) -> Result<StatusCode, (StatusCode, Json<ErrorResponse>)> {
    let db = state.require_storage()?;

    let (project_uuid, file_uuid) = match (Uuid::parse_str(&project_id), Uuid::parse_str(&file_id))
    {
        (Ok(p), Ok(f)) => (p, f),
        _ => {
            return Err(ErrorResponse::respond(
                StatusCode::BAD_REQUEST,
                format!("Invalid project or file id '{}'/'{}'", project_id, file_id),
            ));
        }
    };

    match db.delete_file(project_uuid, file_uuid).await {
        Ok(true) => {}
        Ok(false) => {
            return Err(ErrorResponse::respond(
                StatusCode::NOT_FOUND,
                format!("File '{}' not found in project '{}'", file_id, project_id),
            ));
        }
        Err(e) => {
            error!("Failed to delete file '{}': {}", file_id, e);
            return Err(ErrorResponse::respond(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to delete file",
            ));
        }
    }

    let address = RoomAddress::FileManifest {
        project_id: project_uuid.to_string(),
    };
    if let Some(session) = state.registry.get_resident(&address).await {
        match session.engine().remove_manifest_entry(&file_uuid.to_string()) {
            Ok(true) => {
                session.broadcast_local_delta().await;
                info!("Removed file '{}' from manifest room '{}'", file_id, address);
            }
            Ok(false) => {}
            Err(e) => error!("Failed to remove manifest entry '{}': {}", file_id, e),
        }
    }

    Ok(StatusCode::NO_CONTENT)
}
