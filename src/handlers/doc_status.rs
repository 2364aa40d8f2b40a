use crate::collab::address::RoomAddress;
use crate::models::{DocumentStatusResponse, ErrorResponse};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::error;

/// Fetch the stored row and live status of a legacy document
pub async fn doc_status(
    State(state): State<Arc<AppState>>,
    Path(doc_id): Path<String>,
) -> Result<Json<DocumentStatusResponse>, (StatusCode, Json<ErrorResponse>)> {
    let db = state.require_storage()?;

    let row = match db.load_document_row(&doc_id).await {
        Ok(Some(row)) => row,
        Ok(None) => {
            return Err(ErrorResponse::respond(
                StatusCode::NOT_FOUND,
                format!("Document '{}' not found", doc_id),
            ));
        }
        Err(e) => {
            error!("Failed to load document '{}': {}", doc_id, e);
            return Err(ErrorResponse::respond(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to load document '{}'", doc_id),
            ));
        }
    };

    let address = RoomAddress::LegacyDocument {
        document_id: doc_id.clone(),
    };
    let live = state.registry.get_resident(&address).await;
    let (is_loaded, content_length) = match &live {
        // The resident session is authoritative between flushes.
        Some(session) => (true, session.engine().current_text().chars().count()),
        None => (false, row.content.chars().count()),
    };

    Ok(Json(DocumentStatusResponse {
        id: row.id,
        content: row.content,
        updated_at: row.updated_at,
        is_loaded,
        content_length,
    }))
}
