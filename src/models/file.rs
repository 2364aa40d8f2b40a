use crate::db::dbdocs::FileRow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct CreateFileRequest {
    pub name: String,
    /// Defaults to `name` when omitted.
    pub path: Option<String>,
    pub language: Option<String>,
}

/// File metadata as returned by the REST boundary. Content is deliberately
/// absent: while a session is live its in-memory state is authoritative, and
/// clients read it over the collab socket.
#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct FileResponse {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub path: String,
    pub language: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<FileRow> for FileResponse {
    fn from(row: FileRow) -> Self {
        Self {
            id: row.id,
            project_id: row.project_id,
            name: row.name,
            path: row.path,
            language: row.language,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
