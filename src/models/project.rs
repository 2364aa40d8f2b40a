use crate::db::dbdocs::ProjectRow;
use crate::models::FileResponse;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct CreateProjectRequest {
    pub name: String,
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct ProjectResponse {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProjectRow> for ProjectResponse {
    fn from(row: ProjectRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// A project together with its file listing.
#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct ProjectWithFilesResponse {
    pub project: ProjectResponse,
    pub files: Vec<FileResponse>,
}
