use crate::collab::engine::ManifestEntry;
use crate::models::*;
use utoipa::OpenApi;

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
#[allow(dead_code)]
pub async fn health_check_doc() {}

/// Room and process diagnostics
#[utoipa::path(
    get,
    path = "/api/diagnostics",
    responses(
        (status = 200, description = "Diagnostics snapshot", body = DiagnosticsResponse)
    )
)]
#[allow(dead_code)]
pub async fn diagnostics_doc() {}

/// Fetch a legacy document row with its live status
#[utoipa::path(
    get,
    path = "/api/docs/{doc_id}",
    params(("doc_id" = String, Path, description = "Document id")),
    responses(
        (status = 200, description = "Document found", body = DocumentStatusResponse),
        (status = 404, description = "Document not found", body = ErrorResponse),
        (status = 503, description = "No database configured", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn doc_status_doc() {}

/// Create a new project
#[utoipa::path(
    post,
    path = "/api/projects",
    request_body = CreateProjectRequest,
    responses(
        (status = 201, description = "Project created", body = ProjectResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn project_create_doc() {}

/// Fetch a project with its files
#[utoipa::path(
    get,
    path = "/api/projects/{project_id}",
    params(("project_id" = String, Path, description = "Project id")),
    responses(
        (status = 200, description = "Project found", body = ProjectWithFilesResponse),
        (status = 404, description = "Project not found", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn project_get_doc() {}

/// Create a file in a project
#[utoipa::path(
    post,
    path = "/api/projects/{project_id}/files",
    params(("project_id" = String, Path, description = "Project id")),
    request_body = CreateFileRequest,
    responses(
        (status = 201, description = "File created", body = FileResponse),
        (status = 404, description = "Project not found", body = ErrorResponse),
        (status = 409, description = "Path already exists", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn file_create_doc() {}

/// Delete a file from a project
#[utoipa::path(
    delete,
    path = "/api/projects/{project_id}/files/{file_id}",
    params(
        ("project_id" = String, Path, description = "Project id"),
        ("file_id" = String, Path, description = "File id")
    ),
    responses(
        (status = 204, description = "File deleted"),
        (status = 404, description = "File not found", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn file_delete_doc() {}

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check_doc,
        diagnostics_doc,
        doc_status_doc,
        project_create_doc,
        project_get_doc,
        file_create_doc,
        file_delete_doc,
    ),
    components(
        schemas(
            HealthResponse,
            DiagnosticsResponse,
            DocumentStatusResponse,
            CreateProjectRequest,
            ProjectResponse,
            ProjectWithFilesResponse,
            CreateFileRequest,
            FileResponse,
            ManifestEntry,
            ErrorResponse
        )
    ),
    tags(
        (name = "api", description = "API endpoints")
    )
)]
pub struct ApiDoc;
