use axum::{http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Response for an error
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub code: u16,
    pub status: String,
    pub error: String,
}

impl ErrorResponse {
    /// Build the `(status, body)` pair handlers return on failure.
    pub fn respond(
        status: StatusCode,
        error: impl Into<String>,
    ) -> (StatusCode, Json<ErrorResponse>) {
        (
            status,
            Json(ErrorResponse {
                code: status.as_u16(),
                status: status.to_string(),
                error: error.into(),
            }),
        )
    }
}
