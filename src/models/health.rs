use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Response for the health check
#[derive(Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    /// Number of resident collaboration rooms.
    pub rooms: usize,
    pub uptime_secs: u64,
}
