use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Process and room diagnostics
#[derive(Serialize, Deserialize, ToSchema)]
pub struct DiagnosticsResponse {
    pub n_conn: u32,
    pub n_rooms: u32,
    /// Rooms with mutations not yet flushed to storage.
    pub n_dirty_rooms: u32,
    pub cpu_usage: f32,
    pub memory_alloc: u64,
    pub memory_total: u64,
    pub memory_free: u64,
}
