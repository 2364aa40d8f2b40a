use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Stored state and live status of a legacy document
#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct DocumentStatusResponse {
    pub id: String,
    /// Last flushed content. May lag the live session by at most one
    /// debounce interval.
    pub content: String,
    pub updated_at: DateTime<Utc>,
    /// Whether a session for this document is resident in memory.
    pub is_loaded: bool,
    /// Character count of the live session text when loaded, of the stored
    /// content otherwise.
    pub content_length: usize,
}
