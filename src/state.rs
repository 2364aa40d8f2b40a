use crate::collab::registry::SessionRegistry;
use crate::config::Config;
use crate::db::dbdocs::Db;
use crate::models::ErrorResponse;
use axum::{http::StatusCode, Json};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Everything the handlers and the relay share, owned by the composition
/// root and handed to axum as state. No ambient globals: tests build as many
/// independent `AppState`s as they need.
pub struct AppState {
    pub config: Config,
    pub storage: Option<Arc<Db>>,
    pub registry: SessionRegistry,
    started_at: Instant,
}

impl AppState {
    pub fn new(config: Config, storage: Option<Arc<Db>>) -> Self {
        let registry = SessionRegistry::new(
            storage.clone(),
            Duration::from_millis(config.debounce_ms),
        );
        Self {
            config,
            storage,
            registry,
            started_at: Instant::now(),
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    /// Storage handle, or a 503 for data-backed endpoints in demo mode.
    pub fn require_storage(&self) -> Result<&Arc<Db>, (StatusCode, Json<ErrorResponse>)> {
        self.storage.as_ref().ok_or_else(|| {
            ErrorResponse::respond(
                StatusCode::SERVICE_UNAVAILABLE,
                "No database configured (demo mode)",
            )
        })
    }
}
