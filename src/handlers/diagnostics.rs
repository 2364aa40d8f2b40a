use crate::models::DiagnosticsResponse;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, Json};
use std::sync::{Arc, Mutex, OnceLock};
use sysinfo::System;
use tracing::info;

static SYSTEM_MONITOR: OnceLock<Mutex<System>> = OnceLock::new();

/// Room and process diagnostics
pub async fn diagnostics(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<DiagnosticsResponse>) {
    // Aggregate room stats from the registry
    let n_rooms = state.registry.room_count().await as u32;
    let (n_conn, n_dirty_rooms) = state.registry.diagnostics().await;

    // System stats
    let (cpu_usage, memory_alloc, memory_free, memory_total) = {
        let sys_lock = SYSTEM_MONITOR.get_or_init(|| Mutex::new(System::new_all()));
        match sys_lock.lock() {
            Ok(mut sys) => {
                sys.refresh_cpu();
                sys.refresh_memory();
                (
                    sys.global_cpu_info().cpu_usage(),
                    sys.used_memory(),
                    sys.free_memory(),
                    sys.total_memory(),
                )
            }
            Err(_) => (0.0, 0, 0, 0),
        }
    };

    info!(
        "Diagnostics: CPU: {:.2}%, Mem: {}/{} MB (Free: {} MB), Conn: {}, Rooms: {}",
        cpu_usage,
        memory_alloc / 1024 / 1024,
        memory_total / 1024 / 1024,
        memory_free / 1024 / 1024,
        n_conn,
        n_rooms
    );

    (
        StatusCode::OK,
        Json(DiagnosticsResponse {
            n_conn: n_conn as u32,
            n_rooms,
            n_dirty_rooms: n_dirty_rooms as u32,
            cpu_usage,
            memory_alloc,
            memory_total,
            memory_free,
        }),
    )
}
