use codecolab::config::Config;
use codecolab::db::dbdocs::Db;
use codecolab::routes::create_app_router;
use codecolab::state::AppState;
use std::panic;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Set panic hook for better error messages
    panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
    }));

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            // Default to info level, but allow debug for our app
            "codecolab=debug,tower_http=debug,axum::rejection=trace,info".into()
        }))
        .init();

    info!("Starting server...");

    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        error!("Failed to load configuration: {}", e);
        warn!("Using default configuration");
        Config::default()
    });

    // Connect storage if a database URL is provided; otherwise run in demo
    // mode with purely in-memory rooms.
    let storage = match &config.db_url {
        Some(db_url) => match Db::connect(db_url).await {
            Ok(db) => {
                if let Err(e) = db.init_schema().await {
                    error!("Failed to initialize database schema: {}", e);
                }
                Some(Arc::new(db))
            }
            Err(e) => {
                error!("Failed to connect to database: {}", e);
                warn!("Continuing in demo mode - rooms will not be persisted");
                None
            }
        },
        None => {
            warn!("No DB_URL configured - running in demo mode (in-memory only)");
            None
        }
    };

    let state = Arc::new(AppState::new(config, storage));
    let address = state.config.server_address();
    let app_routes = create_app_router(Arc::clone(&state));

    // Binding the listen port is the only process-fatal failure.
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .unwrap_or_else(|_| panic!("Failed to bind to {}", address));

    info!("🚀 Server running on http://{}", address);
    info!("📡 WebSocket available at ws://{}/collab", address);
    info!("📚 Swagger UI available at http://{}/swagger", address);

    axum::serve(listener, app_routes)
        .await
        .expect("Server failed to start");
}
