pub mod api;

use crate::collab::relay::{collab_query, collab_room};
use crate::docs::ApiDoc;
use crate::state::AppState;
use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Assemble the full application router: REST API, Swagger UI, the collab
/// WebSocket endpoints and (in production) the static client bundle.
pub fn create_app_router(state: Arc<AppState>) -> Router {
    let serve_static = state.config.is_production();

    let mut router = Router::new()
        .nest("/api", api::create_api_routes())
        .route("/collab", get(collab_query))
        .route("/collab/:room", get(collab_room))
        .merge(SwaggerUi::new("/swagger").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    if serve_static {
        // SPA bundle with an index fallback for client-side routes.
        router = router.fallback_service(
            ServeDir::new("client/dist").fallback(ServeFile::new("client/dist/index.html")),
        );
    }

    router
}
