use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::{catalog, handlers, middleware::metrics_middleware, reference, sets, verify};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // API routes
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Reference data
        .route("/reference", get(reference::get_info))
        .route("/reference/archives", get(reference::list_archives))
        .route("/reference/checksum/{checksum}", get(reference::get_checksum))
        .route("/reference/archive/{*archive}", get(reference::get_archive))
        // Set matching
        .route("/sets", post(sets::match_sets))
        // Catalog
        .route("/catalog", get(catalog::get_info))
        .route("/catalog/next_file", get(catalog::next_file))
        .route("/catalog/checksum/{checksum}", get(catalog::get_checksum))
        .route(
            "/catalog/archive/{*archive}",
            get(catalog::get_archive)
                .put(catalog::put_archive)
                .delete(catalog::delete_archive),
        )
        // Verification
        .route("/verify/{*archive}", get(verify::verify_archive))
        .layer(middleware::from_fn(metrics_middleware))
        .with_state(Arc::clone(&state));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
