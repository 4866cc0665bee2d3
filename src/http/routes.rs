use super::handlers;
use super::state::AppState;
use axum::{routing::get, Router};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Connected clients
        .route("/sessions", get(handlers::list_sessions))
        // Submission socket
        .route("/ws", get(handlers::ws_upgrade))
        .layer(
            ServiceBuilder::new()
                // Request logging
                .layer(TraceLayer::new_for_http())
                // Browser clients are served from another origin during development
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
