use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Read-only views
        .route("/session/state", get(handlers::get_session_state))
        .route("/session/messages", get(handlers::get_messages))
        // Connection control
        .route("/session/connect", post(handlers::connect))
        .route("/session/disconnect", post(handlers::disconnect))
        // User intents
        .route("/session/send", post(handlers::send_text))
        .route("/session/listen/start", post(handlers::start_listening))
        .route("/session/listen/stop", post(handlers::stop_listening))
        // Browser front ends live on another origin
        .layer(CorsLayer::permissive())
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
