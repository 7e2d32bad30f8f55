use super::state::AppState;
use crate::connection::CommandError;
use crate::conversation::MessageLog;
use crate::session::SessionError;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SendTextRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct AcceptedResponse {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn accepted(status: &str) -> Response {
    (
        StatusCode::ACCEPTED,
        Json(AcceptedResponse {
            status: status.to_string(),
        }),
    )
        .into_response()
}

fn session_error(e: SessionError) -> Response {
    let status = match e {
        SessionError::Command(CommandError::NotConnected) => StatusCode::CONFLICT,
        SessionError::Command(CommandError::EmptyText) => StatusCode::BAD_REQUEST,
        SessionError::Closed => StatusCode::SERVICE_UNAVAILABLE,
    };
    warn!("Request refused: {}", e);

    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
        .into_response()
}

fn respond(result: Result<(), SessionError>, status: &str) -> Response {
    match result {
        Ok(()) => accepted(status),
        Err(e) => session_error(e),
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /session/state
/// Connection state and session statistics
pub async fn get_session_state(State(state): State<AppState>) -> Response {
    match state.session.stats().await {
        Ok(stats) => (StatusCode::OK, Json(stats)).into_response(),
        Err(e) => session_error(e),
    }
}

/// GET /session/messages
/// Ordered conversation log
pub async fn get_messages(State(state): State<AppState>) -> Json<MessageLog> {
    Json(state.session.messages())
}

/// POST /session/connect
pub async fn connect(State(state): State<AppState>) -> Response {
    info!("Connect requested over HTTP");
    respond(state.session.connect().await, "connecting")
}

/// POST /session/disconnect
pub async fn disconnect(State(state): State<AppState>) -> Response {
    info!("Disconnect requested over HTTP");
    respond(state.session.disconnect().await, "disconnecting")
}

/// POST /session/send
/// Send a text message to the assistant
pub async fn send_text(
    State(state): State<AppState>,
    Json(req): Json<SendTextRequest>,
) -> Response {
    respond(state.session.send_text(req.text).await, "sent")
}

/// POST /session/listen/start
pub async fn start_listening(State(state): State<AppState>) -> Response {
    respond(state.session.start_listening().await, "listening")
}

/// POST /session/listen/stop
pub async fn stop_listening(State(state): State<AppState>) -> Response {
    respond(state.session.stop_listening().await, "stopped")
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
