//! HTTP API for an external presentation layer
//!
//! This module exposes one chat session over REST:
//! - GET /health - Health check
//! - GET /session/state - Connection state and session statistics
//! - GET /session/messages - Ordered conversation log
//! - POST /session/connect, /session/disconnect - Connection control
//! - POST /session/send - Send a text message
//! - POST /session/listen/start, /session/listen/stop - Voice recognition

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
