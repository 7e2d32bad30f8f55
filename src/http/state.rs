use crate::session::ChatSession;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// The session every request talks to
    pub session: ChatSession,
}

impl AppState {
    pub fn new(session: ChatSession) -> Self {
        Self { session }
    }
}
