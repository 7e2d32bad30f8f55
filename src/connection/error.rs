use thiserror::Error;

/// Why a user intent was refused before anything was sent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("Not connected to server")]
    NotConnected,

    #[error("Message text is empty")]
    EmptyText,
}
