use crate::connection::ConnectionState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Snapshot of a chat session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    /// Current connection state
    pub state: ConnectionState,

    /// Consecutive unexpected disconnects since the last successful open
    pub reconnect_attempt: u32,

    /// Whether a reconnect is scheduled
    pub reconnect_pending: bool,

    /// Whether voice recognition is waiting for a transcription
    pub listening: bool,

    /// When the session was created
    pub started_at: DateTime<Utc>,

    /// Session age in seconds
    pub duration_secs: f64,

    /// Number of messages in the log
    pub messages_count: usize,

    /// Frames decoded and handed to the log
    pub frames_received: u64,

    /// Frames dropped as undecodable
    pub frames_dropped: u64,
}
