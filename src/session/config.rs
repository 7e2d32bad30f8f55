use crate::config::Config;
use crate::connection::ReconnectPolicy;
use crate::conversation::DEFAULT_TURN_FINISHED_MARKER;
use std::time::Duration;

/// Configuration for a chat session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Assistant backend endpoint; every reconnect re-dials it
    pub url: String,

    /// Reconnect limit and flat delay
    pub reconnect: ReconnectPolicy,

    /// How long to wait for a final transcription after start-listening
    /// Default: 10 seconds
    pub listen_timeout: Duration,

    /// Status substring that ends an assistant turn (`None` disables)
    pub turn_finished_marker: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:8765".to_string(),
            reconnect: ReconnectPolicy::default(),
            listen_timeout: Duration::from_secs(10),
            turn_finished_marker: Some(DEFAULT_TURN_FINISHED_MARKER.to_string()),
        }
    }
}

impl From<&Config> for SessionConfig {
    fn from(cfg: &Config) -> Self {
        let marker = &cfg.conversation.turn_finished_marker;
        Self {
            url: cfg.server.url.clone(),
            reconnect: ReconnectPolicy {
                max_attempts: cfg.connection.max_reconnect_attempts,
                delay: Duration::from_millis(cfg.connection.reconnect_delay_ms),
            },
            listen_timeout: Duration::from_millis(cfg.connection.listen_timeout_ms),
            turn_finished_marker: (!marker.is_empty()).then(|| marker.clone()),
        }
    }
}
