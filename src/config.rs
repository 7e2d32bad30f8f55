use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub connection: ConnectionConfig,
    pub conversation: ConversationConfig,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Assistant backend endpoint
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionConfig {
    pub max_reconnect_attempts: u32,
    pub reconnect_delay_ms: u64,
    pub listen_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConversationConfig {
    /// Status text that marks the end of an assistant turn; empty disables it
    pub turn_finished_marker: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

const ENV_PREFIX: &str = "DEEP_TALK";

impl Config {
    /// Load defaults, then `path` (any format `config` understands, optional),
    /// then `DEEP_TALK__SECTION__KEY` environment overrides.
    pub fn load(path: &str) -> Result<Self> {
        let settings = Self::defaults()?
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()
            .with_context(|| format!("Failed to load config from {}", path))?;

        Ok(settings.try_deserialize()?)
    }

    fn defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>> {
        Ok(config::Config::builder()
            .set_default("server.url", "ws://localhost:8765")?
            .set_default("connection.max_reconnect_attempts", 5)?
            .set_default("connection.reconnect_delay_ms", 3000)?
            .set_default("connection.listen_timeout_ms", 10000)?
            .set_default("conversation.turn_finished_marker", "Response time")?
            .set_default("http.bind", "127.0.0.1")?
            .set_default("http.port", 8080)?)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                url: "ws://localhost:8765".to_string(),
            },
            connection: ConnectionConfig {
                max_reconnect_attempts: 5,
                reconnect_delay_ms: 3000,
                listen_timeout_ms: 10000,
            },
            conversation: ConversationConfig {
                turn_finished_marker: "Response time".to_string(),
            },
            http: HttpConfig {
                bind: "127.0.0.1".to_string(),
                port: 8080,
            },
        }
    }
}
