use super::config::SessionConfig;
use super::driver::{Command, SessionDriver};
use super::stats::SessionStats;
use crate::connection::{CommandError, ConnectionState};
use crate::conversation::MessageLog;
use crate::transport::Connector;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("Session has shut down")]
    Closed,
}

/// Handle to a running chat session
///
/// Cheap to clone; every clone talks to the same session task, so there is
/// exactly one connection and one authoritative log. The task tears itself
/// down when [`shutdown`](Self::shutdown) is called or every handle is dropped.
#[derive(Clone)]
pub struct ChatSession {
    commands: mpsc::Sender<Command>,
    log_rx: watch::Receiver<MessageLog>,
    state_rx: watch::Receiver<ConnectionState>,
}

impl ChatSession {
    /// Spawn the session task on the current tokio runtime
    ///
    /// The session starts disconnected; call [`connect`](Self::connect).
    pub fn spawn(config: SessionConfig, connector: Arc<dyn Connector>) -> Self {
        info!("Creating chat session for {}", config.url);

        let (commands_tx, commands_rx) = mpsc::channel(32);
        let (log_tx, log_rx) = watch::channel(MessageLog::new());
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);

        let driver = SessionDriver::new(config, connector, log_tx, state_tx);
        tokio::spawn(driver.run(commands_rx));

        Self {
            commands: commands_tx,
            log_rx,
            state_rx,
        }
    }

    /// Dial the backend unless already connecting or connected
    pub async fn connect(&self) -> Result<(), SessionError> {
        self.submit(Command::Connect).await
    }

    /// Close the connection without scheduling a reconnect
    pub async fn disconnect(&self) -> Result<(), SessionError> {
        self.submit(Command::Disconnect).await
    }

    pub async fn send_text(&self, text: impl Into<String>) -> Result<(), SessionError> {
        let text = text.into();
        self.request(|reply| Command::SendText(text, reply))
            .await?
            .map_err(SessionError::from)
    }

    pub async fn start_listening(&self) -> Result<(), SessionError> {
        self.request(Command::StartListening)
            .await?
            .map_err(SessionError::from)
    }

    pub async fn stop_listening(&self) -> Result<(), SessionError> {
        self.request(Command::StopListening)
            .await?
            .map_err(SessionError::from)
    }

    /// Current snapshot of the conversation log
    pub fn messages(&self) -> MessageLog {
        self.log_rx.borrow().clone()
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Receiver notified on every log change
    pub fn subscribe_messages(&self) -> watch::Receiver<MessageLog> {
        self.log_rx.clone()
    }

    /// Receiver notified on every connection state change
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    pub async fn stats(&self) -> Result<SessionStats, SessionError> {
        self.request(Command::Stats).await
    }

    /// Disconnect, cancel all timers and stop the session task
    pub async fn shutdown(&self) -> Result<SessionStats, SessionError> {
        info!("Shutting down chat session");
        self.request(Command::Shutdown).await
    }

    async fn submit(&self, command: Command) -> Result<(), SessionError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| SessionError::Closed)
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.submit(command(reply_tx)).await?;
        reply_rx.await.map_err(|_| SessionError::Closed)
    }
}
