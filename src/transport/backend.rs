use anyhow::Result;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;

/// Event delivered by a live transport
#[derive(Debug, Clone, PartialEq)]
pub enum LinkEvent {
    /// One text frame from the backend
    Text(String),
    /// The peer closed the connection, with its reason if it gave one
    Closed(Option<String>),
    /// The transport failed
    Error(String),
}

/// One open transport instance
///
/// Dropping a `Link` detaches it: the inbound reader is aborted and closing
/// the outbound sender lets the writer shut the socket down.
pub struct Link {
    /// Text frames to write to the backend
    pub outbound: mpsc::Sender<String>,
    /// Events read from the backend; `None` means the reader has ended
    pub inbound: mpsc::Receiver<LinkEvent>,
    reader: Option<AbortHandle>,
}

impl Link {
    pub fn new(outbound: mpsc::Sender<String>, inbound: mpsc::Receiver<LinkEvent>) -> Self {
        Self {
            outbound,
            inbound,
            reader: None,
        }
    }

    /// Abort `reader` when this link is dropped
    pub fn with_reader(mut self, reader: AbortHandle) -> Self {
        self.reader = Some(reader);
        self
    }
}

impl Drop for Link {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}

/// Dials the assistant backend
///
/// Implementations:
/// - WebSocket: production transport
/// - Scripted channels: tests
#[async_trait::async_trait]
pub trait Connector: Send + Sync {
    /// Open a transport to `url`, resolving once the handshake completes
    async fn connect(&self, url: &str) -> Result<Link>;

    /// Connector name for logging
    fn name(&self) -> &str;
}
