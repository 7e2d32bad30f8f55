use super::backend::{Connector, Link, LinkEvent};
use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

const CHANNEL_CAPACITY: usize = 64;

/// WebSocket transport carrying JSON text frames
#[derive(Debug, Default, Clone)]
pub struct WebSocketConnector;

impl WebSocketConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self, url: &str) -> Result<Link> {
        info!("Connecting to assistant at {}", url);

        let (ws_stream, _) = connect_async(url)
            .await
            .with_context(|| format!("Failed to connect to {}", url))?;

        let (mut ws_write, mut ws_read) = ws_stream.split();
        let (outbound_tx, mut outbound_rx) = mpsc::channel::<String>(CHANNEL_CAPACITY);
        let (inbound_tx, inbound_rx) = mpsc::channel::<LinkEvent>(CHANNEL_CAPACITY);

        // Writer: ends when the link (and its sender) is dropped
        tokio::spawn(async move {
            while let Some(text) = outbound_rx.recv().await {
                if let Err(e) = ws_write.send(Message::Text(text.into())).await {
                    warn!("WebSocket write failed: {}", e);
                    return;
                }
            }
            debug!("Outbound channel closed, closing WebSocket");
            let _ = ws_write.close().await;
        });

        let reader = tokio::spawn(async move {
            while let Some(msg) = ws_read.next().await {
                let event = match msg {
                    Ok(Message::Text(text)) => LinkEvent::Text(text.as_str().to_owned()),
                    Ok(Message::Close(frame)) => {
                        LinkEvent::Closed(frame.map(|f| f.reason.as_str().to_owned()))
                    }
                    Ok(other) => {
                        debug!("Ignoring non-text WebSocket message: {:?}", other);
                        continue;
                    }
                    Err(e) => LinkEvent::Error(e.to_string()),
                };

                let terminal = !matches!(event, LinkEvent::Text(_));
                if inbound_tx.send(event).await.is_err() || terminal {
                    break;
                }
            }
        });

        info!("WebSocket connected to {}", url);

        Ok(Link::new(outbound_tx, inbound_rx).with_reader(reader.abort_handle()))
    }

    fn name(&self) -> &str {
        "websocket"
    }
}
