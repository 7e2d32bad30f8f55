// Scripted in-memory transport for session tests
//
// Each dial pops the next outcome. Accepted dials hand the test a `Peer`:
// the backend side of the link.

#![allow(dead_code)]

use anyhow::{bail, Result};
use deep_talk_client::{Connector, Link, LinkEvent};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy)]
pub enum Outcome {
    Accept,
    Refuse,
}

/// Backend side of an accepted link
pub struct Peer {
    /// Frames the client wrote
    pub sent: mpsc::Receiver<String>,
    /// Events to deliver to the client
    pub events: mpsc::Sender<LinkEvent>,
}

impl Peer {
    pub async fn send_json(&self, json: serde_json::Value) {
        self.events
            .send(LinkEvent::Text(json.to_string()))
            .await
            .expect("client dropped the link");
    }

    pub async fn next_sent(&mut self) -> serde_json::Value {
        let text = tokio::time::timeout(Duration::from_secs(60), self.sent.recv())
            .await
            .expect("no outbound frame")
            .expect("link closed");
        serde_json::from_str(&text).expect("outbound frame is JSON")
    }
}

pub struct ScriptedConnector {
    outcomes: Mutex<VecDeque<Outcome>>,
    /// Used once the script runs out
    fallback: Outcome,
    dials: AtomicUsize,
    peers: mpsc::UnboundedSender<Peer>,
}

impl ScriptedConnector {
    pub fn new(
        outcomes: Vec<Outcome>,
        fallback: Outcome,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<Peer>) {
        let (peers_tx, peers_rx) = mpsc::unbounded_channel();
        let connector = Arc::new(Self {
            outcomes: Mutex::new(outcomes.into()),
            fallback,
            dials: AtomicUsize::new(0),
            peers: peers_tx,
        });
        (connector, peers_rx)
    }

    pub fn dials(&self) -> usize {
        self.dials.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Connector for ScriptedConnector {
    async fn connect(&self, _url: &str) -> Result<Link> {
        self.dials.fetch_add(1, Ordering::SeqCst);

        let outcome = self
            .outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.fallback);

        match outcome {
            Outcome::Refuse => bail!("connection refused"),
            Outcome::Accept => {
                let (outbound_tx, outbound_rx) = mpsc::channel(16);
                let (inbound_tx, inbound_rx) = mpsc::channel(16);
                let _ = self.peers.send(Peer {
                    sent: outbound_rx,
                    events: inbound_tx,
                });
                Ok(Link::new(outbound_tx, inbound_rx))
            }
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
