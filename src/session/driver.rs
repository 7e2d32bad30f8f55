use super::config::SessionConfig;
use super::stats::SessionStats;
use crate::connection::{CommandError, ConnectionManager, ConnectionState, LinkId, Output};
use crate::conversation::{Input, Intent, MessageLog, MessageStreamReducer};
use crate::protocol::OutboundFrame;
use crate::transport::{Connector, Link, LinkEvent};
use anyhow::Result;
use chrono::{DateTime, Utc};
use std::future;
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

pub(crate) type Reply<T> = oneshot::Sender<T>;

/// Requests from session handles to the session task
pub(crate) enum Command {
    Connect,
    Disconnect,
    SendText(String, Reply<Result<(), CommandError>>),
    StartListening(Reply<Result<(), CommandError>>),
    StopListening(Reply<Result<(), CommandError>>),
    Stats(Reply<SessionStats>),
    Shutdown(Reply<SessionStats>),
}

struct DialResult {
    link: LinkId,
    result: Result<Link>,
}

/// Owns the connection manager, the log and the live link
///
/// Runs as one task; commands, dial results, link events and timer expiry
/// are handled one at a time, so nothing here needs a lock.
pub(crate) struct SessionDriver {
    url: String,
    connector: Arc<dyn Connector>,
    manager: ConnectionManager,
    reducer: MessageStreamReducer,
    log: MessageLog,

    /// The live transport, tagged with the id the manager gave it
    link: Option<(LinkId, Link)>,

    /// Dial in flight
    dial_task: Option<(LinkId, JoinHandle<()>)>,
    dial_tx: mpsc::Sender<DialResult>,
    dial_rx: mpsc::Receiver<DialResult>,

    log_tx: watch::Sender<MessageLog>,
    state_tx: watch::Sender<ConnectionState>,
    started_at: DateTime<Utc>,
}

impl SessionDriver {
    pub(crate) fn new(
        config: SessionConfig,
        connector: Arc<dyn Connector>,
        log_tx: watch::Sender<MessageLog>,
        state_tx: watch::Sender<ConnectionState>,
    ) -> Self {
        let (dial_tx, dial_rx) = mpsc::channel(4);

        Self {
            url: config.url,
            connector,
            manager: ConnectionManager::new(config.reconnect, config.listen_timeout),
            reducer: MessageStreamReducer::new(config.turn_finished_marker),
            log: MessageLog::new(),
            link: None,
            dial_task: None,
            dial_tx,
            dial_rx,
            log_tx,
            state_tx,
            started_at: Utc::now(),
        }
    }

    pub(crate) async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        info!("Session task started ({} transport)", self.connector.name());

        loop {
            let deadline = self.manager.poll_timeout();

            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Shutdown(reply)) => {
                        self.teardown();
                        let _ = reply.send(self.stats());
                        break;
                    }
                    Some(command) => self.handle_command(command),
                    None => {
                        debug!("All session handles dropped");
                        self.teardown();
                        break;
                    }
                },
                Some(dial) = self.dial_rx.recv() => self.handle_dial(dial),
                (link, event) = next_link_event(&mut self.link) => self.handle_link_event(link, event),
                _ = sleep_until(deadline) => self.manager.handle_timeout(Instant::now()),
            }

            self.flush();
        }

        info!("Session task stopped");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Connect => self.manager.connect(),
            Command::Disconnect => self.manager.disconnect(),
            Command::SendText(text, reply) => {
                let result = self.manager.send_text(&text);
                if result.is_ok() {
                    self.record(Intent::TextSent(text));
                }
                let _ = reply.send(result);
            }
            Command::StartListening(reply) => {
                let result = self.manager.start_listening(Instant::now());
                if result.is_ok() {
                    self.record(Intent::ListeningStarted);
                }
                let _ = reply.send(result);
            }
            Command::StopListening(reply) => {
                let result = self.manager.stop_listening();
                if result.is_ok() {
                    self.record(Intent::ListeningStopped);
                }
                let _ = reply.send(result);
            }
            Command::Stats(reply) => {
                let _ = reply.send(self.stats());
            }
            // handled by the run loop
            Command::Shutdown(_) => {}
        }
    }

    fn handle_dial(&mut self, dial: DialResult) {
        if matches!(&self.dial_task, Some((link, _)) if *link == dial.link) {
            self.dial_task = None;
        }

        if !self.manager.is_current(dial.link) {
            debug!("Discarding result of stale dial {}", dial.link);
            return;
        }

        match dial.result {
            Ok(link) => {
                self.link = Some((dial.link, link));
                self.manager.on_open(dial.link);
            }
            Err(e) => {
                error!("Failed to connect to {}: {:#}", self.url, e);
                self.manager
                    .on_lost(dial.link, &format!("{:#}", e), Instant::now());
            }
        }
    }

    fn handle_link_event(&mut self, link: LinkId, event: Option<LinkEvent>) {
        match event {
            Some(LinkEvent::Text(payload)) => self.manager.on_text(link, &payload),
            Some(LinkEvent::Closed(reason)) => {
                let reason = reason.unwrap_or_else(|| "closed by server".to_string());
                self.manager.on_lost(link, &reason, Instant::now());
            }
            Some(LinkEvent::Error(e)) => self.manager.on_lost(link, &e, Instant::now()),
            None => self
                .manager
                .on_lost(link, "transport ended", Instant::now()),
        }
    }

    /// Carry out everything the manager asked for
    fn flush(&mut self) {
        while let Some(output) = self.manager.poll_output() {
            match output {
                Output::Dial(link) => self.dial(link),
                Output::Teardown(link) => self.teardown_link(link),
                Output::Send(frame) => self.send(frame),
                Output::StateChanged(state) => {
                    info!("Connection state: {}", state);
                    self.state_tx.send_replace(state);
                }
                Output::Frame(frame) => self.record(frame),
                Output::ListenTimedOut => self.record(Intent::ListenTimedOut),
            }
        }
    }

    fn dial(&mut self, link: LinkId) {
        if let Some((previous, task)) = self.dial_task.take() {
            debug!("Aborting dial {}", previous);
            task.abort();
        }

        let connector = Arc::clone(&self.connector);
        let url = self.url.clone();
        let dial_tx = self.dial_tx.clone();

        let task = tokio::spawn(async move {
            let result = connector.connect(&url).await;
            let _ = dial_tx.send(DialResult { link, result }).await;
        });
        self.dial_task = Some((link, task));
    }

    fn teardown_link(&mut self, link: LinkId) {
        if matches!(&self.link, Some((current, _)) if *current == link) {
            debug!("Dropping link {}", link);
            self.link = None;
        }
        if matches!(&self.dial_task, Some((pending, _)) if *pending == link) {
            if let Some((_, task)) = self.dial_task.take() {
                task.abort();
            }
        }
    }

    /// Queue `frame` on the live link without waiting on the writer
    ///
    /// A full queue means the backend stopped reading; the link is reported
    /// lost.
    fn send(&mut self, frame: OutboundFrame) {
        let Some((link, transport)) = &self.link else {
            warn!("No live link for outbound {:?}", frame);
            return;
        };
        let link = *link;

        let payload = match frame.encode() {
            Ok(payload) => payload,
            Err(e) => {
                error!("Failed to encode outbound frame: {}", e);
                return;
            }
        };

        match transport.outbound.try_send(payload) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!("Link {} outbound queue is full", link);
                self.manager
                    .on_lost(link, "outbound queue full", Instant::now());
            }
            Err(TrySendError::Closed(_)) => {
                warn!("Link {} writer is gone; frame not sent", link);
            }
        }
    }

    fn record(&mut self, input: impl Into<Input>) {
        let log = std::mem::take(&mut self.log);
        self.log = self.reducer.apply(log, input.into(), Utc::now());
        self.log_tx.send_replace(self.log.clone());
    }

    fn teardown(&mut self) {
        self.manager.disconnect();
        self.flush();

        if let Some((_, task)) = self.dial_task.take() {
            task.abort();
        }
        self.link = None;
    }

    fn stats(&self) -> SessionStats {
        let duration = Utc::now().signed_duration_since(self.started_at);

        SessionStats {
            state: self.manager.state(),
            reconnect_attempt: self.manager.reconnect_attempt(),
            reconnect_pending: self.manager.reconnect_pending(),
            listening: self.manager.is_listening(),
            started_at: self.started_at,
            duration_secs: duration.num_milliseconds() as f64 / 1000.0,
            messages_count: self.log.len(),
            frames_received: self.manager.frames_received(),
            frames_dropped: self.manager.frames_dropped(),
        }
    }
}

async fn next_link_event(link: &mut Option<(LinkId, Link)>) -> (LinkId, Option<LinkEvent>) {
    match link {
        Some((id, transport)) => (*id, transport.inbound.recv().await),
        None => future::pending().await,
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => future::pending().await,
    }
}
