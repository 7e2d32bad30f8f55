use super::error::CommandError;
use super::state::{ConnectionState, ReconnectPolicy};
use crate::protocol::{InboundFrame, OutboundFrame};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Identity of one transport instance; never reused within a manager
pub type LinkId = u64;

/// Work the manager hands to whoever drives the transport
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    /// Open a new transport and report back under this id
    Dial(LinkId),
    /// Close and detach the transport with this id
    Teardown(LinkId),
    /// Write a frame to the current transport
    Send(OutboundFrame),
    /// The connection state changed
    StateChanged(ConnectionState),
    /// A decoded frame for the conversation log
    Frame(InboundFrame),
    /// Listening was stopped because no transcription arrived in time
    ListenTimedOut,
}

/// Connection lifecycle, reconnect policy and listen timeout
///
/// The manager performs no I/O. Callers feed it user intents, transport
/// events and the current time, then drain [`Output`]s with
/// [`poll_output`](Self::poll_output). Timers are plain deadlines owned here;
/// cancelling one clears it, so a cancelled timer can never fire.
#[derive(Debug)]
pub struct ConnectionManager {
    policy: ReconnectPolicy,
    listen_timeout: Duration,

    state: ConnectionState,
    reconnect_attempt: u32,

    /// Deadline of the scheduled reconnect
    pending_reconnect: Option<Instant>,

    /// Deadline of the armed listen timeout; set while listening
    pending_listen_timeout: Option<Instant>,

    /// The one transport allowed to deliver events
    link: Option<LinkId>,
    last_link: LinkId,

    frames_received: u64,
    frames_dropped: u64,

    outputs: VecDeque<Output>,
}

impl ConnectionManager {
    pub fn new(policy: ReconnectPolicy, listen_timeout: Duration) -> Self {
        Self {
            policy,
            listen_timeout,
            state: ConnectionState::Disconnected,
            reconnect_attempt: 0,
            pending_reconnect: None,
            pending_listen_timeout: None,
            link: None,
            last_link: 0,
            frames_received: 0,
            frames_dropped: 0,
            outputs: VecDeque::new(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn reconnect_attempt(&self) -> u32 {
        self.reconnect_attempt
    }

    pub fn is_listening(&self) -> bool {
        self.pending_listen_timeout.is_some()
    }

    pub fn reconnect_pending(&self) -> bool {
        self.pending_reconnect.is_some()
    }

    /// Whether events tagged with `link` should still be processed
    pub fn is_current(&self, link: LinkId) -> bool {
        self.link == Some(link)
    }

    pub fn frames_received(&self) -> u64 {
        self.frames_received
    }

    pub fn frames_dropped(&self) -> u64 {
        self.frames_dropped
    }

    /// Manual connect; a no-op while connecting or connected
    pub fn connect(&mut self) {
        if self.state != ConnectionState::Disconnected {
            debug!("Connect ignored while {:?}", self.state);
            return;
        }

        self.cancel_reconnect();
        self.reconnect_attempt = 0;
        self.dial();
    }

    /// Manual disconnect; never followed by an automatic reconnect
    pub fn disconnect(&mut self) {
        self.cancel_reconnect();
        self.cancel_listen_timeout();
        self.reconnect_attempt = 0;

        if let Some(link) = self.link.take() {
            info!("Disconnecting link {}", link);
            self.outputs.push_back(Output::Teardown(link));
        }
        self.set_state(ConnectionState::Disconnected);
    }

    /// The transport for `link` finished its handshake
    pub fn on_open(&mut self, link: LinkId) {
        if !self.is_current(link) || self.state != ConnectionState::Connecting {
            debug!("Ignoring open from stale link {}", link);
            return;
        }

        info!("Connected (link {})", link);
        self.reconnect_attempt = 0;
        self.set_state(ConnectionState::Connected);
    }

    /// The transport for `link` failed to open, errored, or closed
    pub fn on_lost(&mut self, link: LinkId, reason: &str, now: Instant) {
        if !self.is_current(link) {
            debug!("Ignoring loss of stale link {}: {}", link, reason);
            return;
        }

        warn!("Connection lost (link {}): {}", link, reason);
        self.link = None;
        self.outputs.push_back(Output::Teardown(link));
        self.cancel_listen_timeout();
        self.set_state(ConnectionState::Disconnected);
        self.schedule_reconnect(now);
    }

    /// A text payload arrived on `link`
    pub fn on_text(&mut self, link: LinkId, payload: &str) {
        if !self.is_current(link) {
            debug!("Ignoring frame from stale link {}", link);
            return;
        }

        let frame = match InboundFrame::decode(payload) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Dropping malformed frame: {}", e);
                self.frames_dropped += 1;
                return;
            }
        };

        self.frames_received += 1;
        if matches!(frame, InboundFrame::Transcription { .. }) {
            self.cancel_listen_timeout();
        }
        self.outputs.push_back(Output::Frame(frame));
    }

    pub fn send_text(&mut self, text: &str) -> Result<(), CommandError> {
        self.ensure_connected()?;
        if text.trim().is_empty() {
            return Err(CommandError::EmptyText);
        }

        self.outputs.push_back(Output::Send(OutboundFrame::SendText {
            text: text.to_string(),
        }));
        Ok(())
    }

    /// Request voice recognition and arm the listen timeout
    pub fn start_listening(&mut self, now: Instant) -> Result<(), CommandError> {
        self.ensure_connected()?;

        self.outputs.push_back(Output::Send(OutboundFrame::StartListening));
        self.pending_listen_timeout = Some(now + self.listen_timeout);
        Ok(())
    }

    pub fn stop_listening(&mut self) -> Result<(), CommandError> {
        self.ensure_connected()?;

        self.cancel_listen_timeout();
        self.outputs.push_back(Output::Send(OutboundFrame::StopListening));
        Ok(())
    }

    /// Earliest pending deadline, if any timer is armed
    pub fn poll_timeout(&self) -> Option<Instant> {
        match (self.pending_reconnect, self.pending_listen_timeout) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Fire every timer whose deadline is at or before `now`
    pub fn handle_timeout(&mut self, now: Instant) {
        if self.pending_reconnect.is_some_and(|deadline| deadline <= now) {
            self.pending_reconnect = None;
            if self.state == ConnectionState::Disconnected {
                info!(
                    "Reconnecting (attempt {}/{})",
                    self.reconnect_attempt, self.policy.max_attempts
                );
                self.dial();
            }
        }

        if self
            .pending_listen_timeout
            .is_some_and(|deadline| deadline <= now)
        {
            self.pending_listen_timeout = None;
            warn!(
                "No transcription within {:?}, stopping voice recognition",
                self.listen_timeout
            );
            if self.state == ConnectionState::Connected {
                self.outputs
                    .push_back(Output::Send(OutboundFrame::StopListening));
            }
            self.outputs.push_back(Output::ListenTimedOut);
        }
    }

    pub fn poll_output(&mut self) -> Option<Output> {
        self.outputs.pop_front()
    }

    fn dial(&mut self) {
        if let Some(previous) = self.link.take() {
            self.outputs.push_back(Output::Teardown(previous));
        }

        self.last_link += 1;
        let link = self.last_link;
        self.link = Some(link);

        self.set_state(ConnectionState::Connecting);
        self.outputs.push_back(Output::Dial(link));
    }

    fn schedule_reconnect(&mut self, now: Instant) {
        self.reconnect_attempt = self.reconnect_attempt.saturating_add(1);

        if self.reconnect_attempt <= self.policy.max_attempts {
            info!(
                "Reconnect {}/{} scheduled in {:?}",
                self.reconnect_attempt, self.policy.max_attempts, self.policy.delay
            );
            self.pending_reconnect = Some(now + self.policy.delay);
        } else {
            warn!(
                "Giving up after {} reconnect attempts; connect manually to retry",
                self.policy.max_attempts
            );
        }
    }

    fn cancel_reconnect(&mut self) {
        if self.pending_reconnect.take().is_some() {
            debug!("Cancelled pending reconnect");
        }
    }

    fn cancel_listen_timeout(&mut self) {
        self.pending_listen_timeout = None;
    }

    fn ensure_connected(&self) -> Result<(), CommandError> {
        if self.state == ConnectionState::Connected {
            Ok(())
        } else {
            Err(CommandError::NotConnected)
        }
    }

    fn set_state(&mut self, state: ConnectionState) {
        if self.state != state {
            self.state = state;
            self.outputs.push_back(Output::StateChanged(state));
        }
    }
}
