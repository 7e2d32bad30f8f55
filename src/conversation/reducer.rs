use super::message::{Message, MessageKind, MessageLog};
use crate::protocol::InboundFrame;
use chrono::{DateTime, Utc};

/// Bookkeeping the client records for its own actions
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    /// The user sent a text message
    TextSent(String),
    /// Voice recognition was requested
    ListeningStarted,
    /// Voice recognition was stopped by the user
    ListeningStopped,
    /// No final transcription arrived in time; listening was stopped locally
    ListenTimedOut,
}

/// Everything that can change the conversation log
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Frame(InboundFrame),
    Intent(Intent),
}

impl From<InboundFrame> for Input {
    fn from(frame: InboundFrame) -> Self {
        Input::Frame(frame)
    }
}

impl From<Intent> for Input {
    fn from(intent: Intent) -> Self {
        Input::Intent(intent)
    }
}

pub const DEFAULT_TURN_FINISHED_MARKER: &str = "Response time";

/// Folds inbound frames and local intents into the message log
///
/// `apply` only rewrites the log value it is handed: streamed chunks merge
/// into the tail assistant reply, partial transcriptions collapse into one
/// placeholder, and a final transcription replaces that placeholder.
#[derive(Debug, Clone)]
pub struct MessageStreamReducer {
    turn_finished_marker: Option<String>,
}

impl Default for MessageStreamReducer {
    fn default() -> Self {
        Self::new(Some(DEFAULT_TURN_FINISHED_MARKER.to_string()))
    }
}

impl MessageStreamReducer {
    /// `marker` is the substring that flags a status line as end-of-turn
    /// timing; `None` disables the substring rule.
    pub fn new(marker: Option<String>) -> Self {
        Self {
            turn_finished_marker: marker.filter(|m| !m.is_empty()),
        }
    }

    pub fn apply(&self, mut log: MessageLog, input: Input, now: DateTime<Utc>) -> MessageLog {
        match input {
            Input::Frame(frame) => self.apply_frame(&mut log, frame, now),
            Input::Intent(intent) => Self::apply_intent(&mut log, intent, now),
        }
        log
    }

    fn apply_frame(&self, log: &mut MessageLog, frame: InboundFrame, now: DateTime<Utc>) {
        match frame {
            InboundFrame::Status { message } => {
                if self.is_turn_finished(&message) {
                    finish_turn(log, &message, now);
                }
                log.push(Message::new(MessageKind::Status, message, now));
            }
            InboundFrame::TurnTiming { elapsed_secs } => {
                let note = format!("Response time: {:.2}s", elapsed_secs);
                finish_turn(log, &note, now);
                log.push(Message::new(MessageKind::Status, note, now));
            }
            InboundFrame::Transcription { text, .. } => {
                let message = Message::new(MessageKind::User, text, now);
                if tail_is(log, MessageKind::Partial) {
                    log.replace_last(message);
                } else {
                    log.push(message);
                }
            }
            InboundFrame::PartialTranscription { text } => {
                match log.last_mut().filter(|m| m.kind == MessageKind::Partial) {
                    Some(last) => {
                        last.text = text;
                        last.updated_at = now;
                    }
                    None => log.push(Message::new(MessageKind::Partial, text, now)),
                }
            }
            InboundFrame::ResponseChunk { text } => {
                match log.last_mut().filter(|m| m.is_streaming()) {
                    Some(last) => {
                        last.text.push_str(&text);
                        last.updated_at = now;
                    }
                    None => log.push(Message::new(MessageKind::Assistant, text, now)),
                }
            }
            InboundFrame::ResponseComplete => {
                if let Some(last) = log.last_mut().filter(|m| m.is_streaming()) {
                    last.complete = true;
                    last.updated_at = now;
                }
            }
            InboundFrame::Error { message } => {
                log.push(Message::new(MessageKind::Error, message, now));
            }
            InboundFrame::Unrecognized { kind } => {
                log.push(Message::new(
                    MessageKind::Error,
                    format!("Unknown message type: {}", kind),
                    now,
                ));
            }
        }
    }

    fn apply_intent(log: &mut MessageLog, intent: Intent, now: DateTime<Utc>) {
        match intent {
            Intent::TextSent(text) => log.push(Message::new(MessageKind::User, text, now)),
            Intent::ListeningStarted => log.push(Message::new(
                MessageKind::Status,
                "Starting voice recognition...",
                now,
            )),
            Intent::ListeningStopped => log.push(Message::new(
                MessageKind::Status,
                "Voice recognition stopped",
                now,
            )),
            Intent::ListenTimedOut => {
                log.push(Message::new(
                    MessageKind::Status,
                    "Voice recognition stopped",
                    now,
                ));
                log.push(Message::new(
                    MessageKind::Error,
                    "Voice recognition timeout",
                    now,
                ));
            }
        }
    }

    fn is_turn_finished(&self, status: &str) -> bool {
        self.turn_finished_marker
            .as_deref()
            .is_some_and(|marker| status.contains(marker))
    }
}

fn tail_is(log: &MessageLog, kind: MessageKind) -> bool {
    log.last().is_some_and(|m| m.kind == kind)
}

/// Close the tail assistant reply and attach the timing note once
fn finish_turn(log: &mut MessageLog, note: &str, now: DateTime<Utc>) {
    if let Some(last) = log.last_mut() {
        if last.kind == MessageKind::Assistant && last.annotation.is_none() {
            last.complete = true;
            last.annotation = Some(note.to_string());
            last.updated_at = now;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(reducer: &MessageStreamReducer, inputs: Vec<Input>) -> MessageLog {
        inputs
            .into_iter()
            .fold(MessageLog::new(), |log, input| reducer.apply(log, input, Utc::now()))
    }

    fn chunk(text: &str) -> Input {
        InboundFrame::ResponseChunk {
            text: text.to_string(),
        }
        .into()
    }

    #[test]
    fn test_chunk_after_completed_reply_starts_new_message() {
        let reducer = MessageStreamReducer::default();
        let log = run(
            &reducer,
            vec![chunk("one"), InboundFrame::ResponseComplete.into(), chunk("two")],
        );

        assert_eq!(log.len(), 2);
        assert!(log.as_slice()[0].complete);
        assert_eq!(log.as_slice()[1].text, "two");
        assert!(log.as_slice()[1].is_streaming());
    }

    #[test]
    fn test_chunk_keeps_message_identity() {
        let reducer = MessageStreamReducer::default();
        let log = run(&reducer, vec![chunk("a")]);
        let id = log.last().unwrap().id;

        let log = reducer.apply(log, chunk("b"), Utc::now());
        assert_eq!(log.last().unwrap().id, id);
        assert_eq!(log.last().unwrap().text, "ab");
    }

    #[test]
    fn test_marker_status_annotates_finished_reply() {
        let reducer = MessageStreamReducer::default();
        let log = run(
            &reducer,
            vec![
                chunk("Hi there"),
                InboundFrame::ResponseComplete.into(),
                InboundFrame::Status {
                    message: "⏱ Response time: 1.50s".to_string(),
                }
                .into(),
            ],
        );

        assert_eq!(log.len(), 2);
        let reply = &log.as_slice()[0];
        assert_eq!(reply.text, "Hi there");
        assert_eq!(reply.annotation.as_deref(), Some("⏱ Response time: 1.50s"));
        assert_eq!(log.last().unwrap().kind, MessageKind::Status);
    }

    #[test]
    fn test_marker_disabled_leaves_reply_untouched() {
        let reducer = MessageStreamReducer::new(None);
        let log = run(
            &reducer,
            vec![
                chunk("Hi"),
                InboundFrame::Status {
                    message: "Response time: 1.00s".to_string(),
                }
                .into(),
            ],
        );

        assert!(log.as_slice()[0].is_streaming());
        assert!(log.as_slice()[0].annotation.is_none());
    }

    #[test]
    fn test_turn_timing_closes_streaming_reply() {
        let reducer = MessageStreamReducer::default();
        let log = run(
            &reducer,
            vec![chunk("partial reply"), InboundFrame::TurnTiming { elapsed_secs: 2.314 }.into()],
        );

        let reply = &log.as_slice()[0];
        assert!(reply.complete);
        assert_eq!(reply.annotation.as_deref(), Some("Response time: 2.31s"));
        assert_eq!(log.last().unwrap().text, "Response time: 2.31s");
    }

    #[test]
    fn test_listen_timeout_records_stop_and_error() {
        let reducer = MessageStreamReducer::default();
        let log = run(&reducer, vec![Intent::ListenTimedOut.into()]);

        let kinds: Vec<MessageKind> = log.iter().map(|m| m.kind).collect();
        assert_eq!(kinds, vec![MessageKind::Status, MessageKind::Error]);
        assert_eq!(log.last().unwrap().text, "Voice recognition timeout");
    }
}
