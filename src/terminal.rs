use deep_talk_client::{Message, MessageId, MessageKind, MessageLog};

const CLEAR_LINE: &str = "\r\x1b[2K";

/// Turns successive log snapshots into terminal output
///
/// Finished messages are printed once. A streaming reply is printed as it
/// grows, and a live transcription is redrawn in place on one line.
#[derive(Debug, Default)]
pub struct TranscriptPrinter {
    /// Messages already printed in full
    printed: usize,
    /// Tail message drawn so far and how many bytes of it are on screen
    live: Option<(MessageId, MessageKind, usize)>,
}

impl TranscriptPrinter {
    pub fn render(&mut self, log: &MessageLog) -> String {
        let mut out = String::new();
        let messages = log.as_slice();

        for (index, message) in messages.iter().enumerate().skip(self.printed) {
            let is_tail = index + 1 == messages.len();
            let drawn = self.take_live(message, &mut out);

            if is_tail && !message.complete {
                match message.kind {
                    MessageKind::Partial => {
                        out.push_str(CLEAR_LINE);
                        out.push_str(&format!("🎤 Listening: {}", message.text));
                    }
                    _ => {
                        if drawn == 0 {
                            out.push_str(label(message.kind));
                        }
                        out.push_str(message.text.get(drawn..).unwrap_or_default());
                    }
                }
                self.live = Some((message.id, message.kind, message.text.len()));
                break;
            }

            if drawn == 0 {
                out.push_str(label(message.kind));
            }
            out.push_str(message.text.get(drawn..).unwrap_or_default());
            if let Some(note) = &message.annotation {
                out.push_str(&format!(" ({})", note));
            }
            out.push('\n');
            self.printed = index + 1;
        }

        out
    }

    /// Bytes of `message` already on screen; clears a stale live line
    fn take_live(&mut self, message: &Message, out: &mut String) -> usize {
        match self.live.take() {
            Some((id, kind, len)) if id == message.id && kind != MessageKind::Partial => len,
            Some((_, MessageKind::Partial, _)) => {
                out.push_str(CLEAR_LINE);
                0
            }
            Some(_) => {
                out.push('\n');
                0
            }
            None => 0,
        }
    }
}

fn label(kind: MessageKind) -> &'static str {
    match kind {
        MessageKind::User => "You: ",
        MessageKind::Assistant => "Assistant: ",
        MessageKind::Status => "· ",
        MessageKind::Error => "❌ Error: ",
        MessageKind::Partial => "🎤 Listening: ",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deep_talk_client::conversation::Input;
    use deep_talk_client::{InboundFrame, MessageStreamReducer};

    fn feed(log: MessageLog, frame: InboundFrame) -> MessageLog {
        MessageStreamReducer::default().apply(log, Input::Frame(frame), chrono::Utc::now())
    }

    #[test]
    fn test_streaming_reply_prints_only_new_text() {
        let mut printer = TranscriptPrinter::default();
        let log = feed(
            MessageLog::new(),
            InboundFrame::ResponseChunk {
                text: "Hel".to_string(),
            },
        );
        assert_eq!(printer.render(&log), "Assistant: Hel");

        let log = feed(
            log,
            InboundFrame::ResponseChunk {
                text: "lo".to_string(),
            },
        );
        assert_eq!(printer.render(&log), "lo");

        let log = feed(log, InboundFrame::ResponseComplete);
        assert_eq!(printer.render(&log), "\n");
        assert_eq!(printer.render(&log), "");
    }

    #[test]
    fn test_final_transcription_overwrites_partial_line() {
        let mut printer = TranscriptPrinter::default();
        let log = feed(
            MessageLog::new(),
            InboundFrame::PartialTranscription {
                text: "how".to_string(),
            },
        );
        assert_eq!(printer.render(&log), format!("{}🎤 Listening: how", CLEAR_LINE));

        let log = feed(
            log,
            InboundFrame::Transcription {
                text: "how are you".to_string(),
                full_text: None,
            },
        );
        assert_eq!(printer.render(&log), format!("{}You: how are you\n", CLEAR_LINE));
    }
}
