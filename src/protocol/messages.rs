use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Frame received from the assistant backend
///
/// Every frame is a JSON object with a `type` discriminator. Types this client
/// does not know decode to [`InboundFrame::Unrecognized`] so the caller can
/// surface a possible protocol mismatch instead of silently dropping it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundFrame {
    /// Informational status line from the backend
    Status { message: String },

    /// Finalized speech transcription
    Transcription {
        text: String,
        /// Whole utterance so far, when the backend sends it
        #[serde(default)]
        full_text: Option<String>,
    },

    /// In-progress speech transcription
    PartialTranscription { text: String },

    /// One streamed piece of the assistant reply
    ResponseChunk { text: String },

    /// The assistant reply finished streaming
    ResponseComplete,

    /// Structured end-of-turn timing
    TurnTiming { elapsed_secs: f64 },

    /// Backend-reported error
    Error { message: String },

    /// Decodable frame with a `type` this client does not handle
    #[serde(skip)]
    Unrecognized { kind: String },
}

/// Reasons an inbound payload could not be decoded
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("frame is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("frame has no string `type` field")]
    MissingType,

    #[error("`{kind}` frame is malformed: {source}")]
    Malformed {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

const KNOWN_TYPES: &[&str] = &[
    "status",
    "transcription",
    "partial_transcription",
    "response_chunk",
    "response_complete",
    "turn_timing",
    "error",
];

impl InboundFrame {
    /// Decode one text payload received over the connection
    pub fn decode(payload: &str) -> Result<Self, FrameError> {
        let value: Value = serde_json::from_str(payload).map_err(FrameError::InvalidJson)?;

        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or(FrameError::MissingType)?
            .to_owned();

        if !KNOWN_TYPES.contains(&kind.as_str()) {
            return Ok(InboundFrame::Unrecognized { kind });
        }

        serde_json::from_value(value).map_err(|source| FrameError::Malformed { kind, source })
    }

    /// Wire name of this frame's `type`
    pub fn kind(&self) -> &str {
        match self {
            InboundFrame::Status { .. } => "status",
            InboundFrame::Transcription { .. } => "transcription",
            InboundFrame::PartialTranscription { .. } => "partial_transcription",
            InboundFrame::ResponseChunk { .. } => "response_chunk",
            InboundFrame::ResponseComplete => "response_complete",
            InboundFrame::TurnTiming { .. } => "turn_timing",
            InboundFrame::Error { .. } => "error",
            InboundFrame::Unrecognized { kind } => kind,
        }
    }
}

/// Frame sent to the assistant backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum OutboundFrame {
    StartListening,
    StopListening,
    SendText { text: String },
}

impl OutboundFrame {
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
