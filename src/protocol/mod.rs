//! Wire frames exchanged with the assistant backend
//!
//! Inbound frames carry a `type` discriminator, outbound frames an `action`.
//! Both travel as JSON text frames over the WebSocket link.

pub mod messages;

pub use messages::{FrameError, InboundFrame, OutboundFrame};
