//! Conversation log and the reducer that assembles it
//!
//! The log is the only state the presentation layer sees. It is rebuilt one
//! input at a time by [`MessageStreamReducer::apply`].

mod message;
mod reducer;

pub use message::{Message, MessageId, MessageKind, MessageLog};
pub use reducer::{Input, Intent, MessageStreamReducer, DEFAULT_TURN_FINISHED_MARKER};
