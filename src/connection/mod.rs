//! Connection lifecycle state machine
//!
//! [`ConnectionManager`] decides when to dial, when to give up, and which
//! transport is allowed to deliver frames. It is driven by the session task.

mod error;
mod manager;
mod state;

pub use error::CommandError;
pub use manager::{ConnectionManager, LinkId, Output};
pub use state::{ConnectionState, ReconnectPolicy};
