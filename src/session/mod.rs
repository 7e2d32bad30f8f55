//! Chat session management
//!
//! This module provides the `ChatSession` handle that manages:
//! - The single connection to the assistant backend
//! - Reconnection and listen timeouts
//! - The conversation log and its subscribers
//! - Session statistics and teardown

mod config;
mod driver;
mod handle;
mod stats;

pub use config::SessionConfig;
pub use handle::{ChatSession, SessionError};
pub use stats::SessionStats;
