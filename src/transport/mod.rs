//! Transport to the assistant backend
//!
//! A [`Connector`] dials the endpoint and yields a [`Link`]: a sender for
//! outbound text frames and a receiver of [`LinkEvent`]s.

pub mod backend;
pub mod websocket;

pub use backend::{Connector, Link, LinkEvent};
pub use websocket::WebSocketConnector;
