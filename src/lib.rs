pub mod config;
pub mod connection;
pub mod conversation;
pub mod http;
pub mod protocol;
pub mod session;
pub mod transport;

pub use config::Config;
pub use connection::{CommandError, ConnectionManager, ConnectionState, ReconnectPolicy};
pub use conversation::{Message, MessageId, MessageKind, MessageLog, MessageStreamReducer};
pub use http::{create_router, AppState};
pub use protocol::{InboundFrame, OutboundFrame};
pub use session::{ChatSession, SessionConfig, SessionError, SessionStats};
pub use transport::{Connector, Link, LinkEvent, WebSocketConnector};
