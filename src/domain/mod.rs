//! Domain layer: connections, requests, channel commands, and the
//! connection registry.

pub mod channel;
pub mod connection;
pub mod connection_registry;
pub mod request;

pub use channel::{BroadcastCommand, ChannelCommand, NotifyCommand};
pub use connection::{Connection, ConnectionContext, ConnectionId, PROTOCOL};
pub use connection_registry::ConnectionRegistry;
pub use request::{Request, RequestId, Response};
