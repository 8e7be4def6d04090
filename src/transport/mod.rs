//! WebSocket transport: sockets, frames, rooms, and the per-socket loop.

pub mod connection;
pub mod frame;
pub mod handler;
pub mod hub;
pub mod socket;

pub use frame::Frame;
pub use hub::{Outbound, Outbox, SocketHub};
pub use socket::{Handshake, SocketId, TransportSocket};
