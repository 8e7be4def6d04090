//! # socket-gateway
//!
//! WebSocket protocol adapter for an event-based request router.
//!
//! Clients exchange JSON frames `{"event": ..., "data": ...}` with the
//! gateway. Frames on the configured room event are turned into host
//! requests; each response comes back on an event named after the request
//! id. The host can also push data through channels (rooms) and target
//! single connections.
//!
//! ## Architecture
//!
//! ```text
//! Clients (WebSocket)
//!     │
//!     ├── Upgrade handler + socket loop (transport/)
//!     ├── SocketHub: sockets, rooms, outbound queues (transport/)
//!     │
//!     ├── ConnectionLifecycle, RequestCorrelator, ChannelBroker (service/)
//!     ├── ConnectionRegistry (domain/)
//!     │
//!     └── Host: request execution + connection bookkeeping (host/)
//! ```
//!
//! The host drives the adapter through [`service::ProtocolAdapter`].

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod host;
pub mod service;
pub mod transport;
