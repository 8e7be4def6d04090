//! Service layer: adapter orchestration.
//!
//! [`ProtocolAdapter`] owns the listener and exposes the host-facing API.
//! Per-socket behavior lives in [`ConnectionLifecycle`], request/response
//! routing in [`RequestCorrelator`], and channel operations in
//! [`ChannelBroker`].

pub mod availability;
pub mod channel_broker;
pub mod lifecycle;
pub mod protocol_adapter;
pub mod request_correlator;

pub use availability::Availability;
pub use channel_broker::ChannelBroker;
pub use lifecycle::{CloseReason, ConnectionLifecycle, ConnectionState};
pub use protocol_adapter::{AdapterCore, ProtocolAdapter};
pub use request_correlator::{Delivery, Dispatch, Origin, RequestCorrelator};
