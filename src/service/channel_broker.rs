//! Channel operations on top of the transport's rooms.
//!
//! [`ChannelBroker`] turns host channel commands into hub commands. Every
//! operation is gated on [`Availability`] and returns `false` without
//! touching the hub when the adapter is degraded. Targets that are not
//! registered (typically because they just disconnected) are silent
//! no-ops.

use std::sync::Arc;

use crate::domain::{BroadcastCommand, ChannelCommand, ConnectionId, ConnectionRegistry, NotifyCommand};
use crate::transport::{SocketHub, SocketId};

use super::Availability;

/// Join/leave/broadcast/notify against the hub.
#[derive(Debug, Clone)]
pub struct ChannelBroker {
    hub: SocketHub,
    registry: Arc<ConnectionRegistry>,
    availability: Availability,
}

impl ChannelBroker {
    /// Creates a broker.
    #[must_use]
    pub fn new(hub: SocketHub, registry: Arc<ConnectionRegistry>, availability: Availability) -> Self {
        Self {
            hub,
            registry,
            availability,
        }
    }

    /// Publishes the payload to each channel, labelled with the channel name.
    ///
    /// Returns `false` only in degraded mode; channels without members are
    /// not an error.
    pub async fn broadcast(&self, command: &BroadcastCommand) -> bool {
        if !self.availability.is_available() {
            return false;
        }
        for channel in &command.channels {
            let recipients = self.hub.to_room(channel, channel, &command.payload).await;
            tracing::debug!(channel, recipients, "broadcast");
        }
        true
    }

    /// Delivers the payload to one connection, once per channel.
    ///
    /// Returns `true` if the target was connected and the deliveries were
    /// issued.
    pub async fn notify(&self, command: &NotifyCommand) -> bool {
        let Some(socket_id) = self.target(&command.connection_id).await else {
            return false;
        };
        for channel in &command.channels {
            self.hub.emit(&socket_id, channel, &command.payload).await;
        }
        true
    }

    /// Adds the connection to a channel.
    pub async fn join_channel(&self, command: &ChannelCommand) -> bool {
        match self.target(&command.connection_id).await {
            Some(socket_id) => self.hub.join(&socket_id, &command.channel).await,
            None => false,
        }
    }

    /// Removes the connection from a channel.
    pub async fn leave_channel(&self, command: &ChannelCommand) -> bool {
        match self.target(&command.connection_id).await {
            Some(socket_id) => self.hub.leave(&socket_id, &command.channel).await,
            None => false,
        }
    }

    /// Socket of a registered, still attached connection, unless degraded.
    async fn target(&self, connection_id: &ConnectionId) -> Option<SocketId> {
        if !self.availability.is_available() {
            return None;
        }
        let socket_id = self.registry.resolve(connection_id).await?;
        self.hub.is_connected(&socket_id).await.then_some(socket_id)
    }
}
