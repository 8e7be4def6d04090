//! Socket table and room membership.
//!
//! [`SocketHub`] is the transport's own state: which sockets are attached
//! and which rooms each belongs to. Everything above the transport issues
//! commands against it (`emit`, `deliver`, `to_room`, `join`, `leave`,
//! `close`) and never keeps a copy of room membership.
//!
//! Each socket has a bounded frame queue drained by its connection task.
//! Channel traffic (`emit`, `to_room`) never blocks: a frame that does not
//! fit is dropped. Responses go through `deliver`, which waits for room
//! instead. Closing uses a separate signal so it never queues behind
//! frames.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc, watch};

use super::frame::Frame;
use super::socket::{Handshake, SocketId, TransportSocket};

/// Item handed to a socket's writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Serialized frame to send as a text message.
    Text(Arc<String>),
    /// Close the socket.
    Close,
}

/// Receiving side of one socket: queued frames plus the close signal.
///
/// A pending close takes precedence over queued frames.
#[derive(Debug)]
pub struct Outbox {
    frames: mpsc::Receiver<Arc<String>>,
    closing: watch::Receiver<bool>,
}

impl Outbox {
    /// Waits for the next item. `None` once the hub has forgotten the socket.
    pub async fn recv(&mut self) -> Option<Outbound> {
        if *self.closing.borrow() {
            return Some(Outbound::Close);
        }
        tokio::select! {
            biased;
            changed = self.closing.changed() => match changed {
                Ok(()) if *self.closing.borrow() => Some(Outbound::Close),
                Ok(()) => self.frames.recv().await.map(Outbound::Text),
                Err(_) => None,
            },
            frame = self.frames.recv() => frame.map(Outbound::Text),
        }
    }

    /// Next item if one is ready.
    pub fn try_recv(&mut self) -> Option<Outbound> {
        if *self.closing.borrow() {
            return Some(Outbound::Close);
        }
        self.frames.try_recv().ok().map(Outbound::Text)
    }
}

#[derive(Debug)]
struct SocketEntry {
    frames: mpsc::Sender<Arc<String>>,
    closing: watch::Sender<bool>,
}

#[derive(Debug, Default)]
struct HubState {
    sockets: HashMap<SocketId, SocketEntry>,
    rooms: HashMap<String, HashSet<SocketId>>,
}

/// Shared handle to the transport's sockets and rooms.
#[derive(Debug, Clone)]
pub struct SocketHub {
    state: Arc<RwLock<HubState>>,
    capacity: usize,
}

impl SocketHub {
    /// Creates an empty hub whose sockets queue up to `capacity` frames.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Arc::new(RwLock::new(HubState::default())),
            capacity: capacity.max(1),
        }
    }

    /// Attaches a new socket and returns it with its outbox.
    pub async fn attach(&self, handshake: Handshake) -> (TransportSocket, Outbox) {
        let (frames_tx, frames) = mpsc::channel(self.capacity);
        let (closing_tx, closing) = watch::channel(false);
        let id = SocketId::generate();
        self.state.write().await.sockets.insert(
            id.clone(),
            SocketEntry {
                frames: frames_tx,
                closing: closing_tx,
            },
        );
        tracing::debug!(socket_id = %id, address = %handshake.address, "socket attached");
        (TransportSocket::new(id, handshake), Outbox { frames, closing })
    }

    /// Detaches a socket and removes it from every room.
    ///
    /// Returns `false` if the socket was not attached.
    pub async fn detach(&self, socket_id: &SocketId) -> bool {
        let mut state = self.state.write().await;
        let existed = state.sockets.remove(socket_id).is_some();
        state.rooms.retain(|_, members| {
            members.remove(socket_id);
            !members.is_empty()
        });
        if existed {
            tracing::debug!(%socket_id, "socket detached");
        }
        existed
    }

    /// Returns `true` if the socket is attached.
    pub async fn is_connected(&self, socket_id: &SocketId) -> bool {
        self.state.read().await.sockets.contains_key(socket_id)
    }

    /// Adds the socket to `room`. No-op returning `false` if the socket is
    /// not attached.
    pub async fn join(&self, socket_id: &SocketId, room: &str) -> bool {
        let mut state = self.state.write().await;
        if !state.sockets.contains_key(socket_id) {
            return false;
        }
        state
            .rooms
            .entry(room.to_string())
            .or_default()
            .insert(socket_id.clone());
        true
    }

    /// Removes the socket from `room`. Returns `false` if the socket is not
    /// attached.
    pub async fn leave(&self, socket_id: &SocketId, room: &str) -> bool {
        let mut state = self.state.write().await;
        if !state.sockets.contains_key(socket_id) {
            return false;
        }
        if let Some(members) = state.rooms.get_mut(room) {
            members.remove(socket_id);
            if members.is_empty() {
                state.rooms.remove(room);
            }
        }
        true
    }

    /// Sends `data` under `event` to one socket without waiting.
    ///
    /// Returns `false` if the socket is not attached, its queue is full, or
    /// the payload cannot be serialized.
    pub async fn emit(&self, socket_id: &SocketId, event: &str, data: &serde_json::Value) -> bool {
        let Some(text) = encode(event, data) else {
            return false;
        };
        let state = self.state.read().await;
        state
            .sockets
            .get(socket_id)
            .is_some_and(|entry| push(socket_id, &entry.frames, text))
    }

    /// Sends `data` under `event` to one socket, waiting for queue space.
    ///
    /// The hub lock is not held while waiting. Returns `false` if the socket
    /// is not attached, goes away before the frame is queued, or the payload
    /// cannot be serialized.
    pub async fn deliver(&self, socket_id: &SocketId, event: &str, data: &serde_json::Value) -> bool {
        let Some(text) = encode(event, data) else {
            return false;
        };
        let frames = self
            .state
            .read()
            .await
            .sockets
            .get(socket_id)
            .map(|entry| entry.frames.clone());
        match frames {
            Some(frames) => frames.send(text).await.is_ok(),
            None => false,
        }
    }

    /// Sends `data` under `event` to every member of `room`.
    ///
    /// Returns the number of sockets the frame was queued for.
    pub async fn to_room(&self, room: &str, event: &str, data: &serde_json::Value) -> usize {
        let state = self.state.read().await;
        let Some(members) = state.rooms.get(room) else {
            return 0;
        };
        let Some(text) = encode(event, data) else {
            return 0;
        };
        let mut queued = 0;
        for id in members {
            if let Some(entry) = state.sockets.get(id)
                && push(id, &entry.frames, Arc::clone(&text))
            {
                queued += 1;
            }
        }
        queued
    }

    /// Asks the socket's connection task to close it. Never waits on the
    /// frame queue.
    ///
    /// Returns `false` if the socket is not attached or already closing.
    pub async fn close(&self, socket_id: &SocketId) -> bool {
        self.state
            .read()
            .await
            .sockets
            .get(socket_id)
            .is_some_and(|entry| !entry.closing.send_replace(true))
    }

    /// Asks every attached socket to close. Returns how many were newly
    /// asked.
    pub async fn close_all(&self) -> usize {
        self.state
            .read()
            .await
            .sockets
            .values()
            .filter(|entry| !entry.closing.send_replace(true))
            .count()
    }

    /// Current members of `room`, sorted by id.
    pub async fn members(&self, room: &str) -> Vec<SocketId> {
        let state = self.state.read().await;
        let mut members: Vec<SocketId> = state
            .rooms
            .get(room)
            .map(|m| m.iter().cloned().collect())
            .unwrap_or_default();
        members.sort();
        members
    }

    /// Number of attached sockets.
    pub async fn socket_count(&self) -> usize {
        self.state.read().await.sockets.len()
    }
}

fn encode(event: &str, data: &serde_json::Value) -> Option<Arc<String>> {
    match Frame::encode(event, data) {
        Ok(text) => Some(Arc::new(text)),
        Err(e) => {
            tracing::warn!(event, error = %e, "failed to serialize frame");
            None
        }
    }
}

fn push(socket_id: &SocketId, tx: &mpsc::Sender<Arc<String>>, text: Arc<String>) -> bool {
    match tx.try_send(text) {
        Ok(()) => true,
        Err(mpsc::error::TrySendError::Full(_)) => {
            tracing::warn!(%socket_id, "outbound queue full, dropping frame");
            false
        }
        Err(mpsc::error::TrySendError::Closed(_)) => false,
    }
}
