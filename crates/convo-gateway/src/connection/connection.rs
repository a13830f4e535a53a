//! Individual WebSocket connection
//!
//! An authenticated connection context. The identity is resolved at
//! handshake time and immutable for the connection's lifetime; handlers
//! receive this context explicitly rather than reading state off the
//! transport object.

use convo_core::UserIdentity;
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::protocol::ServerMessage;

/// A single authenticated WebSocket connection
pub struct Connection {
    /// Unique connection ID
    connection_id: String,

    /// Authenticated user identity (resolved before the upgrade completes)
    user: UserIdentity,

    /// Channel to send messages to the WebSocket
    sender: mpsc::Sender<ServerMessage>,

    /// Conversation rooms this connection has joined
    rooms: RwLock<HashSet<Uuid>>,

    /// Connection creation time
    connected_at: Instant,
}

impl Connection {
    /// Create a new connection
    pub fn new(
        connection_id: String,
        user: UserIdentity,
        sender: mpsc::Sender<ServerMessage>,
    ) -> Arc<Self> {
        Arc::new(Self {
            connection_id,
            user,
            sender,
            rooms: RwLock::new(HashSet::new()),
            connected_at: Instant::now(),
        })
    }

    /// Generate a fresh connection ID
    pub fn generate_id() -> String {
        Uuid::new_v4().to_string()
    }

    /// Get the connection ID
    pub fn connection_id(&self) -> &str {
        &self.connection_id
    }

    /// Get the authenticated user's ID
    pub fn user_id(&self) -> Uuid {
        self.user.id
    }

    /// Get the authenticated user's identity
    pub fn user(&self) -> &UserIdentity {
        &self.user
    }

    /// Add a room subscription
    pub fn join_room(&self, conversation_id: Uuid) {
        self.rooms.write().insert(conversation_id);
    }

    /// Remove a room subscription
    pub fn leave_room(&self, conversation_id: Uuid) {
        self.rooms.write().remove(&conversation_id);
    }

    /// Check if subscribed to a room
    pub fn is_in_room(&self, conversation_id: Uuid) -> bool {
        self.rooms.read().contains(&conversation_id)
    }

    /// Get all subscribed rooms
    pub fn rooms(&self) -> Vec<Uuid> {
        self.rooms.read().iter().copied().collect()
    }

    /// Get connection age
    pub fn age(&self) -> std::time::Duration {
        self.connected_at.elapsed()
    }

    /// Send a message to this connection
    pub async fn send(
        &self,
        message: ServerMessage,
    ) -> Result<(), mpsc::error::SendError<ServerMessage>> {
        self.sender.send(message).await
    }

    /// Try to send a message (non-blocking)
    pub fn try_send(
        &self,
        message: ServerMessage,
    ) -> Result<(), mpsc::error::TrySendError<ServerMessage>> {
        self.sender.try_send(message)
    }

    /// Check if the sender channel is closed
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("connection_id", &self.connection_id)
            .field("user_id", &self.user.id)
            .field("rooms", &self.rooms.read().len())
            .finish()
    }
}
