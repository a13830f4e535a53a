//! Connection manager
//!
//! Tracks all active WebSocket connections and the broadcast groups they
//! belong to: one room per conversation, plus a personal group per user
//! that every connection is subscribed to on registration.

use super::Connection;
use crate::protocol::ServerMessage;
use convo_core::UserIdentity;
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

/// Manages all active WebSocket connections
///
/// Uses `DashMap` for concurrent access to connection state. Room and user
/// group membership is mutated only here; the rest of the gateway goes
/// through these methods.
pub struct ConnectionManager {
    /// Active connections by connection ID
    connections: DashMap<String, Arc<Connection>>,

    /// User ID to connection IDs mapping (the personal broadcast group)
    user_connections: DashMap<Uuid, HashSet<String>>,

    /// Conversation ID to connection IDs mapping (room broadcast groups)
    room_connections: DashMap<Uuid, HashSet<String>>,
}

impl ConnectionManager {
    /// Create a new connection manager
    #[must_use]
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            user_connections: DashMap::new(),
            room_connections: DashMap::new(),
        }
    }

    /// Create a new connection manager wrapped in Arc
    #[must_use]
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Register an authenticated connection.
    ///
    /// The connection joins its user's personal group immediately; rooms
    /// are joined later through `subscribe`.
    pub fn add_connection(&self, connection: Arc<Connection>) {
        let connection_id = connection.connection_id().to_string();
        let user_id = connection.user_id();

        self.connections.insert(connection_id.clone(), connection);
        self.user_connections
            .entry(user_id)
            .or_default()
            .insert(connection_id.clone());

        tracing::debug!(
            connection_id = %connection_id,
            user_id = %user_id,
            "Connection added"
        );
    }

    /// Remove a connection and scrub it from every group.
    ///
    /// Uses `alter` for atomic modify-and-cleanup to avoid TOCTOU races
    /// between removal and concurrent broadcasts.
    pub fn remove_connection(&self, connection_id: &str) {
        if let Some((_, connection)) = self.connections.remove(connection_id) {
            let user_id = connection.user_id();

            self.user_connections.alter(&user_id, |_, mut ids| {
                ids.remove(connection_id);
                ids
            });
            self.user_connections.retain(|_, ids| !ids.is_empty());

            for conversation_id in connection.rooms() {
                self.room_connections.alter(&conversation_id, |_, mut ids| {
                    ids.remove(connection_id);
                    ids
                });
            }
            self.room_connections.retain(|_, ids| !ids.is_empty());

            tracing::debug!(connection_id = %connection_id, "Connection removed");
        }
    }

    /// Get a connection by ID
    pub fn get_connection(&self, connection_id: &str) -> Option<Arc<Connection>> {
        self.connections.get(connection_id).map(|r| r.clone())
    }

    /// Subscribe a connection to a conversation room
    pub fn subscribe(&self, connection_id: &str, conversation_id: Uuid) -> bool {
        if let Some(connection) = self.connections.get(connection_id) {
            connection.join_room(conversation_id);

            self.room_connections
                .entry(conversation_id)
                .or_default()
                .insert(connection_id.to_string());

            tracing::trace!(
                connection_id = %connection_id,
                conversation_id = %conversation_id,
                "Connection subscribed to room"
            );

            true
        } else {
            false
        }
    }

    /// Unsubscribe a connection from a conversation room (idempotent)
    pub fn unsubscribe(&self, connection_id: &str, conversation_id: Uuid) -> bool {
        if let Some(connection) = self.connections.get(connection_id) {
            connection.leave_room(conversation_id);

            self.room_connections.alter(&conversation_id, |_, mut ids| {
                ids.remove(connection_id);
                ids
            });
            self.room_connections.retain(|_, ids| !ids.is_empty());

            tracing::trace!(
                connection_id = %connection_id,
                conversation_id = %conversation_id,
                "Connection unsubscribed from room"
            );

            true
        } else {
            false
        }
    }

    /// Get all connections for a user
    pub fn user_connections(&self, user_id: Uuid) -> Vec<Arc<Connection>> {
        self.user_connections
            .get(&user_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.connections.get(id).map(|c| c.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Get all connections subscribed to a room
    pub fn room_connections(&self, conversation_id: Uuid) -> Vec<Arc<Connection>> {
        self.room_connections
            .get(&conversation_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.connections.get(id).map(|c| c.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Resolve a connected user's display identity from any of their
    /// live connections
    pub fn user_identity(&self, user_id: Uuid) -> Option<UserIdentity> {
        self.user_connections(user_id)
            .first()
            .map(|c| c.user().clone())
    }

    /// All rooms any of a user's connections has joined
    pub fn rooms_of_user(&self, user_id: Uuid) -> Vec<Uuid> {
        let mut rooms = HashSet::new();
        for connection in self.user_connections(user_id) {
            rooms.extend(connection.rooms());
        }
        rooms.into_iter().collect()
    }

    /// Send a message to all of a user's connections (the personal group)
    pub async fn send_to_user(&self, user_id: Uuid, message: ServerMessage) -> usize {
        let mut sent = 0;

        for conn in self.user_connections(user_id) {
            if conn.send(message.clone()).await.is_ok() {
                sent += 1;
            }
        }

        tracing::trace!(user_id = %user_id, sent = sent, "Message sent to user connections");

        sent
    }

    /// Send a message to every room subscriber, optionally excluding the
    /// originating connection
    pub async fn send_to_room(
        &self,
        conversation_id: Uuid,
        message: ServerMessage,
        exclude_connection: Option<&str>,
    ) -> usize {
        let mut sent = 0;

        for conn in self.room_connections(conversation_id) {
            if Some(conn.connection_id()) == exclude_connection {
                continue;
            }

            if conn.send(message.clone()).await.is_ok() {
                sent += 1;
            }
        }

        tracing::trace!(
            conversation_id = %conversation_id,
            sent = sent,
            "Message sent to room connections"
        );

        sent
    }

    /// Get the total number of active connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Get the number of distinct connected users
    pub fn user_count(&self) -> usize {
        self.user_connections.len()
    }

    /// Get the number of rooms with active subscribers
    pub fn room_count(&self) -> usize {
        self.room_connections.len()
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("connections", &self.connections.len())
            .field("users", &self.user_connections.len())
            .field("rooms", &self.room_connections.len())
            .finish()
    }
}
