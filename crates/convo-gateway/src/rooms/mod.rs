//! Room membership management
//!
//! Joining and leaving conversation broadcast groups. The participant
//! lookup is the authorization gate and runs on every join; a rejected
//! join changes no state and leaves the connection usable.

use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use crate::connection::Connection;
use crate::events::{
    ConversationJoinedEvent, ConversationLeftEvent, ServerEventType, UserLeftEvent,
};
use crate::handlers::{HandlerError, HandlerResult};
use crate::messages::MessageResolver;
use crate::protocol::ServerMessage;
use crate::server::GatewayState;
use uuid::Uuid;

/// Room membership manager
pub struct RoomManager<'a> {
    state: &'a GatewayState,
}

impl<'a> RoomManager<'a> {
    /// Create a new RoomManager
    pub fn new(state: &'a GatewayState) -> Self {
        Self { state }
    }

    /// Join a conversation room.
    ///
    /// Subscribes the connection, replays the most recent history
    /// (oldest-first) to the joiner only, and records the room as the
    /// user's current conversation.
    #[instrument(skip(self, connection), fields(user_id = %connection.user_id()))]
    pub async fn join(
        &self,
        connection: &Arc<Connection>,
        conversation_id: Uuid,
    ) -> HandlerResult<()> {
        let user_id = connection.user_id();
        let stores = self.state.stores();

        // Authorization gate, re-checked on every join
        stores
            .participants
            .find(conversation_id, user_id)
            .await?
            .ok_or(HandlerError::NotParticipant)?;

        self.state
            .connection_manager()
            .subscribe(connection.connection_id(), conversation_id);

        // History arrives newest-first from the store; the client wants
        // it oldest-first
        let limit = self.state.config().chat.history_limit;
        let mut history = stores.messages.recent(conversation_id, limit).await?;
        history.reverse();

        let mut resolver = MessageResolver::new(stores);
        let mut messages = Vec::with_capacity(history.len());
        for message in history {
            messages.push(resolver.resolve(message).await?);
        }

        let joined = ConversationJoinedEvent {
            conversation_id,
            messages,
        };
        if connection
            .send(ServerMessage::new(ServerEventType::ConversationJoined, &joined))
            .await
            .is_err()
        {
            tracing::debug!(
                connection_id = %connection.connection_id(),
                "Connection closed before conversation_joined"
            );
        }

        self.state
            .presence()
            .set_conversation(user_id, Some(conversation_id));

        tracing::info!(
            conversation_id = %conversation_id,
            replayed = joined.messages.len(),
            "Connection joined conversation"
        );

        Ok(())
    }

    /// Leave a conversation room.
    ///
    /// Unsubscribes unconditionally (idempotent), notifies the remaining
    /// subscribers, and acknowledges to the leaver.
    #[instrument(skip(self, connection), fields(user_id = %connection.user_id()))]
    pub async fn leave(
        &self,
        connection: &Arc<Connection>,
        conversation_id: Uuid,
    ) -> HandlerResult<()> {
        let user_id = connection.user_id();
        let now = Utc::now();

        self.state
            .connection_manager()
            .unsubscribe(connection.connection_id(), conversation_id);

        let user = connection.user();
        let left = UserLeftEvent {
            user_id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            timestamp: now,
        };
        self.state
            .connection_manager()
            .send_to_room(
                conversation_id,
                ServerMessage::new(ServerEventType::UserLeft, &left),
                Some(connection.connection_id()),
            )
            .await;

        let ack = ConversationLeftEvent {
            conversation_id,
            timestamp: now,
        };
        if connection
            .send(ServerMessage::new(ServerEventType::ConversationLeft, &ack))
            .await
            .is_err()
        {
            tracing::debug!(
                connection_id = %connection.connection_id(),
                "Connection closed before conversation_left ack"
            );
        }

        self.state
            .presence()
            .clear_conversation_if_current(user_id, conversation_id);

        tracing::info!(conversation_id = %conversation_id, "Connection left conversation");

        Ok(())
    }
}
