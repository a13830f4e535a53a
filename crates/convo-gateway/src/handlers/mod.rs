//! Client event handlers
//!
//! Dispatches parsed client events to the room manager, message
//! pipeline, and presence registry. A handler failure never tears down
//! the connection; the dispatcher's caller turns it into a single
//! `error` event plus a log line.

mod error;

pub use error::{HandlerError, HandlerResult};

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::connection::Connection;
use crate::events::{PresenceUpdatedEvent, ServerEventType, TypingUser, TypingUsersEvent};
use crate::messages::MessagePipeline;
use crate::presence::{PresencePatch, PresenceStatus};
use crate::protocol::{ClientMessage, ServerMessage};
use crate::rooms::RoomManager;
use crate::server::GatewayState;

/// Dispatch incoming client events to the appropriate handler
pub struct EventDispatcher;

impl EventDispatcher {
    /// Handle an incoming client event
    pub async fn dispatch(
        state: &GatewayState,
        connection: &Arc<Connection>,
        message: ClientMessage,
    ) -> HandlerResult<()> {
        tracing::trace!(
            connection_id = %connection.connection_id(),
            event = message.event_name(),
            "Dispatching client event"
        );

        match message {
            ClientMessage::JoinConversation(payload) => {
                RoomManager::new(state)
                    .join(connection, payload.conversation_id)
                    .await
            }
            ClientMessage::LeaveConversation(payload) => {
                RoomManager::new(state)
                    .leave(connection, payload.conversation_id)
                    .await
            }
            ClientMessage::SendMessage(payload) => {
                MessagePipeline::new(state).send(connection, payload).await
            }
            ClientMessage::TypingStart(payload) => {
                handle_typing(state, connection, payload.conversation_id, true).await
            }
            ClientMessage::TypingStop(payload) => {
                handle_typing(state, connection, payload.conversation_id, false).await
            }
            ClientMessage::SetPresence(payload) => {
                handle_set_presence(state, connection, payload.status).await
            }
        }
    }
}

/// Handle `typing_start` / `typing_stop`.
///
/// Every transition broadcasts the complete typing list for the
/// conversation, so a client that missed an earlier start or stop heals
/// on the next event.
async fn handle_typing(
    state: &GatewayState,
    connection: &Arc<Connection>,
    conversation_id: Uuid,
    is_typing: bool,
) -> HandlerResult<()> {
    // Typing only reaches rooms the connection actually joined
    if !connection.is_in_room(conversation_id) {
        return Err(HandlerError::NotParticipant);
    }

    state
        .presence()
        .set_typing(connection.user_id(), conversation_id, is_typing);
    state.presence().touch(connection.user_id());

    broadcast_typing_snapshot(state, conversation_id).await;

    Ok(())
}

/// Handle `set_presence`
async fn handle_set_presence(
    state: &GatewayState,
    connection: &Arc<Connection>,
    status: PresenceStatus,
) -> HandlerResult<()> {
    let user_id = connection.user_id();

    let applied = state
        .presence()
        .update_presence(user_id, PresencePatch { status: Some(status) });

    if applied {
        broadcast_presence_update(state, user_id).await;
    }

    Ok(())
}

/// Broadcast the full typing-user snapshot for a conversation to all of
/// its current subscribers
pub async fn broadcast_typing_snapshot(state: &GatewayState, conversation_id: Uuid) {
    let typing_users: Vec<TypingUser> = state
        .presence()
        .typing_users(conversation_id)
        .into_iter()
        .filter_map(|user_id| state.connection_manager().user_identity(user_id))
        .map(TypingUser::from)
        .collect();

    let event = TypingUsersEvent {
        conversation_id,
        typing_users,
        timestamp: Utc::now(),
    };

    state
        .connection_manager()
        .send_to_room(
            conversation_id,
            ServerMessage::new(ServerEventType::TypingUsersUpdated, &event),
            None,
        )
        .await;
}

/// Broadcast a user's current status to every room their connections
/// joined, and to their personal group
pub async fn broadcast_presence_update(state: &GatewayState, user_id: Uuid) {
    let status = state.presence().status(user_id);
    let event = PresenceUpdatedEvent {
        user_id,
        status: status.to_string(),
        timestamp: Utc::now(),
    };
    let message = ServerMessage::new(ServerEventType::PresenceUpdated, &event);

    for conversation_id in state.connection_manager().rooms_of_user(user_id) {
        state
            .connection_manager()
            .send_to_room(conversation_id, message.clone(), None)
            .await;
    }

    state
        .connection_manager()
        .send_to_user(user_id, message)
        .await;
}
