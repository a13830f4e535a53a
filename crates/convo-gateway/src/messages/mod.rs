//! Message ingress pipeline
//!
//! Validates, sanitizes, persists, and fans out chat messages. Every
//! gate runs before persistence: a rejected send leaves no message, no
//! read receipt, and no activity bump behind.

mod attachment;
mod resolver;

pub use attachment::validate_attachment_url;
pub use resolver::MessageResolver;

use std::sync::Arc;

use convo_core::{sanitize_content, NewMessage};
use tracing::instrument;

use crate::connection::Connection;
use crate::events::{ServerEventType, WireUser};
use crate::handlers::{HandlerError, HandlerResult};
use crate::protocol::{SendMessagePayload, ServerMessage};
use crate::server::GatewayState;

/// Message ingress pipeline
pub struct MessagePipeline<'a> {
    state: &'a GatewayState,
}

impl<'a> MessagePipeline<'a> {
    /// Create a new MessagePipeline
    pub fn new(state: &'a GatewayState) -> Self {
        Self { state }
    }

    /// Run a send through the full pipeline.
    ///
    /// Gates in order: participant, mute, cooldown, reply integrity,
    /// attachment integrity, then sanitize - persist - fan out. The
    /// pipeline does not deduplicate client retries; each validated call
    /// creates a new message.
    #[instrument(
        skip(self, connection, payload),
        fields(
            conversation_id = %payload.conversation_id,
            user_id = %connection.user_id(),
        )
    )]
    pub async fn send(
        &self,
        connection: &Arc<Connection>,
        payload: SendMessagePayload,
    ) -> HandlerResult<()> {
        let user_id = connection.user_id();
        let conversation_id = payload.conversation_id;
        let stores = self.state.stores();

        // Membership can change between connections, so this is
        // re-fetched on every send rather than cached on the socket
        let participant = stores
            .participants
            .find(conversation_id, user_id)
            .await?
            .ok_or(HandlerError::NotParticipant)?;

        if participant.is_muted {
            return Err(HandlerError::Muted);
        }

        if self.state.message_cooldown().check_key(&user_id).is_err() {
            return Err(HandlerError::RateLimited);
        }

        // Reply target must exist in the same conversation
        if let Some(reply_id) = payload.reply_to_id {
            match stores.messages.find_by_id(reply_id).await? {
                Some(target) if target.conversation_id == conversation_id => {}
                _ => return Err(HandlerError::ReplyNotFound),
            }
        }

        if payload.has_attachment_fields() {
            let url = payload.attachment_url.as_deref().ok_or_else(|| {
                HandlerError::Validation(
                    "Attachment URL is required when an attachment type is set".to_string(),
                )
            })?;
            validate_attachment_url(url, &self.state.config().chat.approved_attachment_hosts)?;
        }

        let content = sanitize_content(&payload.content, self.state.config().chat.max_content_length);
        if content.trim().is_empty() && payload.attachment_url.is_none() {
            return Err(HandlerError::Validation(
                "Message content cannot be empty".to_string(),
            ));
        }

        // Persistence. Nothing above this line has written anything.
        let message = stores
            .messages
            .create(NewMessage {
                conversation_id,
                sender_id: user_id,
                content,
                message_type: payload.message_type.unwrap_or_default(),
                reply_to_id: payload.reply_to_id,
                attachment_url: payload.attachment_url.clone(),
                attachment_type: payload.attachment_type.clone(),
            })
            .await?;

        stores.conversations.touch(conversation_id).await?;

        // The sender has always read their own message
        stores.receipts.create(message.id, user_id).await?;

        // Fan-out envelope: resolved display fields plus the message
        let sender = WireUser::from(connection.user());
        let mut resolver = MessageResolver::new(stores);
        resolver.seed_identity(sender.clone());

        let reply_to = match message.reply_to_id {
            Some(reply_id) => resolver.resolve_reply(reply_id, conversation_id).await?,
            None => None,
        };
        let wire =
            crate::events::WireMessage::from_message(message, sender, reply_to);

        // Two distinct events: the room hears `message_received`, the
        // sender alone hears `message_sent`, so an optimistic local copy
        // is never double-counted
        self.state
            .connection_manager()
            .send_to_room(
                conversation_id,
                ServerMessage::new(ServerEventType::MessageReceived, &wire),
                Some(connection.connection_id()),
            )
            .await;

        if connection
            .send(ServerMessage::new(ServerEventType::MessageSent, &wire))
            .await
            .is_err()
        {
            tracing::debug!(
                connection_id = %connection.connection_id(),
                "Sender disconnected before message_sent echo"
            );
        }

        self.state.presence().touch(user_id);

        tracing::info!(
            message_id = %wire.id,
            conversation_id = %conversation_id,
            "Message delivered"
        );

        Ok(())
    }
}
