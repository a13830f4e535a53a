//! Display-field resolution for outbound messages
//!
//! Persisted messages carry only sender ids; the wire contract carries
//! resolved display identities for the sender and any replied-to
//! message. The resolver caches identity lookups so a 50-message history
//! replay does not hit the user store once per row.

use std::collections::HashMap;

use convo_core::{Message, StoreResult};
use uuid::Uuid;

use crate::events::{WireMessage, WireReplyTo, WireUser};
use crate::server::Stores;

/// Resolves persisted messages into their wire representation
pub struct MessageResolver<'a> {
    stores: &'a Stores,
    identities: HashMap<Uuid, WireUser>,
}

impl<'a> MessageResolver<'a> {
    pub fn new(stores: &'a Stores) -> Self {
        Self {
            stores,
            identities: HashMap::new(),
        }
    }

    /// Resolve a full message, including its reply-to chain (one level)
    pub async fn resolve(&mut self, message: Message) -> StoreResult<WireMessage> {
        let sender = self.identity(message.sender_id).await?;
        let reply_to = match message.reply_to_id {
            Some(reply_id) => self.resolve_reply(reply_id, message.conversation_id).await?,
            None => None,
        };

        Ok(WireMessage::from_message(message, sender, reply_to))
    }

    /// Resolve the replied-to message, if it still exists in the same
    /// conversation. History rows may reference since-deleted targets;
    /// those resolve to `None` rather than failing the replay.
    pub async fn resolve_reply(
        &mut self,
        reply_id: Uuid,
        conversation_id: Uuid,
    ) -> StoreResult<Option<WireReplyTo>> {
        let Some(reply) = self.stores.messages.find_by_id(reply_id).await? else {
            return Ok(None);
        };
        if reply.conversation_id != conversation_id {
            return Ok(None);
        }

        let sender = self.identity(reply.sender_id).await?;

        Ok(Some(WireReplyTo {
            id: reply.id,
            sender,
            content: reply.content,
        }))
    }

    /// Seed the cache with an identity already known to the caller (the
    /// sending connection's own user)
    pub fn seed_identity(&mut self, user: WireUser) {
        self.identities.insert(user.id, user);
    }

    async fn identity(&mut self, user_id: Uuid) -> StoreResult<WireUser> {
        if let Some(user) = self.identities.get(&user_id) {
            return Ok(user.clone());
        }

        let user = self
            .stores
            .users
            .find_identity(user_id)
            .await?
            .map(WireUser::from)
            .unwrap_or_else(|| deleted_user(user_id));

        self.identities.insert(user_id, user.clone());
        Ok(user)
    }
}

/// Placeholder identity for messages whose author no longer exists
fn deleted_user(user_id: Uuid) -> WireUser {
    WireUser {
        id: user_id,
        first_name: "Deleted".to_string(),
        last_name: "User".to_string(),
        avatar: None,
    }
}
