//! PostgreSQL implementation of MessageStore

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use convo_core::entities::{Message, NewMessage};
use convo_core::traits::{MessageStore, StoreResult};

use crate::models::MessageRow;

use super::error::map_db_error;

/// PostgreSQL implementation of MessageStore
#[derive(Clone)]
pub struct PgMessageStore {
    pool: PgPool,
}

impl PgMessageStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageStore for PgMessageStore {
    #[instrument(skip(self, message), fields(conversation_id = %message.conversation_id))]
    async fn create(&self, message: NewMessage) -> StoreResult<Message> {
        let id = Uuid::new_v4();
        let created_at = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO messages
                (id, conversation_id, sender_id, content, message_type,
                 reply_to_id, attachment_url, attachment_type, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(id)
        .bind(message.conversation_id)
        .bind(message.sender_id)
        .bind(&message.content)
        .bind(message.message_type.as_str())
        .bind(message.reply_to_id)
        .bind(&message.attachment_url)
        .bind(&message.attachment_type)
        .bind(created_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(Message {
            id,
            conversation_id: message.conversation_id,
            sender_id: message.sender_id,
            content: message.content,
            message_type: message.message_type,
            reply_to_id: message.reply_to_id,
            attachment_url: message.attachment_url,
            attachment_type: message.attachment_type,
            created_at,
        })
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, message_id: Uuid) -> StoreResult<Option<Message>> {
        let result = sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT id, conversation_id, sender_id, content, message_type,
                   reply_to_id, attachment_url, attachment_type, created_at
            FROM messages
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(message_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(Message::from))
    }

    #[instrument(skip(self))]
    async fn recent(&self, conversation_id: Uuid, limit: i64) -> StoreResult<Vec<Message>> {
        let limit = limit.clamp(1, 100);

        let results = sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT id, conversation_id, sender_id, content, message_type,
                   reply_to_id, attachment_url, attachment_type, created_at
            FROM messages
            WHERE conversation_id = $1 AND deleted_at IS NULL
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(conversation_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(results.into_iter().map(Message::from).collect())
    }
}
