//! PostgreSQL implementation of ConversationStore

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use convo_core::error::DomainError;
use convo_core::traits::{ConversationStore, StoreResult};

use super::error::map_db_error;

/// PostgreSQL implementation of ConversationStore
#[derive(Clone)]
pub struct PgConversationStore {
    pool: PgPool,
}

impl PgConversationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConversationStore for PgConversationStore {
    #[instrument(skip(self))]
    async fn touch(&self, conversation_id: Uuid) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE conversations
            SET last_message_at = NOW(), updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(conversation_id)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::ConversationNotFound(conversation_id));
        }

        Ok(())
    }
}
