//! PostgreSQL implementation of ParticipantStore

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use convo_core::entities::Participant;
use convo_core::traits::{ParticipantStore, StoreResult};

use crate::models::ParticipantRow;

use super::error::map_db_error;

/// PostgreSQL implementation of ParticipantStore
#[derive(Clone)]
pub struct PgParticipantStore {
    pool: PgPool,
}

impl PgParticipantStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ParticipantStore for PgParticipantStore {
    #[instrument(skip(self))]
    async fn find(&self, conversation_id: Uuid, user_id: Uuid) -> StoreResult<Option<Participant>> {
        let result = sqlx::query_as::<_, ParticipantRow>(
            r#"
            SELECT conversation_id, user_id, role, is_muted, last_read_at, joined_at
            FROM conversation_participants
            WHERE conversation_id = $1 AND user_id = $2 AND left_at IS NULL
            "#,
        )
        .bind(conversation_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(Participant::from))
    }
}
