//! PostgreSQL implementation of ReadReceiptStore

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use convo_core::entities::ReadReceipt;
use convo_core::traits::{ReadReceiptStore, StoreResult};

use super::error::map_db_error;

/// PostgreSQL implementation of ReadReceiptStore
#[derive(Clone)]
pub struct PgReadReceiptStore {
    pool: PgPool,
}

impl PgReadReceiptStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReadReceiptStore for PgReadReceiptStore {
    #[instrument(skip(self))]
    async fn create(&self, message_id: Uuid, user_id: Uuid) -> StoreResult<ReadReceipt> {
        let read_at = Utc::now();

        // Re-reads of the same message are idempotent
        sqlx::query(
            r#"
            INSERT INTO message_read_receipts (message_id, user_id, read_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (message_id, user_id) DO NOTHING
            "#,
        )
        .bind(message_id)
        .bind(user_id)
        .bind(read_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(ReadReceipt {
            message_id,
            user_id,
            read_at,
        })
    }
}
