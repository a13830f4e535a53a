//! PostgreSQL implementation of UserStore

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use convo_core::entities::UserIdentity;
use convo_core::traits::{StoreResult, UserStore};

use crate::models::UserRow;

use super::error::map_db_error;

/// PostgreSQL implementation of UserStore
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    #[instrument(skip(self))]
    async fn find_identity(&self, user_id: Uuid) -> StoreResult<Option<UserIdentity>> {
        let result = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, first_name, last_name, avatar
            FROM users
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(UserIdentity::from))
    }
}
