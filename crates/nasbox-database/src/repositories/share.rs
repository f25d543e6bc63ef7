//! Share repository.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use nasbox_core::error::{AppError, ErrorKind};
use nasbox_core::result::AppResult;
use nasbox_entity::share::{NewShare, ShareRecord};

use crate::store::ShareStore;

/// PostgreSQL-backed [`ShareStore`].
#[derive(Debug, Clone)]
pub struct ShareRepository {
    pool: PgPool,
}

impl ShareRepository {
    /// Create a new share repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ShareStore for ShareRepository {
    async fn create(&self, data: &NewShare) -> AppResult<ShareRecord> {
        sqlx::query_as::<_, ShareRecord>(
            "INSERT INTO shares (token, owner_id, file_id, folder_id, password_hash, expires_at, is_public) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
        )
        .bind(&data.token)
        .bind(data.owner_id)
        .bind(data.target.file_id())
        .bind(data.target.folder_id())
        .bind(&data.password_hash)
        .bind(data.expires_at)
        .bind(data.is_public)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.constraint() == Some("shares_token_key") => {
                AppError::already_exists("Share token collision")
            }
            _ => AppError::with_source(ErrorKind::Database, "Failed to create share", e),
        })
    }

    async fn find_by_token(&self, token: &str) -> AppResult<Option<ShareRecord>> {
        sqlx::query_as::<_, ShareRecord>("SELECT * FROM shares WHERE token = $1")
            .bind(token)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find share", e))
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> AppResult<Vec<ShareRecord>> {
        sqlx::query_as::<_, ShareRecord>(
            "SELECT * FROM shares WHERE owner_id = $1 ORDER BY created_at DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list shares", e))
    }

    async fn increment_access(&self, id: Uuid) -> AppResult<i64> {
        sqlx::query_scalar::<_, i64>(
            "UPDATE shares SET access_count = access_count + 1 WHERE id = $1 RETURNING access_count",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to increment share access", e)
        })?
        .ok_or_else(|| AppError::not_found("Share not found"))
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM shares WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to delete share", e))?;
        Ok(result.rows_affected() > 0)
    }
}
