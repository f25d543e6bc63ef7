//! Activity log repository (append-only).

use async_trait::async_trait;
use sqlx::PgPool;

use nasbox_core::error::{AppError, ErrorKind};
use nasbox_core::result::AppResult;
use nasbox_entity::activity::{ActivityLogEntry, ActivityQuery, NewActivity};

use crate::store::ActivityStore;

/// PostgreSQL-backed [`ActivityStore`].
#[derive(Debug, Clone)]
pub struct ActivityRepository {
    pool: PgPool,
}

impl ActivityRepository {
    /// Create a new activity repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ActivityStore for ActivityRepository {
    async fn append(&self, data: &NewActivity) -> AppResult<ActivityLogEntry> {
        sqlx::query_as::<_, ActivityLogEntry>(
            "INSERT INTO activity_logs (user_id, activity_type, description, metadata, ip_address, user_agent) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
        )
        .bind(data.user_id)
        .bind(data.activity_type)
        .bind(&data.description)
        .bind(&data.metadata)
        .bind(&data.ip_address)
        .bind(&data.user_agent)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to append activity", e))
    }

    async fn list(&self, query: &ActivityQuery) -> AppResult<Vec<ActivityLogEntry>> {
        sqlx::query_as::<_, ActivityLogEntry>(
            "SELECT * FROM activity_logs \
             WHERE ($1::uuid IS NULL OR user_id = $1) \
               AND ($2::activity_type IS NULL OR activity_type = $2) \
             ORDER BY created_at DESC LIMIT $3",
        )
        .bind(query.user_id)
        .bind(query.activity_type)
        .bind(i64::from(query.limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list activity", e))
    }
}
