//! NAS share repository.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use nasbox_core::error::{AppError, ErrorKind};
use nasbox_core::result::AppResult;
use nasbox_entity::nas::{NasShare, NewNasShare, UpdateNasShare};

use crate::store::NasShareStore;

/// PostgreSQL-backed [`NasShareStore`].
#[derive(Debug, Clone)]
pub struct NasShareRepository {
    pool: PgPool,
}

impl NasShareRepository {
    /// Create a new NAS share repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_write_err(name: Option<&str>, context: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    let name = name.map(str::to_owned);
    move |e| match e {
        sqlx::Error::Database(ref db) if db.constraint() == Some("nas_shares_name_key") => {
            AppError::already_exists(format!(
                "NAS share name '{}' already exists",
                name.unwrap_or_default()
            ))
        }
        _ => AppError::with_source(ErrorKind::Database, context, e),
    }
}

#[async_trait]
impl NasShareStore for NasShareRepository {
    async fn list(&self) -> AppResult<Vec<NasShare>> {
        sqlx::query_as::<_, NasShare>("SELECT * FROM nas_shares ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list NAS shares", e))
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<NasShare>> {
        sqlx::query_as::<_, NasShare>("SELECT * FROM nas_shares WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find NAS share", e))
    }

    async fn find_by_name(&self, name: &str) -> AppResult<Option<NasShare>> {
        sqlx::query_as::<_, NasShare>("SELECT * FROM nas_shares WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find NAS share by name", e)
            })
    }

    async fn create(&self, data: &NewNasShare) -> AppResult<NasShare> {
        sqlx::query_as::<_, NasShare>(
            "INSERT INTO nas_shares \
                (name, path, protocol, permission, description, allowed_ips, enabled, created_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING *",
        )
        .bind(&data.name)
        .bind(&data.path)
        .bind(data.protocol)
        .bind(data.permission)
        .bind(&data.description)
        .bind(&data.allowed_ips)
        .bind(data.enabled)
        .bind(data.created_by)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_err(Some(&data.name), "Failed to create NAS share"))
    }

    async fn update(&self, id: Uuid, data: &UpdateNasShare) -> AppResult<Option<NasShare>> {
        sqlx::query_as::<_, NasShare>(
            "UPDATE nas_shares SET \
                name = COALESCE($2, name), \
                path = COALESCE($3, path), \
                protocol = COALESCE($4, protocol), \
                permission = COALESCE($5, permission), \
                description = COALESCE($6, description), \
                allowed_ips = COALESCE($7, allowed_ips), \
                enabled = COALESCE($8, enabled), \
                updated_at = NOW() \
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(&data.name)
        .bind(&data.path)
        .bind(data.protocol)
        .bind(data.permission)
        .bind(&data.description)
        .bind(&data.allowed_ips)
        .bind(data.enabled)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_write_err(data.name.as_deref(), "Failed to update NAS share"))
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM nas_shares WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to delete NAS share", e)
            })?;
        Ok(result.rows_affected() > 0)
    }
}
