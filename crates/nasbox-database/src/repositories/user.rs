//! User repository.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use nasbox_core::error::{AppError, ErrorKind};
use nasbox_core::result::AppResult;
use nasbox_entity::user::{NewUser, User};

use crate::store::UserStore;

/// PostgreSQL-backed [`UserStore`].
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for UserRepository {
    async fn create(&self, data: &NewUser) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            "INSERT INTO users (email, username, role, password_hash) \
             VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(&data.email)
        .bind(&data.username)
        .bind(data.role)
        .bind(&data.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db)
                if matches!(db.constraint(), Some("users_email_key" | "users_username_key")) =>
            {
                AppError::already_exists(format!(
                    "User '{}' or email '{}' already exists",
                    data.username, data.email
                ))
            }
            _ => AppError::with_source(ErrorKind::Database, "Failed to create user", e),
        })
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find user", e))
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find user by username", e)
            })
    }

    async fn list(&self) -> AppResult<Vec<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list users", e))
    }
}
