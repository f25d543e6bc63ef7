//! In-memory user store.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use nasbox_core::error::AppError;
use nasbox_core::result::AppResult;
use nasbox_entity::user::{NewUser, User};

use crate::store::UserStore;

/// [`UserStore`] kept in process memory.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

impl MemoryUserStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, data: &NewUser) -> AppResult<User> {
        let mut users = self.users.write().await;
        if users
            .values()
            .any(|u| u.email == data.email || u.username == data.username)
        {
            return Err(AppError::already_exists(format!(
                "User '{}' or email '{}' already exists",
                data.username, data.email
            )));
        }
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: data.email.clone(),
            username: data.username.clone(),
            role: data.role,
            password_hash: data.password_hash.clone(),
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.username == username).cloned())
    }

    async fn list(&self) -> AppResult<Vec<User>> {
        let mut all: Vec<User> = self.users.read().await.values().cloned().collect();
        all.sort_by_key(|u| u.created_at);
        Ok(all)
    }
}
