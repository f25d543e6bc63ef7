//! In-memory NAS share store.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use nasbox_core::error::AppError;
use nasbox_core::result::AppResult;
use nasbox_entity::nas::{NasShare, NewNasShare, UpdateNasShare};

use crate::store::NasShareStore;

/// [`NasShareStore`] kept in process memory.
#[derive(Debug, Default)]
pub struct MemoryNasShareStore {
    shares: RwLock<HashMap<Uuid, NasShare>>,
}

impl MemoryNasShareStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn duplicate(name: &str) -> AppError {
    AppError::already_exists(format!("NAS share '{name}' already exists"))
}

#[async_trait]
impl NasShareStore for MemoryNasShareStore {
    async fn list(&self) -> AppResult<Vec<NasShare>> {
        let mut all: Vec<NasShare> = self.shares.read().await.values().cloned().collect();
        all.sort_by_key(|s| std::cmp::Reverse(s.created_at));
        Ok(all)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<NasShare>> {
        Ok(self.shares.read().await.get(&id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> AppResult<Option<NasShare>> {
        let shares = self.shares.read().await;
        Ok(shares.values().find(|s| s.name == name).cloned())
    }

    async fn create(&self, data: &NewNasShare) -> AppResult<NasShare> {
        let mut shares = self.shares.write().await;
        if shares.values().any(|s| s.name == data.name) {
            return Err(duplicate(&data.name));
        }
        let now = Utc::now();
        let share = NasShare {
            id: Uuid::new_v4(),
            name: data.name.clone(),
            path: data.path.clone(),
            protocol: data.protocol,
            permission: data.permission,
            description: data.description.clone(),
            allowed_ips: data.allowed_ips.clone(),
            enabled: data.enabled,
            created_by: data.created_by,
            created_at: now,
            updated_at: now,
        };
        shares.insert(share.id, share.clone());
        Ok(share)
    }

    async fn update(&self, id: Uuid, data: &UpdateNasShare) -> AppResult<Option<NasShare>> {
        let mut shares = self.shares.write().await;
        if let Some(name) = &data.name {
            if shares.values().any(|s| s.id != id && &s.name == name) {
                return Err(duplicate(name));
            }
        }
        let Some(share) = shares.get_mut(&id) else {
            return Ok(None);
        };
        data.apply_to(share);
        share.updated_at = Utc::now();
        Ok(Some(share.clone()))
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        Ok(self.shares.write().await.remove(&id).is_some())
    }
}
