//! In-memory share store.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use nasbox_core::error::AppError;
use nasbox_core::result::AppResult;
use nasbox_entity::share::{NewShare, ShareRecord};

use crate::store::ShareStore;

/// [`ShareStore`] kept in process memory.
///
/// Nothing cascades here when a target record disappears; resolution
/// reports such shares as not found.
#[derive(Debug, Default)]
pub struct MemoryShareStore {
    shares: RwLock<HashMap<Uuid, ShareRecord>>,
}

impl MemoryShareStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ShareStore for MemoryShareStore {
    async fn create(&self, data: &NewShare) -> AppResult<ShareRecord> {
        let mut shares = self.shares.write().await;
        if shares.values().any(|s| s.token == data.token) {
            return Err(AppError::already_exists("Share token collision"));
        }
        let record = ShareRecord {
            id: Uuid::new_v4(),
            token: data.token.clone(),
            owner_id: data.owner_id,
            file_id: data.target.file_id(),
            folder_id: data.target.folder_id(),
            password_hash: data.password_hash.clone(),
            expires_at: data.expires_at,
            is_public: data.is_public,
            access_count: 0,
            created_at: Utc::now(),
        };
        shares.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_by_token(&self, token: &str) -> AppResult<Option<ShareRecord>> {
        let shares = self.shares.read().await;
        Ok(shares.values().find(|s| s.token == token).cloned())
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> AppResult<Vec<ShareRecord>> {
        let shares = self.shares.read().await;
        let mut owned: Vec<ShareRecord> = shares
            .values()
            .filter(|s| s.owner_id == owner_id)
            .cloned()
            .collect();
        owned.sort_by_key(|s| std::cmp::Reverse(s.created_at));
        Ok(owned)
    }

    async fn increment_access(&self, id: Uuid) -> AppResult<i64> {
        let mut shares = self.shares.write().await;
        let share = shares
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found("Share not found"))?;
        share.access_count += 1;
        Ok(share.access_count)
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        Ok(self.shares.write().await.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nasbox_entity::share::ShareTarget;

    fn new_share(token: &str, owner_id: Uuid) -> NewShare {
        NewShare {
            token: token.to_string(),
            owner_id,
            target: ShareTarget::File(Uuid::new_v4()),
            password_hash: None,
            expires_at: None,
            is_public: false,
        }
    }

    #[tokio::test]
    async fn test_duplicate_token_rejected() {
        let store = MemoryShareStore::new();
        let owner = Uuid::new_v4();
        store.create(&new_share("abc", owner)).await.unwrap();
        let err = store.create(&new_share("abc", owner)).await.unwrap_err();
        assert!(err.is(nasbox_core::error::ErrorKind::AlreadyExists));
    }

    #[tokio::test]
    async fn test_increment_and_delete() {
        let store = MemoryShareStore::new();
        let share = store.create(&new_share("t", Uuid::new_v4())).await.unwrap();
        assert_eq!(store.increment_access(share.id).await.unwrap(), 1);
        assert_eq!(store.increment_access(share.id).await.unwrap(), 2);
        assert!(store.delete(share.id).await.unwrap());
        assert!(!store.delete(share.id).await.unwrap());
        assert!(store.increment_access(share.id).await.is_err());
    }
}
