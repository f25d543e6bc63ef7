//! In-memory activity log.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use nasbox_core::result::AppResult;
use nasbox_entity::activity::{ActivityLogEntry, ActivityQuery, NewActivity};

use super::FailSwitch;
use crate::store::ActivityStore;

/// [`ActivityStore`] kept in process memory.
#[derive(Debug, Default)]
pub struct MemoryActivityStore {
    entries: RwLock<Vec<ActivityLogEntry>>,
    fail_writes: FailSwitch,
}

impl MemoryActivityStore {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent append fail (or succeed again).
    pub fn fail_writes(&self, failing: bool) {
        self.fail_writes.set(failing);
    }

    /// Every entry in insertion order.
    pub async fn all(&self) -> Vec<ActivityLogEntry> {
        self.entries.read().await.clone()
    }
}

#[async_trait]
impl ActivityStore for MemoryActivityStore {
    async fn append(&self, data: &NewActivity) -> AppResult<ActivityLogEntry> {
        self.fail_writes.check("append activity")?;
        let entry = ActivityLogEntry {
            id: Uuid::new_v4(),
            user_id: data.user_id,
            activity_type: data.activity_type,
            description: data.description.clone(),
            metadata: data.metadata.clone(),
            ip_address: data.ip_address.clone(),
            user_agent: data.user_agent.clone(),
            created_at: Utc::now(),
        };
        self.entries.write().await.push(entry.clone());
        Ok(entry)
    }

    async fn list(&self, query: &ActivityQuery) -> AppResult<Vec<ActivityLogEntry>> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .rev()
            .filter(|e| query.user_id.is_none_or(|id| e.user_id == id))
            .filter(|e| query.activity_type.is_none_or(|t| e.activity_type == t))
            .take(query.limit as usize)
            .cloned()
            .collect())
    }
}
