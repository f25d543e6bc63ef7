//! In-memory metadata store.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use nasbox_core::error::AppError;
use nasbox_core::path;
use nasbox_core::result::AppResult;
use nasbox_entity::file::{FileRecord, NewFileRecord};
use nasbox_entity::folder::{FolderRecord, NewFolderRecord};
use nasbox_entity::metadata::{MetadataRecord, SearchKind};

use super::FailSwitch;
use crate::store::MetadataStore;

#[derive(Debug, Default)]
struct Tables {
    files: HashMap<Uuid, FileRecord>,
    folders: HashMap<Uuid, FolderRecord>,
}

/// [`MetadataStore`] kept in process memory.
#[derive(Debug, Default)]
pub struct MemoryMetadataStore {
    tables: RwLock<Tables>,
    fail_writes: FailSwitch,
}

impl MemoryMetadataStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail (or succeed again).
    pub fn fail_writes(&self, failing: bool) {
        self.fail_writes.set(failing);
    }

    /// Total number of records held, for assertions.
    pub async fn len(&self) -> usize {
        let tables = self.tables.read().await;
        tables.files.len() + tables.folders.len()
    }

    /// Whether the store holds no records.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn sorted(mut files: Vec<FileRecord>, mut folders: Vec<FolderRecord>) -> Vec<MetadataRecord> {
    folders.sort_by(|a, b| a.path.cmp(&b.path));
    files.sort_by(|a, b| a.path.cmp(&b.path));
    folders
        .into_iter()
        .map(MetadataRecord::Folder)
        .chain(files.into_iter().map(MetadataRecord::File))
        .collect()
}

#[async_trait]
impl MetadataStore for MemoryMetadataStore {
    async fn upsert_file(&self, data: &NewFileRecord) -> AppResult<FileRecord> {
        self.fail_writes.check("upsert_file")?;
        let mut tables = self.tables.write().await;
        let now = Utc::now();

        if let Some(existing) = tables
            .files
            .values_mut()
            .find(|f| f.owner_id == data.owner_id && f.path == data.path)
        {
            existing.filename = data.filename.clone();
            existing.mime_type = data.mime_type.clone();
            existing.size_bytes = data.size_bytes;
            existing.updated_at = now;
            return Ok(existing.clone());
        }

        let record = FileRecord {
            id: Uuid::new_v4(),
            owner_id: data.owner_id,
            path: data.path.clone(),
            filename: data.filename.clone(),
            mime_type: data.mime_type.clone(),
            size_bytes: data.size_bytes,
            created_at: now,
            updated_at: now,
        };
        tables.files.insert(record.id, record.clone());
        Ok(record)
    }

    async fn upsert_folder(&self, data: &NewFolderRecord) -> AppResult<FolderRecord> {
        self.fail_writes.check("upsert_folder")?;
        let mut tables = self.tables.write().await;
        let now = Utc::now();

        if let Some(existing) = tables
            .folders
            .values_mut()
            .find(|f| f.owner_id == data.owner_id && f.path == data.path)
        {
            existing.name = data.name.clone();
            existing.updated_at = now;
            return Ok(existing.clone());
        }

        let record = FolderRecord {
            id: Uuid::new_v4(),
            owner_id: data.owner_id,
            name: data.name.clone(),
            path: data.path.clone(),
            created_at: now,
            updated_at: now,
        };
        tables.folders.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_by_path(&self, owner_id: Uuid, path: &str) -> AppResult<Option<MetadataRecord>> {
        if let Some(file) = self.find_file(owner_id, path).await? {
            return Ok(Some(MetadataRecord::File(file)));
        }
        Ok(self
            .find_folder(owner_id, path)
            .await?
            .map(MetadataRecord::Folder))
    }

    async fn find_file(&self, owner_id: Uuid, path: &str) -> AppResult<Option<FileRecord>> {
        let tables = self.tables.read().await;
        Ok(tables
            .files
            .values()
            .find(|f| f.owner_id == owner_id && f.path == path)
            .cloned())
    }

    async fn find_folder(&self, owner_id: Uuid, path: &str) -> AppResult<Option<FolderRecord>> {
        let tables = self.tables.read().await;
        Ok(tables
            .folders
            .values()
            .find(|f| f.owner_id == owner_id && f.path == path)
            .cloned())
    }

    async fn find_file_by_id(&self, id: Uuid) -> AppResult<Option<FileRecord>> {
        Ok(self.tables.read().await.files.get(&id).cloned())
    }

    async fn find_folder_by_id(&self, id: Uuid) -> AppResult<Option<FolderRecord>> {
        Ok(self.tables.read().await.folders.get(&id).cloned())
    }

    async fn list_by_prefix(&self, owner_id: Uuid, prefix: &str) -> AppResult<Vec<MetadataRecord>> {
        let tables = self.tables.read().await;
        let files = tables
            .files
            .values()
            .filter(|f| f.owner_id == owner_id && path::is_immediate_child(prefix, &f.path))
            .cloned()
            .collect();
        let folders = tables
            .folders
            .values()
            .filter(|f| f.owner_id == owner_id && path::is_immediate_child(prefix, &f.path))
            .cloned()
            .collect();
        Ok(sorted(files, folders))
    }

    async fn list_subtree(&self, owner_id: Uuid, prefix: &str) -> AppResult<Vec<MetadataRecord>> {
        let tables = self.tables.read().await;
        let files = tables
            .files
            .values()
            .filter(|f| f.owner_id == owner_id && path::is_within(prefix, &f.path))
            .cloned()
            .collect();
        let folders = tables
            .folders
            .values()
            .filter(|f| f.owner_id == owner_id && path::is_within(prefix, &f.path))
            .cloned()
            .collect();
        Ok(sorted(files, folders))
    }

    async fn rename_path(
        &self,
        owner_id: Uuid,
        old_path: &str,
        new_path: &str,
        new_name: &str,
    ) -> AppResult<u64> {
        self.fail_writes.check("rename_path")?;
        if old_path.is_empty() {
            return Err(AppError::validation("The owner root cannot be renamed"));
        }
        let mut tables = self.tables.write().await;

        let taken = tables
            .files
            .values()
            .any(|f| f.owner_id == owner_id && f.path == new_path)
            || tables
                .folders
                .values()
                .any(|f| f.owner_id == owner_id && f.path == new_path);
        if taken {
            return Err(AppError::already_exists(format!(
                "Path '{new_path}' already exists"
            )));
        }

        let now = Utc::now();
        let mut updated = 0u64;
        for folder in tables.folders.values_mut() {
            if folder.owner_id != owner_id {
                continue;
            }
            if let Some(rebased) = path::rebase(&folder.path, old_path, new_path) {
                if folder.path == old_path {
                    folder.name = new_name.to_string();
                }
                folder.path = rebased;
                folder.updated_at = now;
                updated += 1;
            }
        }
        for file in tables.files.values_mut() {
            if file.owner_id != owner_id {
                continue;
            }
            if let Some(rebased) = path::rebase(&file.path, old_path, new_path) {
                if file.path == old_path {
                    file.filename = new_name.to_string();
                }
                file.path = rebased;
                file.updated_at = now;
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn delete_by_path(&self, owner_id: Uuid, path: &str) -> AppResult<u64> {
        self.fail_writes.check("delete_by_path")?;
        let mut tables = self.tables.write().await;
        let before = tables.files.len() + tables.folders.len();
        tables
            .files
            .retain(|_, f| !(f.owner_id == owner_id && path::is_within(path, &f.path)));
        tables
            .folders
            .retain(|_, f| !(f.owner_id == owner_id && path::is_within(path, &f.path)));
        let after = tables.files.len() + tables.folders.len();
        Ok((before - after) as u64)
    }

    async fn refresh_file(
        &self,
        id: Uuid,
        size_bytes: i64,
        updated_at: DateTime<Utc>,
    ) -> AppResult<()> {
        self.fail_writes.check("refresh_file")?;
        let mut tables = self.tables.write().await;
        if let Some(file) = tables.files.get_mut(&id) {
            file.size_bytes = size_bytes;
            file.updated_at = updated_at;
        }
        Ok(())
    }

    async fn search(
        &self,
        owner_id: Uuid,
        query: &str,
        kind: SearchKind,
        limit: u32,
    ) -> AppResult<Vec<MetadataRecord>> {
        let needle = query.trim().to_lowercase();
        let tables = self.tables.read().await;

        let mut hits: Vec<MetadataRecord> = Vec::new();
        if kind.includes_files() {
            hits.extend(
                tables
                    .files
                    .values()
                    .filter(|f| f.owner_id == owner_id && f.filename.to_lowercase().contains(&needle))
                    .cloned()
                    .map(MetadataRecord::File),
            );
        }
        if kind.includes_folders() {
            hits.extend(
                tables
                    .folders
                    .values()
                    .filter(|f| f.owner_id == owner_id && f.name.to_lowercase().contains(&needle))
                    .cloned()
                    .map(MetadataRecord::Folder),
            );
        }

        hits.sort_by_key(|r| std::cmp::Reverse(r.created_at()));
        hits.truncate(limit as usize);
        Ok(hits)
    }
}
