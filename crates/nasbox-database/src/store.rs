//! Store traits implemented by the PostgreSQL repositories and the
//! in-memory stores.
//!
//! Every metadata query is scoped by `owner_id`. Nothing here ever
//! returns another owner's rows for a caller-supplied path.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use nasbox_core::result::AppResult;
use nasbox_entity::activity::{ActivityLogEntry, ActivityQuery, NewActivity};
use nasbox_entity::file::{FileRecord, NewFileRecord};
use nasbox_entity::folder::{FolderRecord, NewFolderRecord};
use nasbox_entity::metadata::{MetadataRecord, SearchKind};
use nasbox_entity::nas::{NasShare, NewNasShare, UpdateNasShare};
use nasbox_entity::share::{NewShare, ShareRecord};
use nasbox_entity::user::{NewUser, User};

/// File and folder records keyed by `(owner_id, path)`.
#[async_trait]
pub trait MetadataStore: Send + Sync + std::fmt::Debug + 'static {
    /// Insert a file record, or refresh the one already at that path.
    ///
    /// An existing record keeps its id and creation time.
    async fn upsert_file(&self, data: &NewFileRecord) -> AppResult<FileRecord>;

    /// Insert a folder record, or touch the one already at that path.
    async fn upsert_folder(&self, data: &NewFolderRecord) -> AppResult<FolderRecord>;

    /// Record at an exact path. A file record wins over a folder record.
    async fn find_by_path(&self, owner_id: Uuid, path: &str) -> AppResult<Option<MetadataRecord>>;

    /// File record at an exact path.
    async fn find_file(&self, owner_id: Uuid, path: &str) -> AppResult<Option<FileRecord>>;

    /// Folder record at an exact path.
    async fn find_folder(&self, owner_id: Uuid, path: &str) -> AppResult<Option<FolderRecord>>;

    /// File record by id.
    async fn find_file_by_id(&self, id: Uuid) -> AppResult<Option<FileRecord>>;

    /// Folder record by id.
    async fn find_folder_by_id(&self, id: Uuid) -> AppResult<Option<FolderRecord>>;

    /// Immediate children of the folder at `prefix` (never deeper).
    async fn list_by_prefix(&self, owner_id: Uuid, prefix: &str) -> AppResult<Vec<MetadataRecord>>;

    /// The record at `prefix` plus every descendant. `""` lists everything.
    async fn list_subtree(&self, owner_id: Uuid, prefix: &str) -> AppResult<Vec<MetadataRecord>>;

    /// Move the record at `old_path` to `new_path`, renaming it to
    /// `new_name`, and rewrite the prefix of every descendant.
    ///
    /// Returns the number of records updated.
    async fn rename_path(
        &self,
        owner_id: Uuid,
        old_path: &str,
        new_path: &str,
        new_name: &str,
    ) -> AppResult<u64>;

    /// Delete the records at `path` and every descendant.
    ///
    /// Returns the number of records removed.
    async fn delete_by_path(&self, owner_id: Uuid, path: &str) -> AppResult<u64>;

    /// Overwrite the size and timestamp of a file record.
    async fn refresh_file(&self, id: Uuid, size_bytes: i64, updated_at: DateTime<Utc>)
    -> AppResult<()>;

    /// Case-insensitive name search, newest first.
    async fn search(
        &self,
        owner_id: Uuid,
        query: &str,
        kind: SearchKind,
        limit: u32,
    ) -> AppResult<Vec<MetadataRecord>>;
}

/// Share capability rows.
#[async_trait]
pub trait ShareStore: Send + Sync + std::fmt::Debug + 'static {
    /// Insert a share.
    async fn create(&self, data: &NewShare) -> AppResult<ShareRecord>;

    /// Look up a share by token.
    async fn find_by_token(&self, token: &str) -> AppResult<Option<ShareRecord>>;

    /// Every share created by `owner_id`, newest first.
    async fn list_by_owner(&self, owner_id: Uuid) -> AppResult<Vec<ShareRecord>>;

    /// Increment the access counter in a single statement, returning the
    /// new value.
    async fn increment_access(&self, id: Uuid) -> AppResult<i64>;

    /// Delete a share. Returns whether a row was removed.
    async fn delete(&self, id: Uuid) -> AppResult<bool>;
}

/// Append-only activity log.
#[async_trait]
pub trait ActivityStore: Send + Sync + std::fmt::Debug + 'static {
    /// Append an entry.
    async fn append(&self, data: &NewActivity) -> AppResult<ActivityLogEntry>;

    /// Entries matching the query, newest first.
    async fn list(&self, query: &ActivityQuery) -> AppResult<Vec<ActivityLogEntry>>;
}

/// Administrator-managed NAS exports.
#[async_trait]
pub trait NasShareStore: Send + Sync + std::fmt::Debug + 'static {
    /// Every share, newest first.
    async fn list(&self) -> AppResult<Vec<NasShare>>;

    /// Share by id.
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<NasShare>>;

    /// Share by name.
    async fn find_by_name(&self, name: &str) -> AppResult<Option<NasShare>>;

    /// Insert a share. Fails `AlreadyExists` on a duplicate name.
    async fn create(&self, data: &NewNasShare) -> AppResult<NasShare>;

    /// Apply a partial update. Returns `None` when the id is unknown.
    async fn update(&self, id: Uuid, data: &UpdateNasShare) -> AppResult<Option<NasShare>>;

    /// Delete a share. Returns whether a row was removed.
    async fn delete(&self, id: Uuid) -> AppResult<bool>;
}

/// User accounts.
#[async_trait]
pub trait UserStore: Send + Sync + std::fmt::Debug + 'static {
    /// Insert a user. Fails `AlreadyExists` on a duplicate email or username.
    async fn create(&self, data: &NewUser) -> AppResult<User>;

    /// User by id.
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>>;

    /// User by username.
    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>>;

    /// Every user, oldest first.
    async fn list(&self) -> AppResult<Vec<User>>;
}
