//! Folder record entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Metadata mirror of one physical directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct FolderRecord {
    /// Unique folder identifier.
    pub id: Uuid,
    /// The owning user.
    pub owner_id: Uuid,
    /// Folder name (last path segment).
    pub name: String,
    /// Logical path relative to the owner root (unique per owner).
    pub path: String,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When the record was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Data for inserting a folder record at `(owner_id, path)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFolderRecord {
    /// The owning user.
    pub owner_id: Uuid,
    /// Logical path.
    pub path: String,
    /// Folder name.
    pub name: String,
}
