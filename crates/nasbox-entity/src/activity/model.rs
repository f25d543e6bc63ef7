//! Activity log entry entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Kind of operation recorded in the activity log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "activity_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityType {
    FileCreate,
    FileDelete,
    FileUpload,
    FileDownload,
    FileModify,
    FolderCreate,
    FolderDelete,
    ShareCreate,
    ShareDelete,
    NasShareCreate,
    NasShareUpdate,
    NasShareDelete,
}

impl ActivityType {
    /// All variants, in declaration order.
    pub const ALL: [ActivityType; 12] = [
        Self::FileCreate,
        Self::FileDelete,
        Self::FileUpload,
        Self::FileDownload,
        Self::FileModify,
        Self::FolderCreate,
        Self::FolderDelete,
        Self::ShareCreate,
        Self::ShareDelete,
        Self::NasShareCreate,
        Self::NasShareUpdate,
        Self::NasShareDelete,
    ];

    /// Wire name of the variant.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FileCreate => "FILE_CREATE",
            Self::FileDelete => "FILE_DELETE",
            Self::FileUpload => "FILE_UPLOAD",
            Self::FileDownload => "FILE_DOWNLOAD",
            Self::FileModify => "FILE_MODIFY",
            Self::FolderCreate => "FOLDER_CREATE",
            Self::FolderDelete => "FOLDER_DELETE",
            Self::ShareCreate => "SHARE_CREATE",
            Self::ShareDelete => "SHARE_DELETE",
            Self::NasShareCreate => "NAS_SHARE_CREATE",
            Self::NasShareUpdate => "NAS_SHARE_UPDATE",
            Self::NasShareDelete => "NAS_SHARE_DELETE",
        }
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == upper)
            .ok_or_else(|| format!("Unknown activity type: {s}"))
    }
}

/// An immutable activity log entry.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ActivityLogEntry {
    /// Unique entry identifier.
    pub id: Uuid,
    /// The acting user.
    pub user_id: Uuid,
    /// Operation kind.
    pub activity_type: ActivityType,
    /// Human-readable description.
    pub description: String,
    /// Structured details (JSON).
    pub metadata: Option<serde_json::Value>,
    /// Request origin IP.
    pub ip_address: Option<String>,
    /// Request User-Agent.
    pub user_agent: Option<String>,
    /// When the entry was recorded.
    pub created_at: DateTime<Utc>,
}

/// Data required to append an activity entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewActivity {
    /// The acting user.
    pub user_id: Uuid,
    /// Operation kind.
    pub activity_type: ActivityType,
    /// Human-readable description.
    pub description: String,
    /// Structured details.
    pub metadata: Option<serde_json::Value>,
    /// Request origin IP.
    pub ip_address: Option<String>,
    /// Request User-Agent.
    pub user_agent: Option<String>,
}

/// Filter for listing activity, newest first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActivityQuery {
    /// Restrict to one user; `None` means every user.
    pub user_id: Option<Uuid>,
    /// Restrict to one operation kind.
    pub activity_type: Option<ActivityType>,
    /// Maximum entries returned.
    pub limit: u32,
}
