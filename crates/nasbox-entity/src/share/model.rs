//! Share entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// What a share grants access to. Exactly one of the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "lowercase")]
pub enum ShareTarget {
    /// A single file record.
    File(Uuid),
    /// A folder record.
    Folder(Uuid),
}

impl ShareTarget {
    /// File id column value.
    pub fn file_id(&self) -> Option<Uuid> {
        match self {
            Self::File(id) => Some(*id),
            Self::Folder(_) => None,
        }
    }

    /// Folder id column value.
    pub fn folder_id(&self) -> Option<Uuid> {
        match self {
            Self::Folder(id) => Some(*id),
            Self::File(_) => None,
        }
    }
}

/// Lifecycle state of a live share row. Revoked shares no longer exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShareState {
    /// Resolvable.
    Active,
    /// Past its expiry timestamp.
    Expired,
}

/// A capability over one file or one folder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ShareRecord {
    /// Unique share identifier.
    pub id: Uuid,
    /// Unguessable token.
    pub token: String,
    /// The user who created the share.
    pub owner_id: Uuid,
    /// Shared file (mutually exclusive with `folder_id`).
    pub file_id: Option<Uuid>,
    /// Shared folder (mutually exclusive with `file_id`).
    pub folder_id: Option<Uuid>,
    /// Password digest, when protected.
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    /// When the share stops resolving.
    pub expires_at: Option<DateTime<Utc>>,
    /// Whether the share is listed publicly.
    pub is_public: bool,
    /// Successful resolutions so far.
    pub access_count: i64,
    /// When the share was created.
    pub created_at: DateTime<Utc>,
}

impl ShareRecord {
    /// The target, or `None` if the row violates the file/folder exclusivity.
    pub fn target(&self) -> Option<ShareTarget> {
        match (self.file_id, self.folder_id) {
            (Some(id), None) => Some(ShareTarget::File(id)),
            (None, Some(id)) => Some(ShareTarget::Folder(id)),
            _ => None,
        }
    }

    /// State at the given instant.
    pub fn state_at(&self, now: DateTime<Utc>) -> ShareState {
        match self.expires_at {
            Some(expires_at) if expires_at <= now => ShareState::Expired,
            _ => ShareState::Active,
        }
    }

    /// Whether a password must be supplied to resolve.
    pub fn is_password_protected(&self) -> bool {
        self.password_hash.is_some()
    }
}

/// Data required to create a share.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewShare {
    /// Token.
    pub token: String,
    /// Owner.
    pub owner_id: Uuid,
    /// Target.
    pub target: ShareTarget,
    /// Password digest.
    pub password_hash: Option<String>,
    /// Expiry.
    pub expires_at: Option<DateTime<Utc>>,
    /// Public flag.
    pub is_public: bool,
}
