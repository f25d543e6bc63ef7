//! File record entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Generic mime type used when nothing better is known.
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Metadata mirror of one physical file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct FileRecord {
    /// Unique file identifier.
    pub id: Uuid,
    /// The owning user.
    pub owner_id: Uuid,
    /// Logical path relative to the owner root (unique per owner).
    pub path: String,
    /// Display file name.
    pub filename: String,
    /// MIME type.
    pub mime_type: String,
    /// Size in bytes as of the last mutating operation.
    pub size_bytes: i64,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When the record was last updated.
    pub updated_at: DateTime<Utc>,
}

impl FileRecord {
    /// Size as an unsigned byte count.
    pub fn size(&self) -> u64 {
        u64::try_from(self.size_bytes).unwrap_or(0)
    }

    /// Get the file extension (lowercase), if any.
    pub fn extension(&self) -> Option<String> {
        self.filename
            .rsplit('.')
            .next()
            .filter(|ext| *ext != self.filename)
            .map(|ext| ext.to_lowercase())
    }
}

/// Data for inserting or refreshing a file record at `(owner_id, path)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFileRecord {
    /// The owning user.
    pub owner_id: Uuid,
    /// Logical path.
    pub path: String,
    /// Display file name.
    pub filename: String,
    /// MIME type.
    pub mime_type: String,
    /// Size in bytes.
    pub size_bytes: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(filename: &str) -> FileRecord {
        FileRecord {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            path: filename.to_string(),
            filename: filename.to_string(),
            mime_type: DEFAULT_MIME_TYPE.to_string(),
            size_bytes: -1,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_extension() {
        assert_eq!(record("Report.PDF").extension().as_deref(), Some("pdf"));
        assert_eq!(record("Makefile").extension(), None);
    }

    #[test]
    fn test_negative_size_clamps_to_zero() {
        assert_eq!(record("a").size(), 0);
    }
}
