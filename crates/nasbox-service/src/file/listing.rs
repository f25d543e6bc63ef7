//! Directory listings joined with metadata, and file content handles.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use nasbox_core::path;
use nasbox_core::result::AppResult;
use nasbox_core::traits::storage::{ByteStream, FilesystemAdapter};
use nasbox_database::store::MetadataStore;
use nasbox_entity::file::model::DEFAULT_MIME_TYPE;
use nasbox_entity::metadata::{ItemKind, MetadataRecord};
use nasbox_storage::ResolvedPath;

/// One child of a listed folder.
///
/// Built from the physical entry; metadata fills in the id, MIME type and
/// timestamps when a matching record exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListEntry {
    /// Record id, when metadata exists.
    pub id: Option<Uuid>,
    /// Entry name.
    pub name: String,
    /// Logical path.
    pub path: String,
    /// File or folder.
    pub kind: ItemKind,
    /// Size in bytes (zero for folders).
    pub size: u64,
    /// MIME type (files only).
    pub mime_type: Option<String>,
    /// Creation time.
    pub created_at: Option<DateTime<Utc>>,
    /// Last modification time.
    pub modified_at: Option<DateTime<Utc>>,
    /// Whether a metadata record backs this entry.
    pub has_metadata: bool,
}

/// An open file ready to be streamed to a client.
pub struct FileContent {
    /// Logical path.
    pub path: String,
    /// File name.
    pub filename: String,
    /// Recorded MIME type, or the generic default.
    pub mime_type: String,
    /// Size in bytes at the time the file was opened.
    pub size: u64,
    /// File bytes.
    pub stream: ByteStream,
}

impl fmt::Debug for FileContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileContent")
            .field("path", &self.path)
            .field("filename", &self.filename)
            .field("mime_type", &self.mime_type)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

/// List the physical children of `folder`, joined with their records.
///
/// Every physical entry appears even when it has no record.
pub(crate) async fn list_directory(
    fs: &dyn FilesystemAdapter,
    metadata: &dyn MetadataStore,
    folder: &ResolvedPath,
) -> AppResult<Vec<ListEntry>> {
    let physical = fs.list(&folder.absolute).await?;
    let mut records: HashMap<(String, ItemKind), MetadataRecord> = metadata
        .list_by_prefix(folder.owner_id, &folder.logical)
        .await?
        .into_iter()
        .map(|r| ((r.path().to_string(), r.kind()), r))
        .collect();

    let mut entries = Vec::with_capacity(physical.len());
    for child in physical {
        let child_path = path::join(&folder.logical, &child.name);
        let kind = if child.is_dir {
            ItemKind::Folder
        } else {
            ItemKind::File
        };

        let entry = match records.remove(&(child_path.clone(), kind)) {
            Some(MetadataRecord::File(file)) => ListEntry {
                id: Some(file.id),
                name: child.name,
                path: child_path,
                kind,
                size: file.size(),
                mime_type: Some(file.mime_type),
                created_at: Some(file.created_at),
                modified_at: Some(file.updated_at),
                has_metadata: true,
            },
            Some(MetadataRecord::Folder(folder)) => ListEntry {
                id: Some(folder.id),
                name: child.name,
                path: child_path,
                kind,
                size: 0,
                mime_type: None,
                created_at: Some(folder.created_at),
                modified_at: Some(folder.updated_at),
                has_metadata: true,
            },
            None => {
                let stat = fs.stat(&folder.absolute.join(&child.name)).await?;
                ListEntry {
                    id: None,
                    name: child.name,
                    path: child_path,
                    kind,
                    size: match (&stat, kind) {
                        (Some(stat), ItemKind::File) => stat.size,
                        _ => 0,
                    },
                    mime_type: (kind == ItemKind::File).then(|| DEFAULT_MIME_TYPE.to_string()),
                    created_at: stat.as_ref().and_then(|s| s.created_at),
                    modified_at: stat.as_ref().and_then(|s| s.modified_at),
                    has_metadata: false,
                }
            }
        };
        entries.push(entry);
    }

    Ok(entries)
}
