//! Types shared by file and folder records.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::file::FileRecord;
use crate::folder::FolderRecord;

/// Whether an operation targets a file or a folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    /// A regular file.
    File,
    /// A directory.
    Folder,
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => f.write_str("file"),
            Self::Folder => f.write_str("folder"),
        }
    }
}

impl FromStr for ItemKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "file" => Ok(Self::File),
            "folder" | "dir" | "directory" => Ok(Self::Folder),
            other => Err(format!("Unknown item type: {other}")),
        }
    }
}

/// Search filter over record kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchKind {
    /// Files and folders.
    #[default]
    All,
    /// Files only.
    File,
    /// Folders only.
    Folder,
}

impl SearchKind {
    /// Whether file records are included.
    pub fn includes_files(&self) -> bool {
        matches!(self, Self::All | Self::File)
    }

    /// Whether folder records are included.
    pub fn includes_folders(&self) -> bool {
        matches!(self, Self::All | Self::Folder)
    }
}

impl FromStr for SearchKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "file" | "files" => Ok(Self::File),
            "folder" | "folders" => Ok(Self::Folder),
            other => Err(format!("Unknown search type: {other}")),
        }
    }
}

/// Either kind of metadata record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MetadataRecord {
    /// A file record.
    File(FileRecord),
    /// A folder record.
    Folder(FolderRecord),
}

impl MetadataRecord {
    /// Logical path of the record.
    pub fn path(&self) -> &str {
        match self {
            Self::File(f) => &f.path,
            Self::Folder(f) => &f.path,
        }
    }

    /// Display name of the record.
    pub fn name(&self) -> &str {
        match self {
            Self::File(f) => &f.filename,
            Self::Folder(f) => &f.name,
        }
    }

    /// Record kind.
    pub fn kind(&self) -> ItemKind {
        match self {
            Self::File(_) => ItemKind::File,
            Self::Folder(_) => ItemKind::Folder,
        }
    }

    /// Creation timestamp.
    pub fn created_at(&self) -> chrono::DateTime<chrono::Utc> {
        match self {
            Self::File(f) => f.created_at,
            Self::Folder(f) => f.created_at,
        }
    }
}
