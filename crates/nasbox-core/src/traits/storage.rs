//! Filesystem adapter trait.
//!
//! Every method takes absolute paths that have already passed the
//! containment check; implementations never see caller-supplied strings.

use std::path::Path;
use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::Stream;

use crate::result::AppResult;

/// Metadata for one filesystem object.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FsStat {
    /// Size in bytes (zero for directories on most platforms).
    pub size: u64,
    /// Creation time, when the platform reports one.
    pub created_at: Option<DateTime<Utc>>,
    /// Last modification time.
    pub modified_at: Option<DateTime<Utc>>,
    /// Whether this is a directory.
    pub is_dir: bool,
    /// Whether this is a regular file.
    pub is_file: bool,
}

/// One child of a listed directory.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FsEntry {
    /// Entry name (single path segment).
    pub name: String,
    /// Whether this is a directory.
    pub is_dir: bool,
    /// Whether this is a regular file.
    pub is_file: bool,
}

/// A byte stream type used for reading and writing file contents.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// Primitive directory and file operations over a local filesystem.
#[async_trait]
pub trait FilesystemAdapter: Send + Sync + std::fmt::Debug + 'static {
    /// Stat a path. Returns `Ok(None)` when nothing exists there.
    async fn stat(&self, path: &Path) -> AppResult<Option<FsStat>>;

    /// List the immediate children of a directory.
    ///
    /// Fails with `NotADirectory` when `path` is a file and `NotFound`
    /// when it does not exist.
    async fn list(&self, path: &Path) -> AppResult<Vec<FsEntry>>;

    /// Recursively create a directory, succeeding if it already exists.
    async fn ensure_dir(&self, path: &Path) -> AppResult<()>;

    /// Remove a file, or a directory with everything beneath it.
    async fn delete(&self, path: &Path) -> AppResult<()>;

    /// Atomically rename `from` to `to`. Never overwrites `to`.
    async fn move_path(&self, from: &Path, to: &Path) -> AppResult<()>;

    /// Duplicate a single file, returning the number of bytes copied.
    async fn copy_file(&self, from: &Path, to: &Path) -> AppResult<u64>;

    /// Read a whole file into memory.
    async fn read(&self, path: &Path) -> AppResult<Bytes>;

    /// Open a file as a byte stream.
    async fn read_stream(&self, path: &Path) -> AppResult<ByteStream>;

    /// Write a whole buffer, replacing any existing file.
    async fn write(&self, path: &Path, data: Bytes) -> AppResult<u64>;

    /// Write a stream, replacing any existing file.
    ///
    /// The file only becomes visible at `path` once the stream has been
    /// fully written. If `limit` is set and the stream exceeds it the
    /// write fails with `PayloadTooLarge` and nothing is left behind.
    async fn write_stream(
        &self,
        path: &Path,
        stream: ByteStream,
        limit: Option<u64>,
    ) -> AppResult<u64>;
}
