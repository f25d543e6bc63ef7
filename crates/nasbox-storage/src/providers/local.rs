//! Local filesystem adapter.
//!
//! Writes are staged in a temporary directory on the same filesystem and
//! renamed into place, so readers never observe a partially written file.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::debug;
use uuid::Uuid;

use nasbox_core::error::{AppError, ErrorKind};
use nasbox_core::result::AppResult;
use nasbox_core::traits::storage::{ByteStream, FilesystemAdapter, FsEntry, FsStat};

/// Local filesystem adapter.
#[derive(Debug, Clone)]
pub struct LocalFilesystem {
    /// Staging directory for in-flight writes.
    temp_dir: PathBuf,
}

impl LocalFilesystem {
    /// Create an adapter staging writes in `temp_dir`, creating it if needed.
    pub async fn new(temp_dir: impl Into<PathBuf>) -> AppResult<Self> {
        let temp_dir = temp_dir.into();
        fs::create_dir_all(&temp_dir).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to create staging directory: {}", temp_dir.display()),
                e,
            )
        })?;
        Ok(Self { temp_dir })
    }

    /// The staging directory.
    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    async fn ensure_parent(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                AppError::from_io(
                    format!("Failed to create parent directory: {}", parent.display()),
                    e,
                )
            })?;
        }
        Ok(())
    }

    fn staging_path(&self) -> PathBuf {
        self.temp_dir.join(format!("{}.part", Uuid::new_v4()))
    }

    /// Move a fully written staging file to its final location.
    async fn commit(&self, staged: StagedFile, target: &Path) -> AppResult<()> {
        self.ensure_parent(target).await?;
        if let Some(stat) = self.stat(target).await? {
            if stat.is_dir {
                return Err(AppError::already_exists(format!(
                    "A folder already exists at {}",
                    target.display()
                )));
            }
        }
        fs::rename(&staged.path, target).await.map_err(|e| {
            AppError::from_io(format!("Failed to move upload into {}", target.display()), e)
        })?;
        staged.disarm();
        Ok(())
    }
}

/// Staging file that removes itself unless committed.
///
/// Dropping the guard (error, or the writing future being cancelled)
/// deletes the partial file.
#[derive(Debug)]
struct StagedFile {
    path: PathBuf,
    armed: bool,
}

impl StagedFile {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if self.armed {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

fn to_utc(time: std::io::Result<std::time::SystemTime>) -> Option<DateTime<Utc>> {
    time.ok().map(DateTime::<Utc>::from)
}

#[async_trait]
impl FilesystemAdapter for LocalFilesystem {
    async fn stat(&self, path: &Path) -> AppResult<Option<FsStat>> {
        match fs::metadata(path).await {
            Ok(meta) => Ok(Some(FsStat {
                size: meta.len(),
                created_at: to_utc(meta.created()),
                modified_at: to_utc(meta.modified()),
                is_dir: meta.is_dir(),
                is_file: meta.is_file(),
            })),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::from_io(
                format!("Failed to stat {}", path.display()),
                e,
            )),
        }
    }

    async fn list(&self, path: &Path) -> AppResult<Vec<FsEntry>> {
        match self.stat(path).await? {
            None => {
                return Err(AppError::not_found(format!(
                    "Directory not found: {}",
                    path.display()
                )));
            }
            Some(stat) if !stat.is_dir => {
                return Err(AppError::not_a_directory(format!(
                    "Not a directory: {}",
                    path.display()
                )));
            }
            Some(_) => {}
        }

        let mut dir = fs::read_dir(path).await.map_err(|e| {
            AppError::from_io(format!("Failed to list directory: {}", path.display()), e)
        })?;

        let mut entries = Vec::new();
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| AppError::from_io("Failed to read directory entry", e))?
        {
            // Symlinks are not followed and report neither kind.
            let (is_dir, is_file) = match entry.file_type().await {
                Ok(ft) => (ft.is_dir(), ft.is_file()),
                Err(_) => (false, false),
            };
            entries.push(FsEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir,
                is_file,
            });
        }

        entries.sort_by(|a, b| b.is_dir.cmp(&a.is_dir).then(a.name.cmp(&b.name)));
        Ok(entries)
    }

    async fn ensure_dir(&self, path: &Path) -> AppResult<()> {
        fs::create_dir_all(path).await.map_err(|e| {
            AppError::from_io(format!("Failed to create directory: {}", path.display()), e)
        })
    }

    async fn delete(&self, path: &Path) -> AppResult<()> {
        let meta = fs::symlink_metadata(path).await.map_err(|e| {
            AppError::from_io(format!("Failed to delete {}", path.display()), e)
        })?;

        let result = if meta.is_dir() {
            fs::remove_dir_all(path).await
        } else {
            fs::remove_file(path).await
        };
        result.map_err(|e| AppError::from_io(format!("Failed to delete {}", path.display()), e))?;

        debug!(path = %path.display(), "Deleted path");
        Ok(())
    }

    async fn move_path(&self, from: &Path, to: &Path) -> AppResult<()> {
        if self.stat(from).await?.is_none() {
            return Err(AppError::not_found(format!(
                "Source not found: {}",
                from.display()
            )));
        }
        if fs::symlink_metadata(to).await.is_ok() {
            return Err(AppError::already_exists(format!(
                "Target already exists: {}",
                to.display()
            )));
        }
        self.ensure_parent(to).await?;

        fs::rename(from, to).await.map_err(|e| {
            AppError::from_io(
                format!("Failed to move {} -> {}", from.display(), to.display()),
                e,
            )
        })?;

        debug!(from = %from.display(), to = %to.display(), "Moved path");
        Ok(())
    }

    async fn copy_file(&self, from: &Path, to: &Path) -> AppResult<u64> {
        let staged = StagedFile::new(self.staging_path());
        let bytes = fs::copy(from, &staged.path).await.map_err(|e| {
            AppError::from_io(
                format!("Failed to copy {} -> {}", from.display(), to.display()),
                e,
            )
        })?;
        self.commit(staged, to).await?;
        Ok(bytes)
    }

    async fn read(&self, path: &Path) -> AppResult<Bytes> {
        let data = fs::read(path)
            .await
            .map_err(|e| AppError::from_io(format!("Failed to read {}", path.display()), e))?;
        Ok(Bytes::from(data))
    }

    async fn read_stream(&self, path: &Path) -> AppResult<ByteStream> {
        let file = fs::File::open(path)
            .await
            .map_err(|e| AppError::from_io(format!("Failed to open {}", path.display()), e))?;
        Ok(Box::pin(ReaderStream::new(file)))
    }

    async fn write(&self, path: &Path, data: Bytes) -> AppResult<u64> {
        let stream: ByteStream = Box::pin(stream::once(async move { Ok(data) }));
        self.write_stream(path, stream, None).await
    }

    async fn write_stream(
        &self,
        path: &Path,
        mut stream: ByteStream,
        limit: Option<u64>,
    ) -> AppResult<u64> {
        let staged = StagedFile::new(self.staging_path());
        let mut file = fs::File::create(&staged.path).await.map_err(|e| {
            AppError::from_io(
                format!("Failed to create staging file: {}", staged.path.display()),
                e,
            )
        })?;

        let mut total_bytes = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk
                .map_err(|e| AppError::with_source(ErrorKind::Storage, "Stream read error", e))?;
            total_bytes += chunk.len() as u64;
            if let Some(max) = limit {
                if total_bytes > max {
                    return Err(AppError::payload_too_large(format!(
                        "Upload exceeds the limit of {max} bytes"
                    )));
                }
            }
            file.write_all(&chunk)
                .await
                .map_err(|e| AppError::from_io("Failed to write chunk", e))?;
        }

        file.flush()
            .await
            .map_err(|e| AppError::from_io("Failed to flush file", e))?;
        file.sync_all()
            .await
            .map_err(|e| AppError::from_io("Failed to sync file", e))?;
        drop(file);

        self.commit(staged, path).await?;
        debug!(path = %path.display(), bytes = total_bytes, "Wrote file");
        Ok(total_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    async fn adapter(root: &Path) -> LocalFilesystem {
        LocalFilesystem::new(root.join(".tmp")).await.unwrap()
    }

    fn staging_is_empty(fs: &LocalFilesystem) -> bool {
        std::fs::read_dir(fs.temp_dir()).unwrap().next().is_none()
    }

    #[tokio::test]
    async fn test_write_read_and_stat() {
        let dir = tempfile::tempdir().unwrap();
        let fs = adapter(dir.path()).await;
        let target = dir.path().join("a/b/hello.txt");

        let written = fs.write(&target, Bytes::from_static(b"hello")).await.unwrap();
        assert_eq!(written, 5);
        assert_eq!(fs.read(&target).await.unwrap(), Bytes::from_static(b"hello"));

        let stat = fs.stat(&target).await.unwrap().unwrap();
        assert!(stat.is_file);
        assert_eq!(stat.size, 5);
        assert!(fs.stat(&dir.path().join("missing")).await.unwrap().is_none());
        assert!(staging_is_empty(&fs));
    }

    #[tokio::test]
    async fn test_write_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let fs = adapter(dir.path()).await;
        let target = dir.path().join("f.txt");
        fs.write(&target, Bytes::from_static(b"first version")).await.unwrap();
        fs.write(&target, Bytes::from_static(b"second")).await.unwrap();
        assert_eq!(fs.read(&target).await.unwrap(), Bytes::from_static(b"second"));
    }

    #[tokio::test]
    async fn test_stream_over_limit_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let fs = adapter(dir.path()).await;
        let target = dir.path().join("big.bin");
        let chunks: Vec<Result<Bytes, std::io::Error>> =
            vec![Ok(Bytes::from(vec![0u8; 8])), Ok(Bytes::from(vec![0u8; 8]))];

        let err = fs
            .write_stream(&target, Box::pin(stream::iter(chunks)), Some(10))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::PayloadTooLarge);
        assert!(fs.stat(&target).await.unwrap().is_none());
        assert!(staging_is_empty(&fs));
    }

    #[tokio::test]
    async fn test_failed_stream_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let fs = adapter(dir.path()).await;
        let target = dir.path().join("broken.bin");
        let chunks: Vec<Result<Bytes, std::io::Error>> = vec![
            Ok(Bytes::from_static(b"partial")),
            Err(std::io::Error::other("client went away")),
        ];

        assert!(
            fs.write_stream(&target, Box::pin(stream::iter(chunks)), None)
                .await
                .is_err()
        );
        assert!(fs.stat(&target).await.unwrap().is_none());
        assert!(staging_is_empty(&fs));
    }

    #[tokio::test]
    async fn test_list_sorts_dirs_first() {
        let dir = tempfile::tempdir().unwrap();
        let fs = adapter(dir.path()).await;
        let root = dir.path().join("root");
        fs.ensure_dir(&root.join("zeta")).await.unwrap();
        fs.write(&root.join("alpha.txt"), Bytes::from_static(b"a")).await.unwrap();

        let entries = fs.list(&root).await.unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["zeta", "alpha.txt"]);
        assert!(entries[0].is_dir);
        assert!(entries[1].is_file);

        let err = fs.list(&root.join("alpha.txt")).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotADirectory);
        let err = fs.list(&root.join("nope")).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_list_does_not_follow_symlinks() {
        let dir = tempfile::tempdir().unwrap();
        let fs = adapter(dir.path()).await;
        let root = dir.path().join("root");
        fs.ensure_dir(&root.join("sub")).await.unwrap();
        std::os::unix::fs::symlink(&root, root.join("sub/loop")).unwrap();

        let entries = fs.list(&root.join("sub")).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "loop");
        assert!(!entries[0].is_dir);
        assert!(!entries[0].is_file);
    }

    #[tokio::test]
    async fn test_move_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let fs = adapter(dir.path()).await;
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        fs.write(&a, Bytes::from_static(b"a")).await.unwrap();
        fs.write(&b, Bytes::from_static(b"b")).await.unwrap();

        let err = fs.move_path(&a, &b).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::AlreadyExists);
        assert_eq!(fs.read(&b).await.unwrap(), Bytes::from_static(b"b"));

        let c = dir.path().join("nested/c.txt");
        fs.move_path(&a, &c).await.unwrap();
        assert!(fs.stat(&a).await.unwrap().is_none());
        assert_eq!(fs.read(&c).await.unwrap(), Bytes::from_static(b"a"));

        let err = fs.move_path(&a, &b).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_delete_is_recursive_and_reports_missing() {
        let dir = tempfile::tempdir().unwrap();
        let fs = adapter(dir.path()).await;
        let folder = dir.path().join("tree");
        fs.write(&folder.join("x/y.txt"), Bytes::from_static(b"y")).await.unwrap();

        fs.delete(&folder).await.unwrap();
        assert!(fs.stat(&folder).await.unwrap().is_none());
        let err = fs.delete(&folder).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_copy_file() {
        let dir = tempfile::tempdir().unwrap();
        let fs = adapter(dir.path()).await;
        let src = dir.path().join("src.bin");
        fs.write(&src, Bytes::from_static(b"payload")).await.unwrap();

        let copied = fs.copy_file(&src, &dir.path().join("dst/copy.bin")).await.unwrap();
        assert_eq!(copied, 7);
        assert_eq!(
            fs.read(&dir.path().join("dst/copy.bin")).await.unwrap(),
            Bytes::from_static(b"payload")
        );
    }
}
