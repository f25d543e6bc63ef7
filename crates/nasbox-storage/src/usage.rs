//! Recursive disk usage and host capacity statistics.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::debug;
use walkdir::WalkDir;

use nasbox_core::error::AppError;
use nasbox_core::result::AppResult;
use nasbox_entity::storage::{Capacity, DiskUsage};

/// One physical entry found while scanning a tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedEntry {
    /// Forward-slash path relative to the scanned root.
    pub relative: String,
    /// Whether the entry is a directory.
    pub is_dir: bool,
    /// File size in bytes (zero for directories).
    pub size: u64,
    /// Last modification time.
    pub modified_at: Option<DateTime<Utc>>,
}

/// Computes usage figures. Holds no state and never mutates anything.
#[derive(Debug, Clone, Default)]
pub struct DiskUsageCalculator;

impl DiskUsageCalculator {
    /// Creates a new calculator.
    pub fn new() -> Self {
        Self
    }

    /// Usage of everything under `scope`.
    ///
    /// Unreadable subdirectories are skipped. Capacity comes from the host
    /// filesystem and is reported as [`Capacity::Unknown`] when unavailable.
    pub async fn usage(&self, scope: &Path) -> AppResult<DiskUsage> {
        let scope = scope.to_path_buf();
        tokio::task::spawn_blocking(move || {
            let used_bytes = sum_file_sizes(&scope);
            let capacity = host_capacity(&scope);
            DiskUsage {
                used_bytes,
                capacity,
            }
        })
        .await
        .map_err(|e| AppError::internal(format!("Disk usage task failed: {e}")))
    }

    /// Every file and directory below `root`, excluding `root` itself.
    ///
    /// Entries that cannot be read are skipped; symlinks are not followed.
    pub async fn scan(&self, root: &Path) -> AppResult<Vec<ScannedEntry>> {
        let root = root.to_path_buf();
        tokio::task::spawn_blocking(move || scan_tree(&root))
            .await
            .map_err(|e| AppError::internal(format!("Scan task failed: {e}")))
    }
}

fn sum_file_sizes(scope: &Path) -> u64 {
    let mut skipped = 0usize;
    let total = WalkDir::new(scope)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(_) => {
                skipped += 1;
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.metadata().ok())
        .map(|meta| meta.len())
        .sum();

    if skipped > 0 {
        debug!(scope = %scope.display(), skipped, "Skipped unreadable entries during usage scan");
    }
    total
}

fn scan_tree(root: &Path) -> Vec<ScannedEntry> {
    WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
        .filter_map(|entry| {
            let file_type = entry.file_type();
            if !file_type.is_dir() && !file_type.is_file() {
                return None;
            }
            let relative = entry.path().strip_prefix(root).ok()?;
            let relative = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            let meta = entry.metadata().ok()?;
            Some(ScannedEntry {
                relative,
                is_dir: file_type.is_dir(),
                size: if file_type.is_file() { meta.len() } else { 0 },
                modified_at: meta.modified().ok().map(DateTime::<Utc>::from),
            })
        })
        .collect()
}

/// Nearest existing ancestor, so capacity can be read for a scope that
/// has not been created yet.
fn existing_ancestor(path: &Path) -> Option<PathBuf> {
    path.ancestors().find(|p| p.exists()).map(Path::to_path_buf)
}

#[cfg(unix)]
#[allow(clippy::unnecessary_cast)]
fn host_capacity(scope: &Path) -> Capacity {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let Some(target) = existing_ancestor(scope) else {
        return Capacity::Unknown;
    };
    let Ok(c_path) = CString::new(target.as_os_str().as_bytes()) else {
        return Capacity::Unknown;
    };

    // SAFETY: `statvfs` only writes into the zeroed struct we own, and
    // `c_path` is a valid NUL-terminated string for the duration of the call.
    let mut stat: libc::statvfs = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::statvfs(c_path.as_ptr(), &mut stat) };
    if rc != 0 {
        debug!(path = %target.display(), "statvfs failed; capacity unknown");
        return Capacity::Unknown;
    }

    let fragment = if stat.f_frsize > 0 {
        stat.f_frsize as u64
    } else {
        stat.f_bsize as u64
    };
    let total_bytes = (stat.f_blocks as u64).saturating_mul(fragment);
    if total_bytes == 0 {
        return Capacity::Unknown;
    }
    Capacity::Known {
        total_bytes,
        free_bytes: (stat.f_bavail as u64).saturating_mul(fragment),
    }
}

#[cfg(not(unix))]
fn host_capacity(scope: &Path) -> Capacity {
    let _ = existing_ancestor(scope);
    Capacity::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_usage_sums_nested_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("a/b")).unwrap();
        std::fs::write(dir.path().join("one.bin"), vec![0u8; 100]).unwrap();
        std::fs::write(dir.path().join("a/two.bin"), vec![0u8; 20]).unwrap();
        std::fs::write(dir.path().join("a/b/three.bin"), vec![0u8; 3]).unwrap();

        let usage = DiskUsageCalculator::new().usage(dir.path()).await.unwrap();
        assert_eq!(usage.used_bytes, 123);
    }

    #[tokio::test]
    async fn test_missing_scope_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let usage = DiskUsageCalculator::new()
            .usage(&dir.path().join("never-created"))
            .await
            .unwrap();
        assert_eq!(usage.used_bytes, 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_capacity_is_reported_on_unix() {
        let dir = tempfile::tempdir().unwrap();
        let usage = DiskUsageCalculator::new().usage(dir.path()).await.unwrap();
        if let Capacity::Known {
            total_bytes,
            free_bytes,
        } = usage.capacity
        {
            assert!(total_bytes >= free_bytes);
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unreadable_subdirectory_is_skipped() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let locked = dir.path().join("locked");
        std::fs::create_dir_all(&locked).unwrap();
        std::fs::write(locked.join("hidden.bin"), vec![0u8; 50]).unwrap();
        std::fs::write(dir.path().join("visible.bin"), vec![0u8; 7]).unwrap();
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();

        let usage = DiskUsageCalculator::new().usage(dir.path()).await;
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();

        let usage = usage.unwrap();
        // Root ignores permission bits, so either figure is acceptable.
        assert!(usage.used_bytes == 7 || usage.used_bytes == 57);
    }

    #[tokio::test]
    async fn test_scan_reports_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("docs")).unwrap();
        std::fs::write(dir.path().join("docs/a.txt"), b"abc").unwrap();

        let mut entries = DiskUsageCalculator::new().scan(dir.path()).await.unwrap();
        entries.sort_by(|a, b| a.relative.cmp(&b.relative));
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].relative, "docs");
        assert!(entries[0].is_dir);
        assert_eq!(entries[1].relative, "docs/a.txt");
        assert_eq!(entries[1].size, 3);
    }
}
