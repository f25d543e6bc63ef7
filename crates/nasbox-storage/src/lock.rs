//! Per-path advisory locks.
//!
//! Mutating operations hold the lock for every resolved path they touch
//! across the filesystem mutation and the metadata update that follows.
//! Entries are removed from the table once no guard references them.

use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

type LockTable = DashMap<PathBuf, Arc<Mutex<()>>>;

/// Lock table keyed by absolute path.
#[derive(Debug, Clone, Default)]
pub struct PathLocks {
    table: Arc<LockTable>,
}

/// Holds one or more path locks until dropped.
#[derive(Debug)]
pub struct PathGuard {
    table: Arc<LockTable>,
    held: Vec<(PathBuf, Option<OwnedMutexGuard<()>>)>,
}

impl PathLocks {
    /// Creates an empty lock table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock a single path.
    pub async fn lock(&self, path: impl Into<PathBuf>) -> PathGuard {
        self.lock_all(vec![path.into()]).await
    }

    /// Lock several paths.
    ///
    /// Paths are locked in sorted order so that two operations touching
    /// the same pair cannot deadlock. Duplicates are collapsed.
    pub async fn lock_all(&self, mut paths: Vec<PathBuf>) -> PathGuard {
        paths.sort();
        paths.dedup();

        let mut held = Vec::with_capacity(paths.len());
        for path in paths {
            let mutex = self
                .table
                .entry(path.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone();
            let guard = mutex.lock_owned().await;
            held.push((path, Some(guard)));
        }

        PathGuard {
            table: Arc::clone(&self.table),
            held,
        }
    }

    /// Number of paths currently tracked.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Whether no path is currently tracked.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl Drop for PathGuard {
    fn drop(&mut self) {
        for (path, guard) in self.held.iter_mut().rev() {
            drop(guard.take());
            self.table
                .remove_if(path, |_, mutex| Arc::strong_count(mutex) == 1);
        }
    }
}
