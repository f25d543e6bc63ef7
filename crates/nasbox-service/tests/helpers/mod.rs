//! Shared wiring for integration tests: every service over one temp
//! storage root and the in-memory stores.

#![allow(dead_code)]

use std::sync::Arc;

use bytes::Bytes;
use futures::TryStreamExt;
use uuid::Uuid;

use nasbox_auth::PasswordHasher;
use nasbox_core::config::storage::StorageConfig;
use nasbox_database::memory::{MemoryActivityStore, MemoryMetadataStore, MemoryShareStore};
use nasbox_entity::user::UserRole;
use nasbox_service::file::FileContent;
use nasbox_service::{
    ActivityRecorder, FileOperationsService, RequestContext, ShareManager, StorageService,
};
use nasbox_storage::{DiskUsageCalculator, LocalFilesystem, PathLocks, PathResolver};

/// Upload ceiling used by the tests.
pub const MAX_UPLOAD: u64 = 16 * 1024 * 1024;

/// Test application context.
pub struct TestApp {
    /// Keeps the storage root alive.
    pub dir: tempfile::TempDir,
    pub resolver: Arc<PathResolver>,
    pub metadata: Arc<MemoryMetadataStore>,
    pub shares_store: Arc<MemoryShareStore>,
    pub activity_store: Arc<MemoryActivityStore>,
    pub files: FileOperationsService,
    pub shares: ShareManager,
    pub storage: StorageService,
}

impl TestApp {
    /// Create a new test application.
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let config = StorageConfig {
            root_path: dir.path().to_string_lossy().into_owned(),
            max_upload_size_bytes: MAX_UPLOAD,
            ..Default::default()
        };

        let resolver = Arc::new(PathResolver::new(config.root()));
        let fs = Arc::new(
            LocalFilesystem::new(config.temp_dir())
                .await
                .expect("Failed to init filesystem"),
        );
        let metadata = Arc::new(MemoryMetadataStore::new());
        let shares_store = Arc::new(MemoryShareStore::new());
        let activity_store = Arc::new(MemoryActivityStore::new());
        let activity = Arc::new(ActivityRecorder::new(activity_store.clone(), 50));

        let files = FileOperationsService::new(
            resolver.clone(),
            fs.clone(),
            metadata.clone(),
            activity.clone(),
            PathLocks::new(),
            &config,
        );
        let shares = ShareManager::new(
            shares_store.clone(),
            metadata.clone(),
            resolver.clone(),
            fs,
            Arc::new(PasswordHasher::new()),
            activity,
            16,
        );
        let storage = StorageService::new(
            resolver.clone(),
            DiskUsageCalculator::new(),
            metadata.clone(),
        );

        Self {
            dir,
            resolver,
            metadata,
            shares_store,
            activity_store,
            files,
            shares,
            storage,
        }
    }

    /// A fresh regular user.
    pub fn user(&self) -> RequestContext {
        RequestContext::new(Uuid::new_v4(), UserRole::User)
    }

    /// Upload `data` as `folder/name`.
    pub async fn put(&self, ctx: &RequestContext, folder: &str, name: &str, data: &[u8]) {
        self.files
            .upload(ctx, folder, name, None, Bytes::copy_from_slice(data))
            .await
            .expect("Upload failed");
    }
}

/// Drain a download into memory.
pub async fn read_all(content: FileContent) -> Vec<u8> {
    let chunks: Vec<Bytes> = content
        .stream
        .try_collect()
        .await
        .expect("Failed to read stream");
    chunks.concat()
}
