//! Share creation, resolution, listing, and revocation.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{debug, info, warn};

use nasbox_core::error::{AppError, ErrorKind};
use nasbox_core::result::AppResult;
use nasbox_core::traits::CredentialHasher;
use nasbox_core::traits::storage::FilesystemAdapter;
use nasbox_database::store::{MetadataStore, ShareStore};
use nasbox_entity::activity::ActivityType;
use nasbox_entity::file::FileRecord;
use nasbox_entity::folder::FolderRecord;
use nasbox_entity::metadata::{ItemKind, MetadataRecord};
use nasbox_entity::share::{NewShare, ShareRecord, ShareState, ShareTarget};
use nasbox_storage::{PathResolver, ResolvedPath};

use super::token;
use crate::activity::ActivityRecorder;
use crate::context::RequestContext;
use crate::file::listing::{self, FileContent, ListEntry};

/// Attempts at drawing a token before giving up on collisions.
const TOKEN_ATTEMPTS: usize = 3;

/// Request to share one of the caller's files or folders.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CreateShareRequest {
    /// Logical path of the target.
    pub path: String,
    /// Whether the target is a file or a folder.
    pub kind: ItemKind,
    /// Whether the share is publicly listed.
    pub is_public: bool,
    /// Password required to resolve the share.
    pub password: Option<String>,
    /// When the share stops resolving.
    pub expires_at: Option<DateTime<Utc>>,
}

/// A share together with a description of its target.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ShareSummary {
    /// The share row.
    pub share: ShareRecord,
    /// Lifecycle state at listing time.
    pub state: ShareState,
    /// Target record, if it still exists.
    pub target: Option<MetadataRecord>,
}

/// What a resolved share grants.
pub enum SharedContent {
    /// A single file, opened for streaming.
    File {
        /// The file record.
        record: FileRecord,
        /// The open file.
        content: FileContent,
    },
    /// A folder and its immediate children.
    Folder {
        /// The folder record.
        record: FolderRecord,
        /// Listing of the folder.
        entries: Vec<ListEntry>,
    },
}

impl fmt::Debug for SharedContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File { record, content } => f
                .debug_struct("File")
                .field("record", record)
                .field("content", content)
                .finish(),
            Self::Folder { record, entries } => f
                .debug_struct("Folder")
                .field("record", record)
                .field("entries", entries)
                .finish(),
        }
    }
}

/// A successfully resolved share.
#[derive(Debug)]
pub struct ResolvedShare {
    /// The share with its updated access counter.
    pub share: ShareRecord,
    /// The shared content.
    pub content: SharedContent,
}

/// Brokers share capabilities over the storage tree.
#[derive(Debug, Clone)]
pub struct ShareManager {
    /// Share rows.
    shares: Arc<dyn ShareStore>,
    /// File and folder records.
    metadata: Arc<dyn MetadataStore>,
    /// Containment-checked path resolution.
    resolver: Arc<PathResolver>,
    /// Physical storage.
    fs: Arc<dyn FilesystemAdapter>,
    /// Password hashing for protected shares.
    hasher: Arc<dyn CredentialHasher>,
    /// Activity log.
    activity: Arc<ActivityRecorder>,
    /// Random bytes per token.
    token_bytes: usize,
}

impl ShareManager {
    /// Creates a new share manager.
    pub fn new(
        shares: Arc<dyn ShareStore>,
        metadata: Arc<dyn MetadataStore>,
        resolver: Arc<PathResolver>,
        fs: Arc<dyn FilesystemAdapter>,
        hasher: Arc<dyn CredentialHasher>,
        activity: Arc<ActivityRecorder>,
        token_bytes: usize,
    ) -> Self {
        Self {
            shares,
            metadata,
            resolver,
            fs,
            hasher,
            activity,
            token_bytes,
        }
    }

    /// Shares one of the caller's files or folders.
    ///
    /// Fails with `NotFound` when the caller has no record at that path.
    pub async fn create(
        &self,
        ctx: &RequestContext,
        req: CreateShareRequest,
    ) -> AppResult<ShareRecord> {
        let resolved = self.resolver.resolve(ctx.user_id, &req.path)?;
        let target = match req.kind {
            ItemKind::File => self
                .metadata
                .find_file(ctx.user_id, &resolved.logical)
                .await?
                .map(|f| ShareTarget::File(f.id)),
            ItemKind::Folder => self
                .metadata
                .find_folder(ctx.user_id, &resolved.logical)
                .await?
                .map(|f| ShareTarget::Folder(f.id)),
        }
        .ok_or_else(|| {
            AppError::not_found(format!("No {} at '{}'", req.kind, resolved.logical))
        })?;

        // Blank passwords mean no password; anything else is hashed verbatim.
        let password_hash = match req.password.as_deref() {
            Some(password) if !password.trim().is_empty() => Some(self.hasher.hash(password)?),
            _ => None,
        };

        let mut attempt = 0;
        let share = loop {
            attempt += 1;
            let new_share = NewShare {
                token: token::generate(self.token_bytes),
                owner_id: ctx.user_id,
                target,
                password_hash: password_hash.clone(),
                expires_at: req.expires_at,
                is_public: req.is_public,
            };
            match self.shares.create(&new_share).await {
                Ok(share) => break share,
                Err(e) if e.is(ErrorKind::AlreadyExists) && attempt < TOKEN_ATTEMPTS => {
                    warn!(attempt, "Share token collision, retrying");
                }
                Err(e) => return Err(e),
            }
        };

        info!(
            user_id = %ctx.user_id,
            share_id = %share.id,
            path = %resolved.logical,
            kind = %req.kind,
            protected = share.is_password_protected(),
            "Share created"
        );
        self.activity
            .append(
                ctx,
                ActivityType::ShareCreate,
                format!("Shared {}", resolved.logical),
                Some(json!({
                    "share_id": share.id,
                    "path": resolved.logical,
                    "type": req.kind,
                    "is_public": share.is_public,
                    "expires_at": share.expires_at,
                })),
            )
            .await;

        Ok(share)
    }

    /// Resolves a token into the content it grants.
    ///
    /// Checks run in order: existence, expiry, password. Only a fully
    /// successful resolution increments the access counter.
    pub async fn resolve(&self, token: &str, password: Option<&str>) -> AppResult<ResolvedShare> {
        let mut share = self
            .shares
            .find_by_token(token)
            .await?
            .ok_or_else(|| AppError::not_found("Share not found"))?;

        if share.state_at(Utc::now()) == ShareState::Expired {
            return Err(AppError::expired("Share link has expired"));
        }

        if let Some(digest) = &share.password_hash {
            match password.filter(|p| !p.is_empty()) {
                None => return Err(AppError::password_required("This share requires a password")),
                Some(supplied) => {
                    if !self.hasher.verify(supplied, digest)? {
                        return Err(AppError::password_invalid("Incorrect share password"));
                    }
                }
            }
        }

        let target = share
            .target()
            .ok_or_else(|| AppError::internal("Share has no single target"))?;
        let content = match target {
            ShareTarget::File(id) => {
                let record = self
                    .metadata
                    .find_file_by_id(id)
                    .await?
                    .filter(|f| f.owner_id == share.owner_id)
                    .ok_or_else(|| AppError::not_found("Shared file no longer exists"))?;
                let resolved = self.resolve_target(share.owner_id, &record.path).await?;
                let stat = match self.fs.stat(&resolved.absolute).await? {
                    Some(stat) if stat.is_file => stat,
                    _ => return Err(AppError::not_found("Shared file no longer exists")),
                };
                let stream = self.fs.read_stream(&resolved.absolute).await?;
                let content = FileContent {
                    path: record.path.clone(),
                    filename: record.filename.clone(),
                    mime_type: record.mime_type.clone(),
                    size: stat.size,
                    stream,
                };
                SharedContent::File { record, content }
            }
            ShareTarget::Folder(id) => {
                let record = self
                    .metadata
                    .find_folder_by_id(id)
                    .await?
                    .filter(|f| f.owner_id == share.owner_id)
                    .ok_or_else(|| AppError::not_found("Shared folder no longer exists"))?;
                let resolved = self.resolve_target(share.owner_id, &record.path).await?;
                match self.fs.stat(&resolved.absolute).await? {
                    Some(stat) if stat.is_dir => {}
                    _ => return Err(AppError::not_found("Shared folder no longer exists")),
                }
                let entries =
                    listing::list_directory(self.fs.as_ref(), self.metadata.as_ref(), &resolved)
                        .await?;
                SharedContent::Folder { record, entries }
            }
        };

        share.access_count = self.shares.increment_access(share.id).await?;
        debug!(share_id = %share.id, access_count = share.access_count, "Share resolved");

        Ok(ResolvedShare { share, content })
    }

    /// Revokes one of the caller's shares.
    ///
    /// A token owned by someone else is reported exactly like an unknown one.
    pub async fn revoke(&self, ctx: &RequestContext, token: &str) -> AppResult<()> {
        let share = self
            .shares
            .find_by_token(token)
            .await?
            .filter(|s| s.owner_id == ctx.user_id)
            .ok_or_else(|| AppError::not_found("Share not found"))?;

        if !self.shares.delete(share.id).await? {
            return Err(AppError::not_found("Share not found"));
        }

        info!(user_id = %ctx.user_id, share_id = %share.id, "Share revoked");
        self.activity
            .append(
                ctx,
                ActivityType::ShareDelete,
                "Revoked share",
                Some(json!({ "share_id": share.id })),
            )
            .await;

        Ok(())
    }

    /// The caller's shares, newest first, with their targets.
    pub async fn list(&self, ctx: &RequestContext) -> AppResult<Vec<ShareSummary>> {
        let now = Utc::now();
        let shares = self.shares.list_by_owner(ctx.user_id).await?;

        let mut summaries = Vec::with_capacity(shares.len());
        for share in shares {
            let target = match share.target() {
                Some(ShareTarget::File(id)) => self
                    .metadata
                    .find_file_by_id(id)
                    .await?
                    .map(MetadataRecord::File),
                Some(ShareTarget::Folder(id)) => self
                    .metadata
                    .find_folder_by_id(id)
                    .await?
                    .map(MetadataRecord::Folder),
                None => None,
            };
            summaries.push(ShareSummary {
                state: share.state_at(now),
                share,
                target,
            });
        }
        Ok(summaries)
    }

    async fn resolve_target(&self, owner_id: uuid::Uuid, logical: &str) -> AppResult<ResolvedPath> {
        let resolved = self.resolver.resolve(owner_id, logical)?;
        self.resolver.confine(&resolved).await?;
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use chrono::Duration;
    use futures::TryStreamExt;
    use nasbox_auth::PasswordHasher;
    use nasbox_core::config::storage::StorageConfig;
    use nasbox_database::memory::{MemoryActivityStore, MemoryMetadataStore, MemoryShareStore};
    use nasbox_entity::user::UserRole;
    use nasbox_storage::{LocalFilesystem, PathLocks};
    use uuid::Uuid;

    use crate::file::FileOperationsService;

    struct Fixture {
        _dir: tempfile::TempDir,
        files: FileOperationsService,
        shares: ShareManager,
        ctx: RequestContext,
    }

    async fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            root_path: dir.path().to_string_lossy().into_owned(),
            ..Default::default()
        };
        let resolver = Arc::new(PathResolver::new(config.root()));
        let fs: Arc<dyn FilesystemAdapter> =
            Arc::new(LocalFilesystem::new(config.temp_dir()).await.unwrap());
        let metadata: Arc<dyn MetadataStore> = Arc::new(MemoryMetadataStore::new());
        let activity = Arc::new(ActivityRecorder::new(
            Arc::new(MemoryActivityStore::new()),
            50,
        ));
        let files = FileOperationsService::new(
            resolver.clone(),
            fs.clone(),
            metadata.clone(),
            activity.clone(),
            PathLocks::new(),
            &config,
        );
        let shares = ShareManager::new(
            Arc::new(MemoryShareStore::new()),
            metadata,
            resolver,
            fs,
            Arc::new(PasswordHasher::new()),
            activity,
            16,
        );
        Fixture {
            _dir: dir,
            files,
            shares,
            ctx: RequestContext::new(Uuid::new_v4(), UserRole::User),
        }
    }

    fn request(path: &str, kind: ItemKind) -> CreateShareRequest {
        CreateShareRequest {
            path: path.to_string(),
            kind,
            is_public: false,
            password: None,
            expires_at: None,
        }
    }

    #[tokio::test]
    async fn test_missing_target_is_not_found() {
        let f = fixture().await;
        let err = f
            .shares
            .create(&f.ctx, request("nope.txt", ItemKind::File))
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::NotFound));
    }

    #[tokio::test]
    async fn test_file_share_streams_content() {
        let f = fixture().await;
        f.files
            .upload(&f.ctx, "", "doc.pdf", None, Bytes::from_static(b"%PDF"))
            .await
            .unwrap();
        let share = f
            .shares
            .create(&f.ctx, request("doc.pdf", ItemKind::File))
            .await
            .unwrap();
        assert_eq!(share.token.len(), 32);

        let resolved = f.shares.resolve(&share.token, None).await.unwrap();
        assert_eq!(resolved.share.access_count, 1);
        match resolved.content {
            SharedContent::File { record, content } => {
                assert_eq!(record.mime_type, "application/pdf");
                let chunks: Vec<Bytes> = content.stream.try_collect().await.unwrap();
                assert_eq!(chunks.concat(), b"%PDF");
            }
            other => panic!("unexpected content {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_folder_share_lists_children() {
        let f = fixture().await;
        f.files
            .upload(&f.ctx, "photos", "a.jpg", None, Bytes::from_static(b"a"))
            .await
            .unwrap();
        let share = f
            .shares
            .create(&f.ctx, request("photos", ItemKind::Folder))
            .await
            .unwrap();
        let resolved = f.shares.resolve(&share.token, None).await.unwrap();
        match resolved.content {
            SharedContent::Folder { record, entries } => {
                assert_eq!(record.name, "photos");
                assert_eq!(entries.len(), 1);
                assert_eq!(entries[0].name, "a.jpg");
            }
            other => panic!("unexpected content {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_deleted_target_does_not_count_access() {
        let f = fixture().await;
        f.files
            .upload(&f.ctx, "", "gone.txt", None, Bytes::from_static(b"x"))
            .await
            .unwrap();
        let share = f
            .shares
            .create(&f.ctx, request("gone.txt", ItemKind::File))
            .await
            .unwrap();
        f.files
            .delete(&f.ctx, "gone.txt", ItemKind::File)
            .await
            .unwrap();

        let err = f.shares.resolve(&share.token, None).await.unwrap_err();
        assert!(err.is(ErrorKind::NotFound));
        let listed = f.shares.list(&f.ctx).await.unwrap();
        assert_eq!(listed[0].share.access_count, 0);
        assert!(listed[0].target.is_none());
    }

    #[tokio::test]
    async fn test_expired_beats_password() {
        let f = fixture().await;
        f.files
            .upload(&f.ctx, "", "a.txt", None, Bytes::from_static(b"x"))
            .await
            .unwrap();
        let mut req = request("a.txt", ItemKind::File);
        req.password = Some("secret".into());
        req.expires_at = Some(Utc::now() - Duration::minutes(1));
        let share = f.shares.create(&f.ctx, req).await.unwrap();

        let err = f.shares.resolve(&share.token, None).await.unwrap_err();
        assert!(err.is(ErrorKind::Expired));
    }

    #[tokio::test]
    async fn test_password_is_matched_verbatim() {
        let f = fixture().await;
        f.files
            .upload(&f.ctx, "", "a.txt", None, Bytes::from_static(b"x"))
            .await
            .unwrap();
        let mut req = request("a.txt", ItemKind::File);
        req.password = Some(" pass phrase ".into());
        let share = f.shares.create(&f.ctx, req).await.unwrap();
        assert!(share.password_hash.is_some());

        let err = f.shares.resolve(&share.token, None).await.unwrap_err();
        assert!(err.is(ErrorKind::PasswordRequired));
        let err = f
            .shares
            .resolve(&share.token, Some("pass phrase"))
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::PasswordInvalid));
        f.shares
            .resolve(&share.token, Some(" pass phrase "))
            .await
            .unwrap();

        let mut blank = request("a.txt", ItemKind::File);
        blank.password = Some("   ".into());
        let open = f.shares.create(&f.ctx, blank).await.unwrap();
        assert!(open.password_hash.is_none());
        f.shares.resolve(&open.token, None).await.unwrap();
    }

    #[tokio::test]
    async fn test_revoke_requires_ownership() {
        let f = fixture().await;
        f.files
            .upload(&f.ctx, "", "a.txt", None, Bytes::from_static(b"x"))
            .await
            .unwrap();
        let share = f
            .shares
            .create(&f.ctx, request("a.txt", ItemKind::File))
            .await
            .unwrap();

        let stranger = RequestContext::new(Uuid::new_v4(), UserRole::Admin);
        let err = f.shares.revoke(&stranger, &share.token).await.unwrap_err();
        assert!(err.is(ErrorKind::NotFound));

        f.shares.revoke(&f.ctx, &share.token).await.unwrap();
        let err = f.shares.resolve(&share.token, None).await.unwrap_err();
        assert!(err.is(ErrorKind::NotFound));
        let err = f.shares.revoke(&f.ctx, &share.token).await.unwrap_err();
        assert!(err.is(ErrorKind::NotFound));
    }

    #[tokio::test]
    async fn test_share_survives_overwrite() {
        let f = fixture().await;
        f.files
            .upload(&f.ctx, "", "a.txt", None, Bytes::from_static(b"v1"))
            .await
            .unwrap();
        let share = f
            .shares
            .create(&f.ctx, request("a.txt", ItemKind::File))
            .await
            .unwrap();
        f.files
            .upload(&f.ctx, "", "a.txt", None, Bytes::from_static(b"v2"))
            .await
            .unwrap();

        let resolved = f.shares.resolve(&share.token, None).await.unwrap();
        match resolved.content {
            SharedContent::File { content, .. } => {
                let chunks: Vec<Bytes> = content.stream.try_collect().await.unwrap();
                assert_eq!(chunks.concat(), b"v2");
            }
            other => panic!("unexpected content {other:?}"),
        }
    }
}
