//! NAS share administration.
//!
//! Only the share rows are managed here; generating export files and
//! reloading the NFS/SMB daemons happens elsewhere.

use std::sync::Arc;

use serde_json::json;
use tracing::info;
use uuid::Uuid;

use nasbox_core::error::AppError;
use nasbox_core::path;
use nasbox_core::result::AppResult;
use nasbox_core::traits::storage::FilesystemAdapter;
use nasbox_database::store::NasShareStore;
use nasbox_entity::activity::ActivityType;
use nasbox_entity::nas::{NasPermission, NasProtocol, NasShare, NewNasShare, UpdateNasShare};
use nasbox_storage::PathResolver;

use crate::activity::ActivityRecorder;
use crate::context::RequestContext;

/// Request to export a directory.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct CreateNasShareRequest {
    /// Export name (unique).
    pub name: String,
    /// Absolute path, or a path relative to the storage root.
    pub path: String,
    /// Protocol (NFS when absent).
    pub protocol: Option<NasProtocol>,
    /// Permission mode (read-write when absent).
    pub permission: Option<NasPermission>,
    /// Free-form description.
    pub description: Option<String>,
    /// Comma-separated client allow-list.
    pub allowed_ips: Option<String>,
    /// Whether the export is active (true when absent).
    pub enabled: Option<bool>,
}

/// Admin-only CRUD over NAS shares.
#[derive(Debug, Clone)]
pub struct NasShareService {
    /// NAS share rows.
    store: Arc<dyn NasShareStore>,
    /// Storage-root containment.
    resolver: Arc<PathResolver>,
    /// Used to check the exported directory exists.
    fs: Arc<dyn FilesystemAdapter>,
    /// Activity log.
    activity: Arc<ActivityRecorder>,
}

impl NasShareService {
    /// Creates a new NAS share service.
    pub fn new(
        store: Arc<dyn NasShareStore>,
        resolver: Arc<PathResolver>,
        fs: Arc<dyn FilesystemAdapter>,
        activity: Arc<ActivityRecorder>,
    ) -> Self {
        Self {
            store,
            resolver,
            fs,
            activity,
        }
    }

    /// Every share, newest first.
    pub async fn list(&self, ctx: &RequestContext) -> AppResult<Vec<NasShare>> {
        ctx.require_admin()?;
        self.store.list().await
    }

    /// A single share.
    pub async fn get(&self, ctx: &RequestContext, id: Uuid) -> AppResult<NasShare> {
        ctx.require_admin()?;
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("NAS share not found"))
    }

    /// Exports a directory inside the storage root.
    pub async fn create(
        &self,
        ctx: &RequestContext,
        req: CreateNasShareRequest,
    ) -> AppResult<NasShare> {
        ctx.require_admin()?;
        let name = path::validate_name(&req.name)?;
        let export_path = self.validate_export_path(&req.path).await?;

        if self.store.find_by_name(&name).await?.is_some() {
            return Err(AppError::already_exists(format!(
                "NAS share '{name}' already exists"
            )));
        }

        let share = self
            .store
            .create(&NewNasShare {
                name,
                path: export_path,
                protocol: req.protocol.unwrap_or_default(),
                permission: req.permission.unwrap_or_default(),
                description: req.description,
                allowed_ips: req.allowed_ips,
                enabled: req.enabled.unwrap_or(true),
                created_by: ctx.user_id,
            })
            .await?;

        info!(
            user_id = %ctx.user_id,
            share_id = %share.id,
            name = %share.name,
            path = %share.path,
            "NAS share created"
        );
        self.activity
            .append(
                ctx,
                ActivityType::NasShareCreate,
                format!("Created NAS share {}", share.name),
                Some(json!({
                    "share_id": share.id,
                    "name": share.name,
                    "path": share.path,
                    "protocol": share.protocol,
                })),
            )
            .await;

        Ok(share)
    }

    /// Applies a partial update.
    pub async fn update(
        &self,
        ctx: &RequestContext,
        id: Uuid,
        mut req: UpdateNasShare,
    ) -> AppResult<NasShare> {
        ctx.require_admin()?;
        if req.is_empty() {
            return Err(AppError::validation("Nothing to update"));
        }
        if let Some(name) = req.name.take() {
            req.name = Some(path::validate_name(&name)?);
        }
        if let Some(raw) = req.path.take() {
            req.path = Some(self.validate_export_path(&raw).await?);
        }

        let share = self
            .store
            .update(id, &req)
            .await?
            .ok_or_else(|| AppError::not_found("NAS share not found"))?;

        info!(user_id = %ctx.user_id, share_id = %id, "NAS share updated");
        self.activity
            .append(
                ctx,
                ActivityType::NasShareUpdate,
                format!("Updated NAS share {}", share.name),
                Some(json!({ "share_id": id, "changes": req })),
            )
            .await;

        Ok(share)
    }

    /// Removes a share.
    pub async fn delete(&self, ctx: &RequestContext, id: Uuid) -> AppResult<()> {
        ctx.require_admin()?;
        if !self.store.delete(id).await? {
            return Err(AppError::not_found("NAS share not found"));
        }

        info!(user_id = %ctx.user_id, share_id = %id, "NAS share deleted");
        self.activity
            .append(
                ctx,
                ActivityType::NasShareDelete,
                "Deleted NAS share",
                Some(json!({ "share_id": id })),
            )
            .await;

        Ok(())
    }

    /// Contain `raw` in the storage root and require an existing directory.
    async fn validate_export_path(&self, raw: &str) -> AppResult<String> {
        let absolute = self.resolver.resolve_in_storage_root(raw)?;
        match self.fs.stat(&absolute).await? {
            Some(stat) if stat.is_dir => Ok(absolute.to_string_lossy().into_owned()),
            Some(_) => Err(AppError::not_a_directory(format!(
                "{} is not a directory",
                absolute.display()
            ))),
            None => Err(AppError::not_found(format!(
                "{} does not exist",
                absolute.display()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nasbox_core::error::ErrorKind;
    use nasbox_database::memory::{MemoryActivityStore, MemoryNasShareStore};
    use nasbox_entity::user::UserRole;
    use nasbox_storage::LocalFilesystem;

    async fn service(root: &std::path::Path) -> (NasShareService, Arc<MemoryActivityStore>) {
        let activity = Arc::new(MemoryActivityStore::new());
        let fs = LocalFilesystem::new(root.join(".nasbox-tmp")).await.unwrap();
        let service = NasShareService::new(
            Arc::new(MemoryNasShareStore::new()),
            Arc::new(PathResolver::new(root)),
            Arc::new(fs),
            Arc::new(ActivityRecorder::new(activity.clone(), 50)),
        );
        (service, activity)
    }

    fn admin() -> RequestContext {
        RequestContext::new(Uuid::new_v4(), UserRole::Admin)
    }

    fn request(name: &str, path: &str) -> CreateNasShareRequest {
        CreateNasShareRequest {
            name: name.to_string(),
            path: path.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_applies_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("media")).unwrap();
        let (service, activity) = service(dir.path()).await;

        let share = service.create(&admin(), request("media", "media")).await.unwrap();
        assert_eq!(share.protocol, NasProtocol::Nfs);
        assert_eq!(share.permission, NasPermission::ReadWrite);
        assert!(share.enabled);
        assert!(share.path.ends_with("media"));
        assert_eq!(activity.all().await.len(), 1);
    }

    #[tokio::test]
    async fn test_create_rejects_bad_paths() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("file.txt"), b"x").unwrap();
        let (service, _) = service(dir.path()).await;
        let ctx = admin();

        let err = service.create(&ctx, request("up", "../")).await.unwrap_err();
        assert!(err.is(ErrorKind::InvalidPath));
        let err = service.create(&ctx, request("etc", "/etc")).await.unwrap_err();
        assert!(err.is(ErrorKind::InvalidPath));
        let err = service.create(&ctx, request("missing", "nope")).await.unwrap_err();
        assert!(err.is(ErrorKind::NotFound));
        let err = service.create(&ctx, request("file", "file.txt")).await.unwrap_err();
        assert!(err.is(ErrorKind::NotADirectory));
    }

    #[tokio::test]
    async fn test_admin_only_and_unique_names() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("a")).unwrap();
        let (service, _) = service(dir.path()).await;

        let user = RequestContext::new(Uuid::new_v4(), UserRole::User);
        let err = service.create(&user, request("a", "a")).await.unwrap_err();
        assert!(err.is(ErrorKind::Unauthorized));

        let ctx = admin();
        service.create(&ctx, request("a", "a")).await.unwrap();
        let err = service.create(&ctx, request("a", "a")).await.unwrap_err();
        assert!(err.is(ErrorKind::AlreadyExists));
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("a")).unwrap();
        let (service, _) = service(dir.path()).await;
        let ctx = admin();
        let share = service.create(&ctx, request("a", "a")).await.unwrap();

        let updated = service
            .update(
                &ctx,
                share.id,
                UpdateNasShare {
                    protocol: Some(NasProtocol::Smb),
                    enabled: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.protocol, NasProtocol::Smb);
        assert!(!updated.enabled);

        let err = service
            .update(
                &ctx,
                share.id,
                UpdateNasShare {
                    path: Some("../outside".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::InvalidPath));

        service.delete(&ctx, share.id).await.unwrap();
        let err = service.delete(&ctx, share.id).await.unwrap_err();
        assert!(err.is(ErrorKind::NotFound));
    }
}
