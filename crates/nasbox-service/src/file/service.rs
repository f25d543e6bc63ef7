//! File and folder operations.
//!
//! Every operation resolves its paths through the [`PathResolver`], holds
//! the path locks for the resolved locations, mutates the filesystem and
//! then brings the metadata store in line. Filesystem state is the ground
//! truth: when the metadata update fails after the filesystem changed the
//! operation reports `Inconsistent` and leaves the repair to the
//! reconciliation sweep.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use futures::stream;
use serde_json::json;
use tracing::{error, info};

use nasbox_core::config::storage::StorageConfig;
use nasbox_core::error::AppError;
use nasbox_core::path;
use nasbox_core::result::AppResult;
use nasbox_core::traits::storage::{ByteStream, FilesystemAdapter, FsStat};
use nasbox_database::store::MetadataStore;
use nasbox_entity::activity::ActivityType;
use nasbox_entity::file::model::DEFAULT_MIME_TYPE;
use nasbox_entity::file::{FileRecord, NewFileRecord};
use nasbox_entity::folder::{FolderRecord, NewFolderRecord};
use nasbox_entity::metadata::{ItemKind, MetadataRecord};
use nasbox_storage::{PathLocks, PathResolver, ResolvedPath, mime};

use super::listing::{self, FileContent, ListEntry};
use crate::activity::ActivityRecorder;
use crate::context::RequestContext;

/// Orchestrates filesystem mutations and metadata reconciliation.
#[derive(Debug, Clone)]
pub struct FileOperationsService {
    /// Containment-checked path resolution.
    resolver: Arc<PathResolver>,
    /// Physical storage.
    fs: Arc<dyn FilesystemAdapter>,
    /// File and folder records.
    metadata: Arc<dyn MetadataStore>,
    /// Activity log.
    activity: Arc<ActivityRecorder>,
    /// Per-path locks shared with every other mutating service.
    locks: PathLocks,
    /// Largest accepted upload.
    max_upload_size: u64,
}

impl FileOperationsService {
    /// Creates a new file operations service.
    pub fn new(
        resolver: Arc<PathResolver>,
        fs: Arc<dyn FilesystemAdapter>,
        metadata: Arc<dyn MetadataStore>,
        activity: Arc<ActivityRecorder>,
        locks: PathLocks,
        config: &StorageConfig,
    ) -> Self {
        Self {
            resolver,
            fs,
            metadata,
            activity,
            locks,
            max_upload_size: config.max_upload_size_bytes,
        }
    }

    /// Lists the children of a folder.
    ///
    /// Physical entries without metadata are still returned, with
    /// filesystem-derived defaults.
    pub async fn list(&self, ctx: &RequestContext, folder_path: &str) -> AppResult<Vec<ListEntry>> {
        let folder = self.resolve(ctx, folder_path).await?;
        if folder.is_root() {
            self.fs.ensure_dir(&folder.absolute).await?;
        }

        match self.fs.stat(&folder.absolute).await? {
            Some(stat) if stat.is_dir => {}
            _ => {
                return Err(AppError::validation(format!(
                    "Not a directory: '{}'",
                    folder.logical
                )));
            }
        }

        listing::list_directory(self.fs.as_ref(), self.metadata.as_ref(), &folder).await
    }

    /// Uploads a whole buffer into `folder_path/filename`.
    pub async fn upload(
        &self,
        ctx: &RequestContext,
        folder_path: &str,
        filename: &str,
        mime_type: Option<&str>,
        data: Bytes,
    ) -> AppResult<FileRecord> {
        let body: ByteStream = Box::pin(stream::once(async move { Ok(data) }));
        self.upload_stream(ctx, folder_path, filename, mime_type, body)
            .await
    }

    /// Streams an upload into `folder_path/filename`.
    ///
    /// An existing file at the target is replaced. The recorded size is
    /// the number of bytes actually written.
    pub async fn upload_stream(
        &self,
        ctx: &RequestContext,
        folder_path: &str,
        filename: &str,
        mime_type: Option<&str>,
        body: ByteStream,
    ) -> AppResult<FileRecord> {
        let folder = self.resolve(ctx, folder_path).await?;
        let target = self.resolve_child(ctx, &folder.logical, filename).await?;
        let _guard = self.locks.lock(target.absolute.clone()).await;

        let created_parents = self.ensure_folder(&folder).await?;
        let written = self
            .fs
            .write_stream(&target.absolute, body, Some(self.max_upload_size))
            .await?;

        let name = target.name().to_string();
        let mime_type = mime::declared_or_guess(mime_type, &name);
        let record = async {
            if created_parents {
                self.record_ancestors(ctx, &folder.logical).await?;
            }
            self.metadata
                .upsert_file(&NewFileRecord {
                    owner_id: ctx.user_id,
                    path: target.logical.clone(),
                    filename: name.clone(),
                    mime_type: mime_type.clone(),
                    size_bytes: written as i64,
                })
                .await
        }
        .await
        .map_err(|e| self.inconsistent(ctx, "upload", &target.logical, e))?;

        info!(
            user_id = %ctx.user_id,
            path = %target.logical,
            size = written,
            mime_type = %mime_type,
            "File uploaded"
        );
        self.activity
            .append(
                ctx,
                ActivityType::FileUpload,
                format!("Uploaded {name}"),
                Some(json!({ "path": target.logical, "size": written, "mime_type": mime_type })),
            )
            .await;

        Ok(record)
    }

    /// Opens a file for download.
    pub async fn download(&self, ctx: &RequestContext, file_path: &str) -> AppResult<FileContent> {
        self.open(ctx, file_path, "download").await
    }

    /// Opens a file for inline viewing.
    pub async fn view(&self, ctx: &RequestContext, file_path: &str) -> AppResult<FileContent> {
        self.open(ctx, file_path, "view").await
    }

    async fn open(
        &self,
        ctx: &RequestContext,
        file_path: &str,
        mode: &'static str,
    ) -> AppResult<FileContent> {
        let file = self.resolve(ctx, file_path).await?;
        let stat = self.require_kind(&file, ItemKind::File).await?;

        let mime_type = self
            .metadata
            .find_file(ctx.user_id, &file.logical)
            .await?
            .map(|r| r.mime_type)
            .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string());
        let stream = self.fs.read_stream(&file.absolute).await?;

        info!(user_id = %ctx.user_id, path = %file.logical, mode, "File opened");
        self.activity
            .append(
                ctx,
                ActivityType::FileDownload,
                format!("Downloaded {}", file.name()),
                Some(json!({ "path": file.logical, "size": stat.size, "mode": mode })),
            )
            .await;

        Ok(FileContent {
            filename: file.name().to_string(),
            path: file.logical,
            mime_type,
            size: stat.size,
            stream,
        })
    }

    /// Creates `parent_path/name`. Succeeds if the folder already exists.
    pub async fn create_folder(
        &self,
        ctx: &RequestContext,
        parent_path: &str,
        name: &str,
    ) -> AppResult<FolderRecord> {
        let parent = self.resolve(ctx, parent_path).await?;
        let folder = self.resolve_child(ctx, &parent.logical, name).await?;
        let _guard = self.locks.lock(folder.absolute.clone()).await;

        if let Some(stat) = self.fs.stat(&folder.absolute).await? {
            if !stat.is_dir {
                return Err(AppError::already_exists(format!(
                    "A file already exists at '{}'",
                    folder.logical
                )));
            }
        }
        self.fs.ensure_dir(&folder.absolute).await?;

        let record = self
            .record_ancestors(ctx, &folder.logical)
            .await
            .map_err(|e| self.inconsistent(ctx, "create folder", &folder.logical, e))?;

        info!(user_id = %ctx.user_id, path = %folder.logical, "Folder created");
        self.activity
            .append(
                ctx,
                ActivityType::FolderCreate,
                format!("Created folder {}", folder.name()),
                Some(json!({ "path": folder.logical })),
            )
            .await;

        Ok(record)
    }

    /// Renames an item within its folder.
    ///
    /// Fails with `AlreadyExists` when the new name is taken.
    pub async fn rename(
        &self,
        ctx: &RequestContext,
        item_path: &str,
        new_name: &str,
        kind: ItemKind,
    ) -> AppResult<MetadataRecord> {
        let source = self.resolve_item(ctx, item_path).await?;
        let target = self
            .resolve_child(ctx, source.parent_logical(), new_name)
            .await?;
        if target.logical == source.logical {
            return Err(AppError::validation("The new name matches the current name"));
        }

        let _guard = self
            .locks
            .lock_all(vec![source.absolute.clone(), target.absolute.clone()])
            .await;
        let stat = self.require_kind(&source, kind).await?;
        self.relocate(ctx, &source, &target, kind, &stat, "rename").await
    }

    /// Moves an item into another folder, creating the folder if needed.
    ///
    /// Fails with `AlreadyExists` when the destination already holds an
    /// entry of the same name, and with `Validation` when a folder would
    /// be moved into itself.
    pub async fn move_item(
        &self,
        ctx: &RequestContext,
        item_path: &str,
        destination_folder: &str,
        kind: ItemKind,
    ) -> AppResult<MetadataRecord> {
        let source = self.resolve_item(ctx, item_path).await?;
        let destination = self.resolve(ctx, destination_folder).await?;
        if path::is_within(&source.logical, &destination.logical) {
            return Err(AppError::validation(format!(
                "Cannot move '{}' into itself",
                source.logical
            )));
        }
        let target = self
            .resolve_child(ctx, &destination.logical, source.name())
            .await?;
        if target.logical == source.logical {
            return Err(AppError::validation(format!(
                "'{}' is already in that folder",
                source.logical
            )));
        }

        let _guard = self
            .locks
            .lock_all(vec![source.absolute.clone(), target.absolute.clone()])
            .await;
        // The source must exist before the destination is created.
        let stat = self.require_kind(&source, kind).await?;
        if self.ensure_folder(&destination).await? {
            self.record_ancestors(ctx, &destination.logical)
                .await
                .map_err(|e| self.inconsistent(ctx, "move", &destination.logical, e))?;
        }

        self.relocate(ctx, &source, &target, kind, &stat, "move").await
    }

    /// Shared rename/move path: one filesystem rename, then a prefix
    /// rewrite of the source record and its descendants.
    ///
    /// Callers hold the locks on `source` and `target`.
    async fn relocate(
        &self,
        ctx: &RequestContext,
        source: &ResolvedPath,
        target: &ResolvedPath,
        kind: ItemKind,
        stat: &FsStat,
        operation: &'static str,
    ) -> AppResult<MetadataRecord> {
        self.fs.move_path(&source.absolute, &target.absolute).await?;

        let record = async {
            // Nothing existed physically at the target, so any record there is stale.
            self.metadata
                .delete_by_path(ctx.user_id, &target.logical)
                .await?;
            self.metadata
                .rename_path(ctx.user_id, &source.logical, &target.logical, target.name())
                .await?;
            match self.metadata.find_by_path(ctx.user_id, &target.logical).await? {
                Some(record) if record.kind() == kind => Ok(record),
                _ => self.record_from_stat(ctx, target, kind, stat).await,
            }
        }
        .await
        .map_err(|e| self.inconsistent(ctx, operation, &source.logical, e))?;

        info!(
            user_id = %ctx.user_id,
            from = %source.logical,
            to = %target.logical,
            kind = %kind,
            operation,
            "Item relocated"
        );
        self.activity
            .append(
                ctx,
                ActivityType::FileModify,
                format!("{} {} to {}", capitalize(operation), source.logical, target.logical),
                Some(json!({
                    "from": source.logical,
                    "to": target.logical,
                    "type": kind,
                    "operation": operation,
                })),
            )
            .await;

        Ok(record)
    }

    /// Copies an item into another folder.
    ///
    /// Folders are copied recursively together with their metadata.
    /// Fails with `AlreadyExists` when the destination name is taken.
    pub async fn copy(
        &self,
        ctx: &RequestContext,
        item_path: &str,
        destination_folder: &str,
        kind: ItemKind,
    ) -> AppResult<MetadataRecord> {
        let source = self.resolve_item(ctx, item_path).await?;
        let destination = self.resolve(ctx, destination_folder).await?;
        if kind == ItemKind::Folder && path::is_within(&source.logical, &destination.logical) {
            return Err(AppError::validation(format!(
                "Cannot copy '{}' into itself",
                source.logical
            )));
        }
        let target = self
            .resolve_child(ctx, &destination.logical, source.name())
            .await?;

        let _guard = self
            .locks
            .lock_all(vec![source.absolute.clone(), target.absolute.clone()])
            .await;

        self.require_kind(&source, kind).await?;
        if self.fs.stat(&target.absolute).await?.is_some() {
            return Err(AppError::already_exists(format!(
                "'{}' already exists",
                target.logical
            )));
        }
        let created_parents = self.ensure_folder(&destination).await?;

        let source_records: HashMap<String, MetadataRecord> = self
            .metadata
            .list_subtree(ctx.user_id, &source.logical)
            .await?
            .into_iter()
            .map(|r| (r.path().to_string(), r))
            .collect();

        let mut copied = 0u64;
        let mut bytes = 0u64;
        let record = async {
            if created_parents {
                self.record_ancestors(ctx, &destination.logical).await?;
            }
            match kind {
                ItemKind::File => {
                    let size = self.fs.copy_file(&source.absolute, &target.absolute).await?;
                    copied += 1;
                    bytes += size;
                    let file = self
                        .copy_file_record(ctx, &source.logical, &target, size, &source_records)
                        .await?;
                    Ok(MetadataRecord::File(file))
                }
                ItemKind::Folder => {
                    let (count, size) = self
                        .copy_tree(ctx, &source, &target, &source_records)
                        .await?;
                    copied += count;
                    bytes += size;
                    self.metadata
                        .find_folder(ctx.user_id, &target.logical)
                        .await?
                        .map(MetadataRecord::Folder)
                        .ok_or_else(|| AppError::internal("Copied folder record vanished"))
                }
            }
        }
        .await
        .map_err(|e| self.inconsistent(ctx, "copy", &target.logical, e))?;

        info!(
            user_id = %ctx.user_id,
            from = %source.logical,
            to = %target.logical,
            kind = %kind,
            entries = copied,
            bytes,
            "Item copied"
        );
        let activity_type = match kind {
            ItemKind::File => ActivityType::FileCreate,
            ItemKind::Folder => ActivityType::FolderCreate,
        };
        self.activity
            .append(
                ctx,
                activity_type,
                format!("Copied {} to {}", source.logical, target.logical),
                Some(json!({
                    "from": source.logical,
                    "to": target.logical,
                    "type": kind,
                    "entries": copied,
                    "size": bytes,
                })),
            )
            .await;

        Ok(record)
    }

    /// Recursively copy a folder, returning `(entries copied, bytes)`.
    async fn copy_tree(
        &self,
        ctx: &RequestContext,
        source: &ResolvedPath,
        target: &ResolvedPath,
        source_records: &HashMap<String, MetadataRecord>,
    ) -> AppResult<(u64, u64)> {
        let mut pending: Vec<(String, String, PathBuf, PathBuf)> = vec![(
            source.logical.clone(),
            target.logical.clone(),
            source.absolute.clone(),
            target.absolute.clone(),
        )];
        let mut entries = 0u64;
        let mut bytes = 0u64;

        while let Some((src_logical, dst_logical, src_abs, dst_abs)) = pending.pop() {
            self.fs.ensure_dir(&dst_abs).await?;
            self.metadata
                .upsert_folder(&NewFolderRecord {
                    owner_id: ctx.user_id,
                    path: dst_logical.clone(),
                    name: path::file_name(&dst_logical).to_string(),
                })
                .await?;
            entries += 1;

            for child in self.fs.list(&src_abs).await? {
                let child_src = path::join(&src_logical, &child.name);
                let child_dst = path::join(&dst_logical, &child.name);
                if child.is_dir {
                    pending.push((
                        child_src,
                        child_dst,
                        src_abs.join(&child.name),
                        dst_abs.join(&child.name),
                    ));
                } else if child.is_file {
                    let dst = ResolvedPath {
                        owner_id: ctx.user_id,
                        logical: child_dst,
                        absolute: dst_abs.join(&child.name),
                    };
                    let size = self
                        .fs
                        .copy_file(&src_abs.join(&child.name), &dst.absolute)
                        .await?;
                    self.copy_file_record(ctx, &child_src, &dst, size, source_records)
                        .await?;
                    entries += 1;
                    bytes += size;
                }
            }
        }

        Ok((entries, bytes))
    }

    async fn copy_file_record(
        &self,
        ctx: &RequestContext,
        source_logical: &str,
        target: &ResolvedPath,
        size: u64,
        source_records: &HashMap<String, MetadataRecord>,
    ) -> AppResult<FileRecord> {
        let mime_type = match source_records.get(source_logical) {
            Some(MetadataRecord::File(file)) => file.mime_type.clone(),
            _ => mime::guess(target.name()),
        };
        self.metadata
            .upsert_file(&NewFileRecord {
                owner_id: ctx.user_id,
                path: target.logical.clone(),
                filename: target.name().to_string(),
                mime_type,
                size_bytes: size as i64,
            })
            .await
    }

    /// Deletes an item, recursively for folders, with every descendant
    /// record.
    pub async fn delete(&self, ctx: &RequestContext, item_path: &str, kind: ItemKind) -> AppResult<()> {
        let item = self.resolve_item(ctx, item_path).await?;
        let _guard = self.locks.lock(item.absolute.clone()).await;

        self.require_kind(&item, kind).await?;
        self.fs.delete(&item.absolute).await?;

        let removed = self
            .metadata
            .delete_by_path(ctx.user_id, &item.logical)
            .await
            .map_err(|e| self.inconsistent(ctx, "delete", &item.logical, e))?;

        info!(
            user_id = %ctx.user_id,
            path = %item.logical,
            kind = %kind,
            records = removed,
            "Item deleted"
        );
        let activity_type = match kind {
            ItemKind::File => ActivityType::FileDelete,
            ItemKind::Folder => ActivityType::FolderDelete,
        };
        self.activity
            .append(
                ctx,
                activity_type,
                format!("Deleted {}", item.logical),
                Some(json!({ "path": item.logical, "type": kind })),
            )
            .await;

        Ok(())
    }

    async fn resolve(&self, ctx: &RequestContext, logical: &str) -> AppResult<ResolvedPath> {
        let resolved = self.resolver.resolve(ctx.user_id, logical)?;
        self.resolver.confine(&resolved).await?;
        Ok(resolved)
    }

    async fn resolve_child(
        &self,
        ctx: &RequestContext,
        parent: &str,
        name: &str,
    ) -> AppResult<ResolvedPath> {
        let resolved = self.resolver.resolve_child(ctx.user_id, parent, name)?;
        self.resolver.confine(&resolved).await?;
        Ok(resolved)
    }

    /// Resolve a path naming an item, which may not be the owner root.
    async fn resolve_item(&self, ctx: &RequestContext, logical: &str) -> AppResult<ResolvedPath> {
        let resolved = self.resolve(ctx, logical).await?;
        if resolved.is_root() {
            return Err(AppError::validation("The root folder cannot be modified"));
        }
        Ok(resolved)
    }

    /// Stat `item`, failing `NotFound` unless it exists with the given kind.
    async fn require_kind(&self, item: &ResolvedPath, kind: ItemKind) -> AppResult<FsStat> {
        match self.fs.stat(&item.absolute).await? {
            Some(stat) if matches_kind(&stat, kind) => Ok(stat),
            _ => Err(AppError::not_found(format!(
                "No {kind} at '{}'",
                item.logical
            ))),
        }
    }

    /// Create `folder` on disk, returning whether folder records are
    /// now missing for it. The owner root never has a record.
    async fn ensure_folder(&self, folder: &ResolvedPath) -> AppResult<bool> {
        match self.fs.stat(&folder.absolute).await? {
            Some(stat) if stat.is_dir => Ok(false),
            Some(_) => Err(AppError::not_a_directory(format!(
                "Not a directory: '{}'",
                folder.logical
            ))),
            None => {
                self.fs.ensure_dir(&folder.absolute).await?;
                Ok(!folder.is_root())
            }
        }
    }

    /// Upsert folder records for `logical` and each of its ancestors,
    /// returning the record for `logical` itself.
    async fn record_ancestors(&self, ctx: &RequestContext, logical: &str) -> AppResult<FolderRecord> {
        let mut current = String::new();
        let mut last = None;
        for segment in logical.split('/').filter(|s| !s.is_empty()) {
            current = path::join(&current, segment);
            last = Some(
                self.metadata
                    .upsert_folder(&NewFolderRecord {
                        owner_id: ctx.user_id,
                        path: current.clone(),
                        name: segment.to_string(),
                    })
                    .await?,
            );
        }
        last.ok_or_else(|| AppError::validation("The root folder has no record"))
    }

    /// Create a record for an item that had none before it was moved.
    async fn record_from_stat(
        &self,
        ctx: &RequestContext,
        item: &ResolvedPath,
        kind: ItemKind,
        stat: &FsStat,
    ) -> AppResult<MetadataRecord> {
        match kind {
            ItemKind::File => self
                .metadata
                .upsert_file(&NewFileRecord {
                    owner_id: ctx.user_id,
                    path: item.logical.clone(),
                    filename: item.name().to_string(),
                    mime_type: mime::guess(item.name()),
                    size_bytes: stat.size as i64,
                })
                .await
                .map(MetadataRecord::File),
            ItemKind::Folder => self
                .metadata
                .upsert_folder(&NewFolderRecord {
                    owner_id: ctx.user_id,
                    path: item.logical.clone(),
                    name: item.name().to_string(),
                })
                .await
                .map(MetadataRecord::Folder),
        }
    }

    fn inconsistent(
        &self,
        ctx: &RequestContext,
        operation: &'static str,
        logical: &str,
        err: AppError,
    ) -> AppError {
        error!(
            user_id = %ctx.user_id,
            operation,
            path = %logical,
            kind = "INCONSISTENT",
            error = %err,
            "Filesystem changed but metadata update failed"
        );
        AppError::inconsistent(format!(
            "{operation} of '{logical}' completed on disk but metadata was not updated: {err}"
        ))
    }
}

fn matches_kind(stat: &FsStat, kind: ItemKind) -> bool {
    match kind {
        ItemKind::File => stat.is_file,
        ItemKind::Folder => stat.is_dir,
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
