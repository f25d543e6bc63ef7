//! Rebuild metadata from the filesystem.
//!
//! The sweep treats the owner's directory tree as ground truth. It never
//! runs implicitly; operators trigger it after an `Inconsistent` error or
//! after files were changed behind the service's back.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use nasbox_core::path;
use nasbox_core::result::AppResult;
use nasbox_entity::file::NewFileRecord;
use nasbox_entity::folder::NewFolderRecord;
use nasbox_entity::metadata::{ItemKind, MetadataRecord};
use nasbox_storage::mime;

use super::service::StorageService;
use crate::context::RequestContext;

/// Outcome of one reconciliation sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    /// Whose tree was swept.
    pub owner_id: Uuid,
    /// Records inserted for untracked entries.
    pub created: u64,
    /// File records whose size or timestamp was refreshed.
    pub updated: u64,
    /// Records removed because nothing exists at their path.
    pub removed: u64,
}

impl StorageService {
    /// Bring `owner_id`'s metadata in line with their directory tree.
    pub async fn reconcile(
        &self,
        ctx: &RequestContext,
        owner_id: Uuid,
    ) -> AppResult<ReconcileReport> {
        Self::require_owner_or_admin(ctx, owner_id)?;
        let root = self.resolver.owner_root(owner_id);
        let mut report = ReconcileReport {
            owner_id,
            ..Default::default()
        };

        let mut physical = HashMap::new();
        for entry in self.calculator.scan(&root).await? {
            match path::normalize(&entry.relative) {
                Ok(logical) if !logical.is_empty() => {
                    physical.insert(logical, entry);
                }
                _ => warn!(owner_id = %owner_id, path = %entry.relative, "Skipping unmappable entry"),
            }
        }

        // Drop records with nothing (or the wrong kind) behind them.
        for record in self.metadata.list_subtree(owner_id, "").await? {
            let present = physical
                .get(record.path())
                .is_some_and(|e| e.is_dir == (record.kind() == ItemKind::Folder));
            if !present {
                report.removed += self.metadata.delete_by_path(owner_id, record.path()).await?;
            }
        }

        // Cascading deletes above may have taken valid descendants with them,
        // so look the records up again before filling gaps.
        let mut folders = HashSet::new();
        let mut files = HashMap::new();
        for record in self.metadata.list_subtree(owner_id, "").await? {
            match record {
                MetadataRecord::Folder(folder) => {
                    folders.insert(folder.path);
                }
                MetadataRecord::File(file) => {
                    files.insert(file.path.clone(), file);
                }
            }
        }

        let mut paths: Vec<&String> = physical.keys().collect();
        paths.sort();
        for logical in paths {
            let entry = &physical[logical];
            let name = path::file_name(logical);
            if entry.is_dir {
                if !folders.contains(logical) {
                    self.metadata
                        .upsert_folder(&NewFolderRecord {
                            owner_id,
                            path: logical.clone(),
                            name: name.to_string(),
                        })
                        .await?;
                    report.created += 1;
                }
                continue;
            }

            match files.get(logical) {
                None => {
                    self.metadata
                        .upsert_file(&NewFileRecord {
                            owner_id,
                            path: logical.clone(),
                            filename: name.to_string(),
                            mime_type: mime::guess(name),
                            size_bytes: entry.size as i64,
                        })
                        .await?;
                    report.created += 1;
                }
                Some(record) => {
                    let drifted = record.size() != entry.size
                        || entry.modified_at.is_some_and(|m| m > record.updated_at);
                    if drifted {
                        let modified_at = entry.modified_at.unwrap_or_else(Utc::now);
                        self.metadata
                            .refresh_file(record.id, entry.size as i64, modified_at)
                            .await?;
                        report.updated += 1;
                    }
                }
            }
        }

        info!(
            user_id = %ctx.user_id,
            owner_id = %owner_id,
            created = report.created,
            updated = report.updated,
            removed = report.removed,
            "Metadata reconciled"
        );
        Ok(report)
    }
}
