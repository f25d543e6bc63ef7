//! Storage usage reporting.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use nasbox_core::error::AppError;
use nasbox_core::result::AppResult;
use nasbox_database::store::MetadataStore;
use nasbox_entity::storage::DiskUsage;
use nasbox_storage::{DiskUsageCalculator, PathResolver};

use crate::context::RequestContext;

/// Whose storage a usage figure covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "scope", content = "user_id", rename_all = "lowercase")]
pub enum UsageScope {
    /// The caller's own root.
    #[default]
    Own,
    /// Another user's root (admin only unless it is the caller).
    User(Uuid),
    /// The whole storage root (admin only).
    All,
}

/// Reports disk usage and runs the reconciliation sweep.
#[derive(Debug, Clone)]
pub struct StorageService {
    /// Containment-checked path resolution.
    pub(super) resolver: Arc<PathResolver>,
    /// Usage and tree scanning.
    pub(super) calculator: DiskUsageCalculator,
    /// File and folder records.
    pub(super) metadata: Arc<dyn MetadataStore>,
}

impl StorageService {
    /// Creates a new storage service.
    pub fn new(
        resolver: Arc<PathResolver>,
        calculator: DiskUsageCalculator,
        metadata: Arc<dyn MetadataStore>,
    ) -> Self {
        Self {
            resolver,
            calculator,
            metadata,
        }
    }

    /// Usage for the requested scope.
    pub async fn usage(&self, ctx: &RequestContext, scope: UsageScope) -> AppResult<DiskUsage> {
        let path = match scope {
            UsageScope::Own => self.resolver.owner_root(ctx.user_id),
            UsageScope::User(id) if id == ctx.user_id => self.resolver.owner_root(id),
            UsageScope::User(id) => {
                ctx.require_admin()?;
                self.resolver.owner_root(id)
            }
            UsageScope::All => {
                ctx.require_admin()?;
                self.resolver.storage_root().to_path_buf()
            }
        };

        let usage = self.calculator.usage(&path).await?;
        debug!(
            user_id = %ctx.user_id,
            scope = ?scope,
            used_bytes = usage.used_bytes,
            "Computed disk usage"
        );
        Ok(usage)
    }

    /// Fails with `Unauthorized` unless the caller may act on `owner_id`.
    pub(super) fn require_owner_or_admin(ctx: &RequestContext, owner_id: Uuid) -> AppResult<()> {
        if owner_id == ctx.user_id || ctx.is_admin() {
            Ok(())
        } else {
            Err(AppError::unauthorized(
                "You can only manage your own storage",
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nasbox_core::error::ErrorKind;
    use nasbox_database::memory::MemoryMetadataStore;
    use nasbox_entity::user::UserRole;

    fn service(root: &std::path::Path) -> StorageService {
        StorageService::new(
            Arc::new(PathResolver::new(root)),
            DiskUsageCalculator::new(),
            Arc::new(MemoryMetadataStore::new()),
        )
    }

    #[tokio::test]
    async fn test_usage_scopes() {
        let dir = tempfile::tempdir().unwrap();
        let alice = RequestContext::new(Uuid::new_v4(), UserRole::User);
        let bob = Uuid::new_v4();
        for (owner, size) in [(alice.user_id, 10usize), (bob, 32)] {
            let root = dir.path().join(owner.to_string());
            std::fs::create_dir_all(&root).unwrap();
            std::fs::write(root.join("f.bin"), vec![1u8; size]).unwrap();
        }
        let service = service(dir.path());

        let own = service.usage(&alice, UsageScope::Own).await.unwrap();
        assert_eq!(own.used_bytes, 10);

        let err = service
            .usage(&alice, UsageScope::User(bob))
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::Unauthorized));
        let err = service.usage(&alice, UsageScope::All).await.unwrap_err();
        assert!(err.is(ErrorKind::Unauthorized));

        let admin = RequestContext::new(Uuid::new_v4(), UserRole::Admin);
        let bob_usage = service.usage(&admin, UsageScope::User(bob)).await.unwrap();
        assert_eq!(bob_usage.used_bytes, 32);
        let all = service.usage(&admin, UsageScope::All).await.unwrap();
        assert_eq!(all.used_bytes, 42);
    }
}
