//! Best-effort activity recording.
//!
//! Appends never fail the operation that triggered them: a store error is
//! logged and dropped.

use std::sync::Arc;

use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use nasbox_core::error::AppError;
use nasbox_core::result::AppResult;
use nasbox_database::store::ActivityStore;
use nasbox_entity::activity::{ActivityLogEntry, ActivityQuery, ActivityType, NewActivity};

use crate::context::RequestContext;

/// Filters for listing activity.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ActivityListRequest {
    /// Only entries of this type.
    pub activity_type: Option<ActivityType>,
    /// Maximum entries returned (configured default when absent).
    pub limit: Option<u32>,
    /// Entries of this user instead of the caller (admin only).
    pub user_id: Option<Uuid>,
    /// Entries of every user (admin only).
    pub all_users: bool,
}

/// Records and lists activity log entries.
#[derive(Debug, Clone)]
pub struct ActivityRecorder {
    /// Activity store.
    store: Arc<dyn ActivityStore>,
    /// Limit applied when a listing does not name one.
    default_limit: u32,
}

impl ActivityRecorder {
    /// Creates a new recorder.
    pub fn new(store: Arc<dyn ActivityStore>, default_limit: u32) -> Self {
        Self {
            store,
            default_limit,
        }
    }

    /// Append an entry attributed to the caller. Failures are logged and
    /// swallowed.
    pub async fn append(
        &self,
        ctx: &RequestContext,
        activity_type: ActivityType,
        description: impl Into<String>,
        metadata: Option<Value>,
    ) {
        let entry = NewActivity {
            user_id: ctx.user_id,
            activity_type,
            description: description.into(),
            metadata,
            ip_address: ctx.ip_address.clone(),
            user_agent: ctx.user_agent.clone(),
        };

        if let Err(e) = self.store.append(&entry).await {
            warn!(
                user_id = %ctx.user_id,
                activity_type = %activity_type,
                error = %e,
                "Failed to record activity"
            );
        }
    }

    /// Newest-first entries visible to the caller.
    ///
    /// Non-admins only ever see their own entries.
    pub async fn list(
        &self,
        ctx: &RequestContext,
        req: ActivityListRequest,
    ) -> AppResult<Vec<ActivityLogEntry>> {
        let user_id = if req.all_users {
            ctx.require_admin()?;
            None
        } else {
            match req.user_id {
                Some(id) if id != ctx.user_id => {
                    if !ctx.is_admin() {
                        return Err(AppError::unauthorized(
                            "You can only view your own activity",
                        ));
                    }
                    Some(id)
                }
                _ => Some(ctx.user_id),
            }
        };

        let query = ActivityQuery {
            user_id,
            activity_type: req.activity_type,
            limit: req.limit.unwrap_or(self.default_limit).max(1),
        };
        self.store.list(&query).await
    }
}
