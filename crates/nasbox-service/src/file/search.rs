//! Name search over the caller's own records.

use std::sync::Arc;

use nasbox_core::error::AppError;
use nasbox_core::result::AppResult;
use nasbox_database::store::MetadataStore;
use nasbox_entity::metadata::{MetadataRecord, SearchKind};

use crate::context::RequestContext;

/// Search request parameters.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct SearchRequest {
    /// Substring matched case-insensitively against names.
    pub query: String,
    /// Restrict to files or folders.
    pub kind: SearchKind,
    /// Maximum results (configured default when absent).
    pub limit: Option<u32>,
}

/// Case-insensitive name search.
#[derive(Debug, Clone)]
pub struct SearchService {
    /// File and folder records.
    metadata: Arc<dyn MetadataStore>,
    /// Limit applied when a request does not name one.
    default_limit: u32,
}

impl SearchService {
    /// Creates a new search service.
    pub fn new(metadata: Arc<dyn MetadataStore>, default_limit: u32) -> Self {
        Self {
            metadata,
            default_limit,
        }
    }

    /// Records owned by the caller whose name contains the query, newest
    /// first.
    pub async fn search(
        &self,
        ctx: &RequestContext,
        req: SearchRequest,
    ) -> AppResult<Vec<MetadataRecord>> {
        let query = req.query.trim();
        if query.is_empty() {
            return Err(AppError::validation("Search query is required"));
        }

        let limit = req.limit.unwrap_or(self.default_limit).max(1);
        self.metadata
            .search(ctx.user_id, query, req.kind, limit)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nasbox_database::memory::MemoryMetadataStore;
    use nasbox_entity::file::NewFileRecord;
    use nasbox_entity::user::UserRole;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_search_is_scoped_to_caller() {
        let store = Arc::new(MemoryMetadataStore::new());
        let alice = RequestContext::new(Uuid::new_v4(), UserRole::User);
        let bob = RequestContext::new(Uuid::new_v4(), UserRole::User);
        for owner in [alice.user_id, bob.user_id] {
            store
                .upsert_file(&NewFileRecord {
                    owner_id: owner,
                    path: "Budget.xlsx".into(),
                    filename: "Budget.xlsx".into(),
                    mime_type: "application/vnd.ms-excel".into(),
                    size_bytes: 10,
                })
                .await
                .unwrap();
        }

        let service = SearchService::new(store, 50);
        let hits = service
            .search(
                &alice,
                SearchRequest {
                    query: "budget".into(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        match &hits[0] {
            MetadataRecord::File(file) => assert_eq!(file.owner_id, alice.user_id),
            other => panic!("unexpected record {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_blank_query_is_rejected() {
        let service = SearchService::new(Arc::new(MemoryMetadataStore::new()), 50);
        let ctx = RequestContext::new(Uuid::new_v4(), UserRole::User);
        let req = SearchRequest {
            query: "  ".into(),
            ..Default::default()
        };
        assert!(service.search(&ctx, req).await.is_err());
    }
}
