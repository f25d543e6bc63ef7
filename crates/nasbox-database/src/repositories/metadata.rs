//! File and folder metadata repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use nasbox_core::error::{AppError, ErrorKind};
use nasbox_core::result::AppResult;
use nasbox_entity::file::{FileRecord, NewFileRecord};
use nasbox_entity::folder::{FolderRecord, NewFolderRecord};
use nasbox_entity::metadata::{MetadataRecord, SearchKind};

use super::{contains_pattern, descendant_pattern};
use crate::store::MetadataStore;

/// PostgreSQL-backed [`MetadataStore`] over the `files` and `folders` tables.
#[derive(Debug, Clone)]
pub struct MetadataRepository {
    pool: PgPool,
}

impl MetadataRepository {
    /// Create a new metadata repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn db_err(context: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| AppError::with_source(ErrorKind::Database, context, e)
}

fn merge(files: Vec<FileRecord>, folders: Vec<FolderRecord>) -> Vec<MetadataRecord> {
    folders
        .into_iter()
        .map(MetadataRecord::Folder)
        .chain(files.into_iter().map(MetadataRecord::File))
        .collect()
}

#[async_trait]
impl MetadataStore for MetadataRepository {
    async fn upsert_file(&self, data: &NewFileRecord) -> AppResult<FileRecord> {
        sqlx::query_as::<_, FileRecord>(
            "INSERT INTO files (owner_id, path, filename, mime_type, size_bytes) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (owner_id, path) DO UPDATE SET \
                filename = EXCLUDED.filename, \
                mime_type = EXCLUDED.mime_type, \
                size_bytes = EXCLUDED.size_bytes, \
                updated_at = NOW() \
             RETURNING *",
        )
        .bind(data.owner_id)
        .bind(&data.path)
        .bind(&data.filename)
        .bind(&data.mime_type)
        .bind(data.size_bytes)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err("Failed to upsert file record"))
    }

    async fn upsert_folder(&self, data: &NewFolderRecord) -> AppResult<FolderRecord> {
        sqlx::query_as::<_, FolderRecord>(
            "INSERT INTO folders (owner_id, path, name) VALUES ($1, $2, $3) \
             ON CONFLICT (owner_id, path) DO UPDATE SET \
                name = EXCLUDED.name, \
                updated_at = NOW() \
             RETURNING *",
        )
        .bind(data.owner_id)
        .bind(&data.path)
        .bind(&data.name)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err("Failed to upsert folder record"))
    }

    async fn find_by_path(&self, owner_id: Uuid, path: &str) -> AppResult<Option<MetadataRecord>> {
        if let Some(file) = self.find_file(owner_id, path).await? {
            return Ok(Some(MetadataRecord::File(file)));
        }
        Ok(self
            .find_folder(owner_id, path)
            .await?
            .map(MetadataRecord::Folder))
    }

    async fn find_file(&self, owner_id: Uuid, path: &str) -> AppResult<Option<FileRecord>> {
        sqlx::query_as::<_, FileRecord>("SELECT * FROM files WHERE owner_id = $1 AND path = $2")
            .bind(owner_id)
            .bind(path)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("Failed to find file by path"))
    }

    async fn find_folder(&self, owner_id: Uuid, path: &str) -> AppResult<Option<FolderRecord>> {
        sqlx::query_as::<_, FolderRecord>(
            "SELECT * FROM folders WHERE owner_id = $1 AND path = $2",
        )
        .bind(owner_id)
        .bind(path)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err("Failed to find folder by path"))
    }

    async fn find_file_by_id(&self, id: Uuid) -> AppResult<Option<FileRecord>> {
        sqlx::query_as::<_, FileRecord>("SELECT * FROM files WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("Failed to find file"))
    }

    async fn find_folder_by_id(&self, id: Uuid) -> AppResult<Option<FolderRecord>> {
        sqlx::query_as::<_, FolderRecord>("SELECT * FROM folders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("Failed to find folder"))
    }

    async fn list_by_prefix(&self, owner_id: Uuid, prefix: &str) -> AppResult<Vec<MetadataRecord>> {
        // Children start right after "prefix/" and contain no further '/'.
        let pattern = descendant_pattern(prefix);
        let tail_start = if prefix.is_empty() {
            1
        } else {
            prefix.chars().count() as i32 + 2
        };

        let folders = sqlx::query_as::<_, FolderRecord>(
            "SELECT * FROM folders WHERE owner_id = $1 AND path LIKE $2 ESCAPE '\\' \
             AND position('/' in substr(path, $3)) = 0 ORDER BY name ASC",
        )
        .bind(owner_id)
        .bind(&pattern)
        .bind(tail_start)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to list child folders"))?;

        let files = sqlx::query_as::<_, FileRecord>(
            "SELECT * FROM files WHERE owner_id = $1 AND path LIKE $2 ESCAPE '\\' \
             AND position('/' in substr(path, $3)) = 0 ORDER BY filename ASC",
        )
        .bind(owner_id)
        .bind(&pattern)
        .bind(tail_start)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to list child files"))?;

        Ok(merge(files, folders))
    }

    async fn list_subtree(&self, owner_id: Uuid, prefix: &str) -> AppResult<Vec<MetadataRecord>> {
        let pattern = descendant_pattern(prefix);

        let folders = sqlx::query_as::<_, FolderRecord>(
            "SELECT * FROM folders WHERE owner_id = $1 \
             AND (path = $2 OR path LIKE $3 ESCAPE '\\') ORDER BY path ASC",
        )
        .bind(owner_id)
        .bind(prefix)
        .bind(&pattern)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to list folder subtree"))?;

        let files = sqlx::query_as::<_, FileRecord>(
            "SELECT * FROM files WHERE owner_id = $1 \
             AND (path = $2 OR path LIKE $3 ESCAPE '\\') ORDER BY path ASC",
        )
        .bind(owner_id)
        .bind(prefix)
        .bind(&pattern)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to list file subtree"))?;

        Ok(merge(files, folders))
    }

    async fn rename_path(
        &self,
        owner_id: Uuid,
        old_path: &str,
        new_path: &str,
        new_name: &str,
    ) -> AppResult<u64> {
        if old_path.is_empty() {
            return Err(AppError::validation("The owner root cannot be renamed"));
        }
        let pattern = descendant_pattern(old_path);
        let tail_start = old_path.chars().count() as i32 + 1;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_err("Failed to begin transaction"))?;

        let folders = sqlx::query(
            "UPDATE folders SET \
                path = $3 || substr(path, $4), \
                name = CASE WHEN path = $2 THEN $5 ELSE name END, \
                updated_at = NOW() \
             WHERE owner_id = $1 AND (path = $2 OR path LIKE $6 ESCAPE '\\')",
        )
        .bind(owner_id)
        .bind(old_path)
        .bind(new_path)
        .bind(tail_start)
        .bind(new_name)
        .bind(&pattern)
        .execute(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db)
                if db.constraint() == Some("folders_owner_path_key") =>
            {
                AppError::already_exists(format!("Folder path '{new_path}' already exists"))
            }
            _ => AppError::with_source(ErrorKind::Database, "Failed to rename folders", e),
        })?;

        let files = sqlx::query(
            "UPDATE files SET \
                path = $3 || substr(path, $4), \
                filename = CASE WHEN path = $2 THEN $5 ELSE filename END, \
                updated_at = NOW() \
             WHERE owner_id = $1 AND (path = $2 OR path LIKE $6 ESCAPE '\\')",
        )
        .bind(owner_id)
        .bind(old_path)
        .bind(new_path)
        .bind(tail_start)
        .bind(new_name)
        .bind(&pattern)
        .execute(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.constraint() == Some("files_owner_path_key") => {
                AppError::already_exists(format!("File path '{new_path}' already exists"))
            }
            _ => AppError::with_source(ErrorKind::Database, "Failed to rename files", e),
        })?;

        tx.commit()
            .await
            .map_err(db_err("Failed to commit rename"))?;

        Ok(folders.rows_affected() + files.rows_affected())
    }

    async fn delete_by_path(&self, owner_id: Uuid, path: &str) -> AppResult<u64> {
        let pattern = descendant_pattern(path);
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_err("Failed to begin transaction"))?;

        let files = sqlx::query(
            "DELETE FROM files WHERE owner_id = $1 AND (path = $2 OR path LIKE $3 ESCAPE '\\')",
        )
        .bind(owner_id)
        .bind(path)
        .bind(&pattern)
        .execute(&mut *tx)
        .await
        .map_err(db_err("Failed to delete file records"))?;

        let folders = sqlx::query(
            "DELETE FROM folders WHERE owner_id = $1 AND (path = $2 OR path LIKE $3 ESCAPE '\\')",
        )
        .bind(owner_id)
        .bind(path)
        .bind(&pattern)
        .execute(&mut *tx)
        .await
        .map_err(db_err("Failed to delete folder records"))?;

        tx.commit()
            .await
            .map_err(db_err("Failed to commit delete"))?;

        Ok(files.rows_affected() + folders.rows_affected())
    }

    async fn refresh_file(
        &self,
        id: Uuid,
        size_bytes: i64,
        updated_at: DateTime<Utc>,
    ) -> AppResult<()> {
        sqlx::query("UPDATE files SET size_bytes = $2, updated_at = $3 WHERE id = $1")
            .bind(id)
            .bind(size_bytes)
            .bind(updated_at)
            .execute(&self.pool)
            .await
            .map_err(db_err("Failed to refresh file record"))?;
        Ok(())
    }

    async fn search(
        &self,
        owner_id: Uuid,
        query: &str,
        kind: SearchKind,
        limit: u32,
    ) -> AppResult<Vec<MetadataRecord>> {
        let pattern = contains_pattern(query);
        let limit = i64::from(limit);

        let files = if kind.includes_files() {
            sqlx::query_as::<_, FileRecord>(
                "SELECT * FROM files WHERE owner_id = $1 AND filename ILIKE $2 ESCAPE '\\' \
                 ORDER BY created_at DESC LIMIT $3",
            )
            .bind(owner_id)
            .bind(&pattern)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err("Failed to search files"))?
        } else {
            Vec::new()
        };

        let folders = if kind.includes_folders() {
            sqlx::query_as::<_, FolderRecord>(
                "SELECT * FROM folders WHERE owner_id = $1 AND name ILIKE $2 ESCAPE '\\' \
                 ORDER BY created_at DESC LIMIT $3",
            )
            .bind(owner_id)
            .bind(&pattern)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err("Failed to search folders"))?
        } else {
            Vec::new()
        };

        let mut hits = merge(files, folders);
        hits.sort_by_key(|r| std::cmp::Reverse(r.created_at()));
        hits.truncate(limit as usize);
        Ok(hits)
    }
}
