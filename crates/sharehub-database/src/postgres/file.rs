//! File store backed by PostgreSQL.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use sharehub_core::error::{AppError, ErrorKind};
use sharehub_core::result::AppResult;
use sharehub_entity::file::{CreateFile, File};

use super::map_unique;
use crate::store::FileStore;

/// Repository for file metadata rows.
#[derive(Debug, Clone)]
pub struct PgFileStore {
    pool: PgPool,
}

impl PgFileStore {
    /// Create a new file store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FileStore for PgFileStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<File>> {
        sqlx::query_as::<_, File>("SELECT * FROM files WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find file", e))
    }

    async fn find_by_directory(&self, directory_id: Uuid) -> AppResult<Vec<File>> {
        sqlx::query_as::<_, File>(
            "SELECT * FROM files WHERE directory_id = $1 ORDER BY name ASC, id ASC",
        )
        .bind(directory_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list files", e))
    }

    async fn find_by_directory_and_name(
        &self,
        owner_id: Uuid,
        directory_id: Option<Uuid>,
        name: &str,
    ) -> AppResult<Option<File>> {
        sqlx::query_as::<_, File>(
            "SELECT * FROM files WHERE owner_id = $1 \
             AND directory_id IS NOT DISTINCT FROM $2 AND name = $3",
        )
        .bind(owner_id)
        .bind(directory_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find file by name", e))
    }

    async fn create(&self, data: &CreateFile) -> AppResult<File> {
        sqlx::query_as::<_, File>(
            "INSERT INTO files (id, owner_id, name, storage_key, size_bytes, mime_type, \
             directory_id, path) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING *",
        )
        .bind(data.id)
        .bind(data.owner_id)
        .bind(&data.name)
        .bind(&data.storage_key)
        .bind(data.size_bytes)
        .bind(&data.mime_type)
        .bind(data.directory_id)
        .bind(&data.path)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            map_unique(
                e,
                "files_owner_path_key",
                || format!("A file already exists at '{}'", data.path),
                "Failed to create file",
            )
        })
    }

    async fn move_file(
        &self,
        id: Uuid,
        directory_id: Option<Uuid>,
        path: &str,
    ) -> AppResult<File> {
        sqlx::query_as::<_, File>(
            "UPDATE files SET directory_id = $2, path = $3, updated_at = NOW() \
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(directory_id)
        .bind(path)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            map_unique(
                e,
                "files_owner_path_key",
                || format!("A file already exists at '{path}'"),
                "Failed to move file",
            )
        })?
        .ok_or_else(|| AppError::not_found(format!("File {id} not found")))
    }

    async fn rewrite_path_prefix(
        &self,
        owner_id: Uuid,
        old_prefix: &str,
        new_prefix: &str,
    ) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE files SET path = $3 || substring(path FROM char_length($2) + 1), \
             updated_at = NOW() WHERE owner_id = $1 AND starts_with(path, $2 || '/')",
        )
        .bind(owner_id)
        .bind(old_prefix)
        .bind(new_prefix)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to rewrite file paths", e))?;
        Ok(result.rows_affected())
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM files WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to delete file", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn total_size_by_owner(&self, owner_id: Uuid) -> AppResult<i64> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(SUM(size_bytes), 0)::BIGINT FROM files WHERE owner_id = $1",
        )
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to sum file sizes", e))
    }
}
