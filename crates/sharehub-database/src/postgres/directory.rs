//! Directory store backed by PostgreSQL.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use sharehub_core::error::{AppError, ErrorKind};
use sharehub_core::result::AppResult;
use sharehub_entity::directory::{CreateDirectory, Directory};

use super::map_unique;
use crate::store::DirectoryStore;

/// Repository for directory rows and tree queries.
#[derive(Debug, Clone)]
pub struct PgDirectoryStore {
    pool: PgPool,
}

impl PgDirectoryStore {
    /// Create a new directory store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DirectoryStore for PgDirectoryStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Directory>> {
        sqlx::query_as::<_, Directory>("SELECT * FROM directories WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find directory", e))
    }

    async fn find_children(&self, parent_id: Uuid) -> AppResult<Vec<Directory>> {
        sqlx::query_as::<_, Directory>(
            "SELECT * FROM directories WHERE parent_id = $1 ORDER BY name ASC, id ASC",
        )
        .bind(parent_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list children", e))
    }

    async fn find_by_parent_and_name(
        &self,
        owner_id: Uuid,
        parent_id: Option<Uuid>,
        name: &str,
    ) -> AppResult<Option<Directory>> {
        sqlx::query_as::<_, Directory>(
            "SELECT * FROM directories WHERE owner_id = $1 \
             AND parent_id IS NOT DISTINCT FROM $2 AND name = $3",
        )
        .bind(owner_id)
        .bind(parent_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find directory by name", e)
        })
    }

    async fn find_descendants(&self, id: Uuid) -> AppResult<Vec<Directory>> {
        // UNION (not UNION ALL) so a corrupted cycle terminates.
        sqlx::query_as::<_, Directory>(
            "WITH RECURSIVE tree AS ( \
                SELECT * FROM directories WHERE id = $1 \
                UNION \
                SELECT d.* FROM directories d INNER JOIN tree t ON d.parent_id = t.id \
             ) SELECT * FROM tree WHERE id != $1 ORDER BY path ASC",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list descendants", e))
    }

    async fn ancestor_ids(&self, id: Uuid, max_depth: usize) -> AppResult<Vec<Uuid>> {
        let limit = i32::try_from(max_depth).unwrap_or(i32::MAX);
        let ids: Vec<Uuid> = sqlx::query_scalar(
            "WITH RECURSIVE ancestors AS ( \
                SELECT id, parent_id, 1 AS level FROM directories WHERE id = $1 \
                UNION ALL \
                SELECT d.id, d.parent_id, a.level + 1 FROM directories d \
                INNER JOIN ancestors a ON d.id = a.parent_id WHERE a.level <= $2 \
             ) SELECT id FROM ancestors ORDER BY level ASC",
        )
        .bind(id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find ancestors", e))?;

        if ids.len() > max_depth {
            return Err(AppError::internal(format!(
                "Directory {id} is nested deeper than {max_depth} levels"
            )));
        }
        Ok(ids)
    }

    async fn create(&self, data: &CreateDirectory) -> AppResult<Directory> {
        sqlx::query_as::<_, Directory>(
            "INSERT INTO directories (owner_id, parent_id, name, path) \
             VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(data.owner_id)
        .bind(data.parent_id)
        .bind(&data.name)
        .bind(&data.path)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            map_unique(
                e,
                "directories_owner_path_key",
                || format!("Directory path '{}' already exists", data.path),
                "Failed to create directory",
            )
        })
    }

    async fn rename(&self, id: Uuid, name: &str, path: &str) -> AppResult<Directory> {
        sqlx::query_as::<_, Directory>(
            "UPDATE directories SET name = $2, path = $3, updated_at = NOW() \
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(name)
        .bind(path)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            map_unique(
                e,
                "directories_owner_path_key",
                || format!("Directory path '{path}' already exists"),
                "Failed to rename directory",
            )
        })?
        .ok_or_else(|| AppError::not_found(format!("Directory {id} not found")))
    }

    async fn move_directory(
        &self,
        id: Uuid,
        parent_id: Option<Uuid>,
        path: &str,
    ) -> AppResult<Directory> {
        sqlx::query_as::<_, Directory>(
            "UPDATE directories SET parent_id = $2, path = $3, updated_at = NOW() \
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(parent_id)
        .bind(path)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            map_unique(
                e,
                "directories_owner_path_key",
                || format!("Directory path '{path}' already exists"),
                "Failed to move directory",
            )
        })?
        .ok_or_else(|| AppError::not_found(format!("Directory {id} not found")))
    }

    async fn rewrite_path_prefix(
        &self,
        owner_id: Uuid,
        old_prefix: &str,
        new_prefix: &str,
    ) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE directories SET path = $3 || substring(path FROM char_length($2) + 1), \
             updated_at = NOW() WHERE owner_id = $1 AND starts_with(path, $2 || '/')",
        )
        .bind(owner_id)
        .bind(old_prefix)
        .bind(new_prefix)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to rewrite directory paths", e)
        })?;
        Ok(result.rows_affected())
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM directories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to delete directory", e)
            })?;
        Ok(result.rows_affected() > 0)
    }
}
