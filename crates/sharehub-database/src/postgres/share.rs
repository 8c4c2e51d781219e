//! Share store backed by PostgreSQL.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use sharehub_core::error::{AppError, ErrorKind};
use sharehub_core::result::AppResult;
use sharehub_core::types::pagination::{PageRequest, PageResponse};
use sharehub_entity::share::{CreateShare, ResourceType, Share};

use super::map_unique;
use crate::store::ShareStore;

/// Repository for share CRUD and token lookup operations.
#[derive(Debug, Clone)]
pub struct PgShareStore {
    pool: PgPool,
}

impl PgShareStore {
    /// Create a new share store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ShareStore for PgShareStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Share>> {
        sqlx::query_as::<_, Share>("SELECT * FROM shares WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find share", e))
    }

    async fn find_by_token(&self, token: &str) -> AppResult<Option<Share>> {
        sqlx::query_as::<_, Share>("SELECT * FROM shares WHERE token = $1")
            .bind(token)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find share by token", e)
            })
    }

    async fn find_by_owner(
        &self,
        owner_id: Uuid,
        resource_type: Option<ResourceType>,
        page: &PageRequest,
    ) -> AppResult<PageResponse<Share>> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM shares WHERE owner_id = $1 \
             AND ($2::resource_type IS NULL OR resource_type = $2)",
        )
        .bind(owner_id)
        .bind(resource_type)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count shares", e))?;

        let shares = sqlx::query_as::<_, Share>(
            "SELECT * FROM shares WHERE owner_id = $1 \
             AND ($2::resource_type IS NULL OR resource_type = $2) \
             ORDER BY created_at DESC, id DESC LIMIT $3 OFFSET $4",
        )
        .bind(owner_id)
        .bind(resource_type)
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list shares", e))?;

        Ok(PageResponse::new(shares, *page, total as u64))
    }

    async fn create(&self, data: &CreateShare) -> AppResult<Share> {
        sqlx::query_as::<_, Share>(
            "INSERT INTO shares (owner_id, resource_type, resource_id, permission_type, token, \
             password_hash, expires_at) VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
        )
        .bind(data.owner_id)
        .bind(data.resource_type)
        .bind(data.resource_id)
        .bind(data.permission_type)
        .bind(&data.token)
        .bind(&data.password_hash)
        .bind(data.expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            map_unique(
                e,
                "shares_token_key",
                || "Share token collision".to_string(),
                "Failed to create share",
            )
        })
    }

    async fn update_expiration(
        &self,
        id: Uuid,
        expires_at: Option<DateTime<Utc>>,
    ) -> AppResult<Share> {
        sqlx::query_as::<_, Share>(
            "UPDATE shares SET expires_at = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(expires_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to update share", e))?
        .ok_or_else(|| AppError::not_found(format!("Share {id} not found")))
    }

    async fn increment_access_count(&self, id: Uuid) -> AppResult<i64> {
        let row: (i64,) = sqlx::query_as(
            "UPDATE shares SET access_count = access_count + 1 WHERE id = $1 RETURNING access_count",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to increment access count", e)
        })?;
        Ok(row.0)
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM shares WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to delete share", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_by_resource(
        &self,
        resource_type: ResourceType,
        resource_id: Uuid,
    ) -> AppResult<u64> {
        let result =
            sqlx::query("DELETE FROM shares WHERE resource_type = $1 AND resource_id = $2")
                .bind(resource_type)
                .bind(resource_id)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to delete shares", e)
                })?;
        Ok(result.rows_affected())
    }
}
