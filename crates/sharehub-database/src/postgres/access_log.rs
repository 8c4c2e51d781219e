//! Share access log backed by PostgreSQL.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use sharehub_core::error::{AppError, ErrorKind};
use sharehub_core::result::AppResult;
use sharehub_entity::share::{CreateAccessLog, ShareAccessLog};

use crate::store::AccessLogStore;

/// Append-only repository for share access entries.
#[derive(Debug, Clone)]
pub struct PgAccessLogStore {
    pool: PgPool,
}

impl PgAccessLogStore {
    /// Create a new access log store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccessLogStore for PgAccessLogStore {
    async fn append(&self, data: &CreateAccessLog) -> AppResult<ShareAccessLog> {
        sqlx::query_as::<_, ShareAccessLog>(
            "INSERT INTO share_access_logs (share_id, action, ip_address, user_agent, file_name) \
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(data.share_id)
        .bind(data.action)
        .bind(&data.ip_address)
        .bind(&data.user_agent)
        .bind(&data.file_name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to append access log", e))
    }

    async fn find_by_share(&self, share_id: Uuid, limit: i64) -> AppResult<Vec<ShareAccessLog>> {
        sqlx::query_as::<_, ShareAccessLog>(
            "SELECT * FROM share_access_logs WHERE share_id = $1 \
             ORDER BY accessed_at DESC, id DESC LIMIT $2",
        )
        .bind(share_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list access log", e))
    }
}
