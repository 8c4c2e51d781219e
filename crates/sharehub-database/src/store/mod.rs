//! Entity store traits.
//!
//! Services depend on these traits only; [`Stores`] bundles one
//! implementation of each so a backend can be swapped in a single place.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use sharehub_core::result::AppResult;
use sharehub_core::types::pagination::{PageRequest, PageResponse};
use sharehub_entity::directory::{CreateDirectory, Directory};
use sharehub_entity::file::{CreateFile, File};
use sharehub_entity::share::{CreateAccessLog, CreateShare, ResourceType, Share, ShareAccessLog};
use sharehub_entity::user::UserAccount;

use crate::connection::DatabasePool;
use crate::memory::MemoryStore;
use crate::postgres::{
    PgAccessLogStore, PgDirectoryStore, PgFileStore, PgShareStore, PgUserStore,
};

/// Reachability of whatever backs the stores.
#[async_trait]
pub trait HealthCheck: Send + Sync + 'static {
    /// `Ok(true)` when the backend answers.
    async fn ping(&self) -> AppResult<bool>;
}

/// File metadata rows.
#[async_trait]
pub trait FileStore: Send + Sync + 'static {
    /// Find a file by ID.
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<File>>;

    /// List the files directly inside a directory, ordered by name.
    async fn find_by_directory(&self, directory_id: Uuid) -> AppResult<Vec<File>>;

    /// Find a sibling with the given name (`None` directory is the owner's root).
    async fn find_by_directory_and_name(
        &self,
        owner_id: Uuid,
        directory_id: Option<Uuid>,
        name: &str,
    ) -> AppResult<Option<File>>;

    /// Insert a new file row.
    async fn create(&self, data: &CreateFile) -> AppResult<File>;

    /// Move a file to another directory.
    async fn move_file(
        &self,
        id: Uuid,
        directory_id: Option<Uuid>,
        path: &str,
    ) -> AppResult<File>;

    /// Rewrite the logical path of every file of `owner_id` under `old_prefix`.
    async fn rewrite_path_prefix(
        &self,
        owner_id: Uuid,
        old_prefix: &str,
        new_prefix: &str,
    ) -> AppResult<u64>;

    /// Delete a file row.
    async fn delete(&self, id: Uuid) -> AppResult<bool>;

    /// Sum of `size_bytes` over every file the user owns.
    async fn total_size_by_owner(&self, owner_id: Uuid) -> AppResult<i64>;
}

/// Directory rows and tree queries.
#[async_trait]
pub trait DirectoryStore: Send + Sync + 'static {
    /// Find a directory by ID.
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Directory>>;

    /// Direct children of a directory, ordered by name.
    async fn find_children(&self, parent_id: Uuid) -> AppResult<Vec<Directory>>;

    /// Find a sibling with the given name.
    async fn find_by_parent_and_name(
        &self,
        owner_id: Uuid,
        parent_id: Option<Uuid>,
        name: &str,
    ) -> AppResult<Option<Directory>>;

    /// Every directory below `id` (excluding `id` itself).
    async fn find_descendants(&self, id: Uuid) -> AppResult<Vec<Directory>>;

    /// IDs from `id` up to its top-level ancestor, starting with `id`.
    ///
    /// Fails with an internal error when the chain is longer than
    /// `max_depth`, which also guards against a corrupted cyclic parent
    /// relation.
    async fn ancestor_ids(&self, id: Uuid, max_depth: usize) -> AppResult<Vec<Uuid>>;

    /// Insert a new directory.
    async fn create(&self, data: &CreateDirectory) -> AppResult<Directory>;

    /// Rename a directory in place.
    async fn rename(&self, id: Uuid, name: &str, path: &str) -> AppResult<Directory>;

    /// Re-parent a directory.
    async fn move_directory(
        &self,
        id: Uuid,
        parent_id: Option<Uuid>,
        path: &str,
    ) -> AppResult<Directory>;

    /// Rewrite the path of every directory of `owner_id` strictly under `old_prefix`.
    async fn rewrite_path_prefix(
        &self,
        owner_id: Uuid,
        old_prefix: &str,
        new_prefix: &str,
    ) -> AppResult<u64>;

    /// Delete a directory together with its subtree.
    async fn delete(&self, id: Uuid) -> AppResult<bool>;
}

/// Share link rows.
#[async_trait]
pub trait ShareStore: Send + Sync + 'static {
    /// Find a share by ID.
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Share>>;

    /// Find a share by exact token.
    async fn find_by_token(&self, token: &str) -> AppResult<Option<Share>>;

    /// List a user's shares, newest first (`created_at DESC, id DESC`).
    async fn find_by_owner(
        &self,
        owner_id: Uuid,
        resource_type: Option<ResourceType>,
        page: &PageRequest,
    ) -> AppResult<PageResponse<Share>>;

    /// Insert a new share.
    async fn create(&self, data: &CreateShare) -> AppResult<Share>;

    /// Replace the expiration timestamp.
    async fn update_expiration(
        &self,
        id: Uuid,
        expires_at: Option<DateTime<Utc>>,
    ) -> AppResult<Share>;

    /// Atomically bump the access counter, returning the new value.
    async fn increment_access_count(&self, id: Uuid) -> AppResult<i64>;

    /// Delete a share.
    async fn delete(&self, id: Uuid) -> AppResult<bool>;

    /// Delete every share pointing at a resource.
    async fn delete_by_resource(
        &self,
        resource_type: ResourceType,
        resource_id: Uuid,
    ) -> AppResult<u64>;
}

/// Append-only share access log.
#[async_trait]
pub trait AccessLogStore: Send + Sync + 'static {
    /// Append an entry.
    async fn append(&self, data: &CreateAccessLog) -> AppResult<ShareAccessLog>;

    /// Most recent entries for a share, newest first.
    async fn find_by_share(&self, share_id: Uuid, limit: i64) -> AppResult<Vec<ShareAccessLog>>;
}

/// User accounts.
#[async_trait]
pub trait UserStore: Send + Sync + 'static {
    /// Find a user by ID.
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<UserAccount>>;
}

/// One implementation of every entity store.
#[derive(Clone)]
pub struct Stores {
    /// Liveness of the backing database.
    pub health: Arc<dyn HealthCheck>,
    /// File rows.
    pub files: Arc<dyn FileStore>,
    /// Directory rows.
    pub directories: Arc<dyn DirectoryStore>,
    /// Share rows.
    pub shares: Arc<dyn ShareStore>,
    /// Share access log.
    pub access_logs: Arc<dyn AccessLogStore>,
    /// User accounts.
    pub users: Arc<dyn UserStore>,
}

impl Stores {
    /// PostgreSQL-backed stores sharing one pool.
    pub fn postgres(db: &DatabasePool) -> Self {
        let pool = db.pool().clone();
        Self {
            health: Arc::new(db.clone()),
            files: Arc::new(PgFileStore::new(pool.clone())),
            directories: Arc::new(PgDirectoryStore::new(pool.clone())),
            shares: Arc::new(PgShareStore::new(pool.clone())),
            access_logs: Arc::new(PgAccessLogStore::new(pool.clone())),
            users: Arc::new(PgUserStore::new(pool)),
        }
    }

    /// In-process stores backed by a single [`MemoryStore`].
    pub fn memory(store: Arc<MemoryStore>) -> Self {
        Self {
            health: store.clone(),
            files: store.clone(),
            directories: store.clone(),
            shares: store.clone(),
            access_logs: store.clone(),
            users: store,
        }
    }

    /// Whether the backing database answers, logging a failed ping.
    pub async fn is_healthy(&self) -> bool {
        match self.health.ping().await {
            Ok(ok) => ok,
            Err(e) => {
                tracing::warn!(error = %e, "Database health check failed");
                false
            }
        }
    }
}

impl std::fmt::Debug for Stores {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stores").finish_non_exhaustive()
    }
}
