//! In-process entity store.
//!
//! Backs every store trait with process memory. Used by the test suites
//! and for running the server without PostgreSQL. Unique constraints of the
//! SQL schema are mirrored: file/directory paths per owner and share tokens.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::RwLock;
use uuid::Uuid;

use sharehub_core::error::AppError;
use sharehub_core::result::AppResult;
use sharehub_core::types::pagination::{PageRequest, PageResponse};
use sharehub_entity::directory::{CreateDirectory, Directory};
use sharehub_entity::file::{CreateFile, File};
use sharehub_entity::share::{CreateAccessLog, CreateShare, ResourceType, Share, ShareAccessLog};
use sharehub_entity::user::UserAccount;

use crate::store::{
    AccessLogStore, DirectoryStore, FileStore, HealthCheck, ShareStore, UserStore,
};

#[derive(Debug, Default)]
struct Tree {
    files: HashMap<Uuid, File>,
    directories: HashMap<Uuid, Directory>,
}

impl Tree {
    fn file_path_taken(&self, owner_id: Uuid, path: &str, except: Option<Uuid>) -> bool {
        self.files
            .values()
            .any(|f| f.owner_id == owner_id && f.path == path && Some(f.id) != except)
    }

    fn directory_path_taken(&self, owner_id: Uuid, path: &str, except: Option<Uuid>) -> bool {
        self.directories
            .values()
            .any(|d| d.owner_id == owner_id && d.path == path && Some(d.id) != except)
    }

    /// IDs of `root` and everything below it, breadth first.
    fn subtree_ids(&self, root: Uuid) -> Vec<Uuid> {
        let mut seen = HashSet::from([root]);
        let mut order = vec![root];
        let mut i = 0;
        while i < order.len() {
            let current = order[i];
            for dir in self.directories.values() {
                if dir.parent_id == Some(current) && seen.insert(dir.id) {
                    order.push(dir.id);
                }
            }
            i += 1;
        }
        order
    }
}

fn rewrite(path: &str, old_prefix: &str, new_prefix: &str) -> Option<String> {
    path.strip_prefix(old_prefix)
        .filter(|rest| rest.starts_with('/'))
        .map(|rest| format!("{new_prefix}{rest}"))
}

/// Process-memory implementation of every entity store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tree: RwLock<Tree>,
    shares: DashMap<Uuid, Share>,
    share_tokens: DashMap<String, Uuid>,
    access_logs: RwLock<Vec<ShareAccessLog>>,
    users: DashMap<Uuid, UserAccount>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user account.
    pub fn insert_user(&self, user: UserAccount) {
        self.users.insert(user.id, user);
    }
}

#[async_trait]
impl HealthCheck for MemoryStore {
    async fn ping(&self) -> AppResult<bool> {
        Ok(true)
    }
}

#[async_trait]
impl FileStore for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<File>> {
        Ok(self.tree.read().await.files.get(&id).cloned())
    }

    async fn find_by_directory(&self, directory_id: Uuid) -> AppResult<Vec<File>> {
        let tree = self.tree.read().await;
        let mut files: Vec<File> = tree
            .files
            .values()
            .filter(|f| f.directory_id == Some(directory_id))
            .cloned()
            .collect();
        files.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(files)
    }

    async fn find_by_directory_and_name(
        &self,
        owner_id: Uuid,
        directory_id: Option<Uuid>,
        name: &str,
    ) -> AppResult<Option<File>> {
        let tree = self.tree.read().await;
        Ok(tree
            .files
            .values()
            .find(|f| f.owner_id == owner_id && f.directory_id == directory_id && f.name == name)
            .cloned())
    }

    async fn create(&self, data: &CreateFile) -> AppResult<File> {
        let mut tree = self.tree.write().await;
        if tree.file_path_taken(data.owner_id, &data.path, None) {
            return Err(AppError::conflict(format!(
                "A file already exists at '{}'",
                data.path
            )));
        }
        if tree.files.values().any(|f| f.storage_key == data.storage_key) {
            return Err(AppError::database("Duplicate storage key"));
        }
        let now = Utc::now();
        let file = File {
            id: data.id,
            owner_id: data.owner_id,
            name: data.name.clone(),
            storage_key: data.storage_key.clone(),
            size_bytes: data.size_bytes,
            mime_type: data.mime_type.clone(),
            directory_id: data.directory_id,
            path: data.path.clone(),
            created_at: now,
            updated_at: now,
        };
        tree.files.insert(file.id, file.clone());
        Ok(file)
    }

    async fn move_file(
        &self,
        id: Uuid,
        directory_id: Option<Uuid>,
        path: &str,
    ) -> AppResult<File> {
        let mut tree = self.tree.write().await;
        let owner_id = tree
            .files
            .get(&id)
            .map(|f| f.owner_id)
            .ok_or_else(|| AppError::not_found(format!("File {id} not found")))?;
        if tree.file_path_taken(owner_id, path, Some(id)) {
            return Err(AppError::conflict(format!("A file already exists at '{path}'")));
        }
        let file = tree
            .files
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("File {id} not found")))?;
        file.directory_id = directory_id;
        file.path = path.to_string();
        file.updated_at = Utc::now();
        Ok(file.clone())
    }

    async fn rewrite_path_prefix(
        &self,
        owner_id: Uuid,
        old_prefix: &str,
        new_prefix: &str,
    ) -> AppResult<u64> {
        let mut tree = self.tree.write().await;
        let mut count = 0;
        for file in tree.files.values_mut().filter(|f| f.owner_id == owner_id) {
            if let Some(path) = rewrite(&file.path, old_prefix, new_prefix) {
                file.path = path;
                file.updated_at = Utc::now();
                count += 1;
            }
        }
        Ok(count)
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        Ok(self.tree.write().await.files.remove(&id).is_some())
    }

    async fn total_size_by_owner(&self, owner_id: Uuid) -> AppResult<i64> {
        let tree = self.tree.read().await;
        Ok(tree
            .files
            .values()
            .filter(|f| f.owner_id == owner_id)
            .map(|f| f.size_bytes)
            .sum())
    }
}

#[async_trait]
impl DirectoryStore for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Directory>> {
        Ok(self.tree.read().await.directories.get(&id).cloned())
    }

    async fn find_children(&self, parent_id: Uuid) -> AppResult<Vec<Directory>> {
        let tree = self.tree.read().await;
        let mut children: Vec<Directory> = tree
            .directories
            .values()
            .filter(|d| d.parent_id == Some(parent_id))
            .cloned()
            .collect();
        children.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(children)
    }

    async fn find_by_parent_and_name(
        &self,
        owner_id: Uuid,
        parent_id: Option<Uuid>,
        name: &str,
    ) -> AppResult<Option<Directory>> {
        let tree = self.tree.read().await;
        Ok(tree
            .directories
            .values()
            .find(|d| d.owner_id == owner_id && d.parent_id == parent_id && d.name == name)
            .cloned())
    }

    async fn find_descendants(&self, id: Uuid) -> AppResult<Vec<Directory>> {
        let tree = self.tree.read().await;
        let mut found: Vec<Directory> = tree
            .subtree_ids(id)
            .into_iter()
            .filter(|d| *d != id)
            .filter_map(|d| tree.directories.get(&d).cloned())
            .collect();
        found.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(found)
    }

    async fn ancestor_ids(&self, id: Uuid, max_depth: usize) -> AppResult<Vec<Uuid>> {
        let tree = self.tree.read().await;
        let mut chain = Vec::new();
        let mut visited = HashSet::new();
        let mut current = tree.directories.get(&id);
        while let Some(dir) = current {
            if !visited.insert(dir.id) {
                return Err(AppError::internal(format!(
                    "Cycle detected in ancestry of directory {id}"
                )));
            }
            chain.push(dir.id);
            if chain.len() > max_depth {
                return Err(AppError::internal(format!(
                    "Directory {id} is nested deeper than {max_depth} levels"
                )));
            }
            current = dir.parent_id.and_then(|p| tree.directories.get(&p));
        }
        Ok(chain)
    }

    async fn create(&self, data: &CreateDirectory) -> AppResult<Directory> {
        let mut tree = self.tree.write().await;
        if tree.directory_path_taken(data.owner_id, &data.path, None) {
            return Err(AppError::conflict(format!(
                "Directory path '{}' already exists",
                data.path
            )));
        }
        let now = Utc::now();
        let dir = Directory {
            id: Uuid::new_v4(),
            owner_id: data.owner_id,
            name: data.name.clone(),
            parent_id: data.parent_id,
            path: data.path.clone(),
            created_at: now,
            updated_at: now,
        };
        tree.directories.insert(dir.id, dir.clone());
        Ok(dir)
    }

    async fn rename(&self, id: Uuid, name: &str, path: &str) -> AppResult<Directory> {
        let mut tree = self.tree.write().await;
        let owner_id = tree
            .directories
            .get(&id)
            .map(|d| d.owner_id)
            .ok_or_else(|| AppError::not_found(format!("Directory {id} not found")))?;
        if tree.directory_path_taken(owner_id, path, Some(id)) {
            return Err(AppError::conflict(format!(
                "Directory path '{path}' already exists"
            )));
        }
        let dir = tree
            .directories
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Directory {id} not found")))?;
        dir.name = name.to_string();
        dir.path = path.to_string();
        dir.updated_at = Utc::now();
        Ok(dir.clone())
    }

    async fn move_directory(
        &self,
        id: Uuid,
        parent_id: Option<Uuid>,
        path: &str,
    ) -> AppResult<Directory> {
        let mut tree = self.tree.write().await;
        let owner_id = tree
            .directories
            .get(&id)
            .map(|d| d.owner_id)
            .ok_or_else(|| AppError::not_found(format!("Directory {id} not found")))?;
        if tree.directory_path_taken(owner_id, path, Some(id)) {
            return Err(AppError::conflict(format!(
                "Directory path '{path}' already exists"
            )));
        }
        let dir = tree
            .directories
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Directory {id} not found")))?;
        dir.parent_id = parent_id;
        dir.path = path.to_string();
        dir.updated_at = Utc::now();
        Ok(dir.clone())
    }

    async fn rewrite_path_prefix(
        &self,
        owner_id: Uuid,
        old_prefix: &str,
        new_prefix: &str,
    ) -> AppResult<u64> {
        let mut tree = self.tree.write().await;
        let mut count = 0;
        for dir in tree.directories.values_mut().filter(|d| d.owner_id == owner_id) {
            if let Some(path) = rewrite(&dir.path, old_prefix, new_prefix) {
                dir.path = path;
                dir.updated_at = Utc::now();
                count += 1;
            }
        }
        Ok(count)
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let mut tree = self.tree.write().await;
        if !tree.directories.contains_key(&id) {
            return Ok(false);
        }
        let doomed: HashSet<Uuid> = tree.subtree_ids(id).into_iter().collect();
        tree.directories.retain(|dir_id, _| !doomed.contains(dir_id));
        tree.files
            .retain(|_, f| f.directory_id.is_none_or(|d| !doomed.contains(&d)));
        Ok(true)
    }
}

#[async_trait]
impl ShareStore for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Share>> {
        Ok(self.shares.get(&id).map(|s| s.clone()))
    }

    async fn find_by_token(&self, token: &str) -> AppResult<Option<Share>> {
        let Some(id) = self.share_tokens.get(token).map(|id| *id) else {
            return Ok(None);
        };
        Ok(self.shares.get(&id).map(|s| s.clone()))
    }

    async fn find_by_owner(
        &self,
        owner_id: Uuid,
        resource_type: Option<ResourceType>,
        page: &PageRequest,
    ) -> AppResult<PageResponse<Share>> {
        let mut shares: Vec<Share> = self
            .shares
            .iter()
            .filter(|s| s.owner_id == owner_id)
            .filter(|s| resource_type.is_none_or(|rt| s.resource_type == rt))
            .map(|s| s.clone())
            .collect();
        shares.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        let total = shares.len() as u64;
        let items = shares
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .collect();
        Ok(PageResponse::new(items, *page, total))
    }

    async fn create(&self, data: &CreateShare) -> AppResult<Share> {
        let id = Uuid::new_v4();
        match self.share_tokens.entry(data.token.clone()) {
            Entry::Occupied(_) => {
                return Err(AppError::conflict("Share token collision"));
            }
            Entry::Vacant(slot) => {
                slot.insert(id);
            }
        }
        let now = Utc::now();
        let share = Share {
            id,
            owner_id: data.owner_id,
            resource_type: data.resource_type,
            resource_id: data.resource_id,
            permission_type: data.permission_type,
            token: data.token.clone(),
            password_hash: data.password_hash.clone(),
            expires_at: data.expires_at,
            access_count: 0,
            created_at: now,
            updated_at: now,
        };
        self.shares.insert(id, share.clone());
        Ok(share)
    }

    async fn update_expiration(
        &self,
        id: Uuid,
        expires_at: Option<DateTime<Utc>>,
    ) -> AppResult<Share> {
        let mut share = self
            .shares
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Share {id} not found")))?;
        share.expires_at = expires_at;
        share.updated_at = Utc::now();
        Ok(share.clone())
    }

    async fn increment_access_count(&self, id: Uuid) -> AppResult<i64> {
        let mut share = self
            .shares
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Share {id} not found")))?;
        share.access_count += 1;
        Ok(share.access_count)
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        match self.shares.remove(&id) {
            Some((_, share)) => {
                self.share_tokens.remove(&share.token);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_by_resource(
        &self,
        resource_type: ResourceType,
        resource_id: Uuid,
    ) -> AppResult<u64> {
        let doomed: Vec<Uuid> = self
            .shares
            .iter()
            .filter(|s| s.resource_type == resource_type && s.resource_id == resource_id)
            .map(|s| s.id)
            .collect();
        let mut count = 0;
        for id in doomed {
            if ShareStore::delete(self, id).await? {
                count += 1;
            }
        }
        Ok(count)
    }
}

#[async_trait]
impl AccessLogStore for MemoryStore {
    async fn append(&self, data: &CreateAccessLog) -> AppResult<ShareAccessLog> {
        let entry = ShareAccessLog {
            id: Uuid::new_v4(),
            share_id: data.share_id,
            action: data.action,
            ip_address: data.ip_address.clone(),
            user_agent: data.user_agent.clone(),
            file_name: data.file_name.clone(),
            accessed_at: Utc::now(),
        };
        self.access_logs.write().await.push(entry.clone());
        Ok(entry)
    }

    async fn find_by_share(&self, share_id: Uuid, limit: i64) -> AppResult<Vec<ShareAccessLog>> {
        let logs = self.access_logs.read().await;
        Ok(logs
            .iter()
            .rev()
            .filter(|l| l.share_id == share_id)
            .take(usize::try_from(limit).unwrap_or(0))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<UserAccount>> {
        Ok(self.users.get(&id).map(|u| u.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dir(owner_id: Uuid, parent_id: Option<Uuid>, path: &str) -> CreateDirectory {
        CreateDirectory {
            owner_id,
            parent_id,
            name: path.rsplit('/').next().unwrap_or_default().to_string(),
            path: path.to_string(),
        }
    }

    #[tokio::test]
    async fn test_ancestor_chain_and_subtree_delete() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let a = DirectoryStore::create(&store, &dir(owner, None, "/a")).await.unwrap();
        let b = DirectoryStore::create(&store, &dir(owner, Some(a.id), "/a/b")).await.unwrap();
        let c = DirectoryStore::create(&store, &dir(owner, Some(b.id), "/a/b/c")).await.unwrap();

        let chain = store.ancestor_ids(c.id, 10).await.unwrap();
        assert_eq!(chain, vec![c.id, b.id, a.id]);
        assert!(store.ancestor_ids(c.id, 2).await.is_err());

        assert_eq!(store.find_descendants(a.id).await.unwrap().len(), 2);
        assert!(DirectoryStore::delete(&store, b.id).await.unwrap());
        assert!(DirectoryStore::find_by_id(&store, c.id).await.unwrap().is_none());
        assert!(DirectoryStore::find_by_id(&store, a.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_path_prefix_rewrite_is_segment_aware() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let a = DirectoryStore::create(&store, &dir(owner, None, "/a")).await.unwrap();
        DirectoryStore::create(&store, &dir(owner, Some(a.id), "/a/x")).await.unwrap();
        DirectoryStore::create(&store, &dir(owner, None, "/ab")).await.unwrap();

        let n = DirectoryStore::rewrite_path_prefix(&store, owner, "/a", "/z").await.unwrap();
        assert_eq!(n, 1);
        assert!(store.find_by_parent_and_name(owner, None, "ab").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_duplicate_token_rejected() {
        let store = MemoryStore::new();
        let data = CreateShare {
            owner_id: Uuid::new_v4(),
            resource_type: ResourceType::File,
            resource_id: Uuid::new_v4(),
            permission_type: sharehub_entity::share::PermissionType::Read,
            token: "same".into(),
            password_hash: None,
            expires_at: None,
        };
        ShareStore::create(&store, &data).await.unwrap();
        let err = ShareStore::create(&store, &data).await.unwrap_err();
        assert_eq!(err.kind, sharehub_core::error::ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_concurrent_increments_are_not_lost() {
        let store = std::sync::Arc::new(MemoryStore::new());
        let share = ShareStore::create(
            store.as_ref(),
            &CreateShare {
                owner_id: Uuid::new_v4(),
                resource_type: ResourceType::File,
                resource_id: Uuid::new_v4(),
                permission_type: sharehub_entity::share::PermissionType::Read,
                token: "tok".into(),
                password_hash: None,
                expires_at: None,
            },
        )
        .await
        .unwrap();

        let mut handles = Vec::new();
        for _ in 0..32 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.increment_access_count(share.id).await.unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        let reloaded = ShareStore::find_by_id(store.as_ref(), share.id).await.unwrap().unwrap();
        assert_eq!(reloaded.access_count, 32);
    }

    #[derive(Debug)]
    struct Unreachable;

    #[async_trait]
    impl HealthCheck for Unreachable {
        async fn ping(&self) -> AppResult<bool> {
            Err(AppError::internal("connection refused"))
        }
    }

    #[tokio::test]
    async fn test_store_health() {
        let mut stores = crate::Stores::memory(std::sync::Arc::new(MemoryStore::new()));
        assert!(stores.is_healthy().await);

        stores.health = std::sync::Arc::new(Unreachable);
        assert!(!stores.is_healthy().await);
    }
}
