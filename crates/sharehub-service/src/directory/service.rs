//! Directory CRUD with materialized path maintenance.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use sharehub_core::error::AppError;
use sharehub_core::result::AppResult;
use sharehub_core::traits::storage::StorageProvider;
use sharehub_database::Stores;
use sharehub_entity::directory::{CreateDirectory, Directory, join_path};
use sharehub_entity::file::File;
use sharehub_entity::share::{AccessAction, ResourceType};
use sharehub_storage::hygiene::sanitize_filename;

use crate::context::RequestContext;
use crate::permission::PermissionResolver;
use crate::share::ShareService;

/// Creates, renames, moves and deletes directories.
#[derive(Debug, Clone)]
pub struct DirectoryService {
    /// Entity stores.
    stores: Stores,
    /// Blob store.
    storage: Arc<dyn StorageProvider>,
    /// Access checks.
    resolver: Arc<PermissionResolver>,
    /// Share access logging.
    shares: Arc<ShareService>,
    /// Ceiling on ancestor walks.
    max_depth: usize,
}

impl DirectoryService {
    /// Creates a new directory service.
    pub fn new(
        stores: Stores,
        storage: Arc<dyn StorageProvider>,
        resolver: Arc<PermissionResolver>,
        shares: Arc<ShareService>,
        max_depth: usize,
    ) -> Self {
        Self {
            stores,
            storage,
            resolver,
            shares,
            max_depth,
        }
    }

    /// Get a directory the caller can read.
    pub async fn get_directory(&self, ctx: &RequestContext, id: Uuid) -> AppResult<Directory> {
        let dir = self.find(id).await?;
        if !self
            .resolver
            .can_read_directory(&ctx.principal, id, ctx.share.as_ref())
            .await?
        {
            return Err(AppError::forbidden(
                "You do not have access to this directory",
            ));
        }
        Ok(dir)
    }

    /// Create a subdirectory. Through an upload-capable share, the new
    /// directory belongs to the share owner.
    pub async fn create(
        &self,
        ctx: &RequestContext,
        parent_id: Option<Uuid>,
        name: &str,
    ) -> AppResult<Directory> {
        let name = clean_name(name)?;

        if ctx.share.is_none() {
            ctx.require_user()?;
        }

        let parent = match parent_id {
            Some(id) => Some(self.find(id).await?),
            None => None,
        };

        let target_owner = parent.as_ref().map_or(ctx.principal.user_id(), |d| Some(d.owner_id));
        let access = self
            .resolver
            .grant_for(&ctx.principal, target_owner, ctx.share.as_ref())
            .await?;

        if !self
            .resolver
            .upload_allowed(&ctx.principal, parent.as_ref(), access.as_ref())
            .await?
        {
            return Err(AppError::forbidden(
                "You cannot create a directory here",
            ));
        }

        let owner_id = match &parent {
            Some(dir) => dir.owner_id,
            None => ctx.require_user()?,
        };

        self.ensure_name_free(owner_id, parent_id, &name).await?;

        let path = join_path(parent.as_ref().map_or("", |d| d.path.as_str()), &name);
        let dir = self
            .stores
            .directories
            .create(&CreateDirectory {
                owner_id,
                parent_id,
                name,
                path,
            })
            .await?;

        if let Some(a) = &access {
            self.shares
                .log_share_access(a.share_id, AccessAction::Upload, Some(&dir.name), &ctx.client)
                .await;
        }

        info!(principal = %ctx.principal, directory_id = %dir.id, path = %dir.path, "Directory created");
        Ok(dir)
    }

    /// Rename a directory, rewriting the paths of everything below it.
    pub async fn rename(&self, ctx: &RequestContext, id: Uuid, name: &str) -> AppResult<Directory> {
        let user_id = ctx.require_user()?;
        let name = clean_name(name)?;
        let dir = self.find(id).await?;

        if !self.resolver.can_rename_directory(&ctx.principal, id).await? {
            return Err(AppError::forbidden(
                "Only the owner can rename this directory",
            ));
        }
        if dir.name == name {
            return Ok(dir);
        }

        self.ensure_name_free(user_id, dir.parent_id, &name).await?;

        let new_path = join_path(parent_path(&dir.path), &name);
        let renamed = self.stores.directories.rename(id, &name, &new_path).await?;
        self.rewrite_descendants(dir.owner_id, &dir.path, &new_path)
            .await?;

        info!(principal = %ctx.principal, directory_id = %id, path = %new_path, "Directory renamed");
        Ok(renamed)
    }

    /// Re-parent a directory. Moving it into itself or below itself is
    /// rejected before anything changes.
    pub async fn move_directory(
        &self,
        ctx: &RequestContext,
        id: Uuid,
        destination: Option<Uuid>,
    ) -> AppResult<Directory> {
        let user_id = ctx.require_user()?;
        let dir = self.find(id).await?;

        if !self.resolver.can_move_directory(&ctx.principal, id).await? {
            return Err(AppError::forbidden(
                "Only the owner can move this directory",
            ));
        }

        let parent_path = match destination {
            Some(dest_id) => {
                if dest_id == id {
                    return Err(AppError::validation(
                        "Cannot move a directory into itself",
                    ));
                }
                let dest = self.find(dest_id).await?;
                if !dest.is_owned_by(user_id) {
                    return Err(AppError::forbidden(
                        "You do not own the destination directory",
                    ));
                }
                let chain = self
                    .stores
                    .directories
                    .ancestor_ids(dest_id, self.max_depth)
                    .await?;
                if chain.contains(&id) {
                    return Err(AppError::validation(
                        "Cannot move a directory into one of its descendants",
                    ));
                }
                dest.path
            }
            None => String::new(),
        };

        if dir.parent_id == destination {
            return Ok(dir);
        }

        self.ensure_name_free(user_id, destination, &dir.name)
            .await?;

        let new_path = join_path(&parent_path, &dir.name);
        let moved = self
            .stores
            .directories
            .move_directory(id, destination, &new_path)
            .await?;
        self.rewrite_descendants(dir.owner_id, &dir.path, &new_path)
            .await?;

        info!(principal = %ctx.principal, directory_id = %id, destination = ?destination, "Directory moved");
        Ok(moved)
    }

    /// Delete a directory with its whole subtree, the shares pointing into
    /// it, and the blobs of its files.
    pub async fn delete(&self, ctx: &RequestContext, id: Uuid) -> AppResult<()> {
        ctx.require_user()?;
        self.find(id).await?;

        if !self.resolver.can_delete_directory(&ctx.principal, id).await? {
            return Err(AppError::forbidden(
                "Only the owner can delete this directory",
            ));
        }

        let mut subtree = vec![id];
        subtree.extend(
            self.stores
                .directories
                .find_descendants(id)
                .await?
                .into_iter()
                .map(|d| d.id),
        );

        let mut files: Vec<File> = Vec::new();
        for dir_id in &subtree {
            files.extend(self.stores.files.find_by_directory(*dir_id).await?);
        }

        for file in &files {
            self.stores
                .shares
                .delete_by_resource(ResourceType::File, file.id)
                .await?;
        }
        for dir_id in &subtree {
            self.stores
                .shares
                .delete_by_resource(ResourceType::Directory, *dir_id)
                .await?;
        }

        self.stores.directories.delete(id).await?;

        for file in &files {
            if let Err(e) = self.storage.delete(&file.storage_key).await {
                warn!(file_id = %file.id, error = %e, "Failed to delete blob");
            }
        }

        info!(
            principal = %ctx.principal,
            directory_id = %id,
            directories = subtree.len(),
            files = files.len(),
            "Directory deleted"
        );
        Ok(())
    }

    async fn find(&self, id: Uuid) -> AppResult<Directory> {
        self.stores
            .directories
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Directory not found"))
    }

    async fn ensure_name_free(
        &self,
        owner_id: Uuid,
        parent_id: Option<Uuid>,
        name: &str,
    ) -> AppResult<()> {
        let taken = self
            .stores
            .directories
            .find_by_parent_and_name(owner_id, parent_id, name)
            .await?
            .is_some()
            || self
                .stores
                .files
                .find_by_directory_and_name(owner_id, parent_id, name)
                .await?
                .is_some();
        if taken {
            return Err(AppError::conflict(format!(
                "An entry named '{name}' already exists here"
            )));
        }
        Ok(())
    }

    async fn rewrite_descendants(&self, owner_id: Uuid, old: &str, new: &str) -> AppResult<()> {
        self.stores
            .directories
            .rewrite_path_prefix(owner_id, old, new)
            .await?;
        self.stores
            .files
            .rewrite_path_prefix(owner_id, old, new)
            .await?;
        Ok(())
    }
}

/// Parent portion of a materialized path (`""` for top level).
fn parent_path(path: &str) -> &str {
    path.rsplit_once('/').map_or("", |(parent, _)| parent)
}

/// A directory name must already be a clean single segment.
fn clean_name(name: &str) -> AppResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation("Directory name cannot be empty"));
    }
    if sanitize_filename(trimmed) != trimmed {
        return Err(AppError::validation(
            "Directory name contains invalid characters",
        ));
    }
    Ok(trimmed.to_string())
}
