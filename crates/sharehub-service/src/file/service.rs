//! File CRUD service.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{info, warn};
use uuid::Uuid;

use sharehub_core::error::AppError;
use sharehub_core::result::AppResult;
use sharehub_core::traits::storage::StorageProvider;
use sharehub_database::Stores;
use sharehub_entity::directory::join_path;
use sharehub_entity::file::{CreateFile, File};
use sharehub_entity::share::{AccessAction, ResourceType};
use sharehub_storage::hygiene::{sanitize_filename, validate_storage_key};
use sharehub_storage::mime::resolve_content_type;

use crate::context::RequestContext;
use crate::permission::PermissionResolver;
use crate::share::ShareService;

/// An upload as received from the client.
#[derive(Debug, Clone)]
pub struct UploadParams {
    /// Target directory; `None` is the uploader's root.
    pub directory_id: Option<Uuid>,
    /// Client-supplied file name, sanitized before use.
    pub file_name: String,
    /// Client-supplied content type.
    pub content_type: Option<String>,
    /// File contents.
    pub data: Bytes,
}

/// Uploads, deletes and moves files.
#[derive(Debug, Clone)]
pub struct FileService {
    /// Entity stores.
    stores: Stores,
    /// Blob store.
    storage: Arc<dyn StorageProvider>,
    /// Access checks.
    resolver: Arc<PermissionResolver>,
    /// Share access logging.
    shares: Arc<ShareService>,
}

impl FileService {
    /// Creates a new file service.
    pub fn new(
        stores: Stores,
        storage: Arc<dyn StorageProvider>,
        resolver: Arc<PermissionResolver>,
        shares: Arc<ShareService>,
    ) -> Self {
        Self {
            stores,
            storage,
            resolver,
            shares,
        }
    }

    /// Get file metadata the caller can read.
    pub async fn get_file(&self, ctx: &RequestContext, file_id: Uuid) -> AppResult<File> {
        let file = self
            .stores
            .files
            .find_by_id(file_id)
            .await?
            .ok_or_else(|| AppError::not_found("File not found"))?;
        if !self
            .resolver
            .can_read_file(&ctx.principal, file_id, ctx.share.as_ref())
            .await?
        {
            return Err(AppError::forbidden("You do not have access to this file"));
        }
        Ok(file)
    }

    /// Store a new file, billed to the owner of the target directory.
    ///
    /// Uploads through a share are billed to the share owner, never to the
    /// anonymous uploader. If the metadata row cannot be written, the blob
    /// that was already stored is removed again.
    pub async fn upload(&self, ctx: &RequestContext, params: UploadParams) -> AppResult<File> {
        let size = params.data.len() as u64;
        if size == 0 {
            return Err(AppError::validation("Empty uploads are not accepted"));
        }
        if size > ctx.settings.max_upload_size_bytes {
            return Err(AppError::validation(format!(
                "File exceeds the maximum upload size of {} bytes",
                ctx.settings.max_upload_size_bytes
            )));
        }

        if ctx.share.is_none() {
            ctx.require_user()?;
        }

        let parent = match params.directory_id {
            Some(id) => Some(
                self.stores
                    .directories
                    .find_by_id(id)
                    .await?
                    .ok_or_else(|| AppError::not_found("Directory not found"))?,
            ),
            None => None,
        };

        let target_owner = parent.as_ref().map_or(ctx.principal.user_id(), |d| Some(d.owner_id));
        let access = self
            .resolver
            .grant_for(&ctx.principal, target_owner, ctx.share.as_ref())
            .await?;
        if access
            .as_ref()
            .is_some_and(|a| !a.permission_type.allows_upload())
        {
            return Err(AppError::forbidden(
                "Uploads are not permitted for this share",
            ));
        }

        if !self
            .resolver
            .upload_allowed(&ctx.principal, parent.as_ref(), access.as_ref())
            .await?
        {
            return Err(AppError::forbidden(
                "You cannot upload to this directory",
            ));
        }

        let owner_id = match &parent {
            Some(dir) => dir.owner_id,
            None => ctx.require_user()?,
        };

        let name = sanitize_filename(&params.file_name);
        if self
            .stores
            .files
            .find_by_directory_and_name(owner_id, params.directory_id, &name)
            .await?
            .is_some()
        {
            return Err(AppError::conflict(format!(
                "A file named '{name}' already exists here"
            )));
        }

        self.resolver
            .check_upload_size(&ctx.settings, owner_id, size as i64)
            .await?;

        let file_id = Uuid::new_v4();
        let storage_key = format!("{owner_id}/{file_id}");
        validate_storage_key(&storage_key)?;

        let mime_type = resolve_content_type(params.content_type.as_deref(), &name);

        self.storage.write(&storage_key, params.data).await?;

        let path = join_path(parent.as_ref().map_or("", |d| d.path.as_str()), &name);
        let data = CreateFile {
            id: file_id,
            owner_id,
            name,
            storage_key: storage_key.clone(),
            size_bytes: size as i64,
            mime_type,
            directory_id: params.directory_id,
            path,
        };

        let file = match self.stores.files.create(&data).await {
            Ok(file) => file,
            Err(e) => {
                if let Err(cleanup) = self.storage.delete(&storage_key).await {
                    warn!(storage_key = %storage_key, error = %cleanup, "Failed to remove orphaned blob");
                }
                return Err(e);
            }
        };

        if let Some(a) = &access {
            self.shares
                .log_share_access(a.share_id, AccessAction::Upload, Some(&file.name), &ctx.client)
                .await;
            self.shares.increment_access_count(a.share_id).await;
        }

        info!(
            principal = %ctx.principal,
            owner_id = %owner_id,
            file_id = %file.id,
            size = file.size_bytes,
            "File uploaded"
        );
        Ok(file)
    }

    /// Delete a file, its shares and its blob.
    pub async fn delete(&self, ctx: &RequestContext, file_id: Uuid) -> AppResult<()> {
        ctx.require_user()?;
        let file = self
            .stores
            .files
            .find_by_id(file_id)
            .await?
            .ok_or_else(|| AppError::not_found("File not found"))?;

        if !self
            .resolver
            .can_delete_file(&ctx.principal, file_id)
            .await?
        {
            return Err(AppError::forbidden("Only the owner can delete this file"));
        }

        self.stores
            .shares
            .delete_by_resource(ResourceType::File, file_id)
            .await?;
        self.stores.files.delete(file_id).await?;

        if let Err(e) = self.storage.delete(&file.storage_key).await {
            warn!(file_id = %file_id, error = %e, "Failed to delete blob");
        }

        info!(principal = %ctx.principal, file_id = %file_id, "File deleted");
        Ok(())
    }

    /// Move a file into another directory of the same owner.
    pub async fn move_file(
        &self,
        ctx: &RequestContext,
        file_id: Uuid,
        destination: Option<Uuid>,
    ) -> AppResult<File> {
        let user_id = ctx.require_user()?;
        let file = self
            .stores
            .files
            .find_by_id(file_id)
            .await?
            .ok_or_else(|| AppError::not_found("File not found"))?;

        if !self.resolver.can_move_file(&ctx.principal, file_id).await? {
            return Err(AppError::forbidden("Only the owner can move this file"));
        }

        let parent_path = match destination {
            Some(dir_id) => {
                let dir = self
                    .stores
                    .directories
                    .find_by_id(dir_id)
                    .await?
                    .ok_or_else(|| AppError::not_found("Destination directory not found"))?;
                if !dir.is_owned_by(user_id) {
                    return Err(AppError::forbidden(
                        "You do not own the destination directory",
                    ));
                }
                dir.path
            }
            None => String::new(),
        };

        if file.directory_id == destination {
            return Ok(file);
        }

        if self
            .stores
            .files
            .find_by_directory_and_name(user_id, destination, &file.name)
            .await?
            .is_some()
        {
            return Err(AppError::conflict(format!(
                "A file named '{}' already exists in the destination",
                file.name
            )));
        }

        let path = join_path(&parent_path, &file.name);
        let moved = self
            .stores
            .files
            .move_file(file_id, destination, &path)
            .await?;
        info!(principal = %ctx.principal, file_id = %file_id, destination = ?destination, "File moved");
        Ok(moved)
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use sharehub_auth::Principal;
    use sharehub_core::error::ErrorKind;

    use super::*;
    use crate::testing::Harness;

    fn upload(dir: Option<Uuid>, name: &str, data: &'static [u8]) -> UploadParams {
        UploadParams {
            directory_id: dir,
            file_name: name.to_string(),
            content_type: None,
            data: Bytes::from_static(data),
        }
    }

    #[tokio::test]
    async fn test_owner_upload_sanitizes_name() {
        let h = Harness::new().await;
        let alice = h.user("alice");
        let dir = h.seed_dir(alice, None, "docs").await;
        let ctx = h.ctx(Principal::User(alice), None);

        let file = h
            .files
            .upload(&ctx, upload(Some(dir.id), "../../etc/passwd", b"root:x"))
            .await
            .unwrap();
        assert_eq!(file.name, "passwd");
        assert_eq!(file.path, "/docs/passwd");
        assert_eq!(file.storage_key, format!("{alice}/{}", file.id));
        assert!(h.storage.exists(&file.storage_key).await.unwrap());

        let err = h
            .files
            .upload(&ctx, upload(Some(dir.id), "passwd", b"again"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_share_upload_bills_owner() {
        let h = Harness::new().await;
        let alice = h.user_with_quota("alice", Some(10));
        let dir = h.seed_dir(alice, None, "inbox").await;
        let cred = h
            .share_credential(alice, ResourceType::Directory, dir.id, "upload_only")
            .await;
        let token = cred.token.clone();
        let ctx = h.ctx(Principal::Anonymous, Some(cred));

        let file = h
            .files
            .upload(&ctx, upload(Some(dir.id), "photo.jpg", b"12345"))
            .await
            .unwrap();
        assert_eq!(file.owner_id, alice);
        assert_eq!(file.mime_type, "image/jpeg");

        let err = h
            .files
            .upload(&ctx, upload(Some(dir.id), "big.bin", b"123456"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Forbidden);
        assert_eq!(err.details.unwrap()["available"], 5);

        let share = h.shares.get_share_by_token(&token).await.unwrap();
        let log = h.shares.share_access_log(share.id, alice, 10).await.unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].action, AccessAction::Upload);
    }

    #[tokio::test]
    async fn test_owner_upload_ignores_expired_share_token() {
        let h = Harness::new().await;
        let alice = h.user("alice");
        let dir = h.seed_dir(alice, None, "inbox").await;
        let cred = h
            .share_credential(alice, ResourceType::Directory, dir.id, "upload_only")
            .await;
        let share = h.shares.get_share_by_token(&cred.token).await.unwrap();
        h.expire_share(share.id).await;

        let owner = h.ctx(Principal::User(alice), Some(cred.clone()));
        h.files
            .upload(&owner, upload(Some(dir.id), "mine.txt", b"ok"))
            .await
            .unwrap();
        h.files
            .upload(&owner, upload(None, "root.txt", b"ok"))
            .await
            .unwrap();
        h.directories.create(&owner, Some(dir.id), "sub").await.unwrap();

        let anon = h.ctx(Principal::Anonymous, Some(cred));
        let err = h
            .files
            .upload(&anon, upload(Some(dir.id), "guest.txt", b"no"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Forbidden);
        assert!(err.message.contains("expired"));
    }

    #[tokio::test]
    async fn test_read_share_cannot_upload() {
        let h = Harness::new().await;
        let alice = h.user("alice");
        let dir = h.seed_dir(alice, None, "docs").await;
        let cred = h.share_credential(alice, ResourceType::Directory, dir.id, "read").await;
        let ctx = h.ctx(Principal::Anonymous, Some(cred));

        let err = h
            .files
            .upload(&ctx, upload(Some(dir.id), "x.txt", b"x"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Forbidden);
    }

    #[tokio::test]
    async fn test_upload_limits() {
        let h = Harness::new().await;
        let alice = h.user("alice");
        let mut ctx = h.ctx(Principal::User(alice), None);

        let err = h.files.upload(&ctx, upload(None, "e", b"")).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);

        ctx.settings.max_upload_size_bytes = 3;
        let err = h.files.upload(&ctx, upload(None, "big", b"1234")).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);

        let anon = h.ctx(Principal::Anonymous, None);
        let err = h.files.upload(&anon, upload(None, "x", b"1")).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthorized);
    }

    #[tokio::test]
    async fn test_delete_removes_blob_and_shares() {
        let h = Harness::new().await;
        let alice = h.user("alice");
        let bob = h.user("bob");
        let file = h.seed_file_with(alice, None, "a.txt", b"abc").await;
        let cred = h.share_credential(alice, ResourceType::File, file.id, "read").await;

        let err = h
            .files
            .delete(&h.ctx(Principal::User(bob), None), file.id)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Forbidden);

        h.files
            .delete(&h.ctx(Principal::User(alice), None), file.id)
            .await
            .unwrap();
        assert!(!h.storage.exists(&file.storage_key).await.unwrap());
        let err = h.shares.get_share_by_token(&cred.token).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_move_requires_owned_destination() {
        let h = Harness::new().await;
        let alice = h.user("alice");
        let bob = h.user("bob");
        let file = h.seed_file_with(alice, None, "a.txt", b"abc").await;
        let mine = h.seed_dir(alice, None, "archive").await;
        let theirs = h.seed_dir(bob, None, "bobs").await;
        let ctx = h.ctx(Principal::User(alice), None);

        let err = h
            .files
            .move_file(&ctx, file.id, Some(theirs.id))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Forbidden);

        let moved = h.files.move_file(&ctx, file.id, Some(mine.id)).await.unwrap();
        assert_eq!(moved.directory_id, Some(mine.id));
        assert_eq!(moved.path, "/archive/a.txt");
    }
}
