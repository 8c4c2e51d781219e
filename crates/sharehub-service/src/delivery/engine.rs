//! Download orchestration: authorize, log, deliver, count.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};
use uuid::Uuid;

use sharehub_core::config::delivery::DeliveryConfig;
use sharehub_core::error::AppError;
use sharehub_core::result::AppResult;
use sharehub_core::traits::storage::StorageProvider;
use sharehub_database::Stores;
use sharehub_entity::directory::Directory;
use sharehub_entity::share::{AccessAction, ShareAccess};
use sharehub_storage::hygiene::{content_disposition, sanitize_filename};

use super::archive::{ArchiveEntry, spawn_archive};
use super::{Archive, Delivery, DownloadMode, StreamedFile};
use crate::context::RequestContext;
use crate::permission::PermissionResolver;
use crate::share::ShareService;

/// Most file IDs accepted in one batch request.
pub const MAX_BATCH_FILES: usize = 1000;

/// Fallback archive name when nothing better is known.
const DEFAULT_ARCHIVE_NAME: &str = "download";

/// Serves single files, batches and directory trees.
#[derive(Debug, Clone)]
pub struct DeliveryEngine {
    /// Entity stores.
    stores: Stores,
    /// Blob store.
    storage: Arc<dyn StorageProvider>,
    /// Access checks.
    resolver: Arc<PermissionResolver>,
    /// Share logging and counters.
    shares: Arc<ShareService>,
    /// Validity of pre-signed URLs.
    presign_ttl: Duration,
    /// Directory nesting ceiling for archive traversal.
    max_depth: usize,
    /// Buffered chunks between archive producer and response.
    channel_capacity: usize,
}

impl DeliveryEngine {
    /// Creates a new delivery engine.
    pub fn new(
        stores: Stores,
        storage: Arc<dyn StorageProvider>,
        resolver: Arc<PermissionResolver>,
        shares: Arc<ShareService>,
        presign_ttl: Duration,
        config: &DeliveryConfig,
    ) -> Self {
        Self {
            stores,
            storage,
            resolver,
            shares,
            presign_ttl,
            max_depth: config.max_traversal_depth,
            channel_capacity: config.archive_channel_capacity,
        }
    }

    /// Deliver one file as a redirect or a proxied stream.
    pub async fn download_file(
        &self,
        ctx: &RequestContext,
        file_id: Uuid,
        mode: DownloadMode,
    ) -> AppResult<Delivery> {
        require_caller(ctx)?;

        let file = self
            .stores
            .files
            .find_by_id(file_id)
            .await?
            .ok_or_else(|| AppError::not_found("File not found"))?;
        let access = self.download_grant(ctx, file.owner_id).await?;

        if !self
            .resolver
            .file_readable(&ctx.principal, &file, access.as_ref())
            .await?
        {
            return Err(AppError::forbidden("You do not have access to this file"));
        }

        if let Some(a) = &access {
            self.shares
                .log_share_access(a.share_id, AccessAction::Download, Some(&file.name), &ctx.client)
                .await;
        }

        let name = sanitize_filename(&file.name);
        let delivery = match mode {
            DownloadMode::Redirect => Delivery::Redirect {
                url: self
                    .storage
                    .presigned_url(&file.storage_key, self.presign_ttl, &name, &file.mime_type)
                    .await?,
            },
            DownloadMode::Stream { inline } => {
                let meta = self.storage.metadata(&file.storage_key).await?;
                let body = self.storage.read(&file.storage_key).await?;
                Delivery::Stream(StreamedFile {
                    content_type: file.mime_type.clone(),
                    content_length: meta.size_bytes,
                    etag: meta.etag,
                    content_disposition: content_disposition(&name, inline),
                    body,
                })
            }
        };

        if let Some(a) = &access {
            self.shares.increment_access_count(a.share_id).await;
        }

        info!(
            principal = %ctx.principal,
            file_id = %file.id,
            share_id = ?access.as_ref().map(|a| a.share_id),
            mode = ?mode,
            "File download"
        );
        Ok(delivery)
    }

    /// Archive the readable subset of `file_ids`.
    ///
    /// Missing or unreadable files are left out; the request fails only
    /// when none remain. `directory_id`, when readable, names the archive.
    pub async fn download_batch(
        &self,
        ctx: &RequestContext,
        file_ids: &[Uuid],
        directory_id: Option<Uuid>,
    ) -> AppResult<Archive> {
        if file_ids.is_empty() {
            return Err(AppError::validation("No files requested"));
        }
        if file_ids.len() > MAX_BATCH_FILES {
            return Err(AppError::validation(format!(
                "At most {MAX_BATCH_FILES} files can be downloaded at once"
            )));
        }

        require_caller(ctx)?;

        // Resolved on the first file the caller does not own.
        let mut grant: Option<Option<ShareAccess>> = None;
        let mut seen = HashSet::new();
        let mut entries = Vec::new();
        for &id in file_ids {
            if !seen.insert(id) {
                continue;
            }
            let Some(file) = self.stores.files.find_by_id(id).await? else {
                debug!(file_id = %id, "Batch entry not found; skipped");
                continue;
            };
            if grant.is_none() && !ctx.principal.is(file.owner_id) {
                grant = Some(self.download_grant(ctx, file.owner_id).await?);
            }
            let access = grant.as_ref().and_then(Option::as_ref);
            if !self
                .resolver
                .file_readable(&ctx.principal, &file, access)
                .await?
            {
                debug!(file_id = %id, principal = %ctx.principal, "Batch entry not readable; skipped");
                continue;
            }
            entries.push(ArchiveEntry {
                name: sanitize_filename(&file.name),
                file,
            });
        }

        if entries.is_empty() {
            return Err(AppError::forbidden(
                "None of the requested files are accessible",
            ));
        }

        let access = grant.flatten();
        let base_name = match directory_id {
            Some(dir_id) => self
                .readable_directory_name(ctx, dir_id, access.as_ref())
                .await?
                .unwrap_or_else(|| DEFAULT_ARCHIVE_NAME.to_string()),
            None => DEFAULT_ARCHIVE_NAME.to_string(),
        };

        Ok(self.finish_archive(ctx, access.as_ref(), base_name, entries).await)
    }

    /// Archive a directory tree, leaving out anything the caller cannot read.
    pub async fn download_directory(
        &self,
        ctx: &RequestContext,
        directory_id: Uuid,
    ) -> AppResult<Archive> {
        require_caller(ctx)?;

        let dir = self
            .stores
            .directories
            .find_by_id(directory_id)
            .await?
            .ok_or_else(|| AppError::not_found("Directory not found"))?;
        let access = self.download_grant(ctx, dir.owner_id).await?;

        if !self
            .resolver
            .directory_readable(&ctx.principal, &dir, access.as_ref())
            .await?
        {
            return Err(AppError::forbidden(
                "You do not have access to this directory",
            ));
        }

        let entries = self.collect_tree(ctx, &dir, access.as_ref()).await?;
        if entries.is_empty() {
            return Err(AppError::not_found("Directory is empty"));
        }

        let base_name = sanitize_filename(&dir.name);
        Ok(self.finish_archive(ctx, access.as_ref(), base_name, entries).await)
    }

    /// The share grant for downloading something owned by `owner_id`.
    ///
    /// Owners download without one. For anyone else a rejected credential
    /// surfaces its precise error, and an upload-only share is refused.
    async fn download_grant(
        &self,
        ctx: &RequestContext,
        owner_id: Uuid,
    ) -> AppResult<Option<ShareAccess>> {
        let access = self
            .resolver
            .grant_for(&ctx.principal, Some(owner_id), ctx.share.as_ref())
            .await?;
        if access
            .as_ref()
            .is_some_and(|a| !a.permission_type.allows_read())
        {
            return Err(AppError::forbidden(
                "Downloads are not permitted for this share",
            ));
        }
        Ok(access)
    }

    /// Depth-first walk collecting readable files with their archive paths.
    async fn collect_tree(
        &self,
        ctx: &RequestContext,
        root: &Directory,
        access: Option<&ShareAccess>,
    ) -> AppResult<Vec<ArchiveEntry>> {
        let mut entries = Vec::new();
        let mut visited = HashSet::new();
        let mut stack = vec![(root.clone(), String::new(), 0usize)];

        while let Some((dir, prefix, depth)) = stack.pop() {
            if depth > self.max_depth {
                return Err(AppError::internal(format!(
                    "Directory {} is nested deeper than {} levels",
                    root.id, self.max_depth
                )));
            }
            if !visited.insert(dir.id) {
                return Err(AppError::internal(format!(
                    "Cycle detected below directory {}",
                    root.id
                )));
            }

            for file in self.stores.files.find_by_directory(dir.id).await? {
                if self
                    .resolver
                    .file_readable(&ctx.principal, &file, access)
                    .await?
                {
                    entries.push(ArchiveEntry {
                        name: format!("{prefix}{}", sanitize_filename(&file.name)),
                        file,
                    });
                }
            }

            let children = self.stores.directories.find_children(dir.id).await?;
            for child in children.into_iter().rev() {
                if !self
                    .resolver
                    .directory_readable(&ctx.principal, &child, access)
                    .await?
                {
                    debug!(directory_id = %child.id, "Subtree pruned from archive");
                    continue;
                }
                let child_prefix = format!("{prefix}{}/", sanitize_filename(&child.name));
                stack.push((child, child_prefix, depth + 1));
            }
        }

        Ok(entries)
    }

    async fn readable_directory_name(
        &self,
        ctx: &RequestContext,
        directory_id: Uuid,
        access: Option<&ShareAccess>,
    ) -> AppResult<Option<String>> {
        let Some(dir) = self.stores.directories.find_by_id(directory_id).await? else {
            return Ok(None);
        };
        Ok(self
            .resolver
            .directory_readable(&ctx.principal, &dir, access)
            .await?
            .then(|| sanitize_filename(&dir.name)))
    }

    async fn finish_archive(
        &self,
        ctx: &RequestContext,
        access: Option<&ShareAccess>,
        base_name: String,
        entries: Vec<ArchiveEntry>,
    ) -> Archive {
        let file_name = format!("{base_name}.zip");

        if let Some(a) = access {
            self.shares
                .log_share_access(a.share_id, AccessAction::Download, Some(&file_name), &ctx.client)
                .await;
        }

        let entry_count = entries.len();
        let body = spawn_archive(self.storage.clone(), entries, self.channel_capacity);

        if let Some(a) = access {
            self.shares.increment_access_count(a.share_id).await;
        }

        info!(
            principal = %ctx.principal,
            share_id = ?access.map(|a| a.share_id),
            archive = %file_name,
            entries = entry_count,
            "Archive download"
        );

        Archive {
            content_disposition: content_disposition(&file_name, false),
            file_name,
            entry_count,
            body,
        }
    }
}

/// Downloads need a signed-in user or a share token.
fn require_caller(ctx: &RequestContext) -> AppResult<()> {
    if ctx.share.is_none() && !ctx.principal.is_authenticated() {
        return Err(AppError::unauthorized(
            "Authentication or a share token is required",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Read};

    use futures::StreamExt;

    use sharehub_auth::Principal;
    use sharehub_core::error::ErrorKind;
    use sharehub_core::traits::storage::ByteStream;
    use sharehub_entity::share::ResourceType;

    use super::*;
    use crate::context::ShareCredential;
    use crate::testing::Harness;

    async fn collect(mut stream: ByteStream) -> Vec<u8> {
        let mut out = Vec::new();
        while let Some(chunk) = stream.next().await {
            out.extend_from_slice(&chunk.unwrap());
        }
        out
    }

    fn names(bytes: Vec<u8>) -> Vec<String> {
        let mut zip = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut names: Vec<String> = (0..zip.len())
            .map(|i| zip.by_index(i).unwrap().name().to_string())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_stream_owner_download() {
        let h = Harness::new().await;
        let alice = h.user("alice");
        let file = h.seed_file_with(alice, None, "notes.txt", b"hello world").await;
        let ctx = h.ctx(Principal::User(alice), None);

        let delivery = h
            .delivery
            .download_file(&ctx, file.id, DownloadMode::Stream { inline: false })
            .await
            .unwrap();
        let Delivery::Stream(streamed) = delivery else {
            panic!("expected stream");
        };
        assert_eq!(streamed.content_length, 11);
        assert!(streamed.content_disposition.starts_with("attachment;"));
        assert!(streamed.etag.is_some());
        assert_eq!(collect(streamed.body).await, b"hello world");
    }

    #[tokio::test]
    async fn test_redirect_issues_presigned_url() {
        let h = Harness::new().await;
        let alice = h.user("alice");
        let file = h.seed_file_with(alice, None, "notes.txt", b"x").await;
        let ctx = h.ctx(Principal::User(alice), None);

        let delivery = h
            .delivery
            .download_file(&ctx, file.id, DownloadMode::Redirect)
            .await
            .unwrap();
        let Delivery::Redirect { url } = delivery else {
            panic!("expected redirect");
        };
        assert!(url.starts_with("http://localhost:8080/api/blobs/"));
        assert_eq!(h.links.len(), 1);
    }

    #[tokio::test]
    async fn test_share_download_logs_and_counts() {
        let h = Harness::new().await;
        let alice = h.user("alice");
        let file = h.seed_file_with(alice, None, "notes.txt", b"x").await;
        let cred = h.share_credential(alice, ResourceType::File, file.id, "read").await;
        let token = cred.token.clone();
        let ctx = h.ctx(Principal::Anonymous, Some(cred));

        h.delivery
            .download_file(&ctx, file.id, DownloadMode::Stream { inline: true })
            .await
            .unwrap();

        let share = h.shares.get_share_by_token(&token).await.unwrap();
        assert_eq!(share.access_count, 1);
        let log = h.shares.share_access_log(share.id, alice, 10).await.unwrap();
        assert_eq!(log[0].action, AccessAction::Download);
        assert_eq!(log[0].file_name.as_deref(), Some("notes.txt"));
    }

    #[tokio::test]
    async fn test_upload_only_share_cannot_download() {
        let h = Harness::new().await;
        let alice = h.user("alice");
        let dir = h.seed_dir(alice, None, "inbox").await;
        let file = h.seed_file_with(alice, Some(&dir), "a.txt", b"x").await;
        let cred = h.share_credential(alice, ResourceType::Directory, dir.id, "upload_only").await;
        let ctx = h.ctx(Principal::Anonymous, Some(cred));

        let err = h
            .delivery
            .download_file(&ctx, file.id, DownloadMode::Redirect)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Forbidden);
        assert!(err.message.contains("not permitted"));

        let err = h.delivery.download_directory(&ctx, dir.id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Forbidden);
    }

    #[tokio::test]
    async fn test_owner_download_ignores_stale_share_token() {
        let h = Harness::new().await;
        let alice = h.user("alice");
        let dir = h.seed_dir(alice, None, "docs").await;
        let file = h.seed_file_with(alice, Some(&dir), "a.txt", b"mine").await;
        let cred = h.share_credential(alice, ResourceType::File, file.id, "read").await;
        let share = h.shares.get_share_by_token(&cred.token).await.unwrap();
        h.revoke(share.id).await;

        let ctx = h.ctx(Principal::User(alice), Some(cred.clone()));
        h.delivery
            .download_file(&ctx, file.id, DownloadMode::Stream { inline: false })
            .await
            .unwrap();
        h.delivery.download_directory(&ctx, dir.id).await.unwrap();

        let bogus = ShareCredential {
            token: "no-such-token".to_string(),
            password: None,
        };
        let ctx = h.ctx(Principal::User(alice), Some(bogus));
        let archive = h
            .delivery
            .download_batch(&ctx, &[file.id], None)
            .await
            .unwrap();
        assert_eq!(names(collect(archive.body).await), vec!["a.txt"]);

        // Someone else presenting the same revoked token still gets its error.
        let anon = h.ctx(Principal::Anonymous, Some(cred));
        let err = h
            .delivery
            .download_file(&anon, file.id, DownloadMode::Redirect)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_anonymous_without_share_is_unauthorized() {
        let h = Harness::new().await;
        let alice = h.user("alice");
        let file = h.seed_file_with(alice, None, "a.txt", b"x").await;
        let ctx = h.ctx(Principal::Anonymous, None);

        let err = h
            .delivery
            .download_file(&ctx, file.id, DownloadMode::Redirect)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthorized);
    }

    #[tokio::test]
    async fn test_batch_keeps_only_accessible_files() {
        let h = Harness::new().await;
        let alice = h.user("alice");
        let bob = h.user("bob");
        let mine = h.seed_file_with(bob, None, "mine.txt", b"bob").await;
        let theirs = h.seed_file_with(alice, None, "theirs.txt", b"alice").await;
        let ctx = h.ctx(Principal::User(bob), None);

        let archive = h
            .delivery
            .download_batch(&ctx, &[mine.id, theirs.id, Uuid::new_v4()], None)
            .await
            .unwrap();
        assert_eq!(archive.file_name, "download.zip");
        assert_eq!(names(collect(archive.body).await), vec!["mine.txt"]);

        let err = h
            .delivery
            .download_batch(&ctx, &[theirs.id], None)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Forbidden);
    }

    #[tokio::test]
    async fn test_directory_archive_prunes_unshared_subtrees() {
        let h = Harness::new().await;
        let alice = h.user("alice");
        let root = h.seed_dir(alice, None, "project").await;
        let src = h.seed_dir(alice, Some(&root), "src").await;
        let empty = h.seed_dir(alice, Some(&root), "empty").await;
        h.seed_file_with(alice, Some(&root), "README.md", b"readme").await;
        h.seed_file_with(alice, Some(&src), "main.rs", b"fn main() {}").await;

        let ctx = h.ctx(Principal::User(alice), None);
        let archive = h.delivery.download_directory(&ctx, root.id).await.unwrap();
        assert_eq!(archive.file_name, "project.zip");
        assert_eq!(
            names(collect(archive.body).await),
            vec!["README.md", "src/main.rs"]
        );

        // A share on `src` reaches only `src`.
        let cred = h.share_credential(alice, ResourceType::Directory, src.id, "read").await;
        let anon = h.ctx(Principal::Anonymous, Some(cred));
        let err = h.delivery.download_directory(&anon, root.id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Forbidden);
        let archive = h.delivery.download_directory(&anon, src.id).await.unwrap();
        let bytes = collect(archive.body).await;
        let mut zip = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut body = String::new();
        zip.by_name("main.rs").unwrap().read_to_string(&mut body).unwrap();
        assert_eq!(body, "fn main() {}");

        let err = h.delivery.download_directory(&ctx, empty.id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
        assert!(err.message.contains("empty"));
    }

    #[tokio::test]
    async fn test_directory_depth_ceiling() {
        let h = Harness::with_max_depth(2).await;
        let alice = h.user("alice");
        let a = h.seed_dir(alice, None, "a").await;
        let b = h.seed_dir(alice, Some(&a), "b").await;
        let c = h.seed_dir(alice, Some(&b), "c").await;
        let d = h.seed_dir(alice, Some(&c), "d").await;
        h.seed_file_with(alice, Some(&d), "deep.txt", b"x").await;

        let ctx = h.ctx(Principal::User(alice), None);
        let err = h.delivery.download_directory(&ctx, a.id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Internal);
    }
}
