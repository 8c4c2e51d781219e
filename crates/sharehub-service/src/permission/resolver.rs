//! Permission resolver: owner and share-token access decisions.
//!
//! Every check returns `Ok(true)` to allow, `Ok(false)` to deny, and `Err`
//! only when a lookup itself failed. A rejected share credential is a
//! denial, not an error; callers that need the precise reason obtain the
//! grant through [`PermissionResolver::grant_for`] first.

use std::sync::Arc;

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use sharehub_auth::Principal;
use sharehub_core::config::settings::RuntimeSettings;
use sharehub_core::error::ErrorKind;
use sharehub_core::result::AppResult;
use sharehub_database::Stores;
use sharehub_entity::directory::Directory;
use sharehub_entity::file::File;
use sharehub_entity::share::{ResourceType, ShareAccess};

use crate::context::ShareCredential;
use crate::quota::QuotaTracker;
use crate::share::ShareService;

/// Decides who may read, write and manage files, directories and shares.
#[derive(Debug, Clone)]
pub struct PermissionResolver {
    /// Entity stores.
    stores: Stores,
    /// Share validation.
    shares: Arc<ShareService>,
    /// Quota checks.
    quota: Arc<QuotaTracker>,
    /// Ceiling on ancestor walks.
    max_depth: usize,
}

impl PermissionResolver {
    /// Creates a new permission resolver.
    pub fn new(
        stores: Stores,
        shares: Arc<ShareService>,
        quota: Arc<QuotaTracker>,
        max_depth: usize,
    ) -> Self {
        Self {
            stores,
            shares,
            quota,
            max_depth,
        }
    }

    // ── Share credentials ───────────────────────────────────────

    /// Pass-through to share validation, returning the resolved grant.
    pub async fn validate_share_token(
        &self,
        token: &str,
        password: Option<&str>,
    ) -> AppResult<ShareAccess> {
        self.shares.validate_share_access(token, password).await
    }

    /// Validate an optional credential, keeping the precise error.
    pub async fn resolve_share(
        &self,
        credential: Option<&ShareCredential>,
    ) -> AppResult<Option<ShareAccess>> {
        match credential {
            Some(c) => Ok(Some(
                self.validate_share_token(&c.token, c.password.as_deref())
                    .await?,
            )),
            None => Ok(None),
        }
    }

    /// The share grant that applies to a resource owned by `owner_id`.
    ///
    /// The owner needs no grant, so their credential is never looked at and
    /// a stale token cannot fail a request on their own resource. Anyone
    /// else gets the credential validated with its precise error.
    pub async fn grant_for(
        &self,
        principal: &Principal,
        owner_id: Option<Uuid>,
        credential: Option<&ShareCredential>,
    ) -> AppResult<Option<ShareAccess>> {
        if owner_id.is_some_and(|id| principal.is(id)) {
            return Ok(None);
        }
        self.resolve_share(credential).await
    }

    /// Validate an optional credential, turning a rejection into `None`.
    async fn share_grant(
        &self,
        credential: Option<&ShareCredential>,
    ) -> AppResult<Option<ShareAccess>> {
        match self.resolve_share(credential).await {
            Ok(access) => Ok(access),
            Err(e) if matches!(e.kind, ErrorKind::NotFound | ErrorKind::Forbidden) => {
                debug!(error = %e, "Share credential rejected");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    // ── Read ────────────────────────────────────────────────────

    /// Check if the principal can read a file.
    pub async fn can_read_file(
        &self,
        principal: &Principal,
        file_id: Uuid,
        share: Option<&ShareCredential>,
    ) -> AppResult<bool> {
        let Some(file) = self.stores.files.find_by_id(file_id).await? else {
            return Ok(false);
        };
        if principal.is(file.owner_id) {
            return Ok(true);
        }
        let access = self.share_grant(share).await?;
        self.file_readable(principal, &file, access.as_ref()).await
    }

    /// Check if the principal can read a directory and its listing.
    pub async fn can_read_directory(
        &self,
        principal: &Principal,
        directory_id: Uuid,
        share: Option<&ShareCredential>,
    ) -> AppResult<bool> {
        let Some(dir) = self.stores.directories.find_by_id(directory_id).await? else {
            return Ok(false);
        };
        if principal.is(dir.owner_id) {
            return Ok(true);
        }
        let access = self.share_grant(share).await?;
        self.directory_readable(principal, &dir, access.as_ref())
            .await
    }

    /// Read check against an already validated grant.
    pub async fn file_readable(
        &self,
        principal: &Principal,
        file: &File,
        access: Option<&ShareAccess>,
    ) -> AppResult<bool> {
        if principal.is(file.owner_id) {
            return Ok(true);
        }
        let Some(access) = access.filter(|a| grant_usable(a) && a.permission_type.allows_read())
        else {
            return Ok(false);
        };
        match access.resource_type {
            ResourceType::File => Ok(access.resource_id == file.id),
            ResourceType::Directory => match file.directory_id {
                Some(dir_id) => self.is_within(dir_id, access.resource_id).await,
                None => Ok(false),
            },
        }
    }

    /// Directory read check against an already validated grant.
    pub async fn directory_readable(
        &self,
        principal: &Principal,
        dir: &Directory,
        access: Option<&ShareAccess>,
    ) -> AppResult<bool> {
        if principal.is(dir.owner_id) {
            return Ok(true);
        }
        match access {
            Some(a)
                if grant_usable(a)
                    && a.permission_type.allows_read()
                    && a.resource_type == ResourceType::Directory =>
            {
                self.is_within(dir.id, a.resource_id).await
            }
            _ => Ok(false),
        }
    }

    // ── Write into a directory ──────────────────────────────────

    /// Check if the principal can upload a file into `parent_id` (`None` is
    /// the principal's own root).
    pub async fn can_upload_file(
        &self,
        principal: &Principal,
        parent_id: Option<Uuid>,
        share: Option<&ShareCredential>,
    ) -> AppResult<bool> {
        let parent = match parent_id {
            Some(id) => match self.stores.directories.find_by_id(id).await? {
                Some(dir) => Some(dir),
                None => return Ok(false),
            },
            None => None,
        };
        if let Some(dir) = &parent {
            if principal.is(dir.owner_id) {
                return Ok(true);
            }
        }
        let access = self.share_grant(share).await?;
        self.upload_allowed(principal, parent.as_ref(), access.as_ref())
            .await
    }

    /// Check if the principal can create a subdirectory in `parent_id`.
    pub async fn can_create_directory(
        &self,
        principal: &Principal,
        parent_id: Option<Uuid>,
        share: Option<&ShareCredential>,
    ) -> AppResult<bool> {
        self.can_upload_file(principal, parent_id, share).await
    }

    /// Write check against an already validated grant.
    pub async fn upload_allowed(
        &self,
        principal: &Principal,
        parent: Option<&Directory>,
        access: Option<&ShareAccess>,
    ) -> AppResult<bool> {
        let Some(dir) = parent else {
            // Only the owner writes into their own root.
            return Ok(principal.is_authenticated());
        };
        if principal.is(dir.owner_id) {
            return Ok(true);
        }
        match access {
            Some(a)
                if grant_usable(a)
                    && a.permission_type.allows_upload()
                    && a.resource_type == ResourceType::Directory =>
            {
                self.is_within(dir.id, a.resource_id).await
            }
            _ => Ok(false),
        }
    }

    // ── Owner-only ──────────────────────────────────────────────

    /// Check if the principal can delete a file.
    pub async fn can_delete_file(&self, principal: &Principal, file_id: Uuid) -> AppResult<bool> {
        self.owns_file(principal, file_id).await
    }

    /// Check if the principal can move a file.
    pub async fn can_move_file(&self, principal: &Principal, file_id: Uuid) -> AppResult<bool> {
        self.owns_file(principal, file_id).await
    }

    /// Check if the principal can delete a directory and its subtree.
    pub async fn can_delete_directory(
        &self,
        principal: &Principal,
        directory_id: Uuid,
    ) -> AppResult<bool> {
        self.owns_directory(principal, directory_id).await
    }

    /// Check if the principal can move a directory.
    pub async fn can_move_directory(
        &self,
        principal: &Principal,
        directory_id: Uuid,
    ) -> AppResult<bool> {
        self.owns_directory(principal, directory_id).await
    }

    /// Check if the principal can rename a directory.
    pub async fn can_rename_directory(
        &self,
        principal: &Principal,
        directory_id: Uuid,
    ) -> AppResult<bool> {
        self.owns_directory(principal, directory_id).await
    }

    /// Check if the principal can share a resource.
    pub async fn can_create_share(
        &self,
        principal: &Principal,
        resource_type: ResourceType,
        resource_id: Uuid,
    ) -> AppResult<bool> {
        match resource_type {
            ResourceType::File => self.owns_file(principal, resource_id).await,
            ResourceType::Directory => self.owns_directory(principal, resource_id).await,
        }
    }

    /// Check if the principal can revoke a share.
    pub async fn can_revoke_share(&self, principal: &Principal, share_id: Uuid) -> AppResult<bool> {
        Ok(self
            .stores
            .shares
            .find_by_id(share_id)
            .await?
            .is_some_and(|s| principal.is(s.owner_id)))
    }

    // ── Quota ───────────────────────────────────────────────────

    /// Check that `size` more bytes fit in the quota of `user_id`, who must
    /// be the owner being billed. A denial is `Forbidden` with the figures.
    pub async fn check_upload_size(
        &self,
        settings: &RuntimeSettings,
        user_id: Uuid,
        size: i64,
    ) -> AppResult<()> {
        self.quota.ensure_can_upload(settings, user_id, size).await
    }

    // ── Helpers ─────────────────────────────────────────────────

    async fn owns_file(&self, principal: &Principal, file_id: Uuid) -> AppResult<bool> {
        Ok(self
            .stores
            .files
            .find_by_id(file_id)
            .await?
            .is_some_and(|f| principal.is(f.owner_id)))
    }

    async fn owns_directory(&self, principal: &Principal, directory_id: Uuid) -> AppResult<bool> {
        Ok(self
            .stores
            .directories
            .find_by_id(directory_id)
            .await?
            .is_some_and(|d| principal.is(d.owner_id)))
    }

    /// Whether `directory_id` is `ancestor_id` or lies below it.
    async fn is_within(&self, directory_id: Uuid, ancestor_id: Uuid) -> AppResult<bool> {
        let chain = self
            .stores
            .directories
            .ancestor_ids(directory_id, self.max_depth)
            .await?;
        Ok(chain.contains(&ancestor_id))
    }
}

/// A grant can outlive its validation by the length of a long download.
fn grant_usable(access: &ShareAccess) -> bool {
    access.expires_at.is_none_or(|at| Utc::now() <= at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Harness;

    #[tokio::test]
    async fn test_owner_reads_everything() {
        let h = Harness::new().await;
        let alice = h.user("alice");
        let dir = h.seed_dir(alice, None, "docs").await;
        let file = h.seed_file(alice, Some(&dir), "a.txt", 3).await;
        let owner = Principal::User(alice);

        assert!(h.resolver.can_read_file(&owner, file.id, None).await.unwrap());
        assert!(h.resolver.can_read_directory(&owner, dir.id, None).await.unwrap());
        assert!(!h
            .resolver
            .can_read_file(&Principal::User(h.user("bob")), file.id, None)
            .await
            .unwrap());
        assert!(!h
            .resolver
            .can_read_file(&Principal::Anonymous, file.id, None)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_directory_share_covers_descendants_only() {
        let h = Harness::new().await;
        let alice = h.user("alice");
        let shared = h.seed_dir(alice, None, "shared").await;
        let nested = h.seed_dir(alice, Some(&shared), "nested").await;
        let other = h.seed_dir(alice, None, "private").await;
        let deep_file = h.seed_file(alice, Some(&nested), "deep.txt", 1).await;
        let outside = h.seed_file(alice, Some(&other), "secret.txt", 1).await;
        let root_file = h.seed_file(alice, None, "root.txt", 1).await;

        let cred = h.share_credential(alice, ResourceType::Directory, shared.id, "read").await;
        let anon = Principal::Anonymous;

        assert!(h.resolver.can_read_file(&anon, deep_file.id, Some(&cred)).await.unwrap());
        assert!(h.resolver.can_read_directory(&anon, nested.id, Some(&cred)).await.unwrap());
        assert!(!h.resolver.can_read_file(&anon, outside.id, Some(&cred)).await.unwrap());
        assert!(!h.resolver.can_read_file(&anon, root_file.id, Some(&cred)).await.unwrap());
        assert!(!h.resolver.can_read_directory(&anon, other.id, Some(&cred)).await.unwrap());
    }

    #[tokio::test]
    async fn test_file_share_matches_exact_file() {
        let h = Harness::new().await;
        let alice = h.user("alice");
        let a = h.seed_file(alice, None, "a.txt", 1).await;
        let b = h.seed_file(alice, None, "b.txt", 1).await;
        let cred = h.share_credential(alice, ResourceType::File, a.id, "read").await;

        let anon = Principal::Anonymous;
        assert!(h.resolver.can_read_file(&anon, a.id, Some(&cred)).await.unwrap());
        assert!(!h.resolver.can_read_file(&anon, b.id, Some(&cred)).await.unwrap());
    }

    #[tokio::test]
    async fn test_permission_types_gate_read_and_upload() {
        let h = Harness::new().await;
        let alice = h.user("alice");
        let dir = h.seed_dir(alice, None, "drop").await;
        let file = h.seed_file(alice, Some(&dir), "a.txt", 1).await;
        let anon = Principal::Anonymous;

        let upload_only = h.share_credential(alice, ResourceType::Directory, dir.id, "upload_only").await;
        assert!(!h.resolver.can_read_file(&anon, file.id, Some(&upload_only)).await.unwrap());
        assert!(h.resolver.can_upload_file(&anon, Some(dir.id), Some(&upload_only)).await.unwrap());

        let read = h.share_credential(alice, ResourceType::Directory, dir.id, "read").await;
        assert!(h.resolver.can_read_file(&anon, file.id, Some(&read)).await.unwrap());
        assert!(!h.resolver.can_upload_file(&anon, Some(dir.id), Some(&read)).await.unwrap());

        let both = h.share_credential(alice, ResourceType::Directory, dir.id, "read_upload").await;
        assert!(h.resolver.can_read_file(&anon, file.id, Some(&both)).await.unwrap());
        assert!(h.resolver.can_create_directory(&anon, Some(dir.id), Some(&both)).await.unwrap());

        // A share never opens anyone's root.
        assert!(!h.resolver.can_upload_file(&anon, None, Some(&both)).await.unwrap());
        assert!(h.resolver.can_upload_file(&Principal::User(alice), None, None).await.unwrap());
    }

    #[tokio::test]
    async fn test_rejected_credentials_deny() {
        let h = Harness::new().await;
        let alice = h.user("alice");
        let file = h.seed_file(alice, None, "a.txt", 1).await;
        let mut cred = h.share_credential(alice, ResourceType::File, file.id, "read").await;
        let anon = Principal::Anonymous;

        let share = h.shares.get_share_by_token(&cred.token).await.unwrap();
        h.expire_share(share.id).await;
        assert!(!h.resolver.can_read_file(&anon, file.id, Some(&cred)).await.unwrap());

        cred.token = "missing".to_string();
        assert!(!h.resolver.can_read_file(&anon, file.id, Some(&cred)).await.unwrap());
    }

    #[tokio::test]
    async fn test_management_is_owner_only() {
        let h = Harness::new().await;
        let alice = h.user("alice");
        let bob = Principal::User(h.user("bob"));
        let owner = Principal::User(alice);
        let dir = h.seed_dir(alice, None, "d").await;
        let file = h.seed_file(alice, Some(&dir), "f", 1).await;

        assert!(h.resolver.can_delete_file(&owner, file.id).await.unwrap());
        assert!(!h.resolver.can_delete_file(&bob, file.id).await.unwrap());
        assert!(!h.resolver.can_move_file(&Principal::Anonymous, file.id).await.unwrap());
        assert!(h.resolver.can_rename_directory(&owner, dir.id).await.unwrap());
        assert!(!h.resolver.can_move_directory(&bob, dir.id).await.unwrap());
        assert!(!h.resolver.can_delete_directory(&bob, dir.id).await.unwrap());
        assert!(h.resolver.can_create_share(&owner, ResourceType::Directory, dir.id).await.unwrap());
        assert!(!h.resolver.can_create_share(&bob, ResourceType::File, file.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_revoke_is_owner_only() {
        let h = Harness::new().await;
        let alice = h.user("alice");
        let bob = h.user("bob");
        let file = h.seed_file(alice, None, "f", 1).await;
        let cred = h.share_credential(alice, ResourceType::File, file.id, "read").await;
        let share = h.shares.get_share_by_token(&cred.token).await.unwrap();

        assert!(h.resolver.can_revoke_share(&Principal::User(alice), share.id).await.unwrap());
        assert!(!h.resolver.can_revoke_share(&Principal::User(bob), share.id).await.unwrap());
        assert!(!h.resolver.can_revoke_share(&Principal::Anonymous, share.id).await.unwrap());
        assert!(!h
            .resolver
            .can_revoke_share(&Principal::User(alice), Uuid::new_v4())
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_owner_grant_ignores_stale_credential() {
        let h = Harness::new().await;
        let alice = h.user("alice");
        let file = h.seed_file(alice, None, "a.txt", 1).await;
        let cred = h.share_credential(alice, ResourceType::File, file.id, "read").await;
        let share = h.shares.get_share_by_token(&cred.token).await.unwrap();
        h.expire_share(share.id).await;

        let grant = h
            .resolver
            .grant_for(&Principal::User(alice), Some(alice), Some(&cred))
            .await
            .unwrap();
        assert!(grant.is_none());

        let err = h
            .resolver
            .grant_for(&Principal::Anonymous, Some(alice), Some(&cred))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Forbidden);
    }

    #[tokio::test]
    async fn test_upload_size_reports_figures() {
        let h = Harness::new().await;
        let alice = h.user_with_quota("alice", Some(10));
        h.seed_file(alice, None, "a.bin", 6).await;

        h.resolver.check_upload_size(&h.settings, alice, 4).await.unwrap();
        let err = h
            .resolver
            .check_upload_size(&h.settings, alice, 5)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Forbidden);
        assert_eq!(err.details.unwrap()["available"], 4);
    }
}
