//! Share CRUD and token validation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use sharehub_auth::{PasswordHasher, TokenGenerator};
use sharehub_core::config::settings::RuntimeSettings;
use sharehub_core::config::sharing::SharingConfig;
use sharehub_core::error::{AppError, ErrorKind};
use sharehub_core::result::AppResult;
use sharehub_core::types::pagination::{PageRequest, PageResponse};
use sharehub_database::Stores;
use sharehub_entity::share::{
    AccessAction, CreateAccessLog, CreateShare, PermissionType, ResourceType, Share, ShareAccess,
    ShareAccessLog,
};

use crate::context::ClientMeta;

/// Attempts at drawing an unused token before giving up.
const TOKEN_ATTEMPTS: usize = 5;

/// Largest page of access log entries returned at once.
const MAX_LOG_ENTRIES: i64 = 500;

/// Manages share creation, listing, validation and revocation.
#[derive(Debug, Clone)]
pub struct ShareService {
    /// Entity stores.
    stores: Stores,
    /// Hasher for password-protected shares.
    hasher: PasswordHasher,
    /// Share token source.
    tokens: TokenGenerator,
    /// Share link settings.
    config: SharingConfig,
}

/// Parameters for a new share.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateShareParams {
    /// Kind of resource shared.
    pub resource_type: ResourceType,
    /// Resource ID.
    pub resource_id: Uuid,
    /// Permission type as sent by the client (`read`, `upload_only`, `read_upload`).
    pub permission_type: String,
    /// Optional plaintext password.
    pub password: Option<String>,
    /// Optional expiry.
    pub expires_at: Option<DateTime<Utc>>,
}

/// What an anonymous holder of a share token may see about it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicShareInfo {
    /// Kind of resource shared.
    pub resource_type: ResourceType,
    /// Shared resource ID.
    pub resource_id: Uuid,
    /// Display name of the resource.
    pub resource_name: String,
    /// Size for file shares.
    pub size_bytes: Option<i64>,
    /// MIME type for file shares.
    pub mime_type: Option<String>,
    /// Granted permission.
    pub permission_type: PermissionType,
    /// Expiry, if any.
    pub expires_at: Option<DateTime<Utc>>,
    /// Whether a password was required.
    pub has_password: bool,
}

impl ShareService {
    /// Creates a new share service.
    pub fn new(stores: Stores, hasher: PasswordHasher, config: SharingConfig) -> Self {
        Self {
            stores,
            hasher,
            tokens: TokenGenerator::new(config.token_bytes),
            config,
        }
    }

    /// Creates a new share, owned by the owner of the shared resource.
    ///
    /// Whether the caller may share the resource is decided beforehand by
    /// [`PermissionResolver::can_create_share`](crate::PermissionResolver::can_create_share).
    pub async fn create_share(
        &self,
        params: CreateShareParams,
        settings: &RuntimeSettings,
    ) -> AppResult<Share> {
        if !settings.sharing_enabled {
            return Err(AppError::forbidden("Sharing is disabled"));
        }

        let permission_type: PermissionType = params.permission_type.parse()?;

        if let Some(expires_at) = params.expires_at {
            if expires_at <= Utc::now() {
                return Err(AppError::validation("Expiration must be in the future"));
            }
        }

        let owner_id = self
            .resource_owner(params.resource_type, params.resource_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!(
                    "{} {} not found",
                    params.resource_type, params.resource_id
                ))
            })?;

        let password_hash = match params.password.as_deref() {
            Some(password) => {
                if password.chars().count() < self.config.min_password_length {
                    return Err(AppError::validation(format!(
                        "Password must be at least {} characters",
                        self.config.min_password_length
                    )));
                }
                Some(self.hasher.hash_password(password)?)
            }
            None => None,
        };

        let mut data = CreateShare {
            owner_id,
            resource_type: params.resource_type,
            resource_id: params.resource_id,
            permission_type,
            token: String::new(),
            password_hash,
            expires_at: params.expires_at,
        };

        for _ in 0..TOKEN_ATTEMPTS {
            data.token = self.tokens.generate();
            if self.stores.shares.find_by_token(&data.token).await?.is_some() {
                continue;
            }
            match self.stores.shares.create(&data).await {
                Ok(share) => {
                    info!(
                        user_id = %owner_id,
                        share_id = %share.id,
                        resource_type = %share.resource_type,
                        resource_id = %share.resource_id,
                        permission = %share.permission_type,
                        "Share created"
                    );
                    return Ok(share);
                }
                Err(e) if e.kind == ErrorKind::Conflict => continue,
                Err(e) => return Err(e),
            }
        }

        Err(AppError::internal("Could not allocate a unique share token"))
    }

    /// Finds a share by ID.
    pub async fn get_share_by_id(&self, share_id: Uuid) -> AppResult<Share> {
        self.stores
            .shares
            .find_by_id(share_id)
            .await?
            .ok_or_else(|| AppError::not_found("Share not found"))
    }

    /// Finds a share by token.
    pub async fn get_share_by_token(&self, token: &str) -> AppResult<Share> {
        self.stores
            .shares
            .find_by_token(token)
            .await?
            .ok_or_else(|| AppError::not_found("Share not found"))
    }

    /// Finds a share the caller owns.
    pub async fn get_owned_share(&self, share_id: Uuid, user_id: Uuid) -> AppResult<Share> {
        let share = self.get_share_by_id(share_id).await?;
        if share.owner_id != user_id {
            return Err(AppError::forbidden("You do not own this share"));
        }
        Ok(share)
    }

    /// Lists shares created by a user, newest first.
    pub async fn list_user_shares(
        &self,
        user_id: Uuid,
        resource_type: Option<ResourceType>,
        page: PageRequest,
    ) -> AppResult<PageResponse<Share>> {
        self.stores
            .shares
            .find_by_owner(user_id, resource_type, &page.normalized())
            .await
    }

    /// Replaces the expiry of a share the caller owns.
    pub async fn update_share_expiration(
        &self,
        share_id: Uuid,
        user_id: Uuid,
        expires_at: Option<DateTime<Utc>>,
    ) -> AppResult<Share> {
        self.get_owned_share(share_id, user_id).await?;

        if let Some(at) = expires_at {
            if at <= Utc::now() {
                return Err(AppError::validation("Expiration must be in the future"));
            }
        }

        let share = self
            .stores
            .shares
            .update_expiration(share_id, expires_at)
            .await?;
        info!(user_id = %user_id, share_id = %share_id, expires_at = ?expires_at, "Share expiration updated");
        Ok(share)
    }

    /// Revokes (deletes) a share. The caller must have passed
    /// [`PermissionResolver::can_revoke_share`](crate::PermissionResolver::can_revoke_share).
    pub async fn revoke_share(&self, share_id: Uuid) -> AppResult<()> {
        if !self.stores.shares.delete(share_id).await? {
            return Err(AppError::not_found("Share not found"));
        }
        info!(share_id = %share_id, "Share revoked");
        Ok(())
    }

    /// Checks a token and password and returns what the share grants.
    ///
    /// Checks run in a fixed order: the token must exist, the share must not
    /// be expired, then the password must verify when one is set. An expired
    /// share is rejected whatever password is sent.
    pub async fn validate_share_access(
        &self,
        token: &str,
        password: Option<&str>,
    ) -> AppResult<ShareAccess> {
        let share = self
            .stores
            .shares
            .find_by_token(token)
            .await?
            .ok_or_else(|| AppError::not_found("Share not found"))?;

        if share.is_expired() {
            return Err(AppError::forbidden("Share link has expired"));
        }

        if let Some(hash) = share.password_hash.as_deref() {
            let verified = match password {
                Some(password) => self.hasher.verify_password(password, hash)?,
                None => false,
            };
            if !verified {
                return Err(
                    AppError::forbidden("A valid password is required for this share")
                        .with_details(serde_json::json!({ "requires_password": true })),
                );
            }
        }

        Ok(share.to_access())
    }

    /// Records an access. Failures are logged, never returned.
    pub async fn log_share_access(
        &self,
        share_id: Uuid,
        action: AccessAction,
        file_name: Option<&str>,
        client: &ClientMeta,
    ) {
        let entry = CreateAccessLog {
            share_id,
            action,
            ip_address: client.ip_address.clone(),
            user_agent: client.user_agent.clone(),
            file_name: file_name.map(str::to_string),
        };
        if let Err(e) = self.stores.access_logs.append(&entry).await {
            warn!(share_id = %share_id, action = %action, error = %e, "Failed to record share access");
        }
    }

    /// Bumps the access counter. Failures are logged, never returned.
    pub async fn increment_access_count(&self, share_id: Uuid) {
        if let Err(e) = self.stores.shares.increment_access_count(share_id).await {
            warn!(share_id = %share_id, error = %e, "Failed to increment share access count");
        }
    }

    /// The unauthenticated view of a share. Records a `view`.
    pub async fn public_share_info(
        &self,
        token: &str,
        password: Option<&str>,
        client: &ClientMeta,
    ) -> AppResult<PublicShareInfo> {
        let access = self.validate_share_access(token, password).await?;
        let share = self.get_share_by_id(access.share_id).await?;

        let (resource_name, size_bytes, mime_type) = match access.resource_type {
            ResourceType::File => {
                let file = self
                    .stores
                    .files
                    .find_by_id(access.resource_id)
                    .await?
                    .ok_or_else(|| AppError::not_found("Shared file no longer exists"))?;
                (file.name, Some(file.size_bytes), Some(file.mime_type))
            }
            ResourceType::Directory => {
                let dir = self
                    .stores
                    .directories
                    .find_by_id(access.resource_id)
                    .await?
                    .ok_or_else(|| AppError::not_found("Shared directory no longer exists"))?;
                (dir.name, None, None)
            }
        };

        self.log_share_access(access.share_id, AccessAction::View, None, client)
            .await;

        Ok(PublicShareInfo {
            resource_type: access.resource_type,
            resource_id: access.resource_id,
            resource_name,
            size_bytes,
            mime_type,
            permission_type: access.permission_type,
            expires_at: access.expires_at,
            has_password: share.has_password(),
        })
    }

    /// Recent access log entries of a share the caller owns.
    pub async fn share_access_log(
        &self,
        share_id: Uuid,
        user_id: Uuid,
        limit: i64,
    ) -> AppResult<Vec<ShareAccessLog>> {
        self.get_owned_share(share_id, user_id).await?;
        self.stores
            .access_logs
            .find_by_share(share_id, limit.clamp(1, MAX_LOG_ENTRIES))
            .await
    }

    /// Owner of a file or directory, `None` when it does not exist.
    async fn resource_owner(
        &self,
        resource_type: ResourceType,
        resource_id: Uuid,
    ) -> AppResult<Option<Uuid>> {
        Ok(match resource_type {
            ResourceType::File => self
                .stores
                .files
                .find_by_id(resource_id)
                .await?
                .map(|f| f.owner_id),
            ResourceType::Directory => self
                .stores
                .directories
                .find_by_id(resource_id)
                .await?
                .map(|d| d.owner_id),
        })
    }
}
