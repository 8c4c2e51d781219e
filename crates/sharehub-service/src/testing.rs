//! Shared fixtures for service unit tests.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;
use uuid::Uuid;

use sharehub_auth::{PasswordHasher, Principal};
use sharehub_core::config::delivery::DeliveryConfig;
use sharehub_core::config::settings::RuntimeSettings;
use sharehub_core::config::sharing::SharingConfig;
use sharehub_core::traits::storage::StorageProvider;
use sharehub_database::{MemoryStore, Stores};
use sharehub_entity::directory::{CreateDirectory, Directory, join_path};
use sharehub_entity::file::{CreateFile, File};
use sharehub_entity::share::ResourceType;
use sharehub_entity::user::UserAccount;
use sharehub_storage::{LocalStorageProvider, PresignedLinks};

use crate::context::{ClientMeta, RequestContext, ShareCredential};
use crate::delivery::DeliveryEngine;
use crate::directory::DirectoryService;
use crate::file::FileService;
use crate::permission::PermissionResolver;
use crate::quota::QuotaTracker;
use crate::share::{CreateShareParams, ShareService};

pub(crate) struct Harness {
    pub store: Arc<MemoryStore>,
    pub stores: Stores,
    pub storage: Arc<dyn StorageProvider>,
    pub links: Arc<PresignedLinks>,
    pub settings: RuntimeSettings,
    pub quota: Arc<QuotaTracker>,
    pub shares: Arc<ShareService>,
    pub resolver: Arc<PermissionResolver>,
    pub delivery: DeliveryEngine,
    pub files: FileService,
    pub directories: DirectoryService,
    _root: tempfile::TempDir,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_max_depth(64).await
    }

    pub async fn with_max_depth(max_depth: usize) -> Self {
        let root = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        let stores = Stores::memory(store.clone());
        let links = Arc::new(PresignedLinks::new());
        let storage: Arc<dyn StorageProvider> = Arc::new(
            LocalStorageProvider::new(root.path(), "http://localhost:8080", links.clone())
                .await
                .unwrap(),
        );

        let quota = Arc::new(QuotaTracker::new(stores.clone()));
        let shares = Arc::new(ShareService::new(
            stores.clone(),
            PasswordHasher::new(),
            SharingConfig::default(),
        ));
        let resolver = Arc::new(PermissionResolver::new(
            stores.clone(),
            shares.clone(),
            quota.clone(),
            max_depth,
        ));
        let delivery_config = DeliveryConfig {
            max_traversal_depth: max_depth,
            archive_channel_capacity: 4,
        };
        let delivery = DeliveryEngine::new(
            stores.clone(),
            storage.clone(),
            resolver.clone(),
            shares.clone(),
            Duration::from_secs(900),
            &delivery_config,
        );
        let files = FileService::new(
            stores.clone(),
            storage.clone(),
            resolver.clone(),
            shares.clone(),
        );
        let directories = DirectoryService::new(
            stores.clone(),
            storage.clone(),
            resolver.clone(),
            shares.clone(),
            max_depth,
        );

        Self {
            store,
            stores,
            storage,
            links,
            settings: RuntimeSettings::default(),
            quota,
            shares,
            resolver,
            delivery,
            files,
            directories,
            _root: root,
        }
    }

    pub fn user(&self, name: &str) -> Uuid {
        self.user_with_quota(name, None)
    }

    pub fn user_with_quota(&self, name: &str, quota: Option<i64>) -> Uuid {
        let id = Uuid::new_v4();
        self.store.insert_user(UserAccount {
            id,
            username: name.to_string(),
            storage_quota_bytes: quota,
            created_at: Utc::now(),
        });
        id
    }

    pub fn settings_with_default_quota(&self, default_quota_bytes: i64) -> RuntimeSettings {
        RuntimeSettings {
            default_quota_bytes,
            ..self.settings.clone()
        }
    }

    pub fn ctx(&self, principal: Principal, share: Option<ShareCredential>) -> RequestContext {
        RequestContext::new(principal, share, ClientMeta::default(), self.settings.clone())
    }

    pub async fn seed_dir(&self, owner: Uuid, parent: Option<&Directory>, name: &str) -> Directory {
        self.stores
            .directories
            .create(&CreateDirectory {
                owner_id: owner,
                parent_id: parent.map(|p| p.id),
                name: name.to_string(),
                path: join_path(parent.map_or("", |p| p.path.as_str()), name),
            })
            .await
            .unwrap()
    }

    pub async fn seed_file(
        &self,
        owner: Uuid,
        parent: Option<&Directory>,
        name: &str,
        size: usize,
    ) -> File {
        self.seed_file_with(owner, parent, name, &vec![b'x'; size])
            .await
    }

    pub async fn seed_file_with(
        &self,
        owner: Uuid,
        parent: Option<&Directory>,
        name: &str,
        data: &[u8],
    ) -> File {
        let id = Uuid::new_v4();
        let storage_key = format!("{owner}/{id}");
        self.storage
            .write(&storage_key, Bytes::copy_from_slice(data))
            .await
            .unwrap();
        self.stores
            .files
            .create(&CreateFile {
                id,
                owner_id: owner,
                name: name.to_string(),
                storage_key,
                size_bytes: data.len() as i64,
                mime_type: "application/octet-stream".to_string(),
                directory_id: parent.map(|p| p.id),
                path: join_path(parent.map_or("", |p| p.path.as_str()), name),
            })
            .await
            .unwrap()
    }

    pub async fn share_credential(
        &self,
        owner: Uuid,
        resource_type: ResourceType,
        resource_id: Uuid,
        permission: &str,
    ) -> ShareCredential {
        let share = self
            .shares
            .create_share(
                CreateShareParams {
                    resource_type,
                    resource_id,
                    permission_type: permission.to_string(),
                    password: None,
                    expires_at: None,
                },
                &self.settings,
            )
            .await
            .unwrap();
        assert_eq!(share.owner_id, owner);
        ShareCredential {
            token: share.token,
            password: None,
        }
    }

    pub async fn revoke(&self, share_id: Uuid) {
        assert!(self.stores.shares.delete(share_id).await.unwrap());
    }

    pub async fn expire_share(&self, share_id: Uuid) {
        self.stores
            .shares
            .update_expiration(share_id, Some(Utc::now() - chrono::Duration::hours(1)))
            .await
            .unwrap();
    }
}
