//! Shared application state passed to all handlers via Axum's `State` extractor.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;

use sharehub_auth::{JwtDecoder, PasswordHasher, Principal};
use sharehub_core::config::AppConfig;
use sharehub_core::config::settings::RuntimeSettings;
use sharehub_core::traits::storage::StorageProvider;
use sharehub_database::Stores;
use sharehub_service::{
    ClientMeta, DeliveryEngine, DirectoryService, FileService, PermissionResolver, QuotaTracker,
    RequestContext, ShareCredential, ShareService,
};
use sharehub_storage::{BlobBackend, PresignedLinks};

/// Central application state shared across all request handlers.
///
/// All fields are wrapped in `Arc` for cheap cloning across tasks.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Operator-tunable settings; handlers take a snapshot per request.
    pub settings: Arc<RwLock<RuntimeSettings>>,
    /// Entity stores.
    pub stores: Stores,
    /// Blob store.
    pub storage: Arc<dyn StorageProvider>,
    /// Local pre-signed link registry.
    pub links: Arc<PresignedLinks>,
    /// Bearer token verification.
    pub jwt_decoder: Arc<JwtDecoder>,
    /// Share lifecycle.
    pub share_service: Arc<ShareService>,
    /// Access decisions.
    pub permission_resolver: Arc<PermissionResolver>,
    /// Quota accounting.
    pub quota_tracker: Arc<QuotaTracker>,
    /// Downloads and archives.
    pub delivery_engine: Arc<DeliveryEngine>,
    /// File operations.
    pub file_service: Arc<FileService>,
    /// Directory operations.
    pub directory_service: Arc<DirectoryService>,
}

impl AppState {
    /// Wire every service from configuration, stores and the blob backend.
    pub fn new(config: AppConfig, stores: Stores, blobs: BlobBackend) -> Self {
        let storage = blobs.provider;
        let max_depth = config.delivery.max_traversal_depth;

        let quota_tracker = Arc::new(QuotaTracker::new(stores.clone()));
        let share_service = Arc::new(ShareService::new(
            stores.clone(),
            PasswordHasher::new(),
            config.sharing.clone(),
        ));
        let permission_resolver = Arc::new(PermissionResolver::new(
            stores.clone(),
            Arc::clone(&share_service),
            Arc::clone(&quota_tracker),
            max_depth,
        ));
        let delivery_engine = Arc::new(DeliveryEngine::new(
            stores.clone(),
            Arc::clone(&storage),
            Arc::clone(&permission_resolver),
            Arc::clone(&share_service),
            Duration::from_secs(config.storage.presign_ttl_seconds),
            &config.delivery,
        ));
        let file_service = Arc::new(FileService::new(
            stores.clone(),
            Arc::clone(&storage),
            Arc::clone(&permission_resolver),
            Arc::clone(&share_service),
        ));
        let directory_service = Arc::new(DirectoryService::new(
            stores.clone(),
            Arc::clone(&storage),
            Arc::clone(&permission_resolver),
            Arc::clone(&share_service),
            max_depth,
        ));

        Self {
            settings: Arc::new(RwLock::new(RuntimeSettings::from_config(&config))),
            jwt_decoder: Arc::new(JwtDecoder::new(&config.auth)),
            config: Arc::new(config),
            stores,
            storage,
            links: blobs.links,
            share_service,
            permission_resolver,
            quota_tracker,
            delivery_engine,
            file_service,
            directory_service,
        }
    }

    /// Current settings, copied out so one request sees one set of values.
    pub async fn settings_snapshot(&self) -> RuntimeSettings {
        self.settings.read().await.clone()
    }

    /// Build the context for a service call.
    pub async fn context(
        &self,
        principal: Principal,
        share: Option<ShareCredential>,
        client: ClientMeta,
    ) -> RequestContext {
        RequestContext::new(principal, share, client, self.settings_snapshot().await)
    }
}
