//! Shared test helpers for API integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use chrono::Utc;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

use sharehub_api::{AppState, build_app};
use sharehub_auth::JwtEncoder;
use sharehub_core::config::app::ServerConfig;
use sharehub_core::config::auth::AuthConfig;
use sharehub_core::config::delivery::DeliveryConfig;
use sharehub_core::config::logging::LoggingConfig;
use sharehub_core::config::sharing::{QuotaConfig, SharingConfig};
use sharehub_core::config::storage::{LocalStorageConfig, StorageConfig};
use sharehub_core::config::{AppConfig, DatabaseConfig};
use sharehub_database::{MemoryStore, Stores};
use sharehub_entity::user::UserAccount;
use sharehub_storage::BlobBackend;

pub const PUBLIC_URL: &str = "http://localhost:8080";

const BOUNDARY: &str = "sharehub-test-boundary";

/// Test application context
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// Application state, for direct store access
    pub state: AppState,
    /// In-process entity store
    pub store: Arc<MemoryStore>,
    encoder: JwtEncoder,
    _blobs: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Raw body
    pub bytes: Vec<u8>,
}

impl TestResponse {
    /// Body parsed as JSON, `Null` when it is not JSON.
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.bytes).unwrap_or(Value::Null)
    }

    /// A header as a string.
    pub fn header(&self, name: &str) -> Option<String> {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }
}

impl TestApp {
    /// Create a new test application backed by memory and a temp directory.
    pub async fn new() -> Self {
        Self::with_default_quota(10_737_418_240).await
    }

    /// Create a test application with a given default quota.
    pub async fn with_default_quota(default_quota_bytes: i64) -> Self {
        let blobs_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let config = AppConfig {
            server: ServerConfig {
                public_url: PUBLIC_URL.to_string(),
                ..ServerConfig::default()
            },
            database: DatabaseConfig {
                url: String::new(),
                max_connections: 1,
                min_connections: 0,
                connect_timeout_seconds: 1,
                idle_timeout_seconds: 1,
                run_migrations: false,
            },
            storage: StorageConfig {
                local: LocalStorageConfig {
                    root_path: blobs_dir.path().to_string_lossy().into_owned(),
                },
                ..StorageConfig::default()
            },
            auth: AuthConfig {
                jwt_secret: "integration-test-secret".to_string(),
                jwt_issuer: String::new(),
                leeway_seconds: 0,
            },
            sharing: SharingConfig::default(),
            quota: QuotaConfig {
                default_quota_bytes,
            },
            delivery: DeliveryConfig::default(),
            logging: LoggingConfig::default(),
        };

        let blobs = BlobBackend::from_config(&config.storage, &config.server.public_url)
            .await
            .expect("Failed to init storage");
        let store = Arc::new(MemoryStore::new());
        let encoder = JwtEncoder::new(&config.auth);
        let state = AppState::new(config, Stores::memory(Arc::clone(&store)), blobs);

        Self {
            router: build_app(state.clone()),
            state,
            store,
            encoder,
            _blobs: blobs_dir,
        }
    }

    /// Register a user and return its ID and a bearer token.
    pub fn create_user(&self, username: &str) -> (Uuid, String) {
        self.create_user_with_quota(username, None)
    }

    /// Register a user with a per-user quota override.
    pub fn create_user_with_quota(&self, username: &str, quota: Option<i64>) -> (Uuid, String) {
        let id = Uuid::new_v4();
        self.store.insert_user(UserAccount {
            id,
            username: username.to_string(),
            storage_quota_bytes: quota,
            created_at: Utc::now(),
        });
        let token = self
            .encoder
            .issue(id, username, chrono::Duration::hours(1))
            .expect("Failed to issue token");
        (id, token)
    }

    /// Send a request with an optional JSON body and bearer token.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> TestResponse {
        let mut req = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(value) => {
                req = req.header(header::CONTENT_TYPE, "application/json");
                Body::from(serde_json::to_vec(&value).expect("Failed to serialize body"))
            }
            None => Body::empty(),
        };
        self.send(req.body(body).expect("Failed to build request"))
            .await
    }

    /// Upload a file as multipart form data.
    pub async fn upload(
        &self,
        query: &str,
        file_name: &str,
        data: &[u8],
        token: Option<&str>,
    ) -> TestResponse {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        let mut req = Request::builder()
            .method(Method::POST)
            .uri(format!("/api/files/upload{query}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            );
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        self.send(req.body(Body::from(body)).expect("Failed to build request"))
            .await
    }

    /// Upload into a directory as an authenticated user and return the file ID.
    pub async fn upload_owned(
        &self,
        token: &str,
        directory_id: Option<Uuid>,
        file_name: &str,
        data: &[u8],
    ) -> Uuid {
        let query = directory_id
            .map(|id| format!("?directory_id={id}"))
            .unwrap_or_default();
        let resp = self.upload(&query, file_name, data, Some(token)).await;
        assert_eq!(resp.status, StatusCode::OK, "upload failed: {:?}", resp.json());
        id_of(&resp.json())
    }

    /// Create a directory as an authenticated user and return its ID.
    pub async fn create_directory(&self, token: &str, parent_id: Option<Uuid>, name: &str) -> Uuid {
        let resp = self
            .request(
                Method::POST,
                "/api/directories",
                Some(serde_json::json!({ "parent_id": parent_id, "name": name })),
                Some(token),
            )
            .await;
        assert_eq!(resp.status, StatusCode::OK, "mkdir failed: {:?}", resp.json());
        id_of(&resp.json())
    }

    /// Create a share and return its `data` object.
    pub async fn create_share(
        &self,
        token: &str,
        resource_type: &str,
        resource_id: Uuid,
        permission_type: &str,
        password: Option<&str>,
    ) -> Value {
        let resp = self
            .request(
                Method::POST,
                "/api/shares",
                Some(serde_json::json!({
                    "resource_type": resource_type,
                    "resource_id": resource_id,
                    "permission_type": permission_type,
                    "password": password,
                })),
                Some(token),
            )
            .await;
        assert_eq!(resp.status, StatusCode::OK, "share failed: {:?}", resp.json());
        resp.json()["data"].clone()
    }

    async fn send(&self, req: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read body")
            .to_bytes()
            .to_vec();

        TestResponse {
            status,
            headers,
            bytes,
        }
    }
}

/// `data.id` of a standard success response.
pub fn id_of(body: &Value) -> Uuid {
    body["data"]["id"]
        .as_str()
        .and_then(|s| s.parse().ok())
        .expect("response has no data.id")
}

/// Names of the entries in a ZIP archive.
pub fn zip_entries(bytes: &[u8]) -> Vec<String> {
    let mut archive =
        zip::ZipArchive::new(std::io::Cursor::new(bytes.to_vec())).expect("Invalid ZIP archive");
    let mut names: Vec<String> = (0..archive.len())
        .map(|i| archive.by_index(i).expect("Bad entry").name().to_string())
        .collect();
    names.sort();
    names
}

/// Contents of one entry in a ZIP archive.
pub fn zip_entry(bytes: &[u8], name: &str) -> Vec<u8> {
    use std::io::Read;

    let mut archive =
        zip::ZipArchive::new(std::io::Cursor::new(bytes.to_vec())).expect("Invalid ZIP archive");
    let mut entry = archive.by_name(name).expect("Missing entry");
    let mut out = Vec::new();
    entry.read_to_end(&mut out).expect("Failed to read entry");
    out
}
