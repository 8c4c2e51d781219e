//! ShareHub Server: file sharing with share links, quotas and streamed
//! downloads.
//!
//! Main entry point that wires all crates together and starts the server.

use tracing_subscriber::{EnvFilter, fmt};

use sharehub_core::config::AppConfig;
use sharehub_core::error::AppError;
use sharehub_database::{DatabasePool, Stores};
use sharehub_storage::BlobBackend;

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

/// Load configuration from `config/` and `SHAREHUB__*` variables.
fn load_configuration() -> Result<AppConfig, AppError> {
    let env = std::env::var("SHAREHUB_ENV").unwrap_or_else(|_| "development".to_string());
    AppConfig::load(&env)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Connect the stores and blob backend, then serve until shutdown.
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting ShareHub v{}", env!("CARGO_PKG_VERSION"));

    let pool = DatabasePool::connect(&config.database).await?;
    let stores = Stores::postgres(&pool);
    let blobs = BlobBackend::from_config(&config.storage, &config.server.public_url).await?;

    let result = sharehub_api::run_server(config, stores, blobs).await;
    pool.close().await;
    result
}
