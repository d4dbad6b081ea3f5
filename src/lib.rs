pub mod api;
pub mod client;
pub mod config;
pub mod core_state;
pub mod crypto;
pub mod db;
pub mod models;
pub mod resources;

use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crate::config::ServerConfig;
use crate::core_state::CoreState;

/// Errors that stop the service from starting.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("{0}")]
    Core(#[from] core_state::CoreError),
    #[error("Failed to create data directory: {0}")]
    DataDir(#[from] std::io::Error),
    #[error("{0}")]
    Server(String),
}

/// Start the records API and serve until Ctrl-C.
pub async fn run() -> Result<(), StartupError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = ServerConfig::from_env()?;
    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let core = Arc::new(CoreState::from_config(&config));
    // Runs migrations before the first request.
    drop(core.open_db()?);
    if let Some(admin) = &config.bootstrap_admin {
        core.bootstrap(admin)?;
    }

    let server = api::start_api_server(core.clone(), config.bind_addr, config.cors_origin.as_deref())
        .await
        .map_err(StartupError::Server)?;

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
    }
    server.stop().await;

    match core.flush_and_prune_audit() {
        Ok(flushed) => tracing::info!(flushed, "Audit buffer flushed at shutdown"),
        Err(e) => tracing::warn!("Final audit flush failed: {e}"),
    }
    Ok(())
}
