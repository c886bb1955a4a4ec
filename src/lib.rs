pub mod analytics; // Trends, anomaly detection, health score
pub mod api; // HTTP query layer
pub mod config;
pub mod models;
pub mod store; // Per-user observation storage

use std::sync::Arc;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use analytics::{AnalyticsEngine, AnalyticsError, ReferenceCatalog};
use config::{AnalyticsConfig, ConfigError, ServerConfig};
use store::InMemoryRecordStore;

#[derive(Error, Debug)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Analytics(#[from] AnalyticsError),
    #[error("Server failed to start: {0}")]
    Server(String),
}

/// Build the engine from the configured files, falling back to defaults.
pub fn build_engine(server: &ServerConfig) -> Result<AnalyticsEngine, StartupError> {
    let analytics_config = match &server.analytics_config_path {
        Some(path) => AnalyticsConfig::load(path)?,
        None => AnalyticsConfig::default(),
    };

    let catalog = match &server.reference_ranges_path {
        Some(path) => ReferenceCatalog::load(path)?,
        None => ReferenceCatalog::builtin(),
    };

    tracing::info!(
        ranges = catalog.ranges().len(),
        contamination = analytics_config.contamination,
        min_history = analytics_config.min_history,
        "Analytics engine configured"
    );

    Ok(AnalyticsEngine::new(Arc::new(catalog), analytics_config))
}

/// Run the query server until Ctrl-C.
pub async fn run() -> Result<(), StartupError> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let server_config = ServerConfig::from_env()?;
    let engine = build_engine(&server_config)?;

    let ctx = api::ApiContext::new(Arc::new(engine), Arc::new(InMemoryRecordStore::new()));
    let app = api::analytics_router(ctx).layer(api::cors_layer(&server_config.cors_origins));

    let mut server = api::start_server(app, server_config.bind_addr)
        .await
        .map_err(StartupError::Server)?;

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Cannot listen for shutdown signal: {e}");
    }
    server.shutdown();

    Ok(())
}
