//! Application setup and initialization

pub mod database;
pub mod routes;
pub mod server;
pub mod services;

use crate::state::AppState;
use anyhow::Result;
use kubeapps_core::Config;
use kubeapps_worker::ConsumerHandle;
use std::sync::Arc;

pub struct Application {
    pub state: Arc<AppState>,
    pub router: axum::Router,
    /// Background consumer, when `SQS_CONSUMER_ENABLED` is set.
    pub consumer: Option<ConsumerHandle>,
}

/// Initialize the entire application
pub async fn initialize_app(config: &Config) -> Result<Application> {
    crate::telemetry::init_telemetry(&config.environment)
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    tracing::info!("Configuration loaded successfully");

    let pool = database::setup_database(config).await?;

    let services = services::initialize_services(config, pool).await?;

    let router = routes::setup_routes(config, services.state.clone())?;

    Ok(Application {
        state: services.state,
        router,
        consumer: services.consumer,
    })
}
