//! EWM API - event listing and participation server

use axum_helpers::server::{create_app, create_router, health_router};
use core_config::tracing::{init_tracing, install_color_eyre};
use domain_events::{EventContext, HttpStatsClient, handlers};
use std::sync::Arc;
use tracing::info;

mod config;
mod openapi;

use config::Config;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    install_color_eyre();

    let config = Config::from_env()?;
    init_tracing(&config.environment);

    info!(
        stats_url = %config.stats.server_url,
        timeout_ms = config.stats.timeout.as_millis() as u64,
        "Using stats service"
    );
    let stats = HttpStatsClient::new(config.stats.server_url.clone(), config.stats.timeout)?;

    let ctx = EventContext::in_memory(Arc::new(stats)).with_app_name(config.stats.app_name.clone());

    let app = create_router::<openapi::ApiDoc>(handlers::router(ctx)).merge(health_router(config.app));

    info!("Starting {} v{} on port {}", config.app.name, config.app.version, config.server.port);

    create_app(app, &config.server)
        .await
        .map_err(|e| eyre::eyre!("Server error: {}", e))?;

    info!("EWM API shutdown complete");
    Ok(())
}
