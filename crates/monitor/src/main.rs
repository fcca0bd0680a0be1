//! Marine Monitor - oceanographic anomaly detection service
//!
//! Accepts SST and chlorophyll measurements, raises environmental-risk
//! alerts, and serves advisories and notifications for them.

use anyhow::Result;
use marine_monitor::{api, build_state, config::MonitorConfig};
use monitor_lib::{
    health::HealthRegistry,
    observability::{MonitorMetrics, StructuredLogger},
};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const MONITOR_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting marine-monitor");

    let config = MonitorConfig::load()?;
    info!(
        node_name = %config.node_name,
        api_port = config.api_port,
        "Monitor configured"
    );

    let health_registry = HealthRegistry::new();
    let metrics = MonitorMetrics::new();
    let state = build_state(&config, health_registry.clone(), metrics)?;

    let logger = StructuredLogger::new(&config.node_name);
    logger.log_startup(MONITOR_VERSION, config.z_threshold, config.window_size);

    api::mark_ready(&health_registry).await;

    let server = tokio::spawn(api::serve(config.api_port, state));

    tokio::select! {
        result = server => {
            result??;
        }
        _ = tokio::signal::ctrl_c() => {
            logger.log_shutdown("SIGINT received");
        }
    }

    info!("Shutting down");
    Ok(())
}
