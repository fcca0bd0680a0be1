//! Marine Monitor service
//!
//! Wires the detector, stores, and notification dispatcher from
//! `monitor-lib` into an HTTP API.

pub mod api;
pub mod config;

use std::sync::Arc;

use anyhow::{Context, Result};
use monitor_lib::{
    anomaly::AnomalyEvaluator,
    health::HealthRegistry,
    notify::NotificationDispatcher,
    observability::{MonitorMetrics, StructuredLogger},
    store::{AlertStore, MeasurementStore},
};

/// Build the shared application state from configuration
pub fn build_state(
    config: &config::MonitorConfig,
    health_registry: HealthRegistry,
    metrics: MonitorMetrics,
) -> Result<Arc<api::AppState>> {
    let evaluator =
        AnomalyEvaluator::new(config.detector_config()).context("Invalid detector configuration")?;

    Ok(Arc::new(api::AppState::new(
        evaluator,
        Arc::new(MeasurementStore::with_capacity(config.measurement_capacity)),
        Arc::new(AlertStore::with_capacity(config.alert_capacity)),
        NotificationDispatcher::with_mock_channels(config.default_targets()),
        health_registry,
        metrics,
        StructuredLogger::new(&config.node_name),
    )))
}
