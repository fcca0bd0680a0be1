//! Marine monitoring library
//!
//! This crate provides the core functionality for:
//! - Anomaly detection on sea-surface temperature and chlorophyll
//! - Measurement history, CSV import and alert storage
//! - Advisory rendering and notification delivery
//! - Health checks and observability

pub mod advisory;
pub mod anomaly;
pub mod error;
pub mod health;
pub mod ingest;
pub mod models;
pub mod notify;
pub mod observability;
pub mod store;

#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;

pub use anomaly::{Alert, AlertStatus, AnomalyEvaluator, DetectorConfig, Evaluation};
pub use error::{AdvisoryError, ConfigError, ImportError, StoreError, ValidationError};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{MonitorMetrics, StructuredLogger};
