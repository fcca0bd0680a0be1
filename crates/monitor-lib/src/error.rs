//! Error types for the monitor library

use thiserror::Error;

use crate::models::Channel;

/// Malformed input rejected before scoring
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("{channel} value must be finite, got {value}")]
    NonFiniteValue { channel: Channel, value: f64 },

    #[error("{channel} history contains a non-finite value: {value}")]
    NonFiniteHistory { channel: Channel, value: f64 },

    #[error("latitude {0} is outside [-90, 90]")]
    Latitude(f64),

    #[error("longitude {0} is outside [-180, 180]")]
    Longitude(f64),

    #[error("subscriber needs a phone number or an e-mail address")]
    MissingContact,
}

/// Invalid detector configuration
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("z-threshold must be a positive finite number, got {0}")]
    ZThreshold(f64),

    #[error("history window size must be at least 1")]
    WindowSize,

    #[error("invalid {channel} bound: {reason}")]
    Bound { channel: Channel, reason: String },
}

/// Failures reported by the alert and measurement stores
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("alert {0} not found")]
    AlertNotFound(u64),
}

/// CSV import failures that abort the whole upload
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ImportError {
    #[error("malformed CSV: {0}")]
    Csv(String),

    #[error("CSV header has no {0} column")]
    MissingColumn(&'static str),
}

/// Advisory document rendering failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AdvisoryError {
    #[error("failed to render advisory PDF: {0}")]
    Pdf(String),
}
