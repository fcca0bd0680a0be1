//! Alert composition
//!
//! Turns the triggers of one evaluation into a single self-describing
//! alert record. Ids, creation timestamps and lifecycle changes belong to
//! the alert store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::rules::Trigger;
use crate::models::{Location, Measurement};

/// Classification label for alerts raised by this detector
pub const ENVIRONMENTAL_RISK: &str = "environmental risk";

/// Separator between trigger phrases in the alert message
pub const PHRASE_SEPARATOR: &str = "; ";

/// Alert lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertStatus {
    Active,
    Resolved,
}

impl std::fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertStatus::Active => write!(f, "Active"),
            AlertStatus::Resolved => write!(f, "Resolved"),
        }
    }
}

/// Alert produced by the anomaly evaluator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Classification label
    #[serde(rename = "type")]
    pub alert_type: String,
    pub status: AlertStatus,
    /// Trigger phrases joined in channel order
    pub message: String,
    /// Observed sea-surface temperature
    pub sst: f64,
    /// Observed chlorophyll concentration
    pub chl: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    /// Timestamp carried by the triggering measurement
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_at: Option<DateTime<Utc>>,
    pub triggers: Vec<Trigger>,
}

impl Alert {
    /// Channels that contributed to this alert
    pub fn channel_labels(&self) -> Vec<&'static str> {
        self.triggers.iter().map(|t| t.channel.label()).collect()
    }
}

/// Compose an active alert from a non-empty trigger list
///
/// Returns `None` when nothing triggered.
pub fn compose(triggers: Vec<Trigger>, measurement: &Measurement) -> Option<Alert> {
    if triggers.is_empty() {
        return None;
    }

    let message = triggers
        .iter()
        .flat_map(Trigger::phrases)
        .collect::<Vec<_>>()
        .join(PHRASE_SEPARATOR);

    Some(Alert {
        alert_type: ENVIRONMENTAL_RISK.to_string(),
        status: AlertStatus::Active,
        message,
        sst: measurement.sst,
        chl: measurement.chl,
        location: measurement.location,
        observed_at: measurement.timestamp,
        triggers,
    })
}
