//! Core data models for the marine monitor

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::ValidationError;

/// A named numeric measurement stream
///
/// Variants are declared in the order trigger phrases are emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    SeaSurfaceTemperature,
    Chlorophyll,
}

impl Channel {
    /// All channels in declared order
    pub const ALL: [Channel; 2] = [Channel::SeaSurfaceTemperature, Channel::Chlorophyll];

    /// Short label used in alert messages
    pub fn label(&self) -> &'static str {
        match self {
            Channel::SeaSurfaceTemperature => "SST",
            Channel::Chlorophyll => "Chl",
        }
    }

    /// Format an observed value with the channel's display precision
    pub fn format_value(&self, value: f64) -> String {
        match self {
            Channel::SeaSurfaceTemperature => format!("{:.1}", value),
            Channel::Chlorophyll => format!("{:.2}", value),
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Geographic position in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
}

impl Location {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.lat.is_finite() || !(-90.0..=90.0).contains(&self.lat) {
            return Err(ValidationError::Latitude(self.lat));
        }
        if !self.lon.is_finite() || !(-180.0..=180.0).contains(&self.lon) {
            return Err(ValidationError::Longitude(self.lon));
        }
        Ok(())
    }
}

/// A single oceanographic observation covering every channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Sea-surface temperature
    pub sst: f64,
    /// Chlorophyll concentration
    pub chl: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Measurement {
    pub fn new(sst: f64, chl: f64) -> Self {
        Self {
            sst,
            chl,
            location: None,
            timestamp: None,
        }
    }

    pub fn with_location(mut self, lat: f64, lon: f64) -> Self {
        self.location = Some(Location { lat, lon });
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Observed value for a channel
    pub fn value(&self, channel: Channel) -> f64 {
        match channel {
            Channel::SeaSurfaceTemperature => self.sst,
            Channel::Chlorophyll => self.chl,
        }
    }

    /// Reject non-finite values and out-of-range coordinates
    pub fn validate(&self) -> Result<(), ValidationError> {
        for channel in Channel::ALL {
            let value = self.value(channel);
            if !value.is_finite() {
                return Err(ValidationError::NonFiniteValue { channel, value });
            }
        }
        if let Some(location) = &self.location {
            location.validate()?;
        }
        Ok(())
    }

    /// Stable SHA-256 fingerprint of the measurement's canonical JSON form
    pub fn fingerprint(&self) -> String {
        let canonical = serde_json::to_vec(self).unwrap_or_default();
        hex::encode(Sha256::digest(&canonical))
    }
}

/// Recent prior values per channel, most recent first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelHistory {
    #[serde(default)]
    pub sst: Vec<f64>,
    #[serde(default)]
    pub chl: Vec<f64>,
}

impl ChannelHistory {
    pub fn new(sst: Vec<f64>, chl: Vec<f64>) -> Self {
        Self { sst, chl }
    }

    pub fn for_channel(&self, channel: Channel) -> &[f64] {
        match channel {
            Channel::SeaSurfaceTemperature => &self.sst,
            Channel::Chlorophyll => &self.chl,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        for channel in Channel::ALL {
            if let Some(&value) = self.for_channel(channel).iter().find(|v| !v.is_finite()) {
                return Err(ValidationError::NonFiniteHistory { channel, value });
            }
        }
        Ok(())
    }
}

/// A recorded measurement with its provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeasurementRecord {
    pub id: u64,
    #[serde(flatten)]
    pub measurement: Measurement,
    pub fingerprint: String,
    pub received_at: DateTime<Utc>,
}
