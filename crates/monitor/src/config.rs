//! Monitor configuration

use anyhow::{Context, Result};
use monitor_lib::anomaly::{
    AbsoluteBound, DetectorConfig, ThresholdRules, DEFAULT_CHL_MAX, DEFAULT_SST_MAX,
    DEFAULT_WINDOW_SIZE, DEFAULT_Z_THRESHOLD,
};
use monitor_lib::notify::DefaultTargets;
use monitor_lib::store::DEFAULT_ALERT_CAPACITY;
use serde::Deserialize;

/// Monitor configuration
///
/// Read from an optional `monitor.{toml,yaml,json}` file (path overridable
/// through `MONITOR_CONFIG`) and then from `MONITOR_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    /// Name reported in structured logs
    #[serde(default = "default_node_name")]
    pub node_name: String,

    /// HTTP port for the API, health and metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Standard deviations required by the statistical rule
    #[serde(default = "default_z_threshold")]
    pub z_threshold: f64,

    /// Prior values per channel used as the baseline
    #[serde(default = "default_window_size")]
    pub window_size: usize,

    /// Upper bound for sea-surface temperature
    #[serde(default = "default_sst_max")]
    pub sst_max: f64,

    /// Optional lower bound for sea-surface temperature
    #[serde(default)]
    pub sst_min: Option<f64>,

    /// Upper bound for chlorophyll concentration
    #[serde(default = "default_chl_max")]
    pub chl_max: f64,

    /// Measurements kept in the in-memory history
    #[serde(default = "default_measurement_capacity")]
    pub measurement_capacity: usize,

    /// Alerts kept in memory; resolved alerts are dropped first
    #[serde(default = "default_alert_capacity")]
    pub alert_capacity: usize,

    /// Fallback SMS recipient
    #[serde(default = "default_sms_to")]
    pub notify_sms_to: String,

    /// Fallback Telegram chat
    #[serde(default = "default_telegram_chat")]
    pub notify_telegram_chat: String,

    /// Fallback e-mail recipient
    #[serde(default = "default_email_to")]
    pub notify_email_to: String,
}

fn default_node_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string())
}

fn default_api_port() -> u16 {
    8000
}

fn default_z_threshold() -> f64 {
    DEFAULT_Z_THRESHOLD
}

fn default_window_size() -> usize {
    DEFAULT_WINDOW_SIZE
}

fn default_sst_max() -> f64 {
    DEFAULT_SST_MAX
}

fn default_chl_max() -> f64 {
    DEFAULT_CHL_MAX
}

fn default_measurement_capacity() -> usize {
    10_000
}

fn default_alert_capacity() -> usize {
    DEFAULT_ALERT_CAPACITY
}

fn default_sms_to() -> String {
    "+0000000000".to_string()
}

fn default_telegram_chat() -> String {
    "demo_chat".to_string()
}

fn default_email_to() -> String {
    "demo@example.com".to_string()
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            node_name: default_node_name(),
            api_port: default_api_port(),
            z_threshold: default_z_threshold(),
            window_size: default_window_size(),
            sst_max: default_sst_max(),
            sst_min: None,
            chl_max: default_chl_max(),
            measurement_capacity: default_measurement_capacity(),
            alert_capacity: default_alert_capacity(),
            notify_sms_to: default_sms_to(),
            notify_telegram_chat: default_telegram_chat(),
            notify_email_to: default_email_to(),
        }
    }
}

impl MonitorConfig {
    /// Load configuration from config file and environment
    pub fn load() -> Result<Self> {
        let path = std::env::var("MONITOR_CONFIG").unwrap_or_else(|_| "monitor".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name(&path).required(false))
            .add_source(config::Environment::with_prefix("MONITOR").try_parsing(true))
            .build()
            .context("Failed to read monitor configuration")?;

        let config: MonitorConfig = config
            .try_deserialize()
            .context("Invalid monitor configuration")?;

        config
            .detector_config()
            .validate()
            .context("Invalid detector configuration")?;

        Ok(config)
    }

    /// Detector settings derived from this configuration
    pub fn detector_config(&self) -> DetectorConfig {
        let sst_bound = match self.sst_min {
            Some(min) => AbsoluteBound::Outside {
                min,
                max: self.sst_max,
            },
            None => AbsoluteBound::Above { max: self.sst_max },
        };

        DetectorConfig {
            rules: ThresholdRules {
                z_threshold: self.z_threshold,
                sst_bound,
                chl_bound: AbsoluteBound::Above { max: self.chl_max },
            },
            window_size: self.window_size,
        }
    }

    /// Fallback notification recipients
    pub fn default_targets(&self) -> DefaultTargets {
        let mut targets = DefaultTargets::default();
        targets.0.insert("sms".to_string(), self.notify_sms_to.clone());
        targets
            .0
            .insert("telegram".to_string(), self.notify_telegram_chat.clone());
        targets.0.insert("email".to_string(), self.notify_email_to.clone());
        targets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_detector_defaults() {
        let config = MonitorConfig::default();
        assert_eq!(config.detector_config(), DetectorConfig::default());
        assert_eq!(config.api_port, 8000);
    }

    #[test]
    fn test_sst_min_builds_band() {
        let config = MonitorConfig {
            sst_min: Some(18.0),
            sst_max: 31.0,
            ..MonitorConfig::default()
        };
        assert_eq!(
            config.detector_config().rules.sst_bound,
            AbsoluteBound::Outside {
                min: 18.0,
                max: 31.0
            }
        );
    }

    #[test]
    fn test_default_targets_from_config() {
        let config = MonitorConfig {
            notify_email_to: "ops@fisheries.example".to_string(),
            ..MonitorConfig::default()
        };
        let targets = config.default_targets();
        assert_eq!(targets.0["email"], "ops@fisheries.example");
        assert_eq!(targets.0["sms"], "+0000000000");
    }

    #[test]
    fn test_deserialize_partial_config() {
        let config: MonitorConfig =
            serde_json::from_str(r#"{"z_threshold": 2.5, "window_size": 14}"#).unwrap();
        assert_eq!(config.z_threshold, 2.5);
        assert_eq!(config.window_size, 14);
        assert_eq!(config.chl_max, DEFAULT_CHL_MAX);
        assert_eq!(config.alert_capacity, DEFAULT_ALERT_CAPACITY);
    }

    #[test]
    fn test_alert_capacity_override() {
        let config: MonitorConfig =
            serde_json::from_str(r#"{"alert_capacity": 25, "measurement_capacity": 500}"#)
                .unwrap();
        assert_eq!(config.alert_capacity, 25);
        assert_eq!(config.measurement_capacity, 500);
    }
}
