//! Anomaly evaluation
//!
//! Scores a new measurement against the recent history of each channel,
//! applies the threshold rules and composes at most one alert.

use serde::{Deserialize, Serialize};

use super::composer::{compose, Alert};
use super::rules::{AbsoluteBound, ChannelReading, ThresholdRules};
use super::scorer::deviation_score;
use crate::error::{ConfigError, ValidationError};
use crate::models::{Channel, ChannelHistory, Measurement};

/// Default number of prior values used as the statistical baseline
pub const DEFAULT_WINDOW_SIZE: usize = 30;

/// Detector configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    #[serde(flatten)]
    pub rules: ThresholdRules,
    /// Maximum history values considered per channel
    pub window_size: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            rules: ThresholdRules::default(),
            window_size: DEFAULT_WINDOW_SIZE,
        }
    }
}

impl DetectorConfig {
    pub fn with_z_threshold(mut self, z_threshold: f64) -> Self {
        self.rules.z_threshold = z_threshold;
        self
    }

    pub fn with_window_size(mut self, window_size: usize) -> Self {
        self.window_size = window_size;
        self
    }

    pub fn with_bound(mut self, channel: Channel, bound: AbsoluteBound) -> Self {
        match channel {
            Channel::SeaSurfaceTemperature => self.rules.sst_bound = bound,
            Channel::Chlorophyll => self.rules.chl_bound = bound,
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_size == 0 {
            return Err(ConfigError::WindowSize);
        }
        self.rules.validate()
    }
}

/// Outcome of one evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Evaluation {
    /// One or more channels tripped a rule
    Anomaly(Alert),
    /// Nothing tripped; observed values kept for auditing
    NoAnomaly { sst: f64, chl: f64 },
}

impl Evaluation {
    pub fn is_anomaly(&self) -> bool {
        matches!(self, Evaluation::Anomaly(_))
    }

    pub fn alert(&self) -> Option<&Alert> {
        match self {
            Evaluation::Anomaly(alert) => Some(alert),
            Evaluation::NoAnomaly { .. } => None,
        }
    }

    pub fn into_alert(self) -> Option<Alert> {
        match self {
            Evaluation::Anomaly(alert) => Some(alert),
            Evaluation::NoAnomaly { .. } => None,
        }
    }
}

/// Stateless evaluator combining the scorer, rule engine and composer
#[derive(Debug, Clone, Default)]
pub struct AnomalyEvaluator {
    config: DetectorConfig,
}

impl AnomalyEvaluator {
    /// Create an evaluator, rejecting invalid configuration
    pub fn new(config: DetectorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Score every channel without applying any rule
    ///
    /// Only the first `window_size` history values of each channel are used.
    pub fn readings(&self, measurement: &Measurement, history: &ChannelHistory) -> Vec<ChannelReading> {
        Channel::ALL
            .iter()
            .map(|&channel| {
                let window = history.for_channel(channel);
                let window = &window[..window.len().min(self.config.window_size)];
                let observed = measurement.value(channel);
                ChannelReading {
                    channel,
                    observed,
                    score: deviation_score(observed, window),
                }
            })
            .collect()
    }

    /// Evaluate a measurement against its channel histories
    ///
    /// # Errors
    /// Returns a [`ValidationError`] for non-finite values or out-of-range
    /// coordinates; nothing is scored in that case.
    pub fn evaluate(
        &self,
        measurement: &Measurement,
        history: &ChannelHistory,
    ) -> Result<Evaluation, ValidationError> {
        measurement.validate()?;
        history.validate()?;

        let readings = self.readings(measurement, history);
        let triggers = self.config.rules.evaluate(&readings);

        Ok(match compose(triggers, measurement) {
            Some(alert) => Evaluation::Anomaly(alert),
            None => Evaluation::NoAnomaly {
                sst: measurement.sst,
                chl: measurement.chl,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anomaly::composer::AlertStatus;

    const SST_HISTORY: [f64; 5] = [27.0, 27.1, 26.9, 27.2, 27.0];

    fn evaluator() -> AnomalyEvaluator {
        AnomalyEvaluator::new(DetectorConfig::default()).unwrap()
    }

    #[test]
    fn test_scenario_hot_spike_fires_both_rules() {
        let history = ChannelHistory::new(SST_HISTORY.to_vec(), vec![]);
        let result = evaluator()
            .evaluate(&Measurement::new(32.0, 1.0), &history)
            .unwrap();

        let alert = result.alert().expect("expected an alert");
        assert!(alert.message.contains("SST z="));
        assert!(alert.message.contains("SST too high: 32.0"));
        assert!(!alert.message.contains("Chl"));
        assert_eq!(alert.status, AlertStatus::Active);
        assert_eq!(alert.sst, 32.0);
        assert_eq!(alert.chl, 1.0);
    }

    #[test]
    fn test_scenario_normal_reading_is_quiet() {
        let history = ChannelHistory::new(SST_HISTORY.to_vec(), vec![]);
        let result = evaluator()
            .evaluate(&Measurement::new(27.0, 0.5), &history)
            .unwrap();

        assert_eq!(result, Evaluation::NoAnomaly { sst: 27.0, chl: 0.5 });
    }

    #[test]
    fn test_scenario_cold_start_uses_absolute_rule() {
        let result = evaluator()
            .evaluate(&Measurement::new(28.0, 3.5), &ChannelHistory::default())
            .unwrap();

        let alert = result.into_alert().expect("expected an alert");
        assert_eq!(alert.message, "Chl too high: 3.50");
        assert_eq!(alert.channel_labels(), vec!["Chl"]);
    }

    #[test]
    fn test_scenario_constant_history() {
        let history = ChannelHistory::new(vec![25.0, 25.0, 25.0], vec![]);
        let ev = evaluator();
        let measurement = Measurement::new(25.0, 0.3);

        let readings = ev.readings(&measurement, &history);
        assert_eq!(readings[0].score, None);

        let result = ev.evaluate(&measurement, &history).unwrap();
        assert!(!result.is_anomaly());
    }

    #[test]
    fn test_constant_decimal_histories_are_quiet() {
        let ev = evaluator();

        let chl_flat = ChannelHistory::new(vec![], vec![0.1, 0.1, 0.1]);
        let result = ev.evaluate(&Measurement::new(25.0, 0.2), &chl_flat).unwrap();
        assert_eq!(result, Evaluation::NoAnomaly { sst: 25.0, chl: 0.2 });

        let sst_flat = ChannelHistory::new(vec![0.7, 0.7, 0.7], vec![]);
        let measurement = Measurement::new(0.8, 0.3);
        assert_eq!(ev.readings(&measurement, &sst_flat)[0].score, None);
        assert!(!ev.evaluate(&measurement, &sst_flat).unwrap().is_anomaly());
    }

    #[test]
    fn test_empty_history_above_bound() {
        let result = evaluator()
            .evaluate(&Measurement::new(31.0, 0.2), &ChannelHistory::default())
            .unwrap();
        assert_eq!(result.alert().unwrap().message, "SST too high: 31.0");
    }

    #[test]
    fn test_exact_threshold_triggers() {
        // mean 2, population std 1, observed 4 -> z = 2.0
        let history = ChannelHistory::new(vec![1.0, 3.0], vec![]);
        let result = evaluator()
            .evaluate(&Measurement::new(4.0, 0.5), &history)
            .unwrap();
        assert_eq!(result.alert().unwrap().message, "SST z=2.00");
    }

    #[test]
    fn test_window_caps_history() {
        // Only the two most recent values (mean 2, std 1) are considered
        let history = ChannelHistory::new(vec![1.0, 3.0, 100.0, -100.0], vec![]);
        let ev = AnomalyEvaluator::new(DetectorConfig::default().with_window_size(2)).unwrap();
        let readings = ev.readings(&Measurement::new(5.0, 0.5), &history);
        assert!((readings[0].score.unwrap() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_evaluation_is_idempotent() {
        let history = ChannelHistory::new(SST_HISTORY.to_vec(), vec![0.3, 0.35, 0.28]);
        let measurement = Measurement::new(29.4, 4.1).with_location(12.0, 72.5);
        let ev = evaluator();

        let first = serde_json::to_string(&ev.evaluate(&measurement, &history).unwrap()).unwrap();
        let second = serde_json::to_string(&ev.evaluate(&measurement, &history).unwrap()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_history_is_not_mutated() {
        let history = ChannelHistory::new(SST_HISTORY.to_vec(), vec![0.3, 0.4]);
        let snapshot = history.clone();
        evaluator()
            .evaluate(&Measurement::new(35.0, 5.0), &history)
            .unwrap();
        assert_eq!(history, snapshot);
    }

    #[test]
    fn test_malformed_input_is_rejected() {
        let ev = evaluator();
        assert!(ev
            .evaluate(&Measurement::new(f64::NAN, 0.5), &ChannelHistory::default())
            .is_err());
        assert!(ev
            .evaluate(
                &Measurement::new(27.0, 0.5).with_location(0.0, 200.0),
                &ChannelHistory::default()
            )
            .is_err());
        assert!(ev
            .evaluate(
                &Measurement::new(27.0, 0.5),
                &ChannelHistory::new(vec![f64::INFINITY], vec![])
            )
            .is_err());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        assert_eq!(
            AnomalyEvaluator::new(DetectorConfig::default().with_window_size(0)).unwrap_err(),
            ConfigError::WindowSize
        );
        assert!(AnomalyEvaluator::new(DetectorConfig::default().with_z_threshold(-1.0)).is_err());
    }

    #[test]
    fn test_custom_bounds() {
        let config = DetectorConfig::default()
            .with_bound(Channel::Chlorophyll, AbsoluteBound::Above { max: 1.0 });
        let ev = AnomalyEvaluator::new(config).unwrap();
        let result = ev
            .evaluate(&Measurement::new(27.0, 1.5), &ChannelHistory::default())
            .unwrap();
        assert_eq!(result.alert().unwrap().message, "Chl too high: 1.50");
    }

    #[test]
    fn test_evaluation_serialization_tags() {
        let quiet = Evaluation::NoAnomaly { sst: 27.0, chl: 0.5 };
        let json = serde_json::to_value(&quiet).unwrap();
        assert_eq!(json["result"], "no_anomaly");
        assert_eq!(json["sst"], 27.0);
    }
}
