//! Threshold rule engine
//!
//! Two independent rule families are evaluated for every channel:
//! - Statistical: the deviation score reaches the configured z-threshold
//! - Absolute: the observed value falls outside a fixed bound, with or
//!   without a score

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::models::Channel;

/// Default number of standard deviations for the statistical rule
pub const DEFAULT_Z_THRESHOLD: f64 = 2.0;

/// Default upper bound for sea-surface temperature
pub const DEFAULT_SST_MAX: f64 = 30.0;

/// Default upper bound for chlorophyll concentration
pub const DEFAULT_CHL_MAX: f64 = 3.0;

/// Fixed bound checked by the absolute rule (strict comparisons)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AbsoluteBound {
    /// Trips when the value exceeds `max`
    Above { max: f64 },
    /// Trips when the value drops below `min`
    Below { min: f64 },
    /// Trips when the value leaves `[min, max]`
    Outside { min: f64, max: f64 },
}

/// Direction in which an absolute bound was crossed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Breach {
    High,
    Low,
}

impl AbsoluteBound {
    pub fn check(&self, value: f64) -> Option<Breach> {
        match *self {
            AbsoluteBound::Above { max } if value > max => Some(Breach::High),
            AbsoluteBound::Below { min } if value < min => Some(Breach::Low),
            AbsoluteBound::Outside { max, .. } if value > max => Some(Breach::High),
            AbsoluteBound::Outside { min, .. } if value < min => Some(Breach::Low),
            _ => None,
        }
    }

    fn validate(&self, channel: Channel) -> Result<(), ConfigError> {
        let (min, max) = match *self {
            AbsoluteBound::Above { max } => (f64::NEG_INFINITY, max),
            AbsoluteBound::Below { min } => (min, f64::INFINITY),
            AbsoluteBound::Outside { min, max } => (min, max),
        };
        if min.is_nan() || max.is_nan() {
            return Err(ConfigError::Bound {
                channel,
                reason: "bound is NaN".to_string(),
            });
        }
        if min > max {
            return Err(ConfigError::Bound {
                channel,
                reason: format!("min {} exceeds max {}", min, max),
            });
        }
        Ok(())
    }
}

/// Observed value and score for one channel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelReading {
    pub channel: Channel,
    pub observed: f64,
    pub score: Option<f64>,
}

/// A channel that tripped at least one rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    pub channel: Channel,
    pub observed: f64,
    /// Deviation score when one could be computed
    pub score: Option<f64>,
    /// Statistical rule fired
    pub statistical: bool,
    /// Absolute rule fired, and in which direction
    pub breach: Option<Breach>,
}

impl Trigger {
    /// Human-readable phrases, statistical first
    pub fn phrases(&self) -> Vec<String> {
        let mut phrases = Vec::with_capacity(2);
        let label = self.channel.label();

        if self.statistical {
            if let Some(score) = self.score {
                phrases.push(format!("{} z={:.2}", label, score));
            }
        }

        match self.breach {
            Some(Breach::High) => phrases.push(format!(
                "{} too high: {}",
                label,
                self.channel.format_value(self.observed)
            )),
            Some(Breach::Low) => phrases.push(format!(
                "{} too low: {}",
                label,
                self.channel.format_value(self.observed)
            )),
            None => {}
        }

        phrases
    }
}

/// Statistical and absolute thresholds for every channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdRules {
    pub z_threshold: f64,
    pub sst_bound: AbsoluteBound,
    pub chl_bound: AbsoluteBound,
}

impl Default for ThresholdRules {
    fn default() -> Self {
        Self {
            z_threshold: DEFAULT_Z_THRESHOLD,
            sst_bound: AbsoluteBound::Above {
                max: DEFAULT_SST_MAX,
            },
            chl_bound: AbsoluteBound::Above {
                max: DEFAULT_CHL_MAX,
            },
        }
    }
}

impl ThresholdRules {
    pub fn bound(&self, channel: Channel) -> &AbsoluteBound {
        match channel {
            Channel::SeaSurfaceTemperature => &self.sst_bound,
            Channel::Chlorophyll => &self.chl_bound,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.z_threshold.is_finite() || self.z_threshold <= 0.0 {
            return Err(ConfigError::ZThreshold(self.z_threshold));
        }
        for channel in Channel::ALL {
            self.bound(channel).validate(channel)?;
        }
        Ok(())
    }

    /// Apply both rule families to a single channel
    pub fn check(&self, reading: &ChannelReading) -> Option<Trigger> {
        let statistical = reading
            .score
            .map(|z| z.abs() >= self.z_threshold)
            .unwrap_or(false);
        let breach = self.bound(reading.channel).check(reading.observed);

        if !statistical && breach.is_none() {
            return None;
        }

        Some(Trigger {
            channel: reading.channel,
            observed: reading.observed,
            score: reading.score,
            statistical,
            breach,
        })
    }

    /// Evaluate all readings, returning triggers in declared channel order
    pub fn evaluate(&self, readings: &[ChannelReading]) -> Vec<Trigger> {
        let mut triggers: Vec<Trigger> = readings.iter().filter_map(|r| self.check(r)).collect();
        triggers.sort_by_key(|t| t.channel);
        triggers
    }
}
