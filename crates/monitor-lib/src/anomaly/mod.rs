//! Anomaly detection for oceanographic measurements
//!
//! This module provides:
//! - Deviation scoring against a recent history window
//! - Statistical and absolute threshold rules per channel
//! - Composition of a single aggregated alert per evaluation

mod composer;
mod evaluator;
mod rules;
mod scorer;

pub use composer::{compose, Alert, AlertStatus, ENVIRONMENTAL_RISK, PHRASE_SEPARATOR};
pub use evaluator::{AnomalyEvaluator, DetectorConfig, Evaluation, DEFAULT_WINDOW_SIZE};
pub use rules::{
    AbsoluteBound, Breach, ChannelReading, ThresholdRules, Trigger, DEFAULT_CHL_MAX,
    DEFAULT_SST_MAX, DEFAULT_Z_THRESHOLD,
};
pub use scorer::{deviation_score, HistoryStats};
