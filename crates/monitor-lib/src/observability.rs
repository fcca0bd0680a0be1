//! Observability infrastructure for the marine monitor
//!
//! Provides:
//! - Prometheus metrics (evaluation latency, anomaly and alert counters)
//! - Structured JSON logging with tracing

use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

use crate::anomaly::Evaluation;
use crate::notify::{DeliveryResult, DeliveryStatus};

/// Histogram buckets for evaluation latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.00001, 0.00005, 0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<MonitorMetricsInner> = OnceLock::new();

struct MonitorMetricsInner {
    evaluation_latency_seconds: Histogram,
    evaluations: IntCounter,
    anomalies_detected: IntCounter,
    validation_failures: IntCounter,
    alerts_stored: IntCounter,
    active_alerts: IntGauge,
    measurements_recorded: IntCounter,
    notifications: IntCounterVec,
}

impl MonitorMetricsInner {
    fn new() -> Self {
        Self {
            evaluation_latency_seconds: register_histogram!(
                "marine_monitor_evaluation_latency_seconds",
                "Time spent scoring a measurement and applying threshold rules",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register evaluation_latency_seconds"),

            evaluations: register_int_counter!(
                "marine_monitor_evaluations_total",
                "Total number of anomaly evaluations"
            )
            .expect("Failed to register evaluations_total"),

            anomalies_detected: register_int_counter!(
                "marine_monitor_anomalies_detected_total",
                "Total number of evaluations that produced an alert"
            )
            .expect("Failed to register anomalies_detected_total"),

            validation_failures: register_int_counter!(
                "marine_monitor_validation_failures_total",
                "Total number of measurements rejected as malformed"
            )
            .expect("Failed to register validation_failures_total"),

            alerts_stored: register_int_counter!(
                "marine_monitor_alerts_stored_total",
                "Total number of alerts persisted"
            )
            .expect("Failed to register alerts_stored_total"),

            active_alerts: register_int_gauge!(
                "marine_monitor_active_alerts",
                "Number of alerts currently in Active status"
            )
            .expect("Failed to register active_alerts"),

            measurements_recorded: register_int_counter!(
                "marine_monitor_measurements_recorded_total",
                "Total number of measurements added to the history store"
            )
            .expect("Failed to register measurements_recorded_total"),

            notifications: register_int_counter_vec!(
                "marine_monitor_notifications_total",
                "Notification deliveries by channel and status",
                &["channel", "status"]
            )
            .expect("Failed to register notifications_total"),
        }
    }
}

/// Handle to the global monitor metrics
///
/// Clones share the same underlying metrics.
#[derive(Clone)]
pub struct MonitorMetrics {
    _private: (),
}

impl Default for MonitorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl MonitorMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(MonitorMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &MonitorMetricsInner {
        GLOBAL_METRICS.get_or_init(MonitorMetricsInner::new)
    }

    /// Record one completed evaluation
    pub fn observe_evaluation(&self, duration_secs: f64, anomaly: bool) {
        let inner = self.inner();
        inner.evaluation_latency_seconds.observe(duration_secs);
        inner.evaluations.inc();
        if anomaly {
            inner.anomalies_detected.inc();
        }
    }

    pub fn inc_validation_failures(&self) {
        self.inner().validation_failures.inc();
    }

    pub fn inc_alerts_stored(&self) {
        self.inner().alerts_stored.inc();
    }

    /// Mirror the alert store's active count
    pub fn set_active_alerts(&self, count: usize) {
        self.inner().active_alerts.set(count as i64);
    }

    pub fn inc_measurements_recorded(&self) {
        self.inner().measurements_recorded.inc();
    }

    pub fn inc_notification(&self, channel: &str, status: DeliveryStatus) {
        self.inner()
            .notifications
            .with_label_values(&[channel, &status.to_string()])
            .inc();
    }

    pub fn evaluations_total(&self) -> u64 {
        self.inner().evaluations.get()
    }
}

/// Structured logger for monitor events
#[derive(Clone)]
pub struct StructuredLogger {
    node_name: String,
}

impl StructuredLogger {
    pub fn new(node_name: impl Into<String>) -> Self {
        Self {
            node_name: node_name.into(),
        }
    }

    /// Log the outcome of an evaluation
    pub fn log_evaluation(&self, evaluation: &Evaluation, history_len: usize) {
        match evaluation {
            Evaluation::Anomaly(alert) => {
                warn!(
                    event = "anomaly_detected",
                    node = %self.node_name,
                    alert_type = %alert.alert_type,
                    channels = ?alert.channel_labels(),
                    sst = alert.sst,
                    chl = alert.chl,
                    history_len = history_len,
                    message = %alert.message,
                    "Environmental anomaly detected"
                );
            }
            Evaluation::NoAnomaly { sst, chl } => {
                info!(
                    event = "evaluation_completed",
                    node = %self.node_name,
                    sst = sst,
                    chl = chl,
                    history_len = history_len,
                    "No anomaly"
                );
            }
        }
    }

    pub fn log_alert_stored(&self, id: u64, message: &str) {
        info!(
            event = "alert_stored",
            node = %self.node_name,
            alert_id = id,
            message = %message,
            "Alert stored"
        );
    }

    pub fn log_validation_failure(&self, reason: &str) {
        warn!(
            event = "measurement_rejected",
            node = %self.node_name,
            reason = %reason,
            "Malformed measurement rejected"
        );
    }

    pub fn log_notification(&self, id: u64, channel: &str, result: &DeliveryResult) {
        if result.status == DeliveryStatus::Failed {
            warn!(
                event = "alert_notified",
                node = %self.node_name,
                alert_id = id,
                channel = %channel,
                recipient = %result.recipient,
                detail = ?result.detail,
                "Alert notification failed"
            );
        } else {
            info!(
                event = "alert_notified",
                node = %self.node_name,
                alert_id = id,
                channel = %channel,
                recipient = %result.recipient,
                "Alert notification delivered"
            );
        }
    }

    pub fn log_import(&self, inserted: usize, rejected: usize) {
        info!(
            event = "measurements_imported",
            node = %self.node_name,
            inserted = inserted,
            rejected = rejected,
            "CSV measurements imported"
        );
    }

    pub fn log_subscriber_registered(&self, id: u64) {
        info!(
            event = "subscriber_registered",
            node = %self.node_name,
            subscriber_id = id,
            "Subscriber registered"
        );
    }

    pub fn log_alert_resolved(&self, id: u64) {
        info!(
            event = "alert_resolved",
            node = %self.node_name,
            alert_id = id,
            "Alert resolved"
        );
    }

    pub fn log_startup(&self, version: &str, z_threshold: f64, window_size: usize) {
        info!(
            event = "monitor_started",
            node = %self.node_name,
            monitor_version = %version,
            z_threshold = z_threshold,
            window_size = window_size,
            "Marine monitor started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "monitor_shutdown",
            node = %self.node_name,
            reason = %reason,
            "Marine monitor shutting down"
        );
    }
}
