//! Measurement history and alert storage
//!
//! The evaluator never touches storage directly. The service reads a
//! history snapshot through [`HistoryProvider`] before scoring and hands
//! the resulting alert to an [`AlertSink`]. In-memory implementations of
//! both are provided here.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::anomaly::{Alert, AlertStatus};
use crate::error::{StoreError, ValidationError};
use crate::models::{Channel, ChannelHistory, Measurement, MeasurementRecord};
use crate::notify::DeliveryResult;

/// Default number of measurements retained in memory
const DEFAULT_MEASUREMENT_CAPACITY: usize = 10_000;

/// Default number of alerts retained in memory
pub const DEFAULT_ALERT_CAPACITY: usize = 1_000;

/// Source of recent per-channel values
#[async_trait]
pub trait HistoryProvider: Send + Sync {
    /// Up to `limit` most recent values for a channel, newest first
    ///
    /// Returns an empty vector when nothing has been recorded yet.
    async fn recent(&self, channel: Channel, limit: usize) -> Result<Vec<f64>>;

    /// Snapshot of every channel's history
    async fn channel_history(&self, limit: usize) -> Result<ChannelHistory> {
        Ok(ChannelHistory {
            sst: self.recent(Channel::SeaSurfaceTemperature, limit).await?,
            chl: self.recent(Channel::Chlorophyll, limit).await?,
        })
    }
}

/// An alert after it has been persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredAlert {
    pub id: u64,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub alert: Alert,
    pub notified: bool,
    #[serde(default)]
    pub notifications: BTreeMap<String, DeliveryResult>,
}

/// Outcome of [`AlertSink::resolve`]
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub alert: StoredAlert,
    /// Whether the call moved the alert from active to resolved
    pub changed: bool,
}

/// Durable destination for alerts
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Persist an alert, assigning its id and creation time
    async fn append(&self, alert: Alert) -> Result<StoredAlert>;

    /// Most recent alerts, newest first
    async fn list_recent(&self, limit: usize) -> Result<Vec<StoredAlert>>;

    async fn get(&self, id: u64) -> Result<StoredAlert>;

    /// Mark an alert as resolved
    ///
    /// Resolving an already resolved alert succeeds with `changed` unset.
    async fn resolve(&self, id: u64) -> Result<Resolution>;

    /// Number of retained alerts still active
    async fn active_count(&self) -> Result<usize>;

    /// Attach delivery results and flag the alert as notified
    async fn record_notifications(
        &self,
        id: u64,
        results: BTreeMap<String, DeliveryResult>,
    ) -> Result<StoredAlert>;
}

/// In-memory measurement history
pub struct MeasurementStore {
    records: RwLock<VecDeque<MeasurementRecord>>,
    next_id: AtomicU64,
    capacity: usize,
}

impl Default for MeasurementStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MeasurementStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MEASUREMENT_CAPACITY)
    }

    /// Keep at most `capacity` measurements, dropping the oldest
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: RwLock::new(VecDeque::new()),
            next_id: AtomicU64::new(1),
            capacity: capacity.max(1),
        }
    }

    /// Record a measurement with its fingerprint
    pub async fn record(&self, measurement: Measurement) -> MeasurementRecord {
        let record = MeasurementRecord {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            fingerprint: measurement.fingerprint(),
            measurement,
            received_at: Utc::now(),
        };

        let mut records = self.records.write().await;
        records.push_back(record.clone());
        while records.len() > self.capacity {
            records.pop_front();
        }

        record
    }

    /// Most recent measurements, newest first
    pub async fn recent_measurements(&self, limit: usize) -> Vec<MeasurementRecord> {
        self.records
            .read()
            .await
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl HistoryProvider for MeasurementStore {
    async fn recent(&self, channel: Channel, limit: usize) -> Result<Vec<f64>> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .rev()
            .take(limit)
            .map(|r| r.measurement.value(channel))
            .collect())
    }

    async fn channel_history(&self, limit: usize) -> Result<ChannelHistory> {
        let records = self.records.read().await;
        let mut history = ChannelHistory {
            sst: Vec::with_capacity(limit.min(records.len())),
            chl: Vec::with_capacity(limit.min(records.len())),
        };
        for record in records.iter().rev().take(limit) {
            history.sst.push(record.measurement.value(Channel::SeaSurfaceTemperature));
            history.chl.push(record.measurement.value(Channel::Chlorophyll));
        }
        Ok(history)
    }
}

/// In-memory alert store
///
/// Holds at most `capacity` alerts. When full, the oldest resolved alert
/// is dropped first; if every retained alert is active, the oldest one goes.
pub struct AlertStore {
    alerts: RwLock<VecDeque<StoredAlert>>,
    next_id: AtomicU64,
    capacity: usize,
}

impl Default for AlertStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_ALERT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            alerts: RwLock::new(VecDeque::new()),
            next_id: AtomicU64::new(1),
            capacity: capacity.max(1),
        }
    }

    pub async fn len(&self) -> usize {
        self.alerts.read().await.len()
    }

    fn evict(alerts: &mut VecDeque<StoredAlert>) {
        let position = alerts
            .iter()
            .position(|a| a.alert.status == AlertStatus::Resolved)
            .unwrap_or(0);
        if let Some(dropped) = alerts.remove(position) {
            if dropped.alert.status == AlertStatus::Active {
                tracing::warn!(
                    event = "alert_evicted",
                    alert_id = dropped.id,
                    "Alert store full, dropping oldest active alert"
                );
            }
        }
    }

    async fn modify<F>(&self, id: u64, f: F) -> Result<StoredAlert>
    where
        F: FnOnce(&mut StoredAlert) + Send,
    {
        let mut alerts = self.alerts.write().await;
        let stored = alerts
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(StoreError::AlertNotFound(id))?;
        f(stored);
        Ok(stored.clone())
    }
}

#[async_trait]
impl AlertSink for AlertStore {
    async fn append(&self, alert: Alert) -> Result<StoredAlert> {
        let stored = StoredAlert {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            created_at: Utc::now(),
            alert,
            notified: false,
            notifications: BTreeMap::new(),
        };
        let mut alerts = self.alerts.write().await;
        while alerts.len() >= self.capacity {
            Self::evict(&mut alerts);
        }
        alerts.push_back(stored.clone());
        Ok(stored)
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<StoredAlert>> {
        Ok(self
            .alerts
            .read()
            .await
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect())
    }

    async fn get(&self, id: u64) -> Result<StoredAlert> {
        self.alerts
            .read()
            .await
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .ok_or_else(|| StoreError::AlertNotFound(id).into())
    }

    async fn resolve(&self, id: u64) -> Result<Resolution> {
        let mut changed = false;
        let alert = self
            .modify(id, |stored| {
                changed = stored.alert.status != AlertStatus::Resolved;
                stored.alert.status = AlertStatus::Resolved;
            })
            .await?;
        Ok(Resolution { alert, changed })
    }

    async fn active_count(&self) -> Result<usize> {
        Ok(self
            .alerts
            .read()
            .await
            .iter()
            .filter(|a| a.alert.status == AlertStatus::Active)
            .count())
    }

    async fn record_notifications(
        &self,
        id: u64,
        results: BTreeMap<String, DeliveryResult>,
    ) -> Result<StoredAlert> {
        self.modify(id, move |stored| {
            stored.notified = true;
            stored.notifications.extend(results);
        })
        .await
    }
}

/// A registered advisory recipient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscriber {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// In-memory subscriber registry
pub struct SubscriberStore {
    subscribers: RwLock<Vec<Subscriber>>,
    next_id: AtomicU64,
}

impl Default for SubscriberStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SubscriberStore {
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a recipient; blank contact fields are treated as absent
    pub async fn register(
        &self,
        phone: Option<String>,
        email: Option<String>,
    ) -> Result<Subscriber, ValidationError> {
        let phone = phone.map(|p| p.trim().to_string()).filter(|p| !p.is_empty());
        let email = email.map(|e| e.trim().to_string()).filter(|e| !e.is_empty());
        if phone.is_none() && email.is_none() {
            return Err(ValidationError::MissingContact);
        }

        let subscriber = Subscriber {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            phone,
            email,
            created_at: Utc::now(),
        };
        self.subscribers.write().await.push(subscriber.clone());
        Ok(subscriber)
    }

    /// Every subscriber in registration order
    pub async fn list(&self) -> Vec<Subscriber> {
        self.subscribers.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anomaly::{AnomalyEvaluator, DetectorConfig};
    use crate::notify::DeliveryStatus;

    fn sample_alert() -> Alert {
        AnomalyEvaluator::new(DetectorConfig::default())
            .unwrap()
            .evaluate(&Measurement::new(31.5, 0.4), &ChannelHistory::default())
            .unwrap()
            .into_alert()
            .unwrap()
    }

    #[test]
    fn test_default_store_is_empty() {
        let store = MeasurementStore::default();
        assert!(tokio_test::block_on(store.is_empty()));
        assert_eq!(tokio_test::block_on(store.len()), 0);
    }

    #[tokio::test]
    async fn test_history_is_empty_before_any_record() {
        let store = MeasurementStore::new();
        let history = store.channel_history(30).await.unwrap();
        assert!(history.sst.is_empty());
        assert!(history.chl.is_empty());
    }

    #[tokio::test]
    async fn test_history_newest_first_and_limited() {
        let store = MeasurementStore::new();
        for i in 0..5 {
            store.record(Measurement::new(26.0 + i as f64, 0.1 * i as f64)).await;
        }

        let sst = store.recent(Channel::SeaSurfaceTemperature, 3).await.unwrap();
        assert_eq!(sst, vec![30.0, 29.0, 28.0]);

        let records = store.recent_measurements(2).await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, 5);
        assert_eq!(records[1].id, 4);
    }

    #[tokio::test]
    async fn test_measurement_capacity() {
        let store = MeasurementStore::with_capacity(3);
        for i in 0..10 {
            store.record(Measurement::new(i as f64, 0.0)).await;
        }
        assert_eq!(store.len().await, 3);
        let sst = store.recent(Channel::SeaSurfaceTemperature, 10).await.unwrap();
        assert_eq!(sst, vec![9.0, 8.0, 7.0]);
    }

    #[tokio::test]
    async fn test_record_sets_fingerprint() {
        let store = MeasurementStore::new();
        let measurement = Measurement::new(27.0, 0.3);
        let record = store.record(measurement.clone()).await;
        assert_eq!(record.fingerprint, measurement.fingerprint());
    }

    #[tokio::test]
    async fn test_alert_store_assigns_ids() {
        let store = AlertStore::new();
        let first = store.append(sample_alert()).await.unwrap();
        let second = store.append(sample_alert()).await.unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert!(!first.notified);
        assert_eq!(first.alert.status, AlertStatus::Active);

        let recent = store.list_recent(50).await.unwrap();
        assert_eq!(recent.iter().map(|a| a.id).collect::<Vec<_>>(), vec![2, 1]);
    }

    #[tokio::test]
    async fn test_resolve_and_unknown_id() {
        let store = AlertStore::new();
        let stored = store.append(sample_alert()).await.unwrap();

        let resolved = store.resolve(stored.id).await.unwrap();
        assert!(resolved.changed);
        assert_eq!(resolved.alert.alert.status, AlertStatus::Resolved);
        assert_eq!(
            store.get(stored.id).await.unwrap().alert.status,
            AlertStatus::Resolved
        );

        let err = store.resolve(99).await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<StoreError>(),
            Some(&StoreError::AlertNotFound(99))
        );
    }

    #[tokio::test]
    async fn test_record_notifications() {
        let store = AlertStore::new();
        let stored = store.append(sample_alert()).await.unwrap();

        let mut results = BTreeMap::new();
        results.insert(
            "sms".to_string(),
            DeliveryResult {
                status: DeliveryStatus::MockSent,
                recipient: "+910000000000".to_string(),
                detail: None,
            },
        );

        let updated = store.record_notifications(stored.id, results).await.unwrap();
        assert!(updated.notified);
        assert_eq!(updated.notifications["sms"].status, DeliveryStatus::MockSent);
    }

    #[tokio::test]
    async fn test_stored_alert_serializes_flat() {
        let store = AlertStore::new();
        let stored = store.append(sample_alert()).await.unwrap();
        let json = serde_json::to_value(&stored).unwrap();

        assert_eq!(json["id"], 1);
        assert_eq!(json["type"], "environmental risk");
        assert_eq!(json["message"], "SST too high: 31.5");
        assert_eq!(json["notified"], false);
    }

    #[tokio::test]
    async fn test_channel_history_pairs_values_from_same_records() {
        let store = MeasurementStore::new();
        for i in 0..4 {
            store.record(Measurement::new(20.0 + i as f64, i as f64)).await;
        }

        let history = store.channel_history(3).await.unwrap();
        assert_eq!(history.sst, vec![23.0, 22.0, 21.0]);
        assert_eq!(history.chl, vec![3.0, 2.0, 1.0]);
    }

    #[tokio::test]
    async fn test_channel_history_under_concurrent_writes() {
        let store = std::sync::Arc::new(MeasurementStore::new());
        let writer = {
            let store = store.clone();
            tokio::spawn(async move {
                for i in 0..200 {
                    store.record(Measurement::new(i as f64, i as f64)).await;
                }
            })
        };

        for _ in 0..50 {
            let history = store.channel_history(30).await.unwrap();
            assert_eq!(history.sst.len(), history.chl.len());
            assert_eq!(history.sst, history.chl);
            tokio::task::yield_now().await;
        }
        writer.await.unwrap();
    }

    #[tokio::test]
    async fn test_resolve_twice_reports_no_change() {
        let store = AlertStore::new();
        let stored = store.append(sample_alert()).await.unwrap();
        assert_eq!(store.active_count().await.unwrap(), 1);

        assert!(store.resolve(stored.id).await.unwrap().changed);
        let again = store.resolve(stored.id).await.unwrap();
        assert!(!again.changed);
        assert_eq!(again.alert.alert.status, AlertStatus::Resolved);
        assert_eq!(store.active_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_alert_capacity_drops_resolved_first() {
        let store = AlertStore::with_capacity(3);
        let first = store.append(sample_alert()).await.unwrap();
        let second = store.append(sample_alert()).await.unwrap();
        store.append(sample_alert()).await.unwrap();
        store.resolve(second.id).await.unwrap();

        store.append(sample_alert()).await.unwrap();
        assert_eq!(store.len().await, 3);
        assert!(store.get(first.id).await.is_ok());
        assert!(store.get(second.id).await.is_err());

        // Only active alerts remain, so the oldest one goes
        store.append(sample_alert()).await.unwrap();
        assert_eq!(store.len().await, 3);
        assert!(store.get(first.id).await.is_err());

        let ids: Vec<u64> = store
            .list_recent(10)
            .await
            .unwrap()
            .iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(ids, vec![5, 4, 3]);
    }

    #[tokio::test]
    async fn test_subscriber_registration() {
        let store = SubscriberStore::new();
        let sub = store
            .register(Some("+911234567890".to_string()), Some("  ".to_string()))
            .await
            .unwrap();
        assert_eq!(sub.id, 1);
        assert_eq!(sub.phone.as_deref(), Some("+911234567890"));
        assert!(sub.email.is_none());

        let err = store.register(None, Some(String::new())).await.unwrap_err();
        assert_eq!(err, ValidationError::MissingContact);
        assert_eq!(store.list().await.len(), 1);
    }
}
