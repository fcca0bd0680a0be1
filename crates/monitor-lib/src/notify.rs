//! Alert notification delivery
//!
//! Alerts are delivered through named [`NotificationChannel`]s. The
//! built-in SMS, Telegram and e-mail channels are mocks that only log the
//! delivery; real gateways plug in behind the same trait.

use std::collections::{BTreeMap, HashMap};

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::anomaly::Alert;

/// Subject line used by e-mail deliveries
pub const ADVISORY_SUBJECT: &str = "Advisory";

/// Outcome of one delivery attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    /// Accepted by a mock channel
    MockSent,
    Sent,
    Failed,
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryStatus::MockSent => write!(f, "mock_sent"),
            DeliveryStatus::Sent => write!(f, "sent"),
            DeliveryStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Per-channel delivery result recorded back onto the alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryResult {
    pub status: DeliveryStatus,
    pub recipient: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// A delivery channel for alert advisories
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Deliver `body` to `recipient`
    async fn send(&self, recipient: &str, body: &str) -> Result<DeliveryStatus>;

    /// Channel name used in requests and results (e.g. `"sms"`)
    fn channel_name(&self) -> &str;
}

/// Short advisory text sent to every channel
pub fn advisory_body(alert: &Alert) -> String {
    format!("Advisory: {} - {}", alert.alert_type, alert.message)
}

pub struct MockSmsChannel;

#[async_trait]
impl NotificationChannel for MockSmsChannel {
    async fn send(&self, recipient: &str, body: &str) -> Result<DeliveryStatus> {
        info!(channel = "sms", to = %recipient, body = %body, "[MOCK SMS] delivered");
        Ok(DeliveryStatus::MockSent)
    }

    fn channel_name(&self) -> &str {
        "sms"
    }
}

pub struct MockTelegramChannel;

#[async_trait]
impl NotificationChannel for MockTelegramChannel {
    async fn send(&self, recipient: &str, body: &str) -> Result<DeliveryStatus> {
        info!(channel = "telegram", chat_id = %recipient, body = %body, "[MOCK TELEGRAM] delivered");
        Ok(DeliveryStatus::MockSent)
    }

    fn channel_name(&self) -> &str {
        "telegram"
    }
}

pub struct MockEmailChannel;

#[async_trait]
impl NotificationChannel for MockEmailChannel {
    async fn send(&self, recipient: &str, body: &str) -> Result<DeliveryStatus> {
        info!(
            channel = "email",
            to = %recipient,
            subject = ADVISORY_SUBJECT,
            body = %body,
            "[MOCK EMAIL] delivered"
        );
        Ok(DeliveryStatus::MockSent)
    }

    fn channel_name(&self) -> &str {
        "email"
    }
}

/// Fallback recipients per channel name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultTargets(pub HashMap<String, String>);

impl Default for DefaultTargets {
    fn default() -> Self {
        let mut targets = HashMap::new();
        targets.insert("sms".to_string(), "+0000000000".to_string());
        targets.insert("telegram".to_string(), "demo_chat".to_string());
        targets.insert("email".to_string(), "demo@example.com".to_string());
        Self(targets)
    }
}

/// Routes an alert to the requested channels
pub struct NotificationDispatcher {
    channels: Vec<Box<dyn NotificationChannel>>,
    defaults: DefaultTargets,
}

impl NotificationDispatcher {
    pub fn new(channels: Vec<Box<dyn NotificationChannel>>, defaults: DefaultTargets) -> Self {
        Self { channels, defaults }
    }

    /// Dispatcher with the built-in mock channels
    pub fn with_mock_channels(defaults: DefaultTargets) -> Self {
        Self::new(
            vec![
                Box::new(MockSmsChannel),
                Box::new(MockTelegramChannel),
                Box::new(MockEmailChannel),
            ],
            defaults,
        )
    }

    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.channel_name()).collect()
    }

    fn channel(&self, name: &str) -> Option<&dyn NotificationChannel> {
        self.channels
            .iter()
            .find(|c| c.channel_name() == name)
            .map(|c| &**c)
    }

    /// Deliver an alert to each requested channel
    ///
    /// Unknown channels and failed deliveries are reported in the results
    /// rather than aborting the remaining channels.
    pub async fn dispatch(
        &self,
        alert: &Alert,
        channels: &[String],
        targets: &HashMap<String, String>,
    ) -> BTreeMap<String, DeliveryResult> {
        let body = advisory_body(alert);
        let mut results = BTreeMap::new();

        for name in channels {
            let recipient = targets
                .get(name)
                .or_else(|| self.defaults.0.get(name))
                .cloned()
                .unwrap_or_default();

            let result = match self.channel(name) {
                Some(channel) => match channel.send(&recipient, &body).await {
                    Ok(status) => DeliveryResult {
                        status,
                        recipient,
                        detail: None,
                    },
                    Err(e) => {
                        warn!(channel = %name, error = %e, "Notification delivery failed");
                        DeliveryResult {
                            status: DeliveryStatus::Failed,
                            recipient,
                            detail: Some(e.to_string()),
                        }
                    }
                },
                None => {
                    warn!(channel = %name, "Unknown notification channel");
                    DeliveryResult {
                        status: DeliveryStatus::Failed,
                        recipient,
                        detail: Some(format!("unknown channel '{}'", name)),
                    }
                }
            };

            results.insert(name.clone(), result);
        }

        results
    }
}
