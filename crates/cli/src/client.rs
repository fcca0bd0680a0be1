//! API client for communicating with the Marine Monitor service

use std::collections::{BTreeMap, HashMap};

use anyhow::{Context, Result};
use monitor_lib::{
    ingest::RejectedRow, models::Measurement, notify::DeliveryResult, store::StoredAlert,
};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use url::Url;

/// API client for the monitor service
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        Self::parse(response).await
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        Self::parse(response).await
    }

    /// Make a POST request with a CSV body
    pub async fn post_csv<T: DeserializeOwned>(&self, path: &str, body: String) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "text/csv")
            .body(body)
            .send()
            .await
            .context("Failed to send request")?;

        Self::parse(response).await
    }

    async fn parse<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            anyhow::bail!("API error ({}): {}", status, message);
        }

        response.json().await.context("Failed to parse response")
    }

    pub async fn check(&self, measurement: &Measurement) -> Result<CheckResult> {
        self.post("api/v1/alerts/check", measurement).await
    }

    pub async fn import_csv(&self, csv: String) -> Result<ImportSummary> {
        self.post_csv("api/v1/measurements/csv", csv).await
    }

    pub async fn list_alerts(&self, limit: usize) -> Result<AlertList> {
        self.get(&format!("api/v1/alerts?limit={}", limit)).await
    }

    pub async fn notify(&self, id: u64, request: &NotifyRequest) -> Result<NotifyResponse> {
        self.post(&format!("api/v1/alerts/{}/notify", id), request)
            .await
    }

    pub async fn resolve(&self, id: u64) -> Result<StoredAlert> {
        self.post(&format!("api/v1/alerts/{}/resolve", id), &serde_json::json!({}))
            .await
    }
}

// API response types

#[derive(Debug, Clone, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Flattened evaluation returned by the check endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    /// `anomaly` or `no_anomaly`
    pub result: String,
    pub sst: f64,
    pub chl: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert_id: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportSummary {
    pub inserted: usize,
    pub rejected: usize,
    #[serde(default)]
    pub errors: Vec<RejectedRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertList {
    pub alerts: Vec<StoredAlert>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyRequest {
    pub channels: Vec<String>,
    pub targets: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyResponse {
    pub id: u64,
    pub results: BTreeMap<String, DeliveryResult>,
}
