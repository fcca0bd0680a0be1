//! Commands that talk to a running monitor service

use std::collections::HashMap;

use anyhow::Result;
use colored::Colorize;
use monitor_lib::models::Measurement;
use monitor_lib::store::StoredAlert;
use tabled::Tabled;

use crate::client::{ApiClient, NotifyRequest};
use crate::output::{color_status, format_timestamp, print_info, print_success, print_warning, OutputFormat};

/// Row for the alert list table
#[derive(Tabled)]
struct AlertRow {
    #[tabled(rename = "ID")]
    id: u64,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Message")]
    message: String,
    #[tabled(rename = "Notified")]
    notified: String,
    #[tabled(rename = "Created")]
    created: String,
}

impl From<&StoredAlert> for AlertRow {
    fn from(stored: &StoredAlert) -> Self {
        Self {
            id: stored.id,
            status: color_status(&stored.alert.status.to_string()),
            message: stored.alert.message.clone(),
            notified: if stored.notified { "yes" } else { "no" }.to_string(),
            created: format_timestamp(&stored.created_at.to_rfc3339()),
        }
    }
}

#[derive(Tabled)]
struct DeliveryRow {
    #[tabled(rename = "Channel")]
    channel: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Recipient")]
    recipient: String,
    #[tabled(rename = "Detail")]
    detail: String,
}

/// Submit a measurement to the service for evaluation
pub async fn check(
    client: &ApiClient,
    measurement: Measurement,
    format: OutputFormat,
) -> Result<()> {
    let result = client.check(&measurement).await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        OutputFormat::Table => match (&result.message, result.alert_id) {
            (Some(message), Some(id)) => {
                print_warning(&format!("Anomaly detected: {}", message.bold()));
                print_info(&format!("Stored as alert {}", id));
            }
            _ => print_success(&format!(
                "No anomaly (SST {:.1}, Chl {:.2})",
                result.sst, result.chl
            )),
        },
    }

    Ok(())
}

pub async fn list(client: &ApiClient, limit: usize, format: OutputFormat) -> Result<()> {
    let result = client.list_alerts(limit).await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        OutputFormat::Table => {
            if result.alerts.is_empty() {
                print_info("No alerts found");
                return Ok(());
            }

            let rows: Vec<AlertRow> = result.alerts.iter().map(AlertRow::from).collect();
            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);
            println!("\nTotal: {} alert(s)", result.total);
        }
    }

    Ok(())
}

/// Fan an alert out to the requested notification channels
pub async fn notify(
    client: &ApiClient,
    id: u64,
    channels: Vec<String>,
    targets: HashMap<String, String>,
    format: OutputFormat,
) -> Result<()> {
    let request = NotifyRequest { channels, targets };
    let response = client.notify(id, &request).await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Table => {
            let rows: Vec<DeliveryRow> = response
                .results
                .iter()
                .map(|(channel, result)| DeliveryRow {
                    channel: channel.clone(),
                    status: color_status(&result.status.to_string()),
                    recipient: if result.recipient.is_empty() {
                        "-".to_string()
                    } else {
                        result.recipient.clone()
                    },
                    detail: result.detail.clone().unwrap_or_default(),
                })
                .collect();

            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);
        }
    }

    Ok(())
}

pub async fn resolve(client: &ApiClient, id: u64, format: OutputFormat) -> Result<()> {
    let resolved = client.resolve(id).await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&resolved)?);
        }
        OutputFormat::Table => {
            print_success(&format!("Alert {} resolved", resolved.id));
        }
    }

    Ok(())
}

/// Parse `channel=recipient` pairs passed with `--target`
pub fn parse_targets(pairs: &[String]) -> Result<HashMap<String, String>> {
    pairs
        .iter()
        .map(|pair| match pair.split_once('=') {
            Some((channel, recipient)) if !channel.is_empty() && !recipient.is_empty() => {
                Ok((channel.to_string(), recipient.to_string()))
            }
            _ => anyhow::bail!("Invalid target '{}', expected channel=recipient", pair),
        })
        .collect()
}
