//! Bulk measurement upload

use std::path::Path;

use anyhow::{Context, Result};
use tabled::Tabled;

use crate::client::{ApiClient, ImportSummary};
use crate::output::{print_success, print_warning, OutputFormat};

#[derive(Tabled)]
struct RejectedRowView {
    #[tabled(rename = "Line")]
    line: u64,
    #[tabled(rename = "Reason")]
    reason: String,
}

/// Upload a CSV file of measurements to the service
pub async fn import(client: &ApiClient, path: &Path, format: OutputFormat) -> Result<()> {
    let csv = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let summary = client.import_csv(csv).await?;
    print_summary(&summary, format)
}

fn print_summary(summary: &ImportSummary, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(summary)?);
        }
        OutputFormat::Table => {
            print_success(&format!("Imported {} measurements", summary.inserted));
            if summary.rejected > 0 {
                print_warning(&format!("{} rows rejected", summary.rejected));
                let rows: Vec<RejectedRowView> = summary
                    .errors
                    .iter()
                    .map(|r| RejectedRowView {
                        line: r.line,
                        reason: r.reason.clone(),
                    })
                    .collect();
                let table = tabled::Table::new(rows)
                    .with(tabled::settings::Style::rounded())
                    .to_string();
                println!("{}", table);
            }
        }
    }

    Ok(())
}
