//! Marine Monitor CLI
//!
//! Evaluates measurements offline and manages alerts raised by a running
//! monitor service.

mod client;
mod commands;
mod config;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{alerts, evaluate, import};
use monitor_lib::models::Measurement;

/// Marine Monitor CLI
#[derive(Parser)]
#[command(name = "mmctl")]
#[command(author, version, about = "CLI for the Marine Monitor anomaly service", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via MMCTL_API_URL env var)
    #[arg(long, env = "MMCTL_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Evaluate a measurement locally against the given history
    Evaluate {
        /// Sea-surface temperature
        #[arg(long, allow_hyphen_values = true)]
        sst: f64,

        /// Chlorophyll concentration
        #[arg(long, allow_hyphen_values = true)]
        chl: f64,

        #[arg(long, allow_hyphen_values = true, requires = "lon")]
        lat: Option<f64>,

        #[arg(long, allow_hyphen_values = true, requires = "lat")]
        lon: Option<f64>,

        /// Prior SST values, most recent first (comma separated)
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
        sst_history: Vec<f64>,

        /// Prior chlorophyll values, most recent first (comma separated)
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
        chl_history: Vec<f64>,

        /// Standard deviations required by the statistical rule
        #[arg(long)]
        z_threshold: Option<f64>,

        /// Upper SST bound
        #[arg(long)]
        sst_max: Option<f64>,

        /// Upper chlorophyll bound
        #[arg(long)]
        chl_max: Option<f64>,

        /// Number of history values used as the baseline
        #[arg(long)]
        window: Option<usize>,
    },

    /// Submit a measurement to the service for evaluation
    Check {
        #[arg(long, allow_hyphen_values = true)]
        sst: f64,

        #[arg(long, allow_hyphen_values = true)]
        chl: f64,

        #[arg(long, allow_hyphen_values = true, requires = "lon")]
        lat: Option<f64>,

        #[arg(long, allow_hyphen_values = true, requires = "lat")]
        lon: Option<f64>,
    },

    /// Upload a CSV file of measurements to the service history
    Import {
        /// CSV file with an sst column and optional chl, lat, lon, timestamp
        file: PathBuf,
    },

    /// Manage stored alerts
    #[command(subcommand)]
    Alerts(AlertsCommands),
}

#[derive(Subcommand)]
pub enum AlertsCommands {
    /// List the most recent alerts
    List {
        #[arg(long, default_value = "50")]
        limit: usize,
    },

    /// Send an alert advisory through notification channels
    Notify {
        /// Alert ID
        id: u64,

        /// Channels to notify (sms, telegram, email)
        #[arg(long = "channel", short, required = true)]
        channels: Vec<String>,

        /// Recipient override as channel=recipient
        #[arg(long = "target")]
        targets: Vec<String>,
    },

    /// Mark an alert as resolved
    Resolve {
        /// Alert ID
        id: u64,
    },
}

/// Build an API client from the flag, env var or config file
fn connect(api_url: Option<&str>) -> Result<client::ApiClient> {
    let api_url = config::Config::load()?.api_url(api_url);
    client::ApiClient::new(&api_url)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Evaluate {
            sst,
            chl,
            lat,
            lon,
            sst_history,
            chl_history,
            z_threshold,
            sst_max,
            chl_max,
            window,
        } => {
            let args = evaluate::EvaluateArgs {
                sst,
                chl,
                lat,
                lon,
                sst_history,
                chl_history,
                z_threshold,
                sst_max,
                chl_max,
                window,
            };
            evaluate::evaluate(args, cli.format)?;
        }
        Commands::Check { sst, chl, lat, lon } => {
            let mut measurement = Measurement::new(sst, chl);
            if let (Some(lat), Some(lon)) = (lat, lon) {
                measurement = measurement.with_location(lat, lon);
            }
            let client = connect(cli.api_url.as_deref())?;
            alerts::check(&client, measurement, cli.format).await?;
        }
        Commands::Import { file } => {
            let client = connect(cli.api_url.as_deref())?;
            import::import(&client, &file, cli.format).await?;
        }
        Commands::Alerts(alerts_cmd) => {
            let client = connect(cli.api_url.as_deref())?;

            match alerts_cmd {
                AlertsCommands::List { limit } => {
                    alerts::list(&client, limit, cli.format).await?;
                }
                AlertsCommands::Notify {
                    id,
                    channels,
                    targets,
                } => {
                    let targets = alerts::parse_targets(&targets)?;
                    alerts::notify(&client, id, channels, targets, cli.format).await?;
                }
                AlertsCommands::Resolve { id } => {
                    alerts::resolve(&client, id, cli.format).await?;
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_evaluate_with_history() {
        let cli = Cli::try_parse_from([
            "mmctl",
            "evaluate",
            "--sst",
            "28.5",
            "--chl",
            "0.4",
            "--sst-history",
            "27.0,27.2,26.9",
        ])
        .unwrap();

        match cli.command {
            Commands::Evaluate {
                sst, sst_history, ..
            } => {
                assert_eq!(sst, 28.5);
                assert_eq!(sst_history, vec![27.0, 27.2, 26.9]);
            }
            _ => panic!("expected evaluate"),
        }
    }

    #[test]
    fn test_parse_notify_channels() {
        let cli = Cli::try_parse_from([
            "mmctl", "alerts", "notify", "3", "-c", "sms", "-c", "email", "--target",
            "sms=+911234567890",
        ])
        .unwrap();

        match cli.command {
            Commands::Alerts(AlertsCommands::Notify {
                id,
                channels,
                targets,
            }) => {
                assert_eq!(id, 3);
                assert_eq!(channels, vec!["sms", "email"]);
                assert_eq!(targets, vec!["sms=+911234567890"]);
            }
            _ => panic!("expected alerts notify"),
        }
    }

    #[test]
    fn test_notify_requires_channel() {
        assert!(Cli::try_parse_from(["mmctl", "alerts", "notify", "3"]).is_err());
    }

    #[test]
    fn test_check_requires_both_coordinates() {
        assert!(
            Cli::try_parse_from(["mmctl", "check", "--sst", "27", "--chl", "0.3", "--lat", "15.0"])
                .is_err()
        );
    }

    #[test]
    fn test_evaluate_requires_both_coordinates() {
        assert!(Cli::try_parse_from([
            "mmctl", "evaluate", "--sst", "27", "--chl", "0.3", "--lon", "73.8"
        ])
        .is_err());
    }

    #[test]
    fn test_evaluate_accepts_negative_histories() {
        let cli = Cli::try_parse_from([
            "mmctl",
            "evaluate",
            "--sst",
            "-1.5",
            "--chl",
            "-0.1",
            "--lat",
            "-12.5",
            "--lon",
            "-45.0",
            "--sst-history",
            "-1.2,-1.4",
            "--chl-history",
            "-0.2,0.1",
        ])
        .unwrap();

        match cli.command {
            Commands::Evaluate {
                chl,
                lat,
                lon,
                sst_history,
                chl_history,
                ..
            } => {
                assert_eq!(chl, -0.1);
                assert_eq!((lat, lon), (Some(-12.5), Some(-45.0)));
                assert_eq!(sst_history, vec![-1.2, -1.4]);
                assert_eq!(chl_history, vec![-0.2, 0.1]);
            }
            _ => panic!("expected evaluate"),
        }
    }
}
