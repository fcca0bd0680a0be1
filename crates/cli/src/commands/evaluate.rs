//! Offline anomaly evaluation, no running service required

use anyhow::{Context, Result};
use colored::Colorize;
use monitor_lib::anomaly::{
    AbsoluteBound, AnomalyEvaluator, ChannelReading, DetectorConfig, Evaluation,
};
use monitor_lib::models::{Channel, ChannelHistory, Measurement};
use tabled::Tabled;

use crate::output::{format_score, print_success, print_warning, OutputFormat};

/// Inputs for a single offline evaluation
#[derive(Debug, Clone, Default)]
pub struct EvaluateArgs {
    pub sst: f64,
    pub chl: f64,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    /// Most recent value first
    pub sst_history: Vec<f64>,
    pub chl_history: Vec<f64>,
    pub z_threshold: Option<f64>,
    pub sst_max: Option<f64>,
    pub chl_max: Option<f64>,
    pub window: Option<usize>,
}

impl EvaluateArgs {
    fn detector_config(&self) -> DetectorConfig {
        let mut config = DetectorConfig::default();
        if let Some(z) = self.z_threshold {
            config = config.with_z_threshold(z);
        }
        if let Some(window) = self.window {
            config = config.with_window_size(window);
        }
        if let Some(max) = self.sst_max {
            config = config.with_bound(Channel::SeaSurfaceTemperature, AbsoluteBound::Above { max });
        }
        if let Some(max) = self.chl_max {
            config = config.with_bound(Channel::Chlorophyll, AbsoluteBound::Above { max });
        }
        config
    }

    fn measurement(&self) -> Measurement {
        let measurement = Measurement::new(self.sst, self.chl);
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => measurement.with_location(lat, lon),
            _ => measurement,
        }
    }
}

#[derive(Tabled)]
struct ReadingRow {
    #[tabled(rename = "Channel")]
    channel: String,
    #[tabled(rename = "Observed")]
    observed: String,
    #[tabled(rename = "Z-Score")]
    score: String,
    #[tabled(rename = "Bound")]
    bound: String,
}

fn describe_bound(bound: &AbsoluteBound, channel: Channel) -> String {
    match bound {
        AbsoluteBound::Above { max } => format!("<= {}", channel.format_value(*max)),
        AbsoluteBound::Below { min } => format!(">= {}", channel.format_value(*min)),
        AbsoluteBound::Outside { min, max } => format!(
            "{}..{}",
            channel.format_value(*min),
            channel.format_value(*max)
        ),
    }
}

/// Evaluate the inputs and return the per-channel readings alongside the verdict
pub fn run(args: &EvaluateArgs) -> Result<(Vec<ChannelReading>, Evaluation)> {
    let config = args.detector_config();
    let evaluator = AnomalyEvaluator::new(config).context("Invalid detector settings")?;

    let measurement = args.measurement();
    let history = ChannelHistory::new(args.sst_history.clone(), args.chl_history.clone());

    let evaluation = evaluator
        .evaluate(&measurement, &history)
        .context("Invalid measurement")?;
    let readings = evaluator.readings(&measurement, &history);

    Ok((readings, evaluation))
}

pub fn evaluate(args: EvaluateArgs, format: OutputFormat) -> Result<()> {
    let (readings, evaluation) = run(&args)?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&evaluation)?);
        }
        OutputFormat::Table => {
            let rules = &args.detector_config().rules;
            let rows: Vec<ReadingRow> = readings
                .iter()
                .map(|r| ReadingRow {
                    channel: r.channel.label().to_string(),
                    observed: r.channel.format_value(r.observed),
                    score: format_score(r.score),
                    bound: describe_bound(rules.bound(r.channel), r.channel),
                })
                .collect();

            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);
            println!("Z threshold: {}", rules.z_threshold);
            println!();

            match evaluation.alert() {
                Some(alert) => {
                    print_warning(&format!("{}: {}", alert.alert_type, alert.message.bold()));
                }
                None => print_success("No anomaly"),
            }
        }
    }

    Ok(())
}
