//! Bulk measurement import from CSV
//!
//! Header names are matched case-insensitively. Accepted aliases:
//! `sst`; `chl` or `chlorophyll`; `lat` or `latitude`; `lon` or
//! `longitude`; `timestamp` or `time`. Only `sst` is mandatory, a missing
//! chlorophyll column reads as 0.0.

use std::io::Read;

use chrono::{DateTime, NaiveDateTime, Utc};
use csv::StringRecord;
use serde::{Deserialize, Serialize};

use crate::error::ImportError;
use crate::models::Measurement;

/// A row that could not be turned into a valid measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedRow {
    /// 1-based line number in the upload, header included
    pub line: u64,
    pub reason: String,
}

/// Parsed upload, split into accepted measurements and rejected rows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CsvImport {
    pub measurements: Vec<Measurement>,
    pub rejected: Vec<RejectedRow>,
}

#[derive(Debug, Clone, Copy)]
struct Columns {
    sst: usize,
    chl: Option<usize>,
    lat: Option<usize>,
    lon: Option<usize>,
    timestamp: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Result<Self, ImportError> {
        let find = |names: &[&str]| {
            headers
                .iter()
                .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
        };

        Ok(Self {
            sst: find(&["sst"]).ok_or(ImportError::MissingColumn("sst"))?,
            chl: find(&["chl", "chlorophyll"]),
            lat: find(&["lat", "latitude"]),
            lon: find(&["lon", "longitude"]),
            timestamp: find(&["timestamp", "time"]),
        })
    }
}

fn field(record: &StringRecord, index: Option<usize>) -> Option<&str> {
    index
        .and_then(|i| record.get(i))
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn number(record: &StringRecord, index: Option<usize>, name: &str) -> Result<Option<f64>, String> {
    field(record, index)
        .map(|raw| {
            raw.parse::<f64>()
                .map_err(|_| format!("{} is not a number: {:?}", name, raw))
        })
        .transpose()
}

/// Parse RFC 3339 or a naive ISO date-time (taken as UTC)
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn parse_row(record: &StringRecord, columns: Columns) -> Result<Measurement, String> {
    let sst = number(record, Some(columns.sst), "sst")?.ok_or("sst is empty")?;
    let chl = number(record, columns.chl, "chl")?.unwrap_or(0.0);

    let mut measurement = Measurement::new(sst, chl);
    match (
        number(record, columns.lat, "lat")?,
        number(record, columns.lon, "lon")?,
    ) {
        (Some(lat), Some(lon)) => measurement = measurement.with_location(lat, lon),
        (None, None) => {}
        _ => return Err("lat and lon must be given together".to_string()),
    }

    // Unparseable timestamps are dropped rather than rejecting the row
    if let Some(ts) = field(record, columns.timestamp).and_then(parse_timestamp) {
        measurement = measurement.with_timestamp(ts);
    }

    measurement.validate().map_err(|e| e.to_string())?;
    Ok(measurement)
}

/// Read a CSV upload, validating each row independently
///
/// A bad header or unreadable input fails the whole import. Rows that do
/// not parse or validate are collected in [`CsvImport::rejected`].
pub fn parse_measurements_csv<R: Read>(reader: R) -> Result<CsvImport, ImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| ImportError::Csv(e.to_string()))?
        .clone();
    let columns = Columns::from_headers(&headers)?;

    let mut import = CsvImport::default();
    for result in reader.records() {
        let record = result.map_err(|e| ImportError::Csv(e.to_string()))?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();

        match parse_row(&record, columns) {
            Ok(measurement) => import.measurements.push(measurement),
            Err(reason) => import.rejected.push(RejectedRow { line, reason }),
        }
    }

    Ok(import)
}
