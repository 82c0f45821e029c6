//! CSV record loading

use std::io::Read;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;

use gd_core::{Record, RecordStatus};

use crate::DataError;

/// One CSV row, before validation
#[derive(Debug, Deserialize)]
struct CsvRow {
    id: String,
    name: String,
    latitude: f64,
    longitude: f64,
    status: String,
    last_updated: String,
    description: Option<String>,
    budget: Option<f64>,
    progress: Option<f64>,
}

/// Read records from CSV.
///
/// Expected header: `id,name,latitude,longitude,status,last_updated,description,budget,progress`.
/// The last three columns may be empty. Timestamps are RFC 3339, or
/// `YYYY-MM-DD HH:MM:SS` taken as UTC.
pub fn load_records_csv<R: Read>(reader: R) -> Result<Vec<Record>, DataError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    let mut raw = csv::StringRecord::new();
    let mut records = Vec::new();

    while reader.read_record(&mut raw)? {
        let line = raw.position().map(|p| p.line()).unwrap_or(0);
        let row: CsvRow = raw.deserialize(Some(&headers))?;
        records.push(row_to_record(row, line)?);
    }

    tracing::debug!(records = records.len(), "loaded records from CSV");
    Ok(records)
}

fn row_to_record(row: CsvRow, line: u64) -> Result<Record, DataError> {
    let invalid = |source| DataError::InvalidRecord { line, source };

    let status: RecordStatus = row.status.parse().map_err(invalid)?;
    let last_updated = parse_timestamp(&row.last_updated).ok_or_else(|| DataError::InvalidTimestamp {
        line,
        value: row.last_updated.clone(),
    })?;

    let mut record = Record::new(row.id, row.name, row.latitude, row.longitude, status, last_updated)
        .map_err(invalid)?;

    if let Some(description) = row.description.filter(|d| !d.is_empty()) {
        record = record.with_description(description);
    }
    if let Some(budget) = row.budget {
        record = record.with_budget(budget).map_err(invalid)?;
    }
    if let Some(progress) = row.progress {
        record = record.with_progress(progress).map_err(invalid)?;
    }

    Ok(record)
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(value) {
        return Some(timestamp.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}
