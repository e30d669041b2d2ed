// Core structs: SummaryRecord, StoredRecord, EquipmentRow and the error types
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Statistics computed for one uploaded dataset.
///
/// The serialized key names are consumed by the chart renderers and must not change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub total_equipment: u64,
    /// `None` when no row was accepted.
    pub avg_flowrate: Option<f64>,
    pub avg_pressure: Option<f64>,
    pub avg_temperature: Option<f64>,
    pub type_distribution: BTreeMap<String, u64>,
    #[serde(default)]
    pub filename: String,
}

/// A summary as kept by the history store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: u64,
    #[serde(flatten)]
    pub summary: SummaryRecord,
    pub uploaded_at: DateTime<Utc>,
}

/// One validated CSV row.
#[derive(Debug, Clone, PartialEq)]
pub struct EquipmentRow {
    pub flowrate: f64,
    pub pressure: f64,
    pub temperature: f64,
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowRejection {
    /// 1-based line number in the source file.
    pub line: u64,
    pub reason: RejectReason,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RejectReason {
    #[error("missing field '{0}'")]
    MissingField(&'static str),
    #[error("field '{column}' is not a number: '{value}'")]
    NotNumeric { column: &'static str, value: String },
    #[error("empty equipment type")]
    EmptyType,
    #[error("undecodable record: {0}")]
    Undecodable(String),
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("input has no header row")]
    Empty,
    #[error("required column '{0}' is missing")]
    MissingColumn(&'static str),
    #[error("input is not readable as CSV: {0}")]
    Unreadable(#[from] csv::Error),
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("invalid type distribution: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("invalid timestamp '{0}'")]
    Timestamp(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
