use crate::model::{AnalysisError, EquipmentRow, RejectReason};
use csv::StringRecord;

pub const FLOWRATE: &str = "Flowrate";
pub const PRESSURE: &str = "Pressure";
pub const TEMPERATURE: &str = "Temperature";
pub const TYPE: &str = "Type";

/// Positions of the required columns inside a header row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnIndex {
    flowrate: usize,
    pressure: usize,
    temperature: usize,
    kind: usize,
}

impl ColumnIndex {
    /// Locates the required columns. Names match exactly and case-sensitively;
    /// any other column is ignored.
    pub fn from_headers(headers: &StringRecord) -> Result<Self, AnalysisError> {
        if headers.is_empty() {
            return Err(AnalysisError::Empty);
        }

        let find = |name: &'static str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or(AnalysisError::MissingColumn(name))
        };

        Ok(Self {
            flowrate: find(FLOWRATE)?,
            pressure: find(PRESSURE)?,
            temperature: find(TEMPERATURE)?,
            kind: find(TYPE)?,
        })
    }

    /// Turns a raw record into a typed row, or says why it can't be used.
    pub fn validate(&self, record: &StringRecord) -> Result<EquipmentRow, RejectReason> {
        Ok(EquipmentRow {
            flowrate: numeric(record, self.flowrate, FLOWRATE)?,
            pressure: numeric(record, self.pressure, PRESSURE)?,
            temperature: numeric(record, self.temperature, TEMPERATURE)?,
            kind: label(record, self.kind)?,
        })
    }
}

fn numeric(record: &StringRecord, idx: usize, column: &'static str) -> Result<f64, RejectReason> {
    let raw = match record.get(idx) {
        Some(v) if !v.is_empty() => v,
        _ => return Err(RejectReason::MissingField(column)),
    };

    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(RejectReason::NotNumeric {
            column,
            value: raw.to_string(),
        }),
    }
}

fn label(record: &StringRecord, idx: usize) -> Result<String, RejectReason> {
    match record.get(idx) {
        None => Err(RejectReason::MissingField(TYPE)),
        Some("") => Err(RejectReason::EmptyType),
        Some(v) => Ok(v.to_string()),
    }
}
