use crate::analyzer::rows::ColumnIndex;
use crate::model::{AnalysisError, EquipmentRow, RejectReason, RowRejection, SummaryRecord};
use csv::{ErrorKind, ReaderBuilder, Trim};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Trait defining the interface for an equipment data analyzer.
pub trait Analyzer {
    fn analyze(&self, raw: &[u8], filename: &str) -> Result<SummaryRecord, AnalysisError>;
}

/// Summary plus the rows that were left out of it.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub summary: SummaryRecord,
    pub rejections: Vec<RowRejection>,
}

/// Stateless CSV analyzer. Safe to share between concurrent uploads.
#[derive(Debug, Default, Clone, Copy)]
pub struct CsvAnalyzer;

impl CsvAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Parses `raw` as CSV with a header row and aggregates every valid row.
    ///
    /// Malformed rows (missing or non-numeric fields, empty type label, undecodable
    /// bytes) are dropped and listed in [`AnalysisReport::rejections`]. Only a broken
    /// header or a missing required column fails the whole analysis.
    pub fn analyze_detailed(&self, raw: &[u8], filename: &str) -> Result<AnalysisReport, AnalysisError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(raw);

        let columns = ColumnIndex::from_headers(reader.headers()?)?;

        let mut totals = Totals::default();
        let mut rejections = Vec::new();

        for result in reader.records() {
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    let per_row = matches!(
                        e.kind(),
                        ErrorKind::Utf8 { .. } | ErrorKind::UnequalLengths { .. }
                    );
                    if !per_row {
                        return Err(e.into());
                    }
                    let line = e.position().map_or(0, |p| p.line());
                    rejections.push(RowRejection {
                        line,
                        reason: RejectReason::Undecodable(e.to_string()),
                    });
                    continue;
                }
            };

            let line = record.position().map_or(0, |p| p.line());
            match columns.validate(&record) {
                Ok(row) => totals.add(row),
                Err(reason) => {
                    debug!("Rejected row {} of '{}': {}", line, filename, reason);
                    rejections.push(RowRejection { line, reason });
                }
            }
        }

        Ok(AnalysisReport {
            summary: totals.into_summary(filename),
            rejections,
        })
    }
}

impl Analyzer for CsvAnalyzer {
    fn analyze(&self, raw: &[u8], filename: &str) -> Result<SummaryRecord, AnalysisError> {
        let report = self.analyze_detailed(raw, filename)?;
        if !report.rejections.is_empty() {
            let details: Vec<String> = report
                .rejections
                .iter()
                .map(|r| format!("line {}: {}", r.line, r.reason))
                .collect();
            warn!(
                "'{}': {} malformed row(s) excluded from the summary ({})",
                filename,
                report.rejections.len(),
                details.join("; ")
            );
        }
        Ok(report.summary)
    }
}

/// Running means over accepted rows.
///
/// Means are updated incrementally so large finite values never overflow a sum.
#[derive(Debug, Default)]
struct Totals {
    count: u64,
    flowrate: f64,
    pressure: f64,
    temperature: f64,
    type_distribution: BTreeMap<String, u64>,
}

impl Totals {
    fn add(&mut self, row: EquipmentRow) {
        self.count += 1;
        let n = self.count as f64;
        self.flowrate = advance(self.flowrate, row.flowrate, n);
        self.pressure = advance(self.pressure, row.pressure, n);
        self.temperature = advance(self.temperature, row.temperature, n);
        *self.type_distribution.entry(row.kind).or_insert(0) += 1;
    }

    fn into_summary(self, filename: &str) -> SummaryRecord {
        let mean = |value: f64| (self.count > 0).then_some(value);
        SummaryRecord {
            total_equipment: self.count,
            avg_flowrate: mean(self.flowrate),
            avg_pressure: mean(self.pressure),
            avg_temperature: mean(self.temperature),
            type_distribution: self.type_distribution,
            filename: filename.to_string(),
        }
    }
}

/// Folds the `n`-th value into a running mean. Both terms are scaled down
/// before subtracting, so the result stays finite for finite inputs.
fn advance(mean: f64, value: f64, n: f64) -> f64 {
    mean + (value / n - mean / n)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "Equipment Name,Type,Flowrate,Pressure,Temperature\n";

    fn analyze(csv: &str) -> Result<SummaryRecord, AnalysisError> {
        CsvAnalyzer::new().analyze(csv.as_bytes(), "test.csv")
    }

    fn assert_close(actual: Option<f64>, expected: f64) {
        let actual = actual.expect("mean should be present");
        assert!((actual - expected).abs() < 1e-9, "{actual} != {expected}");
    }

    #[test]
    fn summarizes_sample_file() {
        let csv = "Flowrate,Pressure,Temperature,Type\n\
                   10,5,20,Pump\n\
                   20,5,25,Pump\n\
                   15,6,22,Valve\n";
        let summary = analyze(csv).unwrap();

        assert_eq!(summary.total_equipment, 3);
        assert_close(summary.avg_flowrate, 15.0);
        assert_close(summary.avg_pressure, 16.0 / 3.0);
        assert_close(summary.avg_temperature, 67.0 / 3.0);
        assert_eq!(
            summary.type_distribution,
            BTreeMap::from([("Pump".to_string(), 2), ("Valve".to_string(), 1)])
        );
        assert_eq!(summary.filename, "test.csv");
    }

    #[test]
    fn header_only_reports_no_values() {
        let summary = analyze(HEADER).unwrap();
        assert_eq!(summary.total_equipment, 0);
        assert_eq!(summary.avg_flowrate, None);
        assert_eq!(summary.avg_pressure, None);
        assert_eq!(summary.avg_temperature, None);
        assert!(summary.type_distribution.is_empty());
    }

    #[test]
    fn means_match_synthetic_data() {
        let mut csv = String::from(HEADER);
        let n = 250;
        for i in 0..n {
            let kind = ["Pump", "Valve", "Compressor"][i % 3];
            csv.push_str(&format!("E-{i},{kind},{},{},{}\n", i as f64 * 0.5, 100 - i as i64, i * i));
        }
        let summary = analyze(&csv).unwrap();

        let n_f = n as f64;
        let flow: f64 = (0..n).map(|i| i as f64 * 0.5).sum::<f64>() / n_f;
        let pressure: f64 = (0..n).map(|i| 100.0 - i as f64).sum::<f64>() / n_f;
        let temp: f64 = (0..n).map(|i| (i * i) as f64).sum::<f64>() / n_f;

        assert_eq!(summary.total_equipment, n as u64);
        assert_close(summary.avg_flowrate, flow);
        assert_close(summary.avg_pressure, pressure);
        assert_close(summary.avg_temperature, temp);
        assert_eq!(summary.type_distribution.values().sum::<u64>(), summary.total_equipment);
        assert_eq!(summary.type_distribution["Pump"], 84);
    }

    #[test]
    fn extreme_values_keep_a_finite_mean() {
        let csv = "Flowrate,Pressure,Temperature,Type\n\
                   1e308,-1.7e308,1.7976931348623157e308,Pump\n\
                   1e308,1.7e308,1.7976931348623157e308,Pump\n";
        let summary = analyze(csv).unwrap();

        assert_eq!(summary.total_equipment, 2);
        let flowrate = summary.avg_flowrate.unwrap();
        assert!((flowrate - 1e308).abs() <= 1e308 * 1e-12, "{flowrate}");
        assert!(summary.avg_pressure.unwrap().abs() <= 1e308 * 1e-12);
        assert_eq!(summary.avg_temperature, Some(f64::MAX));

        let json = serde_json::to_value(&summary).unwrap();
        assert!(json["avg_flowrate"].is_number());
        assert!(json["avg_temperature"].is_number());
    }

    #[test]
    fn malformed_rows_are_dropped() {
        let csv = "Flowrate,Pressure,Temperature,Type\n\
                   10,5,20,Pump\n\
                   oops,5,20,Pump\n\
                   12,,20,Valve\n\
                   14,5,20\n\
                   16,5,20,\n\
                   20,7,30,Valve\n";
        let report = CsvAnalyzer::new()
            .analyze_detailed(csv.as_bytes(), "mixed.csv")
            .unwrap();

        assert_eq!(report.summary.total_equipment, 2);
        assert_close(report.summary.avg_flowrate, 15.0);
        assert_eq!(report.summary.type_distribution.values().sum::<u64>(), 2);
        let lines: Vec<u64> = report.rejections.iter().map(|r| r.line).collect();
        assert_eq!(lines, vec![3, 4, 5, 6]);
    }

    #[test]
    fn wholly_malformed_file_yields_empty_summary() {
        let csv = "Flowrate,Pressure,Temperature,Type\nx,y,z,Pump\n,,,\n";
        let summary = analyze(csv).unwrap();
        assert_eq!(summary.total_equipment, 0);
        assert_eq!(summary.avg_flowrate, None);
        assert!(summary.type_distribution.is_empty());
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        let csv = " Flowrate , Pressure,Temperature ,Type\n 10 , 5,20 , Pump \n";
        let summary = analyze(csv).unwrap();
        assert_eq!(summary.total_equipment, 1);
        assert_eq!(summary.type_distribution["Pump"], 1);
    }

    #[test]
    fn undecodable_row_is_dropped() {
        let mut raw = b"Flowrate,Pressure,Temperature,Type\n10,5,20,Pump\n".to_vec();
        raw.extend_from_slice(b"11,5,20,\xff\xfe\n");
        let report = CsvAnalyzer::new().analyze_detailed(&raw, "bin.csv").unwrap();
        assert_eq!(report.summary.total_equipment, 1);
        assert_eq!(report.rejections.len(), 1);
        assert!(matches!(report.rejections[0].reason, RejectReason::Undecodable(_)));
    }

    #[test]
    fn missing_column_fails() {
        let err = analyze("Flowrate,Pressure,Type\n1,2,Pump\n").unwrap_err();
        assert!(matches!(err, AnalysisError::MissingColumn("Temperature")));
    }

    #[test]
    fn empty_input_fails() {
        assert!(matches!(analyze("").unwrap_err(), AnalysisError::Empty));
    }

    #[test]
    fn unreadable_header_fails() {
        let err = CsvAnalyzer::new()
            .analyze(b"Flow\xffrate,Pressure,Temperature,Type\n", "bad.csv")
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Unreadable(_)));
    }

    #[test]
    fn serializes_with_chart_field_names() {
        let summary = analyze("Flowrate,Pressure,Temperature,Type\n1,2,3,Pump\n").unwrap();
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["total_equipment"], 1);
        assert_eq!(json["avg_flowrate"], 1.0);
        assert_eq!(json["avg_pressure"], 2.0);
        assert_eq!(json["avg_temperature"], 3.0);
        assert_eq!(json["type_distribution"]["Pump"], 1);

        let empty = serde_json::to_value(analyze(HEADER).unwrap()).unwrap();
        assert!(empty["avg_flowrate"].is_null());
        assert_eq!(empty["type_distribution"], serde_json::json!({}));
    }
}
