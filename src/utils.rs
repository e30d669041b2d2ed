// Utility functions
use chrono::{DateTime, Utc};
use std::path::Path;

/// Parses an RFC 3339 string into `DateTime<Utc>`, if possible.
pub fn parse_datetime(date_str: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(date_str)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// True for paths ending in `.csv`, in any letter case.
pub fn is_csv_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_rfc3339_in_any_offset() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        assert_eq!(parse_datetime("2024-03-01T10:00:00+00:00"), Some(expected));
        assert_eq!(parse_datetime("2024-03-01T12:00:00+02:00"), Some(expected));
        assert_eq!(parse_datetime("not a date"), None);
    }

    #[test]
    fn recognizes_csv_extension() {
        assert!(is_csv_file(Path::new("inbox/plant.csv")));
        assert!(is_csv_file(Path::new("PLANT.CSV")));
        assert!(!is_csv_file(Path::new("plant.csv.bak")));
        assert!(!is_csv_file(Path::new("README")));
    }
}
