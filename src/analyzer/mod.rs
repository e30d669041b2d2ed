// Analyzer module: typed row validation and the CSV-to-summary transform.

pub mod rows;
pub mod summary;

// Re-export the main Analyzer implementation for ease of use.
pub use summary::{Analyzer, CsvAnalyzer};
