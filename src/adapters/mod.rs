//! Report file adapters
//!
//! This module provides adapters that read Ad Manager report exports (CSV or
//! XLSX) into an untyped `ReportTable`. Typing happens later, in the normalizer.

mod csv_file;
mod xlsx_file;

pub use csv_file::CsvAdapter;
pub use xlsx_file::XlsxAdapter;

use std::path::Path;

use crate::config::PipelineConfig;
use crate::error::ReportError;
use crate::schema::ReportTable;

/// Trait for report file adapters
pub trait ReportFileAdapter {
    /// Read a report file into a table
    fn load(&self, path: &Path) -> Result<ReportTable, ReportError>;
}

/// Supported report file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Csv,
    Xlsx,
}

impl ReportFormat {
    /// Detect the format from a file extension
    pub fn from_path(path: &Path) -> Result<Self, ReportError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "csv" => Ok(ReportFormat::Csv),
            "xlsx" | "xlsm" => Ok(ReportFormat::Xlsx),
            _ => Err(ReportError::UnsupportedFormat(if ext.is_empty() {
                path.display().to_string()
            } else {
                ext
            })),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportFormat::Csv => "csv",
            ReportFormat::Xlsx => "xlsx",
        }
    }
}

/// Load a report file, picking the adapter from its extension
pub fn load_report(path: &Path, config: &PipelineConfig) -> Result<ReportTable, ReportError> {
    if !path.exists() {
        return Err(ReportError::FileNotFound(path.display().to_string()));
    }

    match ReportFormat::from_path(path)? {
        ReportFormat::Csv => CsvAdapter.load(path),
        ReportFormat::Xlsx => XlsxAdapter::new(&config.excel_sheet).load(path),
    }
}

/// Drop rows whose cells are all blank
fn is_blank_row(row: &[String]) -> bool {
    row.iter().all(|cell| cell.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ReportFormat::from_path(Path::new("report.CSV")).unwrap(),
            ReportFormat::Csv
        );
        assert_eq!(
            ReportFormat::from_path(Path::new("report.xlsx")).unwrap(),
            ReportFormat::Xlsx
        );
        assert!(matches!(
            ReportFormat::from_path(Path::new("report.pdf")),
            Err(ReportError::UnsupportedFormat(ref e)) if e == "pdf"
        ));
    }

    #[test]
    fn test_load_report_missing_file() {
        let result = load_report(Path::new("missing/report.csv"), &PipelineConfig::default());
        assert!(matches!(result, Err(ReportError::FileNotFound(_))));
    }

    #[test]
    fn test_load_report_dispatches_csv() {
        let mut file = Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "Date,Hour").unwrap();
        writeln!(file, "2024-01-15,3").unwrap();

        let table = load_report(file.path(), &PipelineConfig::default()).unwrap();
        assert_eq!(table.headers, vec!["Date", "Hour"]);
        assert_eq!(table.rows, vec![vec!["2024-01-15", "3"]]);
    }
}
