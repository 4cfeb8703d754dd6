//! CSV report adapter
//!
//! Reads comma-separated Ad Manager exports. The first record is the header
//! row; rows may be ragged and fully blank rows are skipped.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::ReaderBuilder;
use tracing::debug;

use super::{is_blank_row, ReportFileAdapter};
use crate::error::ReportError;
use crate::schema::ReportTable;

/// CSV report adapter
pub struct CsvAdapter;

impl ReportFileAdapter for CsvAdapter {
    fn load(&self, path: &Path) -> Result<ReportTable, ReportError> {
        if !path.exists() {
            return Err(ReportError::FileNotFound(path.display().to_string()));
        }

        let file = File::open(path)?;
        let table = Self::from_reader(file)?;
        debug!(path = %path.display(), rows = table.len(), "loaded csv report");
        Ok(table)
    }
}

impl CsvAdapter {
    /// Read a report from any reader (a file, stdin, an in-memory buffer)
    pub fn from_reader<R: Read>(reader: R) -> Result<ReportTable, ReportError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            let row: Vec<String> = record.iter().map(|v| v.trim().to_string()).collect();

            if is_blank_row(&row) {
                continue;
            }

            rows.push(row);
        }

        Ok(ReportTable::new(headers, rows))
    }

    /// Read a report from CSV text
    pub fn parse_str(data: &str) -> Result<ReportTable, ReportError> {
        Self::from_reader(data.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn test_load_valid_file() {
        let mut file = Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "Date,Hour,Ad Exchange revenue (US$)").unwrap();
        writeln!(file, "2024-01-15,0,1.25").unwrap();
        writeln!(file, "2024-01-15,1,2.50").unwrap();

        let table = CsvAdapter.load(file.path()).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.headers[2], "Ad Exchange revenue (US$)");
        assert_eq!(table.cell(1, 2), Some("2.50"));
    }

    #[test]
    fn test_file_not_found() {
        let result = CsvAdapter.load(Path::new("non_existent.csv"));
        assert!(matches!(result, Err(ReportError::FileNotFound(_))));
    }

    #[test]
    fn test_skips_blank_rows() {
        let table = CsvAdapter::parse_str("Date,Hour\n2024-01-15,0\n,\n2024-01-15,1\n").unwrap();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_strips_bom_and_whitespace() {
        let table = CsvAdapter::parse_str("\u{feff}Date , Hour\n 2024-01-15 , 7 \n").unwrap();
        assert_eq!(table.headers, vec!["Date", "Hour"]);
        assert_eq!(table.rows[0], vec!["2024-01-15", "7"]);
    }

    #[test]
    fn test_quoted_thousands() {
        let table = CsvAdapter::parse_str("Date,Requests\n2024-01-15,\"1,234\"\n").unwrap();
        assert_eq!(table.cell(0, 1), Some("1,234"));
    }

    #[test]
    fn test_ragged_totals_row() {
        let table = CsvAdapter::parse_str("Date,Hour,Revenue\n2024-01-15,0,1.0\nTotal,,1.0\n").unwrap();
        assert_eq!(table.len(), 2);
        assert!(table.has_totals_row());
    }

    #[test]
    fn test_header_only() {
        let table = CsvAdapter::parse_str("Date,Hour\n").unwrap();
        assert!(table.is_empty());
        assert_eq!(table.headers.len(), 2);
    }
}
