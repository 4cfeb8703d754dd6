//! In-memory report table
//!
//! Loaders produce a `ReportTable`: trimmed header names and string cells,
//! row by row, exactly as they appear in the source file.

use serde::{Deserialize, Serialize};

/// Token marking a trailing summary row
const TOTALS_TOKEN: &str = "total";

/// A parsed report before any typing or normalization
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ReportTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Number of data rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of the column whose header matches `name`.
    ///
    /// Matching ignores surrounding whitespace and ASCII case.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let wanted = name.trim();
        self.headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(wanted))
    }

    /// Cell at `(row, column)`, or `None` when the row is short
    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .map(|s| s.as_str())
    }

    /// Whether the last row is a totals/summary row.
    ///
    /// Only the last row is inspected; any cell containing "total"
    /// (case-insensitive) marks it.
    pub fn has_totals_row(&self) -> bool {
        self.rows
            .last()
            .map(|row| row.iter().any(|cell| is_totals_cell(cell)))
            .unwrap_or(false)
    }
}

fn is_totals_cell(cell: &str) -> bool {
    cell.to_ascii_lowercase().contains(TOTALS_TOKEN)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: &[&[&str]]) -> ReportTable {
        ReportTable::new(
            vec!["Date".to_string(), "Hour".to_string(), "Revenue".to_string()],
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn test_column_index_ignores_case_and_whitespace() {
        let t = table(&[]);
        assert_eq!(t.column_index("hour"), Some(1));
        assert_eq!(t.column_index("  REVENUE "), Some(2));
        assert_eq!(t.column_index("eCPM"), None);
    }

    #[test]
    fn test_trailing_totals_row() {
        let t = table(&[
            &["2024-01-01", "0", "1.0"],
            &["2024-01-01", "1", "2.0"],
            &["Total", "", "3.0"],
        ]);
        assert!(t.has_totals_row());
    }

    #[test]
    fn test_totals_detection_is_case_insensitive_substring() {
        let t = table(&[&["2024-01-01", "0", "1.0"], &["", "GRAND TOTALS", ""]]);
        assert!(t.has_totals_row());
    }

    #[test]
    fn test_totals_only_checked_on_last_row() {
        let t = table(&[&["Total", "", "3.0"], &["2024-01-01", "0", "1.0"]]);
        assert!(!t.has_totals_row());
    }

    #[test]
    fn test_empty_table_has_no_totals_row() {
        let t = table(&[]);
        assert!(t.is_empty());
        assert!(!t.has_totals_row());
    }

    #[test]
    fn test_cell_on_short_row() {
        let t = table(&[&["2024-01-01"]]);
        assert_eq!(t.cell(0, 0), Some("2024-01-01"));
        assert_eq!(t.cell(0, 2), None);
        assert_eq!(t.cell(5, 0), None);
    }
}
