//! XLSX report adapter
//!
//! Reads the report worksheet of an Ad Manager Excel export. Ad Manager puts
//! report rows on a sheet named "Report data"; when the configured sheet is
//! absent the first sheet is used instead.

use std::path::Path;

use calamine::{open_workbook, Data, DataType, Reader, Xlsx};
use tracing::{debug, warn};

use super::{is_blank_row, ReportFileAdapter};
use crate::error::ReportError;
use crate::schema::ReportTable;

/// XLSX report adapter
pub struct XlsxAdapter {
    sheet: String,
}

impl XlsxAdapter {
    pub fn new(sheet: &str) -> Self {
        Self {
            sheet: sheet.to_string(),
        }
    }

    /// Worksheet names in a workbook
    pub fn sheet_names(path: &Path) -> Result<Vec<String>, ReportError> {
        let workbook: Xlsx<_> =
            open_workbook(path).map_err(|e: calamine::XlsxError| ReportError::Excel(e.to_string()))?;
        Ok(workbook.sheet_names())
    }
}

impl ReportFileAdapter for XlsxAdapter {
    fn load(&self, path: &Path) -> Result<ReportTable, ReportError> {
        if !path.exists() {
            return Err(ReportError::FileNotFound(path.display().to_string()));
        }

        let mut workbook: Xlsx<_> =
            open_workbook(path).map_err(|e: calamine::XlsxError| ReportError::Excel(e.to_string()))?;

        let sheet_names = workbook.sheet_names();
        let sheet_name = match sheet_names.iter().find(|n| **n == self.sheet) {
            Some(name) => name.clone(),
            None => {
                let first = sheet_names
                    .first()
                    .cloned()
                    .ok_or_else(|| ReportError::Excel("workbook has no worksheets".to_string()))?;
                warn!(
                    wanted = %self.sheet,
                    using = %first,
                    "report sheet not found, reading first sheet"
                );
                first
            }
        };

        let range = workbook
            .worksheet_range(&sheet_name)
            .map_err(|e| ReportError::Excel(e.to_string()))?;

        let mut rows_iter = range.rows();
        let headers: Vec<String> = match rows_iter.next() {
            Some(header_row) => header_row.iter().map(cell_text).collect(),
            None => return Ok(ReportTable::default()),
        };

        let mut rows = Vec::new();
        for data_row in rows_iter {
            let row: Vec<String> = data_row.iter().map(cell_text).collect();

            if is_blank_row(&row) {
                continue;
            }

            rows.push(row);
        }

        debug!(
            path = %path.display(),
            sheet = %sheet_name,
            rows = rows.len(),
            "loaded xlsx report"
        );

        Ok(ReportTable::new(headers, rows))
    }
}

/// Render a cell the way the CSV export would show it
fn cell_text(cell: &Data) -> String {
    let text = match cell {
        Data::Empty => String::new(),
        Data::DateTime(_) | Data::DateTimeIso(_) => cell
            .as_datetime()
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| cell.to_string()),
        _ => cell.to_string(),
    };
    text.trim().to_string()
}
