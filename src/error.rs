//! Error types for ADX Pulse
//!
//! Only the I/O shell can fail. The aggregation, classification and
//! projection stages degrade to smaller or empty results instead.

use thiserror::Error;

/// Errors that can occur while loading, configuring or encoding a report
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Unsupported report format: {0} (expected .csv or .xlsx)")]
    UnsupportedFormat(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parse error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Excel parse error: {0}")]
    Excel(String),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Encoding error: {0}")]
    Encoding(String),
}
