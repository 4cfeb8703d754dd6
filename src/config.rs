//! Pipeline configuration
//!
//! A `PipelineConfig` is passed explicitly to every entry point; nothing is
//! read from ambient state. All fields default, so a JSON config file only
//! needs to name what it overrides.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::classifier::RecommendationThresholds;
use crate::error::ReportError;
use crate::schema::ReportColumns;

/// Sheet holding report rows in an Ad Manager XLSX export
pub const DEFAULT_EXCEL_SHEET: &str = "Report data";

/// Configuration for one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Report header names
    pub columns: ReportColumns,
    /// Recommendation rule thresholds
    pub thresholds: RecommendationThresholds,
    /// Worksheet to read from XLSX reports
    pub excel_sheet: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            columns: ReportColumns::default(),
            thresholds: RecommendationThresholds::default(),
            excel_sheet: DEFAULT_EXCEL_SHEET.to_string(),
        }
    }
}

impl PipelineConfig {
    /// Parse a configuration from JSON
    pub fn from_json(json: &str) -> Result<Self, ReportError> {
        let config: PipelineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ReportError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ReportError::FileNotFound(path.display().to_string()));
        }
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Serialize the configuration to pretty JSON
    pub fn to_json(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ReportError> {
        if !self.thresholds.is_finite() {
            return Err(ReportError::Config(
                "recommendation thresholds must be finite numbers".to_string(),
            ));
        }
        if self.excel_sheet.trim().is_empty() {
            return Err(ReportError::Config("excel_sheet must not be empty".to_string()));
        }

        let columns = &self.columns;
        let headers = [
            &columns.date,
            &columns.hour,
            &columns.revenue,
            &columns.ecpm,
            &columns.ad_requests,
            &columns.impressions,
            &columns.match_rate,
        ];
        if headers.iter().any(|h| h.trim().is_empty()) {
            return Err(ReportError::Config("column names must not be empty".to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_json_is_default() {
        let config = PipelineConfig::from_json("{}").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.excel_sheet, "Report data");
    }

    #[test]
    fn test_partial_override() {
        let config = PipelineConfig::from_json(
            r#"{
                "thresholds": { "optimized_max_revenue": 0.05 },
                "columns": { "hour": "Hour of day" }
            }"#,
        )
        .unwrap();

        assert_eq!(config.thresholds.optimized_max_revenue, 0.05);
        assert_eq!(config.thresholds.floor_min_ecpm, 0.5);
        assert_eq!(config.columns.hour, "Hour of day");
        assert_eq!(config.columns.date, "Date");
    }

    #[test]
    fn test_roundtrip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pulse.json");
        let config = PipelineConfig {
            excel_sheet: "Sheet1".to_string(),
            ..Default::default()
        };
        fs::write(&path, config.to_json().unwrap()).unwrap();

        let loaded = PipelineConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file() {
        let result = PipelineConfig::from_file("does/not/exist.json");
        assert!(matches!(result, Err(ReportError::FileNotFound(_))));
    }

    #[test]
    fn test_rejects_empty_sheet() {
        let result = PipelineConfig::from_json(r#"{"excel_sheet": "  "}"#);
        assert!(matches!(result, Err(ReportError::Config(_))));
    }

    #[test]
    fn test_rejects_invalid_json() {
        let result = PipelineConfig::from_json("not json");
        assert!(matches!(result, Err(ReportError::Json(_))));
    }
}
