//! Report column mapping
//!
//! Defaults follow the Google Ad Manager "Ad Exchange" hourly report export.

use serde::{Deserialize, Serialize};

use crate::error::ReportError;
use crate::schema::ReportTable;
use crate::types::Metric;

/// Current report schema identifier
pub const REPORT_SCHEMA: &str = "adx.hourly_report.v1";

/// Header names used to locate each field in a report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportColumns {
    pub date: String,
    pub hour: String,
    pub revenue: String,
    pub ecpm: String,
    pub ad_requests: String,
    pub impressions: String,
    pub match_rate: String,
}

impl Default for ReportColumns {
    fn default() -> Self {
        Self {
            date: "Date".to_string(),
            hour: "Hour".to_string(),
            revenue: "Ad Exchange revenue (US$)".to_string(),
            ecpm: "Ad Exchange average eCPM (US$)".to_string(),
            ad_requests: "Ad Exchange ad requests".to_string(),
            impressions: "Ad Exchange impressions".to_string(),
            match_rate: "Ad Exchange match rate".to_string(),
        }
    }
}

impl ReportColumns {
    /// Header configured for a metric
    pub fn metric_header(&self, metric: Metric) -> &str {
        match metric {
            Metric::Revenue => &self.revenue,
            Metric::Ecpm => &self.ecpm,
            Metric::AdRequests => &self.ad_requests,
            Metric::Impressions => &self.impressions,
            Metric::MatchRate => &self.match_rate,
        }
    }

    /// Resolve header names to column positions in `table`
    pub fn resolve(&self, table: &ReportTable) -> Result<ColumnIndex, ReportError> {
        let find = |name: &str| {
            table
                .column_index(name)
                .ok_or_else(|| ReportError::MissingColumn(name.to_string()))
        };

        Ok(ColumnIndex {
            date: find(&self.date)?,
            hour: find(&self.hour)?,
            revenue: find(&self.revenue)?,
            ecpm: find(&self.ecpm)?,
            ad_requests: find(&self.ad_requests)?,
            impressions: find(&self.impressions)?,
            match_rate: find(&self.match_rate)?,
        })
    }

    /// Columns the report must contain, with a short description of each
    pub fn describe(&self) -> Vec<ColumnSpec> {
        let mut specs = vec![
            ColumnSpec::new("date", &self.date, "Calendar date of the row"),
            ColumnSpec::new("hour", &self.hour, "Hour of day, 0-23"),
        ];
        specs.extend(Metric::ALL.iter().map(|metric| {
            ColumnSpec::new(metric.as_str(), self.metric_header(*metric), metric_description(*metric))
        }));
        specs
    }
}

fn metric_description(metric: Metric) -> &'static str {
    match metric {
        Metric::Revenue => "Revenue, summed per hour",
        Metric::Ecpm => "Average eCPM, averaged per hour",
        Metric::AdRequests => "Ad requests, summed per hour",
        Metric::Impressions => "Impressions, summed per hour",
        Metric::MatchRate => "Match rate (0-1 or percent), averaged per hour",
    }
}

/// Resolved column positions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnIndex {
    pub date: usize,
    pub hour: usize,
    pub revenue: usize,
    pub ecpm: usize,
    pub ad_requests: usize,
    pub impressions: usize,
    pub match_rate: usize,
}

impl ColumnIndex {
    pub fn metric(&self, metric: Metric) -> usize {
        match metric {
            Metric::Revenue => self.revenue,
            Metric::Ecpm => self.ecpm,
            Metric::AdRequests => self.ad_requests,
            Metric::Impressions => self.impressions,
            Metric::MatchRate => self.match_rate,
        }
    }
}

/// Description of one expected input column
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub field: String,
    pub header: String,
    pub description: String,
}

impl ColumnSpec {
    fn new(field: &str, header: &str, description: &str) -> Self {
        Self {
            field: field.to_string(),
            header: header.to_string(),
            description: description.to_string(),
        }
    }
}
