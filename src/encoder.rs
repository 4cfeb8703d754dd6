//! Report encoding
//!
//! This module encodes an analysis into the presentation payload: display
//! tables, chart-ready trend series, quality and provenance. Tables can also
//! be rendered as CSV using the report's own column headers.

use chrono::{NaiveDateTime, Utc};
use csv::WriterBuilder;
use uuid::Uuid;

use crate::error::ReportError;
use crate::schema::ReportColumns;
use crate::types::{
    Classified, DisplayRow, HourlyBucket, ProjectedHour, ReportAnalysis, ReportPayload,
    ReportProducer, ReportProvenance, TrendPoint, TrendSeries,
};
use crate::{PRODUCER_NAME, PULSE_VERSION};

/// Current report payload version
pub const REPORT_VERSION: &str = "1.0.0";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Which display table to render
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportTableKind {
    /// Historical hourly recommendations
    Hourly,
    /// Next-day projected recommendations
    NextDay,
}

/// Report encoder for producing presentation payloads
pub struct ReportEncoder {
    instance_id: String,
}

impl Default for ReportEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Encode an analysis into a report payload
    pub fn encode(&self, analysis: &ReportAnalysis, source: &str) -> ReportPayload {
        let producer = ReportProducer {
            name: PRODUCER_NAME.to_string(),
            version: PULSE_VERSION.to_string(),
            instance_id: self.instance_id.clone(),
        };

        let provenance = ReportProvenance {
            source: source.to_string(),
            computed_at_utc: Utc::now().to_rfc3339(),
            latest_date: analysis.latest_date.map(|d| d.to_string()),
            projected_date: analysis.projected_date.map(|d| d.to_string()),
        };

        ReportPayload {
            report_version: REPORT_VERSION.to_string(),
            producer,
            provenance,
            quality: analysis.quality.clone(),
            hourly: analysis.hourly.iter().map(hourly_row).collect(),
            next_day: analysis.next_day.iter().map(projected_row).collect(),
            trends: build_trends(analysis),
        }
    }

    /// Encode to a pretty JSON string
    pub fn encode_to_json(&self, analysis: &ReportAnalysis, source: &str) -> Result<String, ReportError> {
        let payload = self.encode(analysis, source);
        serde_json::to_string_pretty(&payload).map_err(ReportError::Json)
    }

    /// Render one display table as CSV.
    ///
    /// The hourly table carries timestamp, eCPM, match rate, revenue and
    /// recommendation; the next-day table adds ad requests.
    pub fn table_to_csv(
        &self,
        payload: &ReportPayload,
        kind: ReportTableKind,
        columns: &ReportColumns,
    ) -> Result<String, ReportError> {
        let (rows, with_requests) = match kind {
            ReportTableKind::Hourly => (&payload.hourly, false),
            ReportTableKind::NextDay => (&payload.next_day, true),
        };

        let mut writer = WriterBuilder::new().from_writer(Vec::new());

        let mut header = vec![
            "Timestamp",
            columns.ecpm.as_str(),
            columns.match_rate.as_str(),
            columns.revenue.as_str(),
        ];
        if with_requests {
            header.push(columns.ad_requests.as_str());
        }
        header.push("Recommendation");
        writer.write_record(&header)?;

        for row in rows {
            let mut record = vec![
                row.timestamp.clone(),
                optional_number(row.ecpm_mean),
                optional_number(row.match_rate_mean),
                row.revenue_sum.to_string(),
            ];
            if with_requests {
                record.push(row.ad_requests_sum.to_string());
            }
            record.push(row.recommendation_label.clone());
            writer.write_record(&record)?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| ReportError::Encoding(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| ReportError::Encoding(e.to_string()))
    }
}

fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

fn optional_number(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn hourly_row(row: &Classified<HourlyBucket>) -> DisplayRow {
    let bucket = &row.row;
    DisplayRow {
        timestamp: format_timestamp(&bucket.timestamp),
        ecpm_mean: bucket.ecpm_mean,
        match_rate_mean: bucket.match_rate_mean,
        revenue_sum: bucket.revenue_sum,
        ad_requests_sum: bucket.ad_requests_sum,
        recommendation: row.recommendation,
        recommendation_label: row.recommendation.label().to_string(),
    }
}

fn projected_row(row: &Classified<ProjectedHour>) -> DisplayRow {
    let hour = &row.row;
    DisplayRow {
        timestamp: format_timestamp(&hour.timestamp),
        ecpm_mean: Some(hour.ecpm_mean),
        match_rate_mean: Some(hour.match_rate_mean),
        revenue_sum: hour.revenue_sum,
        ad_requests_sum: hour.ad_requests_sum,
        recommendation: row.recommendation,
        recommendation_label: row.recommendation.label().to_string(),
    }
}

/// Chart series: historical eCPM, revenue and ad requests, then the
/// projected eCPM and ad requests
fn build_trends(analysis: &ReportAnalysis) -> Vec<TrendSeries> {
    let hourly = &analysis.hourly;
    let next_day = &analysis.next_day;

    vec![
        series(
            "ecpm",
            "Ad Exchange eCPM over time",
            hourly.iter().map(|r| (&r.row.timestamp, r.row.ecpm_mean)),
        ),
        series(
            "revenue",
            "Ad Exchange Revenue over time",
            hourly.iter().map(|r| (&r.row.timestamp, Some(r.row.revenue_sum))),
        ),
        series(
            "ad_requests",
            "Ad Requests over time",
            hourly
                .iter()
                .map(|r| (&r.row.timestamp, Some(r.row.ad_requests_sum as f64))),
        ),
        series(
            "predicted_ecpm",
            "Predicted eCPM for Next Day",
            next_day.iter().map(|r| (&r.row.timestamp, Some(r.row.ecpm_mean))),
        ),
        series(
            "predicted_ad_requests",
            "Predicted Ad Requests for Next Day",
            next_day
                .iter()
                .map(|r| (&r.row.timestamp, Some(r.row.ad_requests_sum as f64))),
        ),
    ]
}

fn series<'a>(
    name: &str,
    caption: &str,
    values: impl Iterator<Item = (&'a NaiveDateTime, Option<f64>)>,
) -> TrendSeries {
    let points = values
        .filter_map(|(ts, value)| {
            value.map(|value| TrendPoint {
                timestamp: format_timestamp(ts),
                value,
            })
        })
        .collect();

    TrendSeries {
        name: name.to_string(),
        caption: caption.to_string(),
        points,
    }
}
