//! Core types for the ADX Pulse pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: raw report records, hourly buckets, next-day projections and the
//! encoded report payload.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Hours in a report day
pub const HOURS_PER_DAY: u32 = 24;

/// Whether an hour of day is in 0-23
pub fn is_valid_hour(hour: u32) -> bool {
    hour < HOURS_PER_DAY
}

/// Whether a currency amount (revenue, eCPM) is finite and non-negative
pub fn is_valid_amount(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

/// Whether a rate is finite and within [0, 1]
pub fn is_valid_rate(value: f64) -> bool {
    value.is_finite() && (0.0..=1.0).contains(&value)
}

/// Report metric identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Revenue,
    Ecpm,
    AdRequests,
    Impressions,
    MatchRate,
}

impl Metric {
    pub const ALL: [Metric; 5] = [
        Metric::Revenue,
        Metric::Ecpm,
        Metric::AdRequests,
        Metric::Impressions,
        Metric::MatchRate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Revenue => "revenue",
            Metric::Ecpm => "ecpm",
            Metric::AdRequests => "ad_requests",
            Metric::Impressions => "impressions",
            Metric::MatchRate => "match_rate",
        }
    }
}

/// One report row after date parsing.
///
/// Metric fields are `None` when the source cell was missing or non-numeric.
/// A `None` value, or one outside its metric's domain, takes no part in
/// aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Calendar date of the row
    pub date: NaiveDate,
    /// Hour of day (0-23)
    pub hour: u32,
    /// Ad Exchange revenue (currency)
    pub revenue: Option<f64>,
    /// Ad Exchange average eCPM (currency per mille)
    pub ecpm: Option<f64>,
    /// Ad requests
    pub ad_requests: Option<u64>,
    /// Impressions served
    pub impressions: Option<u64>,
    /// Match rate (0-1)
    pub match_rate: Option<f64>,
}

impl RawRecord {
    /// Create a record with every metric present
    pub fn new(
        date: NaiveDate,
        hour: u32,
        revenue: f64,
        ecpm: f64,
        ad_requests: u64,
        impressions: u64,
        match_rate: f64,
    ) -> Self {
        Self {
            date,
            hour,
            revenue: Some(revenue),
            ecpm: Some(ecpm),
            ad_requests: Some(ad_requests),
            impressions: Some(impressions),
            match_rate: Some(match_rate),
        }
    }

    /// Revenue, if present and a valid amount
    pub fn valid_revenue(&self) -> Option<f64> {
        self.revenue.filter(|v| is_valid_amount(*v))
    }

    /// eCPM, if present and a valid amount
    pub fn valid_ecpm(&self) -> Option<f64> {
        self.ecpm.filter(|v| is_valid_amount(*v))
    }

    /// Match rate, if present and within [0, 1]
    pub fn valid_match_rate(&self) -> Option<f64> {
        self.match_rate.filter(|v| is_valid_rate(*v))
    }

    /// Whether the given metric carries a usable value
    pub fn has_metric(&self, metric: Metric) -> bool {
        match metric {
            Metric::Revenue => self.valid_revenue().is_some(),
            Metric::Ecpm => self.valid_ecpm().is_some(),
            Metric::AdRequests => self.ad_requests.is_some(),
            Metric::Impressions => self.impressions.is_some(),
            Metric::MatchRate => self.valid_match_rate().is_some(),
        }
    }
}

/// Aggregated metrics for one `(date, hour)` key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyBucket {
    pub date: NaiveDate,
    pub hour: u32,
    /// Start of the hour on `date`
    pub timestamp: NaiveDateTime,
    pub revenue_sum: f64,
    /// Unweighted mean; `None` when no record had a valid eCPM
    pub ecpm_mean: Option<f64>,
    pub ad_requests_sum: u64,
    pub impressions_sum: u64,
    /// Unweighted mean; `None` when no record had a valid match rate
    pub match_rate_mean: Option<f64>,
    /// Number of raw records merged into this bucket
    pub record_count: usize,
}

/// Synthetic next-day row copied from the latest observed day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectedHour {
    pub date: NaiveDate,
    pub hour: u32,
    pub timestamp: NaiveDateTime,
    pub revenue_sum: f64,
    pub ecpm_mean: f64,
    pub match_rate_mean: f64,
    pub ad_requests_sum: u64,
}

/// Monetization recommendation for one hour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    FloorPricing,
    TargetCpm,
    GoogleOptimized,
    NoChange,
}

impl Recommendation {
    /// Human-readable label shown in report tables
    pub fn label(&self) -> &'static str {
        match self {
            Recommendation::FloorPricing => "Use Floor Pricing",
            Recommendation::TargetCpm => "Use Target CPM",
            Recommendation::GoogleOptimized => "Use Google Optimized",
            Recommendation::NoChange => "No Change",
        }
    }
}

/// A row with its recommendation appended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classified<T> {
    #[serde(flatten)]
    pub row: T,
    pub recommendation: Recommendation,
}

/// Quality flag indicating data issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityFlag {
    NoData,
    TotalsRowRemoved,
    UnkeyedRowsDropped,
    InvalidMetricValues,
    PartialLatestDay,
}

/// Count of rejected cells per metric
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricIssueCounts {
    pub revenue: usize,
    pub ecpm: usize,
    pub ad_requests: usize,
    pub impressions: usize,
    pub match_rate: usize,
}

impl MetricIssueCounts {
    pub fn record(&mut self, metric: Metric) {
        match metric {
            Metric::Revenue => self.revenue += 1,
            Metric::Ecpm => self.ecpm += 1,
            Metric::AdRequests => self.ad_requests += 1,
            Metric::Impressions => self.impressions += 1,
            Metric::MatchRate => self.match_rate += 1,
        }
    }

    pub fn get(&self, metric: Metric) -> usize {
        match metric {
            Metric::Revenue => self.revenue,
            Metric::Ecpm => self.ecpm,
            Metric::AdRequests => self.ad_requests,
            Metric::Impressions => self.impressions,
            Metric::MatchRate => self.match_rate,
        }
    }

    pub fn total(&self) -> usize {
        Metric::ALL.iter().map(|m| self.get(*m)).sum()
    }
}

/// Data quality summary for one analysis run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataQuality {
    /// Data rows read from the table (totals row included)
    pub rows_read: usize,
    pub totals_row_removed: bool,
    /// Rows without a parseable date or hour
    pub rows_dropped: usize,
    /// Cells excluded from aggregation, per metric
    pub invalid_metrics: MetricIssueCounts,
    /// Share of metric cells that were usable (0-1)
    pub coverage: f64,
    pub buckets: usize,
    pub projected_hours: usize,
    /// Hours of the projected day with no source bucket
    pub missing_projection_hours: Vec<u32>,
    pub flags: Vec<QualityFlag>,
}

/// Result of running the pipeline over one report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportAnalysis {
    /// Classified hourly buckets, ascending by timestamp
    pub hourly: Vec<Classified<HourlyBucket>>,
    /// Classified next-day rows, ascending by hour
    pub next_day: Vec<Classified<ProjectedHour>>,
    pub latest_date: Option<NaiveDate>,
    pub projected_date: Option<NaiveDate>,
    pub quality: DataQuality,
}

impl ReportAnalysis {
    pub fn is_empty(&self) -> bool {
        self.hourly.is_empty()
    }
}

/// Report producer metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Report provenance information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportProvenance {
    pub source: String,
    pub computed_at_utc: String,
    pub latest_date: Option<String>,
    pub projected_date: Option<String>,
}

/// One display row of the hourly or next-day table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayRow {
    pub timestamp: String,
    pub ecpm_mean: Option<f64>,
    pub match_rate_mean: Option<f64>,
    pub revenue_sum: f64,
    pub ad_requests_sum: u64,
    pub recommendation: Recommendation,
    pub recommendation_label: String,
}

/// A single point on a trend chart
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendPoint {
    pub timestamp: String,
    pub value: f64,
}

/// A named time series ready for charting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendSeries {
    pub name: String,
    pub caption: String,
    pub points: Vec<TrendPoint>,
}

/// Complete report payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportPayload {
    pub report_version: String,
    pub producer: ReportProducer,
    pub provenance: ReportProvenance,
    pub quality: DataQuality,
    pub hourly: Vec<DisplayRow>,
    pub next_day: Vec<DisplayRow>,
    pub trends: Vec<TrendSeries>,
}

/// Start of `hour` on `date`, or `None` when `hour` is not in 0-23
pub fn hour_start(date: NaiveDate, hour: u32) -> Option<NaiveDateTime> {
    if !is_valid_hour(hour) {
        return None;
    }
    date.and_hms_opt(hour, 0, 0)
}
