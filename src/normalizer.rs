//! Report normalization
//!
//! This module turns a loaded `ReportTable` into typed `RawRecord`s.
//! - A trailing totals row is removed
//! - Dates and hours are parsed; rows without both cannot be keyed and are dropped
//! - Metric cells are parsed leniently and rejected individually (fail soft)
//! - Coverage and quality flags are computed

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use tracing::{debug, warn};

use crate::error::ReportError;
use crate::schema::{ColumnIndex, ReportColumns, ReportTable};
use crate::types::{
    is_valid_amount, is_valid_hour, is_valid_rate, DataQuality, Metric, QualityFlag, RawRecord,
};

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%m/%d/%y",
    "%d-%b-%Y",
    "%b %d, %Y",
    "%d %b %Y",
    "%Y%m%d",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Placeholders report exports use for an empty cell
const MISSING_MARKERS: &[&str] = &["-", "--", "n/a", "na", "nan", "null", "none"];

/// Typed report rows plus what was learned while typing them
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedReport {
    pub records: Vec<RawRecord>,
    pub quality: DataQuality,
}

/// Normalizer for converting report tables to raw records
pub struct Normalizer;

impl Normalizer {
    /// Normalize a report table.
    ///
    /// Fails only when a configured column is absent from a non-empty table.
    pub fn normalize(
        table: &ReportTable,
        columns: &ReportColumns,
    ) -> Result<NormalizedReport, ReportError> {
        let mut quality = DataQuality {
            rows_read: table.len(),
            ..Default::default()
        };

        if table.is_empty() {
            quality.flags.push(QualityFlag::NoData);
            return Ok(NormalizedReport {
                records: Vec::new(),
                quality,
            });
        }

        let index = columns.resolve(table)?;

        let mut data_rows = table.len();
        if table.has_totals_row() {
            data_rows -= 1;
            quality.totals_row_removed = true;
            quality.flags.push(QualityFlag::TotalsRowRemoved);
            debug!("removed trailing totals row");
        }

        let mut records = Vec::with_capacity(data_rows);
        for row in 0..data_rows {
            match normalize_row(table, row, &index, &mut quality) {
                Some(record) => records.push(record),
                None => {
                    quality.rows_dropped += 1;
                    warn!(row = row + 1, "dropping row without a usable date and hour");
                }
            }
        }

        if quality.rows_dropped > 0 {
            quality.flags.push(QualityFlag::UnkeyedRowsDropped);
        }
        if quality.invalid_metrics.total() > 0 {
            quality.flags.push(QualityFlag::InvalidMetricValues);
            warn!(
                invalid = quality.invalid_metrics.total(),
                "metric cells excluded from aggregation"
            );
        }
        if records.is_empty() {
            quality.flags.push(QualityFlag::NoData);
        }

        quality.coverage = compute_coverage(&records);

        debug!(
            records = records.len(),
            dropped = quality.rows_dropped,
            coverage = quality.coverage,
            "normalized report"
        );

        Ok(NormalizedReport { records, quality })
    }
}

fn normalize_row(
    table: &ReportTable,
    row: usize,
    index: &ColumnIndex,
    quality: &mut DataQuality,
) -> Option<RawRecord> {
    let cell = |column: usize| table.cell(row, column).unwrap_or("");
    let metric = |m: Metric| cell(index.metric(m));

    let date = parse_date(cell(index.date))?;
    let hour = parse_hour(cell(index.hour))?;

    let record = RawRecord {
        date,
        hour,
        revenue: parse_amount(metric(Metric::Revenue)),
        ecpm: parse_amount(metric(Metric::Ecpm)),
        ad_requests: parse_count(metric(Metric::AdRequests)),
        impressions: parse_count(metric(Metric::Impressions)),
        match_rate: parse_fraction(metric(Metric::MatchRate)),
    };

    for m in Metric::ALL {
        let text = metric(m);
        if !record.has_metric(m) && !text.is_empty() {
            debug!(row = row + 1, metric = m.as_str(), cell = text, "unusable metric cell");
        }
    }
    count_invalid_metrics(&record, quality);

    Some(record)
}

/// Tally the metrics a record cannot contribute to aggregation
pub(crate) fn count_invalid_metrics(record: &RawRecord, quality: &mut DataQuality) {
    for metric in Metric::ALL {
        if !record.has_metric(metric) {
            quality.invalid_metrics.record(metric);
        }
    }
}

/// Share of metric cells that survived parsing
pub(crate) fn compute_coverage(records: &[RawRecord]) -> f64 {
    if records.is_empty() {
        return 0.0;
    }

    let valid = records
        .iter()
        .map(|r| Metric::ALL.iter().filter(|m| r.has_metric(**m)).count())
        .sum::<usize>();

    (valid as f64) / ((records.len() * Metric::ALL.len()) as f64)
}

/// Strip formatting from a numeric cell; `None` for empty or placeholder cells
fn clean_numeric(cell: &str) -> Option<String> {
    let trimmed = cell.trim();
    if trimmed.is_empty()
        || MISSING_MARKERS
            .iter()
            .any(|m| trimmed.eq_ignore_ascii_case(m))
    {
        return None;
    }

    Some(
        trimmed
            .chars()
            .filter(|c| *c != ',' && *c != '$' && !c.is_whitespace())
            .collect(),
    )
}

/// Parse a non-negative currency amount
pub fn parse_amount(cell: &str) -> Option<f64> {
    let value: f64 = clean_numeric(cell)?.parse().ok()?;
    is_valid_amount(value).then_some(value)
}

/// Parse a non-negative integer count; integral floats such as `12.0` are accepted
pub fn parse_count(cell: &str) -> Option<u64> {
    let cleaned = clean_numeric(cell)?;
    if let Ok(value) = cleaned.parse::<u64>() {
        return Some(value);
    }

    let value: f64 = cleaned.parse().ok()?;
    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= u64::MAX as f64 {
        Some(value as u64)
    } else {
        None
    }
}

/// Parse a rate in [0, 1]; a `%` suffix marks a percentage
pub fn parse_fraction(cell: &str) -> Option<f64> {
    let cleaned = clean_numeric(cell)?;
    let value = match cleaned.strip_suffix('%') {
        Some(percent) => percent.parse::<f64>().ok()? / 100.0,
        None => cleaned.parse::<f64>().ok()?,
    };
    is_valid_rate(value).then_some(value)
}

/// Parse an hour of day (0-23); accepts `9`, `9.0` and `09:00`
pub fn parse_hour(cell: &str) -> Option<u32> {
    let trimmed = cell.trim();
    let hour_part = trimmed.split(':').next().unwrap_or(trimmed);
    let hour = u32::try_from(parse_count(hour_part)?).ok()?;
    is_valid_hour(hour).then_some(hour)
}

/// Parse a calendar date; datetimes are truncated to their date
pub fn parse_date(cell: &str) -> Option<NaiveDate> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return None;
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| {
            DateTime::parse_from_rfc3339(trimmed)
                .ok()
                .map(|dt| dt.date_naive())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn headers() -> Vec<String> {
        ReportColumns::default()
            .describe()
            .into_iter()
            .map(|c| c.header)
            .collect()
    }

    fn table(rows: &[[&str; 7]]) -> ReportTable {
        ReportTable::new(
            headers(),
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_normalize_clean_rows() {
        let t = table(&[
            ["2024-01-15", "0", "1.25", "0.40", "1000", "800", "0.8"],
            ["2024-01-15", "1", "2.50", "0.55", "2000", "1500", "0.75"],
        ]);

        let report = Normalizer::normalize(&t, &ReportColumns::default()).unwrap();

        assert_eq!(report.records.len(), 2);
        assert_eq!(
            report.records[0],
            RawRecord::new(date(2024, 1, 15), 0, 1.25, 0.40, 1000, 800, 0.8)
        );
        assert_eq!(report.quality.rows_read, 2);
        assert_eq!(report.quality.coverage, 1.0);
        assert!(report.quality.flags.is_empty());
    }

    #[test]
    fn test_totals_row_removed() {
        let t = table(&[
            ["2024-01-15", "0", "1.25", "0.40", "1000", "800", "0.8"],
            ["Total", "", "1.25", "0.40", "1000", "800", "0.8"],
        ]);

        let report = Normalizer::normalize(&t, &ReportColumns::default()).unwrap();

        assert_eq!(report.records.len(), 1);
        assert!(report.quality.totals_row_removed);
        assert_eq!(report.quality.rows_dropped, 0);
        assert!(report.quality.flags.contains(&QualityFlag::TotalsRowRemoved));
    }

    #[test]
    fn test_invalid_metric_is_excluded_not_fatal() {
        let t = table(&[["2024-01-15", "3", "1.0", "abc", "", "-5", "1.7"]]);

        let report = Normalizer::normalize(&t, &ReportColumns::default()).unwrap();
        let record = &report.records[0];

        assert_eq!(record.revenue, Some(1.0));
        assert_eq!(record.ecpm, None);
        assert_eq!(record.ad_requests, None);
        assert_eq!(record.impressions, None);
        assert_eq!(record.match_rate, None);
        assert_eq!(report.quality.invalid_metrics.total(), 4);
        assert!((report.quality.coverage - 0.2).abs() < 1e-9);
        assert!(report
            .quality
            .flags
            .contains(&QualityFlag::InvalidMetricValues));
    }

    #[test]
    fn test_unkeyed_rows_dropped() {
        let t = table(&[
            ["not a date", "1", "1.0", "0.1", "1", "1", "0.5"],
            ["2024-01-15", "24", "1.0", "0.1", "1", "1", "0.5"],
            ["2024-01-15", "23", "1.0", "0.1", "1", "1", "0.5"],
        ]);

        let report = Normalizer::normalize(&t, &ReportColumns::default()).unwrap();

        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].hour, 23);
        assert_eq!(report.quality.rows_dropped, 2);
        assert!(report
            .quality
            .flags
            .contains(&QualityFlag::UnkeyedRowsDropped));
    }

    #[test]
    fn test_empty_table_is_not_an_error() {
        let report = Normalizer::normalize(&ReportTable::default(), &ReportColumns::default()).unwrap();
        assert!(report.records.is_empty());
        assert_eq!(report.quality.flags, vec![QualityFlag::NoData]);
    }

    #[test]
    fn test_missing_column_is_an_error() {
        let t = ReportTable::new(
            vec!["Date".to_string(), "Hour".to_string()],
            vec![vec!["2024-01-15".to_string(), "1".to_string()]],
        );
        let result = Normalizer::normalize(&t, &ReportColumns::default());
        assert!(matches!(result, Err(ReportError::MissingColumn(_))));
    }

    #[test]
    fn test_parse_amount_formats() {
        assert_eq!(parse_amount("1,234.50"), Some(1234.5));
        assert_eq!(parse_amount(" $0.42 "), Some(0.42));
        assert_eq!(parse_amount("0"), Some(0.0));
        assert_eq!(parse_amount("-0.1"), None);
        assert_eq!(parse_amount("--"), None);
        assert_eq!(parse_amount("NaN"), None);
        assert_eq!(parse_amount("inf"), None);
    }

    #[test]
    fn test_parse_count_formats() {
        assert_eq!(parse_count("12,345"), Some(12345));
        assert_eq!(parse_count("12.0"), Some(12));
        assert_eq!(parse_count("12.5"), None);
        assert_eq!(parse_count("-3"), None);
    }

    #[test]
    fn test_parse_fraction_formats() {
        assert_eq!(parse_fraction("0.45"), Some(0.45));
        assert_eq!(parse_fraction("45%"), Some(0.45));
        assert_eq!(parse_fraction("1"), Some(1.0));
        assert_eq!(parse_fraction("1.2"), None);
        assert_eq!(parse_fraction("120%"), None);
    }

    #[test]
    fn test_parse_hour_formats() {
        assert_eq!(parse_hour("0"), Some(0));
        assert_eq!(parse_hour("9.0"), Some(9));
        assert_eq!(parse_hour("09:00"), Some(9));
        assert_eq!(parse_hour("24"), None);
        assert_eq!(parse_hour(""), None);
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = Some(date(2024, 1, 15));
        assert_eq!(parse_date("2024-01-15"), expected);
        assert_eq!(parse_date("2024/01/15"), expected);
        assert_eq!(parse_date("01/15/2024"), expected);
        assert_eq!(parse_date("15-Jan-2024"), expected);
        assert_eq!(parse_date("Jan 15, 2024"), expected);
        assert_eq!(parse_date("20240115"), expected);
        assert_eq!(parse_date("2024-01-15 00:00:00"), expected);
        assert_eq!(parse_date("2024-01-15T13:45:00Z"), expected);
        assert_eq!(parse_date("yesterday"), None);
    }
}
