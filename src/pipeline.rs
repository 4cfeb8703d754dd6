//! Pipeline orchestration
//!
//! This module provides the public API for ADX Pulse.
//! It orchestrates the full pipeline from a report file to the classified
//! hourly table and the next-day projection.

use std::path::Path;

use tracing::info;

use crate::adapters::load_report;
use crate::aggregator::HourlyAggregator;
use crate::classifier::classify_all;
use crate::config::PipelineConfig;
use crate::encoder::ReportEncoder;
use crate::error::ReportError;
use crate::normalizer::{compute_coverage, count_invalid_metrics, Normalizer};
use crate::projector::NextDayProjector;
use crate::schema::ReportTable;
use crate::types::{
    is_valid_hour, DataQuality, QualityFlag, RawRecord, ReportAnalysis, ReportPayload,
};

/// Analyze a report file end to end.
///
/// # Arguments
/// * `path` - CSV or XLSX report export
/// * `config` - Column names, thresholds and sheet name
///
/// # Returns
/// The classified hourly table and the next-day projection
///
/// # Example
/// ```ignore
/// let analysis = analyze_file(Path::new("gam_report.csv"), &PipelineConfig::default())?;
/// ```
pub fn analyze_file(path: &Path, config: &PipelineConfig) -> Result<ReportAnalysis, ReportError> {
    let table = load_report(path, config)?;
    analyze_table(&table, config)
}

/// Analyze an already loaded report table.
///
/// Fails only when a configured column is missing from a non-empty table.
pub fn analyze_table(
    table: &ReportTable,
    config: &PipelineConfig,
) -> Result<ReportAnalysis, ReportError> {
    let normalized = Normalizer::normalize(table, &config.columns)?;
    Ok(run_stages(&normalized.records, normalized.quality, config))
}

/// Analyze typed records. Never fails; empty input gives an empty analysis.
///
/// Records with an hour outside 0-23 are dropped and metric values outside
/// their domain are ignored, the same way the normalizer treats report cells.
pub fn analyze_records(records: &[RawRecord], config: &PipelineConfig) -> ReportAnalysis {
    let mut quality = DataQuality {
        rows_read: records.len(),
        ..Default::default()
    };

    let keyed: Vec<RawRecord> = records
        .iter()
        .filter(|r| is_valid_hour(r.hour))
        .cloned()
        .collect();
    quality.rows_dropped = records.len() - keyed.len();

    for record in &keyed {
        count_invalid_metrics(record, &mut quality);
    }

    if quality.rows_dropped > 0 {
        quality.flags.push(QualityFlag::UnkeyedRowsDropped);
    }
    if quality.invalid_metrics.total() > 0 {
        quality.flags.push(QualityFlag::InvalidMetricValues);
    }
    quality.coverage = compute_coverage(&keyed);

    run_stages(&keyed, quality, config)
}

/// Pipeline stages after normalization:
/// 1. HourlyAggregator - One bucket per (date, hour)
/// 2. Classifier - Recommendation per bucket
/// 3. NextDayProjector - Copy the latest day forward
/// 4. Classifier - Recommendation per projected hour
fn run_stages(
    records: &[RawRecord],
    mut quality: DataQuality,
    config: &PipelineConfig,
) -> ReportAnalysis {
    // Stage 1: Aggregate to hourly buckets
    let buckets = HourlyAggregator::aggregate(records);
    quality.buckets = buckets.len();
    let latest_date = HourlyAggregator::latest_date(&buckets);

    // Stage 2: Project the next day from the latest observed day
    let projection = NextDayProjector::project(&buckets);

    // Stage 3: Classify observed and projected rows alike
    let hourly = classify_all(buckets, &config.thresholds);

    let (next_day, latest_date, projected_date) = match projection {
        Some(projection) => {
            quality.projected_hours = projection.hours.len();
            if !projection.missing_hours.is_empty() {
                quality.flags.push(QualityFlag::PartialLatestDay);
            }
            quality.missing_projection_hours = projection.missing_hours;
            (
                classify_all(projection.hours, &config.thresholds),
                Some(projection.source_date),
                Some(projection.date),
            )
        }
        None => {
            if hourly.is_empty() && !quality.flags.contains(&QualityFlag::NoData) {
                quality.flags.push(QualityFlag::NoData);
            }
            (Vec::new(), latest_date, None)
        }
    };

    info!(
        buckets = hourly.len(),
        projected = next_day.len(),
        missing = quality.missing_projection_hours.len(),
        "report analyzed"
    );

    ReportAnalysis {
        hourly,
        next_day,
        latest_date,
        projected_date,
        quality,
    }
}

/// Reusable processor holding a configuration and an encoder.
///
/// Holds no data between calls; every call analyzes its input from scratch.
pub struct ReportProcessor {
    config: PipelineConfig,
    encoder: ReportEncoder,
}

impl Default for ReportProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportProcessor {
    /// Create a new processor with default settings
    pub fn new() -> Self {
        Self::with_config(PipelineConfig::default())
    }

    /// Create a processor with a specific configuration
    pub fn with_config(config: PipelineConfig) -> Self {
        Self {
            config,
            encoder: ReportEncoder::new(),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn encoder(&self) -> &ReportEncoder {
        &self.encoder
    }

    /// Analyze a report file
    pub fn analyze_file(&self, path: &Path) -> Result<ReportAnalysis, ReportError> {
        analyze_file(path, &self.config)
    }

    /// Analyze a report table
    pub fn analyze_table(&self, table: &ReportTable) -> Result<ReportAnalysis, ReportError> {
        analyze_table(table, &self.config)
    }

    /// Analyze a report file and encode the result
    pub fn process_file(&self, path: &Path) -> Result<ReportPayload, ReportError> {
        let analysis = self.analyze_file(path)?;
        Ok(self.encoder.encode(&analysis, &path.display().to_string()))
    }

    /// Analyze a report table and encode the result
    pub fn process_table(
        &self,
        table: &ReportTable,
        source: &str,
    ) -> Result<ReportPayload, ReportError> {
        let analysis = self.analyze_table(table)?;
        Ok(self.encoder.encode(&analysis, source))
    }
}
