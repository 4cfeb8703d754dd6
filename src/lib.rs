//! ADX Pulse - Hourly monetization recommendations for Ad Exchange reports
//!
//! Pulse turns an Ad Manager performance report into hourly recommendations
//! through a deterministic pipeline: file adaptation → normalization → hourly
//! aggregation → rule-based classification → next-day projection → encoding.
//!
//! ## Stages
//!
//! - **Adapters**: Read CSV or XLSX report exports into a `ReportTable`
//! - **Normalizer**: Strip the totals row and type every cell, fail soft
//! - **Aggregator**: One bucket per (date, hour)
//! - **Classifier**: Floor pricing, target CPM, Google optimized or no change
//! - **Projector**: Copy the latest day's hourly profile to the next day

pub mod adapters;
pub mod aggregator;
pub mod classifier;
pub mod config;
pub mod encoder;
pub mod error;
pub mod logging;
pub mod normalizer;
pub mod pipeline;
pub mod projector;
pub mod schema;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use classifier::{classify, classify_with, MonetizationMetrics, RecommendationThresholds};
pub use config::PipelineConfig;
pub use error::ReportError;
pub use pipeline::{analyze_file, analyze_records, analyze_table, ReportProcessor};
pub use types::{HourlyBucket, ProjectedHour, RawRecord, Recommendation, ReportAnalysis};

// Schema exports
pub use schema::{ReportColumns, ReportTable, REPORT_SCHEMA};

/// Pulse version embedded in all report payloads
pub const PULSE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for report payloads
pub const PRODUCER_NAME: &str = "adx-pulse";
