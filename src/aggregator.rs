//! Hourly aggregation
//!
//! Collapses raw records into one bucket per `(date, hour)`:
//! - revenue, ad requests and impressions are summed
//! - eCPM and match rate are unweighted arithmetic means
//!
//! A record whose metric is missing or out of domain is left out of that
//! metric's reduction only. Records with an hour outside 0-23 cannot be keyed
//! and are skipped.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::types::{hour_start, is_valid_hour, HourlyBucket, RawRecord};

/// Aggregator for building hourly buckets from raw records
pub struct HourlyAggregator;

impl HourlyAggregator {
    /// Aggregate records into hourly buckets, ascending by `(date, hour)`
    pub fn aggregate(records: &[RawRecord]) -> Vec<HourlyBucket> {
        let mut by_key: BTreeMap<(NaiveDate, u32), BucketAccumulator> = BTreeMap::new();

        let mut skipped = 0usize;
        for record in records {
            if !is_valid_hour(record.hour) {
                skipped += 1;
                continue;
            }
            by_key
                .entry((record.date, record.hour))
                .or_default()
                .add(record);
        }

        if skipped > 0 {
            warn!(skipped, "skipping records with an hour outside 0-23");
        }

        let buckets: Vec<HourlyBucket> = by_key
            .into_iter()
            .filter_map(|((date, hour), acc)| acc.finish(date, hour))
            .collect();

        debug!(
            records = records.len(),
            buckets = buckets.len(),
            "aggregated hourly buckets"
        );

        buckets
    }

    /// Latest date present in a bucket set
    pub fn latest_date(buckets: &[HourlyBucket]) -> Option<NaiveDate> {
        buckets.iter().map(|b| b.date).max()
    }
}

/// Running sums for one bucket
#[derive(Default)]
struct BucketAccumulator {
    records: usize,
    revenue_sum: f64,
    ecpm: Mean,
    ad_requests_sum: u64,
    impressions_sum: u64,
    match_rate: Mean,
}

impl BucketAccumulator {
    fn add(&mut self, record: &RawRecord) {
        self.records += 1;

        if let Some(revenue) = record.valid_revenue() {
            self.revenue_sum += revenue;
        }
        if let Some(ecpm) = record.valid_ecpm() {
            self.ecpm.add(ecpm);
        }
        if let Some(requests) = record.ad_requests {
            self.ad_requests_sum = self.ad_requests_sum.saturating_add(requests);
        }
        if let Some(impressions) = record.impressions {
            self.impressions_sum = self.impressions_sum.saturating_add(impressions);
        }
        if let Some(match_rate) = record.valid_match_rate() {
            self.match_rate.add(match_rate);
        }
    }

    fn finish(self, date: NaiveDate, hour: u32) -> Option<HourlyBucket> {
        Some(HourlyBucket {
            date,
            hour,
            timestamp: hour_start(date, hour)?,
            revenue_sum: self.revenue_sum,
            ecpm_mean: self.ecpm.value(),
            ad_requests_sum: self.ad_requests_sum,
            impressions_sum: self.impressions_sum,
            match_rate_mean: self.match_rate.value(),
            record_count: self.records,
        })
    }
}

#[derive(Default)]
struct Mean {
    sum: f64,
    count: usize,
}

impl Mean {
    fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    fn value(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}
