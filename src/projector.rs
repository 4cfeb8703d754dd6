//! Next-day projection
//!
//! Projects the day after the latest observed date by copying that day's
//! hourly profile verbatim. An hour is projected only when the latest day has
//! a bucket for it with every copied metric defined; nothing is interpolated.

use std::collections::HashMap;

use chrono::{Days, NaiveDate};
use tracing::debug;

use crate::aggregator::HourlyAggregator;
use crate::types::{hour_start, HourlyBucket, ProjectedHour, HOURS_PER_DAY};

/// Rows projected for one day, plus the hours that could not be projected
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    /// Day being projected
    pub date: NaiveDate,
    /// Day the profile was copied from
    pub source_date: NaiveDate,
    /// Projected rows, ascending by hour
    pub hours: Vec<ProjectedHour>,
    /// Hours with no usable source bucket
    pub missing_hours: Vec<u32>,
}

/// Projector for building next-day rows from hourly buckets
pub struct NextDayProjector;

impl NextDayProjector {
    /// Project the day after the latest date in `buckets`.
    ///
    /// Returns `None` when there are no buckets.
    pub fn project(buckets: &[HourlyBucket]) -> Option<Projection> {
        let latest = HourlyAggregator::latest_date(buckets)?;
        Self::project_from(buckets, latest)
    }

    /// Project the day after `source_date` from its buckets.
    ///
    /// Returns `None` only when `source_date` is the last representable date.
    pub fn project_from(buckets: &[HourlyBucket], source_date: NaiveDate) -> Option<Projection> {
        let next_date = source_date.checked_add_days(Days::new(1))?;

        let by_hour: HashMap<u32, &HourlyBucket> = buckets
            .iter()
            .filter(|b| b.date == source_date)
            .map(|b| (b.hour, b))
            .collect();

        let mut hours = Vec::new();
        let mut missing_hours = Vec::new();

        for hour in 0..HOURS_PER_DAY {
            match by_hour.get(&hour).and_then(|b| project_hour(b, next_date)) {
                Some(row) => hours.push(row),
                None => missing_hours.push(hour),
            }
        }

        debug!(
            source = %source_date,
            projected = %next_date,
            hours = hours.len(),
            missing = missing_hours.len(),
            "projected next day"
        );

        Some(Projection {
            date: next_date,
            source_date,
            hours,
            missing_hours,
        })
    }
}

fn project_hour(bucket: &HourlyBucket, date: NaiveDate) -> Option<ProjectedHour> {
    Some(ProjectedHour {
        date,
        hour: bucket.hour,
        timestamp: hour_start(date, bucket.hour)?,
        revenue_sum: bucket.revenue_sum,
        ecpm_mean: bucket.ecpm_mean?,
        match_rate_mean: bucket.match_rate_mean?,
        ad_requests_sum: bucket.ad_requests_sum,
    })
}
