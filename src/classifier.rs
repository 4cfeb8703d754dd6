//! Recommendation rules
//!
//! Maps one hourly row to a monetization recommendation. Rules are checked in
//! a fixed order and the first match wins:
//!
//! 1. Floor pricing: eCPM above 0.5 while match rate is below 0.3
//! 2. Target CPM: match rate above 0.8 while eCPM is below 0.2
//! 3. Google optimized: revenue below 0.01
//! 4. Otherwise no change
//!
//! All comparisons are strict. An undefined mean never satisfies a rule.

use serde::{Deserialize, Serialize};

use crate::types::{Classified, HourlyBucket, ProjectedHour, Recommendation};

/// Metrics the classifier reads from a row
pub trait MonetizationMetrics {
    fn revenue(&self) -> f64;
    fn ecpm(&self) -> Option<f64>;
    fn match_rate(&self) -> Option<f64>;
}

impl MonetizationMetrics for HourlyBucket {
    fn revenue(&self) -> f64 {
        self.revenue_sum
    }

    fn ecpm(&self) -> Option<f64> {
        self.ecpm_mean
    }

    fn match_rate(&self) -> Option<f64> {
        self.match_rate_mean
    }
}

impl MonetizationMetrics for ProjectedHour {
    fn revenue(&self) -> f64 {
        self.revenue_sum
    }

    fn ecpm(&self) -> Option<f64> {
        Some(self.ecpm_mean)
    }

    fn match_rate(&self) -> Option<f64> {
        Some(self.match_rate_mean)
    }
}

/// Rule thresholds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationThresholds {
    /// Floor pricing fires above this eCPM...
    pub floor_min_ecpm: f64,
    /// ...when match rate is below this
    pub floor_max_match_rate: f64,
    /// Target CPM fires above this match rate...
    pub target_min_match_rate: f64,
    /// ...when eCPM is below this
    pub target_max_ecpm: f64,
    /// Google optimized fires below this revenue
    pub optimized_max_revenue: f64,
}

impl Default for RecommendationThresholds {
    fn default() -> Self {
        Self {
            floor_min_ecpm: 0.5,
            floor_max_match_rate: 0.3,
            target_min_match_rate: 0.8,
            target_max_ecpm: 0.2,
            optimized_max_revenue: 0.01,
        }
    }
}

impl RecommendationThresholds {
    pub fn is_finite(&self) -> bool {
        [
            self.floor_min_ecpm,
            self.floor_max_match_rate,
            self.target_min_match_rate,
            self.target_max_ecpm,
            self.optimized_max_revenue,
        ]
        .iter()
        .all(|v| v.is_finite())
    }
}

/// Classify a row with the default thresholds
pub fn classify<M: MonetizationMetrics + ?Sized>(row: &M) -> Recommendation {
    classify_with(row, &RecommendationThresholds::default())
}

/// Classify a row.
///
/// Total over every input, NaN and infinities included.
pub fn classify_with<M: MonetizationMetrics + ?Sized>(
    row: &M,
    thresholds: &RecommendationThresholds,
) -> Recommendation {
    let ecpm = row.ecpm();
    let match_rate = row.match_rate();

    if above(ecpm, thresholds.floor_min_ecpm) && below(match_rate, thresholds.floor_max_match_rate)
    {
        Recommendation::FloorPricing
    } else if above(match_rate, thresholds.target_min_match_rate)
        && below(ecpm, thresholds.target_max_ecpm)
    {
        Recommendation::TargetCpm
    } else if row.revenue() < thresholds.optimized_max_revenue {
        Recommendation::GoogleOptimized
    } else {
        Recommendation::NoChange
    }
}

/// Classify every row, keeping input order
pub fn classify_all<T: MonetizationMetrics>(
    rows: Vec<T>,
    thresholds: &RecommendationThresholds,
) -> Vec<Classified<T>> {
    rows.into_iter()
        .map(|row| {
            let recommendation = classify_with(&row, thresholds);
            Classified { row, recommendation }
        })
        .collect()
}

fn above(value: Option<f64>, threshold: f64) -> bool {
    value.map_or(false, |v| v > threshold)
}

fn below(value: Option<f64>, threshold: f64) -> bool {
    value.map_or(false, |v| v < threshold)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Row {
        ecpm: Option<f64>,
        match_rate: Option<f64>,
        revenue: f64,
    }

    impl MonetizationMetrics for Row {
        fn revenue(&self) -> f64 {
            self.revenue
        }

        fn ecpm(&self) -> Option<f64> {
            self.ecpm
        }

        fn match_rate(&self) -> Option<f64> {
            self.match_rate
        }
    }

    fn row(ecpm: f64, match_rate: f64, revenue: f64) -> Row {
        Row {
            ecpm: Some(ecpm),
            match_rate: Some(match_rate),
            revenue,
        }
    }

    #[test]
    fn test_floor_pricing() {
        assert_eq!(classify(&row(0.6, 0.1, 10.0)), Recommendation::FloorPricing);
    }

    #[test]
    fn test_floor_pricing_beats_google_optimized() {
        // Low revenue would also match rule 3
        assert_eq!(classify(&row(0.6, 0.1, 0.0)), Recommendation::FloorPricing);
    }

    #[test]
    fn test_target_cpm() {
        assert_eq!(classify(&row(0.1, 0.9, 10.0)), Recommendation::TargetCpm);
    }

    #[test]
    fn test_target_cpm_beats_google_optimized() {
        assert_eq!(classify(&row(0.1, 0.9, 0.001)), Recommendation::TargetCpm);
    }

    #[test]
    fn test_google_optimized() {
        assert_eq!(
            classify(&row(0.3, 0.5, 0.005)),
            Recommendation::GoogleOptimized
        );
    }

    #[test]
    fn test_no_change() {
        assert_eq!(classify(&row(0.3, 0.5, 5.0)), Recommendation::NoChange);
    }

    #[test]
    fn test_boundaries_are_strict() {
        // ecpm == 0.5 does not trigger floor pricing
        assert_eq!(classify(&row(0.5, 0.2, 10.0)), Recommendation::NoChange);
        // match rate == 0.3 does not trigger floor pricing
        assert_eq!(classify(&row(0.6, 0.3, 10.0)), Recommendation::NoChange);
        // match rate == 0.8 does not trigger target cpm
        assert_eq!(classify(&row(0.1, 0.8, 10.0)), Recommendation::NoChange);
        // ecpm == 0.2 does not trigger target cpm
        assert_eq!(classify(&row(0.2, 0.9, 10.0)), Recommendation::NoChange);
        // revenue == 0.01 does not trigger google optimized
        assert_eq!(classify(&row(0.3, 0.5, 0.01)), Recommendation::NoChange);
    }

    #[test]
    fn test_boundary_falls_through_to_later_rule() {
        assert_eq!(
            classify(&row(0.5, 0.2, 0.0)),
            Recommendation::GoogleOptimized
        );
    }

    #[test]
    fn test_undefined_means_skip_rules() {
        let r = Row {
            ecpm: None,
            match_rate: Some(0.1),
            revenue: 10.0,
        };
        assert_eq!(classify(&r), Recommendation::NoChange);

        let r = Row {
            ecpm: None,
            match_rate: None,
            revenue: 0.0,
        };
        assert_eq!(classify(&r), Recommendation::GoogleOptimized);
    }

    #[test]
    fn test_total_over_non_finite_and_negative_input() {
        assert_eq!(
            classify(&row(f64::NAN, f64::NAN, f64::NAN)),
            Recommendation::NoChange
        );
        assert_eq!(
            classify(&row(f64::INFINITY, f64::NEG_INFINITY, 1.0)),
            Recommendation::FloorPricing
        );
        assert_eq!(
            classify(&row(-1.0, -1.0, -1.0)),
            Recommendation::GoogleOptimized
        );
    }

    #[test]
    fn test_custom_thresholds() {
        let thresholds = RecommendationThresholds {
            optimized_max_revenue: 100.0,
            ..Default::default()
        };
        assert_eq!(
            classify_with(&row(0.3, 0.5, 5.0), &thresholds),
            Recommendation::GoogleOptimized
        );
    }

    #[test]
    fn test_classify_all_keeps_order() {
        let rows = vec![row(0.6, 0.1, 10.0), row(0.3, 0.5, 5.0)];
        let classified = classify_all(rows, &RecommendationThresholds::default());

        assert_eq!(classified.len(), 2);
        assert_eq!(classified[0].recommendation, Recommendation::FloorPricing);
        assert_eq!(classified[1].recommendation, Recommendation::NoChange);
    }

    #[test]
    fn test_default_thresholds_are_finite() {
        assert!(RecommendationThresholds::default().is_finite());
        let bad = RecommendationThresholds {
            target_max_ecpm: f64::NAN,
            ..Default::default()
        };
        assert!(!bad.is_finite());
    }
}
