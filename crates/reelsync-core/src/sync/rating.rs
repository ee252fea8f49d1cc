//! Sync Rating Calculator
//!
//! Converts drift metrics into a 0-100 rating, a label, and a pass/fail
//! verdict against configurable thresholds.

use serde::{Deserialize, Serialize};

use super::stats::SyncMetrics;

/// Pass/fail thresholds for the sync rating
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncThresholds {
    pub min_rating: u32,
    pub max_mean_drift_ms: f64,
    pub max_max_drift_ms: f64,
    pub min_match_ratio: f64,
}

impl Default for SyncThresholds {
    fn default() -> Self {
        Self {
            min_rating: 60,
            max_mean_drift_ms: 180.0,
            max_max_drift_ms: 500.0,
            min_match_ratio: 0.7,
        }
    }
}

/// Coarse rating band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RatingLabel {
    Excellent,
    Good,
    Fair,
    Poor,
    Broken,
}

impl RatingLabel {
    pub fn from_rating(rating: u32) -> Self {
        match rating {
            90.. => RatingLabel::Excellent,
            75..=89 => RatingLabel::Good,
            60..=74 => RatingLabel::Fair,
            40..=59 => RatingLabel::Poor,
            _ => RatingLabel::Broken,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RatingLabel::Excellent => "excellent",
            RatingLabel::Good => "good",
            RatingLabel::Fair => "fair",
            RatingLabel::Poor => "poor",
            RatingLabel::Broken => "broken",
        }
    }
}

/// Rating verdict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRating {
    pub rating: u32,
    pub rating_label: RatingLabel,
    pub passed: bool,
}

/// Sum of the capped per-condition deductions
fn total_deduction(metrics: &SyncMetrics) -> f64 {
    let mut deduction = 0.0;

    if metrics.mean_drift_ms > 50.0 {
        deduction += ((metrics.mean_drift_ms - 50.0) / 6.25).min(40.0);
    }
    if metrics.max_drift_ms > 100.0 {
        deduction += ((metrics.max_drift_ms - 100.0) / 16.0).min(25.0);
    }
    if metrics.p95_drift_ms > 80.0 {
        deduction += ((metrics.p95_drift_ms - 80.0) / 21.3).min(15.0);
    }
    if metrics.drift_std_dev > 50.0 {
        deduction += ((metrics.drift_std_dev - 50.0) / 25.0).min(10.0);
    }

    let ratio = metrics.match_ratio;
    if ratio < 0.7 {
        deduction += 20.0 + (0.7 - ratio) / 0.7 * 80.0;
    } else if ratio < 0.9 {
        deduction += (0.9 - ratio) / 0.2 * 20.0;
    }

    deduction
}

/// 0-100 rating; exactly 0 when nothing matched
pub fn calculate_rating(metrics: &SyncMetrics) -> u32 {
    if metrics.matched_words == 0 {
        return 0;
    }
    (100.0 - total_deduction(metrics)).clamp(0.0, 100.0).round() as u32
}

/// Whether the rating and raw metrics clear every threshold
pub fn evaluate_pass(rating: u32, metrics: &SyncMetrics, thresholds: &SyncThresholds) -> bool {
    rating >= thresholds.min_rating
        && metrics.mean_drift_ms <= thresholds.max_mean_drift_ms
        && metrics.max_drift_ms <= thresholds.max_max_drift_ms
        && metrics.match_ratio >= thresholds.min_match_ratio
}

/// Rates metrics against thresholds
pub fn rate(metrics: &SyncMetrics, thresholds: &SyncThresholds) -> SyncRating {
    let rating = calculate_rating(metrics);
    SyncRating {
        rating,
        rating_label: RatingLabel::from_rating(rating),
        passed: evaluate_pass(rating, metrics, thresholds),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(mean: f64, max: f64, p95: f64, std_dev: f64, ratio: f64) -> SyncMetrics {
        SyncMetrics {
            mean_drift_ms: mean,
            max_drift_ms: max,
            p95_drift_ms: p95,
            median_drift_ms: mean,
            drift_std_dev: std_dev,
            matched_words: 100,
            total_asr_words: 100,
            total_ocr_words: 300,
            match_ratio: ratio,
            ..SyncMetrics::default()
        }
    }

    #[test]
    fn test_zero_matches_rates_zero() {
        let mut m = metrics(0.0, 0.0, 0.0, 0.0, 1.0);
        m.matched_words = 0;
        assert_eq!(calculate_rating(&m), 0);
    }

    #[test]
    fn test_tight_sync_is_excellent() {
        let m = metrics(10.0, 30.0, 25.0, 10.0, 0.95);
        let rating = calculate_rating(&m);
        assert!(rating >= 90, "rating was {rating}");
        assert_eq!(RatingLabel::from_rating(rating), RatingLabel::Excellent);
    }

    #[test]
    fn test_moderate_drift_lands_mid_range() {
        let m = metrics(80.0, 250.0, 150.0, 60.0, 0.7);
        let rating = calculate_rating(&m);
        assert!((55..=85).contains(&rating), "rating was {rating}");
    }

    #[test]
    fn test_rating_never_negative() {
        let m = metrics(5000.0, 9000.0, 8000.0, 4000.0, 0.01);
        assert_eq!(calculate_rating(&m), 0);
    }

    #[test]
    fn test_deductions_are_capped() {
        // Mean deduction capped at 40, max at 25, p95 at 15, std at 10.
        let m = metrics(10_000.0, 10_000.0, 10_000.0, 10_000.0, 1.0);
        assert_eq!(calculate_rating(&m), 10);
    }

    #[test]
    fn test_labels() {
        assert_eq!(RatingLabel::from_rating(100), RatingLabel::Excellent);
        assert_eq!(RatingLabel::from_rating(75), RatingLabel::Good);
        assert_eq!(RatingLabel::from_rating(74), RatingLabel::Fair);
        assert_eq!(RatingLabel::from_rating(40), RatingLabel::Poor);
        assert_eq!(RatingLabel::from_rating(39), RatingLabel::Broken);
        assert_eq!(RatingLabel::Poor.as_str(), "poor");
    }

    #[test]
    fn test_pass_requires_every_threshold() {
        let thresholds = SyncThresholds::default();
        let good = metrics(10.0, 30.0, 25.0, 10.0, 0.95);
        assert!(rate(&good, &thresholds).passed);

        let mut late = good.clone();
        late.max_drift_ms = 600.0;
        assert!(!evaluate_pass(95, &late, &thresholds));

        let mut sparse = good.clone();
        sparse.match_ratio = 0.5;
        assert!(!evaluate_pass(95, &sparse, &thresholds));

        assert!(!evaluate_pass(59, &good, &thresholds));
    }

    #[test]
    fn test_thresholds_deserialize_with_defaults() {
        let thresholds: SyncThresholds = serde_json::from_str(r#"{"minRating": 75}"#).unwrap();
        assert_eq!(thresholds.min_rating, 75);
        assert_eq!(thresholds.max_mean_drift_ms, 180.0);
    }
}
