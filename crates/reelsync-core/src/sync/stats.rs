//! Drift Statistics
//!
//! Aggregates matched word pairs into distributional drift metrics.

use serde::{Deserialize, Serialize};

use super::matcher::WordMatch;

/// Distributional summary of caption/speech drift
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncMetrics {
    /// Mean of |drift|
    pub mean_drift_ms: f64,
    /// Max of |drift|
    pub max_drift_ms: f64,
    /// 95th percentile of |drift| (nearest rank)
    pub p95_drift_ms: f64,
    /// Median of |drift|
    pub median_drift_ms: f64,
    /// Mean of signed drift; negative means captions lead speech
    pub mean_signed_drift_ms: f64,
    /// Fraction of matches whose caption appeared before the speech
    pub leading_ratio: f64,
    /// Fraction of matches whose caption appeared after the speech
    pub lagging_ratio: f64,
    /// Population standard deviation of |drift|
    pub drift_std_dev: f64,
    pub matched_words: usize,
    pub total_ocr_words: usize,
    pub total_asr_words: usize,
    /// matched / spoken words
    pub match_ratio: f64,
}

/// Computes drift metrics.
///
/// `match_ratio` is graded against what was actually said, so its
/// denominator is the ASR word count, never the OCR word count.
pub fn compute_sync_metrics(
    matches: &[WordMatch],
    total_ocr_words: usize,
    total_asr_words: usize,
) -> SyncMetrics {
    if matches.is_empty() {
        return SyncMetrics {
            total_ocr_words,
            total_asr_words,
            ..SyncMetrics::default()
        };
    }

    let count = matches.len() as f64;
    let mut absolute: Vec<f64> = matches.iter().map(|m| m.drift_ms.abs()).collect();
    absolute.sort_by(|a, b| a.total_cmp(b));

    let mean_drift_ms = absolute.iter().sum::<f64>() / count;
    let mean_signed_drift_ms = matches.iter().map(|m| m.drift_ms).sum::<f64>() / count;
    let leading = matches.iter().filter(|m| m.drift_ms < 0.0).count() as f64;
    let lagging = matches.iter().filter(|m| m.drift_ms > 0.0).count() as f64;

    SyncMetrics {
        mean_drift_ms,
        max_drift_ms: absolute.last().copied().unwrap_or(0.0),
        p95_drift_ms: percentile_sorted(&absolute, 95.0),
        median_drift_ms: median_sorted(&absolute),
        mean_signed_drift_ms,
        leading_ratio: leading / count,
        lagging_ratio: lagging / count,
        drift_std_dev: population_std_dev(&absolute),
        matched_words: matches.len(),
        total_ocr_words,
        total_asr_words,
        match_ratio: if total_asr_words > 0 {
            matches.len() as f64 / total_asr_words as f64
        } else {
            0.0
        },
    }
}

/// Nearest-rank percentile of an ascending slice
pub fn percentile_sorted(sorted: &[f64], percentile: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = ((percentile / 100.0) * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}

/// Median of an ascending slice
pub fn median_sorted(sorted: &[f64]) -> f64 {
    let len = sorted.len();
    match len {
        0 => 0.0,
        _ if len % 2 == 1 => sorted[len / 2],
        _ => (sorted[len / 2 - 1] + sorted[len / 2]) / 2.0,
    }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub fn population_std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let avg = mean(values);
    let variance = values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::matcher::MatchQuality;

    fn matched(drift_ms: f64) -> WordMatch {
        WordMatch {
            word: "word".to_string(),
            ocr_timestamp: 1.0 + drift_ms / 1000.0,
            asr_timestamp: 1.0,
            drift_ms,
            match_quality: MatchQuality::Exact,
        }
    }

    #[test]
    fn test_match_ratio_uses_asr_denominator() {
        let matches: Vec<WordMatch> = (0..80).map(|_| matched(20.0)).collect();
        let metrics = compute_sync_metrics(&matches, 577, 100);
        assert!((metrics.match_ratio - 0.80).abs() < 1e-12);
        assert_eq!(metrics.total_ocr_words, 577);
    }

    #[test]
    fn test_empty_matches_are_all_zero() {
        let metrics = compute_sync_metrics(&[], 40, 50);
        assert_eq!(metrics.mean_drift_ms, 0.0);
        assert_eq!(metrics.max_drift_ms, 0.0);
        assert_eq!(metrics.match_ratio, 0.0);
        assert_eq!(metrics.matched_words, 0);
        assert_eq!(metrics.total_asr_words, 50);
    }

    #[test]
    fn test_distribution_metrics() {
        let matches = vec![matched(-100.0), matched(0.0), matched(100.0), matched(200.0)];
        let metrics = compute_sync_metrics(&matches, 4, 4);

        assert_eq!(metrics.mean_drift_ms, 100.0);
        assert_eq!(metrics.max_drift_ms, 200.0);
        assert_eq!(metrics.median_drift_ms, 100.0);
        assert_eq!(metrics.p95_drift_ms, 200.0);
        assert_eq!(metrics.mean_signed_drift_ms, 50.0);
        assert_eq!(metrics.leading_ratio, 0.25);
        assert_eq!(metrics.lagging_ratio, 0.5);
        assert!((metrics.drift_std_dev - 70.710678).abs() < 1e-5);
        assert_eq!(metrics.match_ratio, 1.0);
    }

    #[test]
    fn test_zero_asr_words_gives_zero_ratio() {
        let metrics = compute_sync_metrics(&[matched(10.0)], 1, 0);
        assert_eq!(metrics.match_ratio, 0.0);
    }

    #[test]
    fn test_percentile_nearest_rank() {
        let values: Vec<f64> = (1..=20).map(f64::from).collect();
        assert_eq!(percentile_sorted(&values, 95.0), 19.0);
        assert_eq!(percentile_sorted(&values, 100.0), 20.0);
        assert_eq!(percentile_sorted(&[], 95.0), 0.0);
    }
}
