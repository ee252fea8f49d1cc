//! Rating Reports
//!
//! Versioned, JSON-serializable outputs of the two rating entry points.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::captions::{BurnedInCaptionQualityReport, OcrCaptionSegment};
use crate::sync::{
    count_by_severity, RatingLabel, Severity, SyncError, SyncMetrics, WordMatch,
};
use crate::types::{CaptionRegion, FrameSize, TimeSec};

/// Version of the report layout
pub const SCHEMA_VERSION: &str = "1.0.0";

/// How the analyzed data was produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisMetadata {
    pub fps: f64,
    pub frame_step_seconds: TimeSec,
    pub ocr_engine: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asr_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asr_engine: Option<String>,
    pub frame_count: usize,
    pub full_frame_size: FrameSize,
    pub caption_region: CaptionRegion,
    /// Pixel row where the caption band starts
    pub crop_offset_y: u32,
    pub video_duration_seconds: TimeSec,
    /// Word appearances extracted from OCR
    pub ocr_word_count: usize,
    pub asr_word_count: usize,
    pub processing_time_ms: u64,
    pub mock: bool,
}

/// One point of the drift-over-time chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriftPoint {
    /// When the word was spoken
    pub time_seconds: TimeSec,
    pub drift_ms: f64,
    pub word: String,
}

/// Drift per match, ordered by spoken time
pub fn build_drift_timeline(matches: &[WordMatch]) -> Vec<DriftPoint> {
    let mut timeline: Vec<DriftPoint> = matches
        .iter()
        .map(|m| DriftPoint {
            time_seconds: m.asr_timestamp,
            drift_ms: m.drift_ms,
            word: m.word.clone(),
        })
        .collect();
    timeline.sort_by(|a, b| a.time_seconds.total_cmp(&b.time_seconds));
    timeline
}

fn issue_counts(errors: &[SyncError]) -> String {
    format!(
        "{} issues - {} critical, {} error, {} warning",
        errors.len(),
        count_by_severity(errors, Severity::Critical),
        count_by_severity(errors, Severity::Error),
        count_by_severity(errors, Severity::Warning)
    )
}

fn verdict(passed: bool) -> &'static str {
    if passed {
        "PASSED"
    } else {
        "FAILED"
    }
}

// =============================================================================
// Sync Rating
// =============================================================================

/// Output of `rate_sync_quality`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRatingOutput {
    pub schema_version: String,
    pub video_path: String,
    pub created_at: DateTime<Utc>,
    /// 0-100
    pub rating: u32,
    pub rating_label: RatingLabel,
    pub passed: bool,
    pub metrics: SyncMetrics,
    pub word_matches: Vec<WordMatch>,
    pub drift_timeline: Vec<DriftPoint>,
    pub errors: Vec<SyncError>,
    pub analysis: AnalysisMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption_quality: Option<BurnedInCaptionQualityReport>,
}

impl SyncRatingOutput {
    /// Get a one-line summary
    pub fn summary(&self) -> String {
        format!(
            "Sync Rating: {} {}/100 {} (mean drift {:.0}ms, {:.0}% matched, {})",
            self.rating_label.as_str().to_uppercase(),
            self.rating,
            verdict(self.passed),
            self.metrics.mean_drift_ms,
            self.metrics.match_ratio * 100.0,
            issue_counts(&self.errors)
        )
    }
}

// =============================================================================
// Caption Quality Rating
// =============================================================================

/// Output of `rate_caption_quality`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionQualityRatingOutput {
    pub schema_version: String,
    pub video_path: String,
    pub created_at: DateTime<Utc>,
    pub passed: bool,
    /// Weighted caption-quality score (0.0 - 1.0)
    pub overall_score: f64,
    pub caption_quality: BurnedInCaptionQualityReport,
    /// Non-empty caption events
    pub segments: Vec<OcrCaptionSegment>,
    pub errors: Vec<SyncError>,
    pub analysis: AnalysisMetadata,
}

impl CaptionQualityRatingOutput {
    /// Get a one-line summary
    pub fn summary(&self) -> String {
        format!(
            "Caption Quality: {:.2} {} ({} segments, {})",
            self.overall_score,
            verdict(self.passed),
            self.segments.len(),
            issue_counts(&self.errors)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::{MatchQuality, SyncErrorType};

    fn word_match(word: &str, asr: f64, drift_ms: f64) -> WordMatch {
        WordMatch {
            word: word.to_string(),
            ocr_timestamp: asr + drift_ms / 1000.0,
            asr_timestamp: asr,
            drift_ms,
            match_quality: MatchQuality::Exact,
        }
    }

    #[test]
    fn test_drift_timeline_ordered_by_spoken_time() {
        let matches = vec![
            word_match("later", 4.0, 120.0),
            word_match("first", 0.5, -40.0),
            word_match("middle", 2.0, 0.0),
        ];
        let timeline = build_drift_timeline(&matches);
        let words: Vec<&str> = timeline.iter().map(|p| p.word.as_str()).collect();
        assert_eq!(words, vec!["first", "middle", "later"]);
        assert_eq!(timeline[0].drift_ms, -40.0);
        assert_eq!(timeline[2].time_seconds, 4.0);
    }

    #[test]
    fn test_issue_counts_by_severity() {
        let errors = vec![
            SyncError::new(SyncErrorType::LowMatchRatio, Severity::Critical, "low"),
            SyncError::new(SyncErrorType::CaptionFlicker, Severity::Warning, "flicker"),
            SyncError::new(SyncErrorType::CaptionDensity, Severity::Warning, "dense"),
        ];
        assert_eq!(
            issue_counts(&errors),
            "3 issues - 1 critical, 0 error, 2 warning"
        );
    }
}
