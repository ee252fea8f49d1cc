//! Sync Error Detector
//!
//! Classifies systemic failure patterns from drift metrics and, when a
//! caption-quality report is available, turns its weak spots into warnings.

use tracing::debug;

use super::errors::{Severity, SuggestedFix, SyncError, SyncErrorType, TimeRange};
use super::matcher::WordMatch;
use super::stats::SyncMetrics;
use crate::captions::quality::{BurnedInCaptionQualityReport, CaptionCase};

/// Below this match ratio the captions are considered unrelated to the audio
const CRITICAL_MATCH_RATIO: f64 = 0.5;
/// Mean signed drift above which a one-sided drift is a global offset
const GLOBAL_OFFSET_MS: f64 = 100.0;
/// |drift| above which a single match is an outlier
const SPORADIC_DRIFT_MS: f64 = 300.0;
/// Outliers must stay below this share of matches to count as sporadic
const SPORADIC_MAX_SHARE: f64 = 0.2;
const MAX_AFFECTED_WORDS: usize = 5;
/// Mean OCR confidence below which captions are likely hard to read
const MIN_LEGIBLE_CONFIDENCE: f64 = 0.7;

// =============================================================================
// Drift patterns
// =============================================================================

fn low_match_ratio(metrics: &SyncMetrics) -> Option<SyncError> {
    (metrics.match_ratio < CRITICAL_MATCH_RATIO).then(|| {
        SyncError::new(
            SyncErrorType::LowMatchRatio,
            Severity::Critical,
            format!(
                "Only {} of {} spoken words were found in the captions ({:.0}%)",
                metrics.matched_words,
                metrics.total_asr_words,
                metrics.match_ratio * 100.0
            ),
        )
        .with_fix(SuggestedFix::new(
            "Check that the burned-in captions belong to this audio track and are readable",
        ))
    })
}

fn global_offset(matches: &[WordMatch], metrics: &SyncMetrics) -> Option<SyncError> {
    if matches.is_empty() {
        return None;
    }
    let all_late = matches.iter().all(|m| m.drift_ms > 0.0);
    let all_early = matches.iter().all(|m| m.drift_ms < 0.0);
    let mean_signed = metrics.mean_signed_drift_ms;

    if !(all_late || all_early) || mean_signed.abs() <= GLOBAL_OFFSET_MS {
        return None;
    }

    let direction = if all_late { "after" } else { "before" };
    Some(
        SyncError::new(
            SyncErrorType::GlobalOffset,
            Severity::Error,
            format!(
                "Captions consistently appear {:.0}ms {} the speech",
                mean_signed.abs(),
                direction
            ),
        )
        .with_fix(
            SuggestedFix::new(format!(
                "Shift every caption by {:.0}ms",
                -mean_signed
            ))
            .with_offset_ms(-mean_signed),
        ),
    )
}

fn sporadic_errors(matches: &[WordMatch]) -> Option<SyncError> {
    let outliers: Vec<&WordMatch> = matches
        .iter()
        .filter(|m| m.drift_ms.abs() > SPORADIC_DRIFT_MS)
        .collect();
    let share_limit = SPORADIC_MAX_SHARE * matches.len() as f64;

    if outliers.is_empty() || outliers.len() as f64 >= share_limit {
        return None;
    }

    let mut error = SyncError::new(
        SyncErrorType::SporadicErrors,
        Severity::Warning,
        format!(
            "{} word(s) drift more than {:.0}ms from the speech",
            outliers.len(),
            SPORADIC_DRIFT_MS
        ),
    )
    .with_words(
        outliers
            .iter()
            .take(MAX_AFFECTED_WORDS)
            .map(|m| m.word.clone())
            .collect(),
    )
    .with_fix(SuggestedFix::new(
        "Retime the listed captions individually",
    ));

    if let Some(range) = TimeRange::spanning(outliers.iter().map(|m| m.asr_timestamp)) {
        error = error.with_time_range(range);
    }
    Some(error)
}

/// Drift-pattern errors, most severe first.
pub fn detect_sync_errors(matches: &[WordMatch], metrics: &SyncMetrics) -> Vec<SyncError> {
    let errors: Vec<SyncError> = [
        low_match_ratio(metrics),
        global_offset(matches, metrics),
        sporadic_errors(matches),
    ]
    .into_iter()
    .flatten()
    .collect();

    debug!(count = errors.len(), "sync errors detected");
    errors
}

// =============================================================================
// Caption quality
// =============================================================================

fn warning(error_type: SyncErrorType, message: String, fix: &str) -> SyncError {
    SyncError::new(error_type, Severity::Warning, message).with_fix(SuggestedFix::new(fix))
}

/// Warnings derived from a caption-quality report
pub fn caption_quality_errors(report: &BurnedInCaptionQualityReport) -> Vec<SyncError> {
    let mut errors = Vec::new();

    if report.overall.score < report.thresholds.min_overall {
        errors.push(warning(
            SyncErrorType::CaptionQualityLow,
            format!(
                "Caption quality score {:.2} is below {:.2}",
                report.overall.score, report.thresholds.min_overall
            ),
            "Review caption timing, layout and styling",
        ));
    }

    if report.flicker.flicker_events > 0 {
        let mut error = warning(
            SyncErrorType::CaptionFlicker,
            format!(
                "Captions flicker off and on {} time(s)",
                report.flicker.flicker_events
            ),
            "Keep captions on screen across short gaps between phrases",
        );
        if let Some(range) = TimeRange::spanning(report.flicker.event_times.iter().copied()) {
            error = error.with_time_range(range);
        }
        errors.push(error);
    }

    if report.safe_area.violation_count > 0 {
        errors.push(warning(
            SyncErrorType::CaptionSafeArea,
            format!(
                "Captions enter the safe margin on {} frame(s)",
                report.safe_area.violation_count
            ),
            "Move captions away from the frame edges",
        ));
    }

    if report.density.overflow_segment_count > 0 {
        errors.push(warning(
            SyncErrorType::CaptionDensity,
            format!(
                "{} caption(s) exceed {} lines or {} characters per line",
                report.density.overflow_segment_count,
                report.thresholds.max_lines,
                report.thresholds.max_chars_per_line
            ),
            "Split long captions into shorter chunks",
        ));
    }

    if report.punctuation.issue_count > 0 {
        errors.push(
            warning(
                SyncErrorType::CaptionPunctuation,
                format!(
                    "{} punctuation issue(s) in captions",
                    report.punctuation.issue_count
                ),
                "End sentences with punctuation and avoid repeated marks",
            )
            .with_words(report.punctuation.examples.clone()),
        );
    }

    if report.capitalization.deviation_count > 0 {
        let style = match report.capitalization.dominant_style {
            CaptionCase::AllCaps => "all caps",
            CaptionCase::SentenceCase => "sentence case",
            CaptionCase::Lowercase => "lowercase",
            CaptionCase::Mixed => "no single style",
        };
        errors.push(warning(
            SyncErrorType::CaptionCapitalization,
            format!(
                "{} caption(s) deviate from the dominant capitalization ({})",
                report.capitalization.deviation_count, style
            ),
            "Use one capitalization style for every caption",
        ));
    }

    if report.ocr_confidence.frame_count > 0
        && report.ocr_confidence.mean_confidence < MIN_LEGIBLE_CONFIDENCE
    {
        errors.push(warning(
            SyncErrorType::CaptionLegibility,
            format!(
                "Mean OCR confidence {:.2} suggests captions are hard to read",
                report.ocr_confidence.mean_confidence
            ),
            "Increase caption contrast, size or outline",
        ));
    }

    errors
}
