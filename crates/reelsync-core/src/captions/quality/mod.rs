//! Burned-In Caption Quality Analyzer
//!
//! Scores rendered captions for readability and accessibility. Every
//! sub-score is independent and lies in `[0, 1]`; the overall score is
//! their weighted mean.
//!
//! # Metrics
//!
//! ```text
//! text      rhythm, displayTime, coverage, density, punctuation,
//!           capitalization, redundancy, segmentation
//! layout    ocrConfidence, safeArea, flicker, alignment, placement,
//!           jitter, style
//! ```
//!
//! Text metrics read the non-empty caption segments. Flicker reads the
//! segment stream including empty gaps; confidence, safe-area and jitter
//! read the raw frame stream.

mod layout_metrics;
mod text_metrics;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::segmenter::{segment_captions, SegmentOptions};
use crate::types::{frame_step, FrameSize, OcrFrame, TimeSec};

pub use layout_metrics::{
    score_alignment, score_flicker, score_jitter, score_ocr_confidence, score_placement,
    score_safe_area, score_style,
};
pub use text_metrics::{
    classify_case, score_capitalization, score_coverage, score_density, score_display_time,
    score_punctuation, score_redundancy, score_rhythm, score_segmentation,
};

pub(crate) fn clamp01(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

// =============================================================================
// Configuration
// =============================================================================

/// Limits used by the individual metrics and the pass verdict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CaptionQualityThresholds {
    pub ideal_wps_min: f64,
    pub ideal_wps_max: f64,
    pub absolute_wps_min: f64,
    pub absolute_wps_max: f64,
    /// Captions shorter than this are flashes
    pub flash_duration_sec: f64,
    pub min_display_sec: f64,
    pub max_display_sec: f64,
    pub max_lines: usize,
    pub max_chars_per_line: usize,
    /// Required edge margin as a fraction of the frame dimension
    pub safe_margin_ratio: f64,
    /// Longest empty gap counted as flicker
    pub flicker_max_gap_sec: f64,
    /// Largest acceptable mean horizontal centre offset (fraction of width)
    pub max_center_offset_ratio: f64,
    /// Largest acceptable std-dev of normalized caption centres
    pub max_placement_std_dev: f64,
    pub max_jitter_mean_px: f64,
    pub max_jitter_p95_px: f64,
    pub max_height_cv: f64,
    pub max_area_cv: f64,
    pub min_overall: f64,
    pub min_coverage_ratio: f64,
    pub max_flicker_events: usize,
}

impl Default for CaptionQualityThresholds {
    fn default() -> Self {
        Self {
            ideal_wps_min: 2.0,
            ideal_wps_max: 4.0,
            absolute_wps_min: 1.0,
            absolute_wps_max: 7.0,
            flash_duration_sec: 0.5,
            min_display_sec: 1.0,
            max_display_sec: 7.0,
            max_lines: 3,
            max_chars_per_line: 45,
            safe_margin_ratio: 0.05,
            flicker_max_gap_sec: 0.5,
            max_center_offset_ratio: 0.15,
            max_placement_std_dev: 0.05,
            max_jitter_mean_px: 4.0,
            max_jitter_p95_px: 12.0,
            max_height_cv: 0.25,
            max_area_cv: 0.35,
            min_overall: 0.7,
            min_coverage_ratio: 0.5,
            max_flicker_events: 2,
        }
    }
}

/// Relative weight of each sub-score in the overall score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CaptionQualityWeights {
    pub rhythm: f64,
    pub display_time: f64,
    pub coverage: f64,
    pub density: f64,
    pub punctuation: f64,
    pub capitalization: f64,
    pub ocr_confidence: f64,
    pub safe_area: f64,
    pub flicker: f64,
    pub alignment: f64,
    pub placement: f64,
    pub jitter: f64,
    pub style: f64,
    pub redundancy: f64,
    pub segmentation: f64,
}

impl Default for CaptionQualityWeights {
    fn default() -> Self {
        Self {
            rhythm: 1.0,
            display_time: 1.0,
            coverage: 1.5,
            density: 1.0,
            punctuation: 0.5,
            capitalization: 0.5,
            ocr_confidence: 1.0,
            safe_area: 1.0,
            flicker: 1.0,
            alignment: 0.75,
            placement: 0.75,
            jitter: 0.75,
            style: 0.5,
            redundancy: 0.75,
            segmentation: 0.75,
        }
    }
}

// =============================================================================
// Sub-reports
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RhythmReport {
    pub score: f64,
    pub mean_wps: f64,
    pub wps_std_dev: f64,
    pub stability: f64,
    pub ideal_range_penalty: f64,
    pub absolute_range_penalty: f64,
    pub segments_outside_absolute_range: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayTimeReport {
    pub score: f64,
    pub mean_duration_sec: f64,
    pub flash_count: usize,
    pub too_short_count: usize,
    pub too_long_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageReport {
    pub score: f64,
    pub covered_seconds: f64,
    pub video_duration_seconds: f64,
    pub coverage_ratio: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DensityReport {
    pub score: f64,
    pub line_overflow_count: usize,
    pub char_overflow_count: usize,
    pub overflow_segment_count: usize,
    pub max_lines_observed: usize,
    pub max_chars_per_line_observed: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PunctuationReport {
    pub score: f64,
    pub missing_terminal_count: usize,
    pub repeated_punctuation_count: usize,
    pub issue_count: usize,
    pub examples: Vec<String>,
}

/// Letter-case convention of a caption
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptionCase {
    AllCaps,
    SentenceCase,
    Lowercase,
    #[default]
    Mixed,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapitalizationReport {
    pub score: f64,
    pub dominant_style: CaptionCase,
    pub deviation_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrConfidenceReport {
    pub score: f64,
    pub mean_confidence: f64,
    pub confidence_std_dev: f64,
    pub frame_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafeAreaReport {
    pub score: f64,
    pub min_margin_ratio: f64,
    pub violation_count: usize,
    pub frames_checked: usize,
    pub required_margin_x_px: f64,
    pub required_margin_y_px: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlickerReport {
    pub score: f64,
    pub flicker_events: usize,
    /// Start time of each empty gap counted as flicker
    pub event_times: Vec<TimeSec>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlignmentReport {
    pub score: f64,
    pub mean_offset_ratio: f64,
    pub segments_measured: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementReport {
    pub score: f64,
    pub center_x_std_dev: f64,
    pub center_y_std_dev: f64,
    pub segments_measured: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JitterReport {
    pub score: f64,
    pub mean_delta_px: f64,
    pub p95_delta_px: f64,
    pub pairs_measured: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleReport {
    pub score: f64,
    pub line_height_cv: f64,
    pub char_area_cv: f64,
    pub segments_measured: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedundancyReport {
    pub score: f64,
    pub reappearance_count: usize,
    pub adjacent_overlap_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentationReport {
    pub score: f64,
    pub dangling_conjunction_count: usize,
    pub mid_word_break_count: usize,
    pub issue_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverallScore {
    pub score: f64,
    pub passed: bool,
}

/// Full caption-quality report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BurnedInCaptionQualityReport {
    pub thresholds: CaptionQualityThresholds,
    pub weights: CaptionQualityWeights,
    pub overall: OverallScore,
    pub segment_count: usize,
    pub rhythm: RhythmReport,
    pub display_time: DisplayTimeReport,
    pub coverage: CoverageReport,
    pub density: DensityReport,
    pub punctuation: PunctuationReport,
    pub capitalization: CapitalizationReport,
    pub ocr_confidence: OcrConfidenceReport,
    pub safe_area: SafeAreaReport,
    pub flicker: FlickerReport,
    pub alignment: AlignmentReport,
    pub placement: PlacementReport,
    pub jitter: JitterReport,
    pub style: StyleReport,
    pub redundancy: RedundancyReport,
    pub segmentation: SegmentationReport,
}

impl BurnedInCaptionQualityReport {
    /// Report for a video in which no caption was ever read
    fn without_captions(
        thresholds: CaptionQualityThresholds,
        weights: CaptionQualityWeights,
        video_duration_seconds: f64,
    ) -> Self {
        Self {
            thresholds,
            weights,
            overall: OverallScore::default(),
            segment_count: 0,
            rhythm: RhythmReport::default(),
            display_time: DisplayTimeReport::default(),
            coverage: CoverageReport {
                video_duration_seconds,
                ..CoverageReport::default()
            },
            density: DensityReport::default(),
            punctuation: PunctuationReport::default(),
            capitalization: CapitalizationReport::default(),
            ocr_confidence: OcrConfidenceReport::default(),
            safe_area: SafeAreaReport::default(),
            flicker: FlickerReport::default(),
            alignment: AlignmentReport::default(),
            placement: PlacementReport::default(),
            jitter: JitterReport::default(),
            style: StyleReport::default(),
            redundancy: RedundancyReport::default(),
            segmentation: SegmentationReport::default(),
        }
    }

    /// (weight, score) for every sub-score
    fn weighted_scores(&self) -> [(f64, f64); 15] {
        let w = &self.weights;
        [
            (w.rhythm, self.rhythm.score),
            (w.display_time, self.display_time.score),
            (w.coverage, self.coverage.score),
            (w.density, self.density.score),
            (w.punctuation, self.punctuation.score),
            (w.capitalization, self.capitalization.score),
            (w.ocr_confidence, self.ocr_confidence.score),
            (w.safe_area, self.safe_area.score),
            (w.flicker, self.flicker.score),
            (w.alignment, self.alignment.score),
            (w.placement, self.placement.score),
            (w.jitter, self.jitter.score),
            (w.style, self.style.score),
            (w.redundancy, self.redundancy.score),
            (w.segmentation, self.segmentation.score),
        ]
    }
}

/// Weighted mean of (weight, score) pairs; 0 when the weights sum to 0
pub fn weighted_mean(pairs: &[(f64, f64)]) -> f64 {
    let weight_sum: f64 = pairs.iter().map(|(w, _)| w.max(0.0)).sum();
    if weight_sum <= 0.0 {
        return 0.0;
    }
    let total: f64 = pairs.iter().map(|(w, s)| w.max(0.0) * s).sum();
    clamp01(total / weight_sum)
}

// =============================================================================
// Analyzer
// =============================================================================

/// Inputs to [`analyze_caption_quality`]
#[derive(Debug, Clone, Copy)]
pub struct CaptionQualityInput<'a> {
    pub frames: &'a [OcrFrame],
    pub fps: f64,
    /// Full-frame size; layout metrics needing it are neutral without it
    pub frame_size: Option<FrameSize>,
    /// Falls back to the frame span when not positive
    pub video_duration_seconds: f64,
}

/// Computes every caption-quality sub-score and combines them.
pub fn analyze_caption_quality(
    input: CaptionQualityInput<'_>,
    thresholds: &CaptionQualityThresholds,
    weights: &CaptionQualityWeights,
) -> BurnedInCaptionQualityReport {
    let step = frame_step(input.fps);
    let mut frames: Vec<OcrFrame> = input.frames.to_vec();
    frames.sort_by(|a, b| a.timestamp_seconds.total_cmp(&b.timestamp_seconds));

    let video_duration = if input.video_duration_seconds > 0.0 {
        input.video_duration_seconds
    } else {
        frames
            .last()
            .map(|frame| frame.timestamp_seconds + step)
            .unwrap_or(0.0)
    };

    let segments = segment_captions(&frames, SegmentOptions::new(input.fps));
    if segments.is_empty() {
        debug!("no caption segments detected");
        return BurnedInCaptionQualityReport::without_captions(
            thresholds.clone(),
            weights.clone(),
            video_duration,
        );
    }
    let segments_with_gaps = segment_captions(&frames, SegmentOptions::new(input.fps).with_empty());

    let mut report = BurnedInCaptionQualityReport {
        thresholds: thresholds.clone(),
        weights: weights.clone(),
        overall: OverallScore::default(),
        segment_count: segments.len(),
        rhythm: score_rhythm(&segments, thresholds),
        display_time: score_display_time(&segments, thresholds),
        coverage: score_coverage(&segments, video_duration),
        density: score_density(&segments, thresholds),
        punctuation: score_punctuation(&segments),
        capitalization: score_capitalization(&segments),
        ocr_confidence: score_ocr_confidence(&frames),
        safe_area: score_safe_area(&frames, input.frame_size, thresholds),
        flicker: score_flicker(&segments_with_gaps, thresholds),
        alignment: score_alignment(&segments, input.frame_size, thresholds),
        placement: score_placement(&segments, input.frame_size, thresholds),
        jitter: score_jitter(&frames, thresholds),
        style: score_style(&segments, thresholds),
        redundancy: score_redundancy(&segments),
        segmentation: score_segmentation(&segments),
    };

    let overall = weighted_mean(&report.weighted_scores());
    let passed = overall >= thresholds.min_overall
        && report.coverage.coverage_ratio >= thresholds.min_coverage_ratio
        && report.flicker.flicker_events <= thresholds.max_flicker_events;
    report.overall = OverallScore {
        score: overall,
        passed,
    };

    debug!(
        segments = report.segment_count,
        overall = overall,
        passed = passed,
        "caption quality analyzed"
    );

    report
}
