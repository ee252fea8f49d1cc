//! Layout-side caption metrics
//!
//! Metrics that look at where captions sit on screen, how steady they are,
//! and how confidently OCR read them.

use super::{
    clamp01, AlignmentReport, CaptionQualityThresholds, FlickerReport, JitterReport,
    OcrConfidenceReport, PlacementReport, SafeAreaReport, StyleReport,
};
use crate::captions::segmenter::OcrCaptionSegment;
use crate::sync::stats::{mean, percentile_sorted, population_std_dev};
use crate::text::{is_similar, normalize_text};
use crate::types::{FrameSize, OcrFrame};

/// 1 at zero, falling linearly to 0 at `limit`
fn limit_score(value: f64, limit: f64) -> f64 {
    if limit <= 0.0 {
        return if value <= 0.0 { 1.0 } else { 0.0 };
    }
    clamp01(1.0 - value / limit)
}

fn coefficient_of_variation(values: &[f64]) -> f64 {
    let avg = mean(values);
    if avg <= 0.0 {
        return 0.0;
    }
    population_std_dev(values) / avg
}

fn usable_size(frame_size: Option<FrameSize>) -> Option<(f64, f64)> {
    frame_size
        .filter(|size| size.width > 0 && size.height > 0)
        .map(|size| (f64::from(size.width), f64::from(size.height)))
}

// =============================================================================
// Legibility
// =============================================================================

/// Confidence of frames on which OCR found text
pub fn score_ocr_confidence(frames: &[OcrFrame]) -> OcrConfidenceReport {
    let confidences: Vec<f64> = frames
        .iter()
        .filter(|frame| frame.has_text())
        .map(|frame| frame.confidence)
        .collect();
    if confidences.is_empty() {
        return OcrConfidenceReport::default();
    }

    let mean_confidence = mean(&confidences);
    let confidence_std_dev = population_std_dev(&confidences);
    OcrConfidenceReport {
        score: clamp01(mean_confidence - confidence_std_dev),
        mean_confidence,
        confidence_std_dev,
        frame_count: confidences.len(),
    }
}

/// Distance of caption boxes from the frame edges
pub fn score_safe_area(
    frames: &[OcrFrame],
    frame_size: Option<FrameSize>,
    thresholds: &CaptionQualityThresholds,
) -> SafeAreaReport {
    let Some((width, height)) = usable_size(frame_size) else {
        return SafeAreaReport {
            score: 1.0,
            min_margin_ratio: 1.0,
            ..SafeAreaReport::default()
        };
    };

    let required_x = width * thresholds.safe_margin_ratio;
    let required_y = height * thresholds.safe_margin_ratio;
    let axis_ratio = |margin: f64, required: f64| {
        if required > 0.0 {
            margin / required
        } else {
            1.0
        }
    };

    let mut min_margin_ratio: Option<f64> = None;
    let mut violation_count = 0;
    let mut frames_checked = 0;

    for frame in frames.iter().filter(|frame| frame.has_text()) {
        let Some(bbox) = frame.bbox else { continue };
        frames_checked += 1;

        let ratio_x = axis_ratio(bbox.x0.min(width - bbox.x1), required_x);
        let ratio_y = axis_ratio(bbox.y0.min(height - bbox.y1), required_y);
        let ratio = ratio_x.min(ratio_y);

        if ratio < 1.0 {
            violation_count += 1;
        }
        min_margin_ratio = Some(min_margin_ratio.map_or(ratio, |current| current.min(ratio)));
    }

    let min_margin_ratio = min_margin_ratio.unwrap_or(1.0);
    SafeAreaReport {
        score: clamp01(min_margin_ratio),
        min_margin_ratio,
        violation_count,
        frames_checked,
        required_margin_x_px: required_x,
        required_margin_y_px: required_y,
    }
}

// =============================================================================
// Stability
// =============================================================================

/// Captions that vanish for a moment and come back
pub fn score_flicker(
    segments_with_gaps: &[OcrCaptionSegment],
    thresholds: &CaptionQualityThresholds,
) -> FlickerReport {
    let event_times: Vec<f64> = segments_with_gaps
        .windows(3)
        .filter(|window| {
            !window[0].is_empty()
                && window[1].is_empty()
                && window[1].duration_seconds <= thresholds.flicker_max_gap_sec
                && !window[2].is_empty()
        })
        .map(|window| window[1].start_seconds)
        .collect();

    FlickerReport {
        score: clamp01(1.0 - 0.2 * event_times.len() as f64),
        flicker_events: event_times.len(),
        event_times,
    }
}

/// Horizontal centring of caption segments
pub fn score_alignment(
    segments: &[OcrCaptionSegment],
    frame_size: Option<FrameSize>,
    thresholds: &CaptionQualityThresholds,
) -> AlignmentReport {
    let Some((width, _)) = usable_size(frame_size) else {
        return AlignmentReport {
            score: 1.0,
            ..AlignmentReport::default()
        };
    };

    let offsets: Vec<f64> = segments
        .iter()
        .filter_map(|segment| segment.center)
        .map(|center| (center.x - width / 2.0).abs() / width)
        .collect();
    if offsets.is_empty() {
        return AlignmentReport {
            score: 1.0,
            ..AlignmentReport::default()
        };
    }

    let mean_offset_ratio = mean(&offsets);
    AlignmentReport {
        score: limit_score(mean_offset_ratio, thresholds.max_center_offset_ratio),
        mean_offset_ratio,
        segments_measured: offsets.len(),
    }
}

/// Spread of caption centres across segments
pub fn score_placement(
    segments: &[OcrCaptionSegment],
    frame_size: Option<FrameSize>,
    thresholds: &CaptionQualityThresholds,
) -> PlacementReport {
    let Some((width, height)) = usable_size(frame_size) else {
        return PlacementReport {
            score: 1.0,
            ..PlacementReport::default()
        };
    };

    let (xs, ys): (Vec<f64>, Vec<f64>) = segments
        .iter()
        .filter_map(|segment| segment.center)
        .map(|center| (center.x / width, center.y / height))
        .unzip();

    let center_x_std_dev = population_std_dev(&xs);
    let center_y_std_dev = population_std_dev(&ys);
    let score = if xs.len() < 2 {
        1.0
    } else {
        (limit_score(center_x_std_dev, thresholds.max_placement_std_dev)
            + limit_score(center_y_std_dev, thresholds.max_placement_std_dev))
            / 2.0
    };

    PlacementReport {
        score,
        center_x_std_dev,
        center_y_std_dev,
        segments_measured: xs.len(),
    }
}

/// Frame-to-frame movement of a caption that stays on screen
pub fn score_jitter(frames: &[OcrFrame], thresholds: &CaptionQualityThresholds) -> JitterReport {
    let mut deltas: Vec<f64> = frames
        .windows(2)
        .filter_map(|pair| {
            let (previous, next) = (&pair[0], &pair[1]);
            if !previous.has_text() || !next.has_text() {
                return None;
            }
            let (a, b) = (previous.bbox?, next.bbox?);
            is_similar(&normalize_text(&previous.text), &normalize_text(&next.text))
                .then(|| a.center().distance(&b.center()))
        })
        .collect();

    if deltas.is_empty() {
        return JitterReport {
            score: 1.0,
            ..JitterReport::default()
        };
    }

    deltas.sort_by(|a, b| a.total_cmp(b));
    let mean_delta_px = mean(&deltas);
    let p95_delta_px = percentile_sorted(&deltas, 95.0);

    JitterReport {
        score: (limit_score(mean_delta_px, thresholds.max_jitter_mean_px)
            + limit_score(p95_delta_px, thresholds.max_jitter_p95_px))
            / 2.0,
        mean_delta_px,
        p95_delta_px,
        pairs_measured: deltas.len(),
    }
}

/// Consistency of rendered text size across segments
pub fn score_style(segments: &[OcrCaptionSegment], thresholds: &CaptionQualityThresholds) -> StyleReport {
    let (heights, areas): (Vec<f64>, Vec<f64>) = segments
        .iter()
        .filter_map(|segment| {
            let height = segment.bbox_height_px?;
            let area = segment.bbox_area_px?;
            let glyphs = segment.text.chars().filter(|c| !c.is_whitespace()).count();
            (segment.line_count > 0 && glyphs > 0)
                .then(|| (height / segment.line_count as f64, area / glyphs as f64))
        })
        .unzip();

    if heights.len() < 2 {
        return StyleReport {
            score: 1.0,
            segments_measured: heights.len(),
            ..StyleReport::default()
        };
    }

    let line_height_cv = coefficient_of_variation(&heights);
    let char_area_cv = coefficient_of_variation(&areas);
    StyleReport {
        score: (limit_score(line_height_cv, thresholds.max_height_cv)
            + limit_score(char_area_cv, thresholds.max_area_cv))
            / 2.0,
        line_height_cv,
        char_area_cv,
        segments_measured: heights.len(),
    }
}
