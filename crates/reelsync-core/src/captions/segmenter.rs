//! Caption Timeline Segmenter
//!
//! Collapses the per-frame OCR stream into discrete on-screen caption
//! events. Segmentation is a fold: each frame maps the accumulator to a new
//! accumulator, so boundary behaviour can be tested one step at a time.

use serde::{Deserialize, Serialize};

use crate::text::{is_similar, normalize_text};
use crate::types::{frame_step, BoundingBox, OcrFrame, Point, TimeSec};

/// One displayed caption: a run of similar consecutive frames
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrCaptionSegment {
    /// Text of the most confident frame in the run
    pub text: String,
    pub normalized_text: String,
    pub start_seconds: TimeSec,
    /// Last merged frame + one frame step
    pub end_seconds: TimeSec,
    pub duration_seconds: TimeSec,
    pub word_count: usize,
    pub line_count: usize,
    pub max_chars_per_line: usize,
    pub mean_confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<BoundingBox>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center: Option<Point>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox_height_px: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox_area_px: Option<f64>,
}

impl OcrCaptionSegment {
    pub fn is_empty(&self) -> bool {
        self.normalized_text.is_empty()
    }
}

/// Options for [`segment_captions`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentOptions {
    pub fps: f64,
    /// Keep runs of empty frames (the flicker detector needs the gaps)
    pub include_empty: bool,
}

impl SegmentOptions {
    pub fn new(fps: f64) -> Self {
        Self {
            fps,
            include_empty: false,
        }
    }

    pub fn with_empty(mut self) -> Self {
        self.include_empty = true;
        self
    }
}

/// The run currently being merged
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateSegment {
    pub normalized_text: String,
    pub best_text: String,
    pub best_confidence: f64,
    pub start_seconds: TimeSec,
    pub last_seconds: TimeSec,
    pub confidences: Vec<f64>,
    pub boxes: Vec<BoundingBox>,
}

impl CandidateSegment {
    fn start(frame: &OcrFrame) -> Self {
        let mut candidate = Self {
            normalized_text: normalize_text(&frame.text),
            best_text: frame.text.clone(),
            best_confidence: frame.confidence,
            start_seconds: frame.timestamp_seconds,
            last_seconds: frame.timestamp_seconds,
            confidences: Vec::new(),
            boxes: Vec::new(),
        };
        candidate.absorb_samples(frame);
        candidate
    }

    fn accepts(&self, normalized: &str) -> bool {
        self.normalized_text == normalized || is_similar(&self.normalized_text, normalized)
    }

    fn merge(mut self, frame: &OcrFrame) -> Self {
        self.last_seconds = frame.timestamp_seconds;
        if frame.confidence > self.best_confidence {
            self.best_confidence = frame.confidence;
            self.best_text = frame.text.clone();
            self.normalized_text = normalize_text(&frame.text);
        }
        self.absorb_samples(frame);
        self
    }

    fn absorb_samples(&mut self, frame: &OcrFrame) {
        self.confidences.push(frame.confidence);
        if let Some(bbox) = frame.bbox.filter(|_| frame.has_text()) {
            self.boxes.push(bbox);
        }
    }

    fn finish(self, step: TimeSec) -> OcrCaptionSegment {
        let end_seconds = self.last_seconds + step;
        let lines: Vec<&str> = self
            .best_text
            .split('\n')
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        let bbox = BoundingBox::union_all(self.boxes.iter());
        let mean_confidence = if self.confidences.is_empty() {
            0.0
        } else {
            self.confidences.iter().sum::<f64>() / self.confidences.len() as f64
        };

        OcrCaptionSegment {
            word_count: self.best_text.split_whitespace().count(),
            line_count: lines.len(),
            max_chars_per_line: lines
                .iter()
                .map(|line| line.chars().count())
                .max()
                .unwrap_or(0),
            text: self.best_text,
            normalized_text: self.normalized_text,
            start_seconds: self.start_seconds,
            end_seconds,
            duration_seconds: end_seconds - self.start_seconds,
            mean_confidence,
            center: bbox.map(|b| b.center()),
            bbox_height_px: bbox.map(|b| b.height()),
            bbox_area_px: bbox.map(|b| b.area()),
            bbox,
        }
    }
}

/// Immutable fold state
#[derive(Debug, Clone, PartialEq)]
pub struct SegmenterState {
    step: TimeSec,
    include_empty: bool,
    current: Option<CandidateSegment>,
    emitted: Vec<OcrCaptionSegment>,
}

impl SegmenterState {
    pub fn new(options: SegmentOptions) -> Self {
        Self {
            step: frame_step(options.fps),
            include_empty: options.include_empty,
            current: None,
            emitted: Vec::new(),
        }
    }

    /// Feeds one frame and returns the next state
    pub fn step(self, frame: &OcrFrame) -> Self {
        let normalized = normalize_text(&frame.text);
        let Self {
            step,
            include_empty,
            current,
            emitted,
        } = self;

        match current {
            Some(candidate) if candidate.accepts(&normalized) => Self {
                step,
                include_empty,
                current: Some(candidate.merge(frame)),
                emitted,
            },
            previous => Self {
                step,
                include_empty,
                current: Some(CandidateSegment::start(frame)),
                emitted: flush(emitted, previous, step, include_empty),
            },
        }
    }

    /// Flushes the open candidate and returns every segment
    pub fn finish(self) -> Vec<OcrCaptionSegment> {
        flush(self.emitted, self.current, self.step, self.include_empty)
    }
}

fn flush(
    mut emitted: Vec<OcrCaptionSegment>,
    candidate: Option<CandidateSegment>,
    step: TimeSec,
    include_empty: bool,
) -> Vec<OcrCaptionSegment> {
    if let Some(candidate) = candidate {
        let segment = candidate.finish(step);
        if include_empty || !segment.is_empty() {
            emitted.push(segment);
        }
    }
    emitted
}

/// Collapses a time-ordered frame stream into caption segments.
pub fn segment_captions(frames: &[OcrFrame], options: SegmentOptions) -> Vec<OcrCaptionSegment> {
    let mut ordered: Vec<&OcrFrame> = frames.iter().collect();
    ordered.sort_by(|a, b| a.timestamp_seconds.total_cmp(&b.timestamp_seconds));

    ordered
        .into_iter()
        .fold(SegmenterState::new(options), SegmenterState::step)
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(index: u32, text: &str, confidence: f64) -> OcrFrame {
        OcrFrame {
            frame_number: index,
            timestamp_seconds: index as f64 * 0.5,
            text: text.to_string(),
            confidence,
            bbox: None,
        }
    }

    fn boxed(index: u32, text: &str, bbox: BoundingBox) -> OcrFrame {
        OcrFrame {
            bbox: Some(bbox),
            ..frame(index, text, 0.9)
        }
    }

    #[test]
    fn test_identical_frames_merge_with_trailing_step() {
        let frames = vec![frame(0, "Hello world", 0.9), frame(1, "hello world!", 0.8)];
        let segments = segment_captions(&frames, SegmentOptions::new(2.0));

        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].start_seconds, 0.0);
        assert_eq!(segments[0].end_seconds, 1.0);
        assert_eq!(segments[0].duration_seconds, 1.0);
        assert_eq!(segments[0].text, "Hello world");
        assert!((segments[0].mean_confidence - 0.85).abs() < 1e-9);
    }

    #[test]
    fn test_higher_confidence_variant_becomes_canonical() {
        let frames = vec![frame(0, "Helo world", 0.6), frame(1, "Hello world", 0.95)];
        let segments = segment_captions(&frames, SegmentOptions::new(2.0));
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].text, "Hello world");
        assert_eq!(segments[0].normalized_text, "hello world");
    }

    #[test]
    fn test_different_text_starts_new_segment() {
        let frames = vec![
            frame(0, "First caption here", 0.9),
            frame(1, "Something else entirely", 0.9),
        ];
        let segments = segment_captions(&frames, SegmentOptions::new(2.0));
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[1].start_seconds, 0.5);
    }

    #[test]
    fn test_empty_segments_dropped_unless_requested() {
        let frames = vec![
            frame(0, "Caption one", 0.9),
            frame(1, "", 0.0),
            frame(2, "Caption two is here", 0.9),
        ];
        assert_eq!(segment_captions(&frames, SegmentOptions::new(2.0)).len(), 2);

        let with_gaps = segment_captions(&frames, SegmentOptions::new(2.0).with_empty());
        assert_eq!(with_gaps.len(), 3);
        assert!(with_gaps[1].is_empty());
        assert_eq!(with_gaps[1].duration_seconds, 0.5);
    }

    #[test]
    fn test_line_and_word_stats() {
        let frames = vec![frame(0, "  First line here \n\n second line  ", 0.9)];
        let segments = segment_captions(&frames, SegmentOptions::new(2.0));
        assert_eq!(segments[0].line_count, 2);
        assert_eq!(segments[0].max_chars_per_line, 15);
        assert_eq!(segments[0].word_count, 5);
    }

    #[test]
    fn test_bbox_union_and_derived_geometry() {
        let frames = vec![
            boxed(0, "Same text", BoundingBox::new(100.0, 1500.0, 500.0, 1560.0)),
            boxed(1, "Same text", BoundingBox::new(90.0, 1510.0, 520.0, 1570.0)),
        ];
        let segments = segment_captions(&frames, SegmentOptions::new(2.0));
        let segment = &segments[0];
        assert_eq!(segment.bbox, Some(BoundingBox::new(90.0, 1500.0, 520.0, 1570.0)));
        assert_eq!(segment.center, Some(Point { x: 305.0, y: 1535.0 }));
        assert_eq!(segment.bbox_height_px, Some(70.0));
        assert_eq!(segment.bbox_area_px, Some(430.0 * 70.0));
    }

    #[test]
    fn test_fold_step_by_step() {
        let state = SegmenterState::new(SegmentOptions::new(2.0))
            .step(&frame(0, "alpha beta gamma", 0.9))
            .step(&frame(1, "alpha beta gamma", 0.9));
        assert_eq!(state.clone().finish().len(), 1);

        let state = state.step(&frame(2, "totally different words", 0.9));
        let segments = state.finish();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].end_seconds, 1.0);
    }

    #[test]
    fn test_unsorted_frames_are_ordered() {
        let frames = vec![frame(1, "Hello world", 0.9), frame(0, "Hello world", 0.9)];
        let segments = segment_captions(&frames, SegmentOptions::new(2.0));
        assert_eq!(segments[0].start_seconds, 0.0);
    }
}
