//! ReelSync Core Type Definitions
//!
//! Defines the frame/word records exchanged between the collaborators
//! (frame extraction, OCR, ASR) and the rating engine.

use serde::{Deserialize, Serialize};

// =============================================================================
// Time Types
// =============================================================================

/// Time in seconds (floating point)
pub type TimeSec = f64;

/// Frame step used when the sampling rate is unknown or non-positive
pub const DEFAULT_FRAME_STEP_SEC: TimeSec = 0.5;

/// Seconds between two sampled frames at the given rate
pub fn frame_step(fps: f64) -> TimeSec {
    if fps > 0.0 && fps.is_finite() {
        1.0 / fps
    } else {
        DEFAULT_FRAME_STEP_SEC
    }
}

// =============================================================================
// Geometry
// =============================================================================

/// Pixel dimensions of a full (uncropped) video frame
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// A 2D point in pixels
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    /// Euclidean distance to another point
    pub fn distance(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Axis-aligned bounding box in full-frame pixel coordinates
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl BoundingBox {
    /// Creates a box, swapping inverted corners
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        }
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn center(&self) -> Point {
        Point {
            x: (self.x0 + self.x1) / 2.0,
            y: (self.y0 + self.y1) / 2.0,
        }
    }

    /// Smallest box containing both boxes
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    /// Union over any number of boxes; `None` for an empty input
    pub fn union_all<'a>(boxes: impl IntoIterator<Item = &'a BoundingBox>) -> Option<BoundingBox> {
        boxes
            .into_iter()
            .fold(None, |acc: Option<BoundingBox>, bbox| match acc {
                Some(current) => Some(current.union(bbox)),
                None => Some(*bbox),
            })
    }

    /// Moves the box down by `dy` pixels (crop offset back to full frame)
    pub fn offset_y(&self, dy: f64) -> BoundingBox {
        BoundingBox {
            x0: self.x0,
            y0: self.y0 + dy,
            x1: self.x1,
            y1: self.y1 + dy,
        }
    }
}

/// Vertical band of the frame that is cropped before OCR
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionRegion {
    /// Top of the band as a fraction of frame height
    pub y_ratio: f64,
    /// Height of the band as a fraction of frame height
    pub height_ratio: f64,
}

impl Default for CaptionRegion {
    fn default() -> Self {
        Self {
            y_ratio: 0.65,
            height_ratio: 0.35,
        }
    }
}

impl CaptionRegion {
    /// Pixel row where the crop starts in a frame of the given height
    pub fn crop_offset_y(&self, frame_height: u32) -> u32 {
        (frame_height as f64 * self.y_ratio).round() as u32
    }
}

// =============================================================================
// Collaborator Records
// =============================================================================

/// One sampled frame as read by OCR
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrFrame {
    pub frame_number: u32,
    /// frame index / fps
    pub timestamp_seconds: TimeSec,
    /// Raw OCR text, lines separated by `\n`
    pub text: String,
    /// Recognition confidence (0.0 - 1.0)
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<BoundingBox>,
}

impl OcrFrame {
    /// Frame with nothing recognized (used when OCR fails for a frame)
    pub fn empty(frame_number: u32, timestamp_seconds: TimeSec) -> Self {
        Self {
            frame_number,
            timestamp_seconds,
            text: String::new(),
            confidence: 0.0,
            bbox: None,
        }
    }

    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }
}

/// One word produced by speech recognition
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AsrWord {
    pub word: String,
    pub start_seconds: TimeSec,
    pub end_seconds: TimeSec,
}

impl AsrWord {
    pub fn new(word: impl Into<String>, start_seconds: TimeSec, end_seconds: TimeSec) -> Self {
        Self {
            word: word.into(),
            start_seconds,
            end_seconds,
        }
    }
}

/// A single OCR'd word and the frame time it was visible at
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrWordAppearance {
    pub word: String,
    pub timestamp_seconds: TimeSec,
}
