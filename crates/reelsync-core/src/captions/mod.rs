//! Burned-In Captions
//!
//! Segments the per-frame OCR stream into caption events and scores their
//! readability.

pub mod quality;
pub mod segmenter;

pub use quality::{
    analyze_caption_quality, BurnedInCaptionQualityReport, CaptionQualityInput,
    CaptionQualityThresholds, CaptionQualityWeights,
};
pub use segmenter::{segment_captions, OcrCaptionSegment, SegmentOptions};
