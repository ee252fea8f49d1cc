//! Mock Media
//!
//! Deterministic stand-ins for the collaborators, used when
//! `RatingOptions::mock` is set. A fixed script is "spoken" at a steady
//! pace and each caption is shown, centred in the bottom third of a
//! 1080x1920 frame, for as long as its words are spoken.

use crate::ffmpeg::MediaInfo;
use crate::types::{AsrWord, BoundingBox, OcrFrame, TimeSec};

pub const MOCK_WIDTH: u32 = 1080;
pub const MOCK_HEIGHT: u32 = 1920;

const MOCK_SCRIPT: &[&str] = &[
    "Welcome back to the channel.",
    "Today we measure caption sync.",
    "Every word lands on time.",
    "Thanks for watching and subscribe.",
];

/// Seconds each caption stays on screen
const CAPTION_SECONDS: TimeSec = 3.0;
/// Seconds between consecutive spoken words
const WORD_SECONDS: TimeSec = 0.55;
/// Speech onset after the caption appears
const SPEECH_LEAD_IN: TimeSec = 0.1;
const MOCK_CONFIDENCE: f64 = 0.92;

const CHAR_WIDTH_PX: f64 = 24.0;
const LINE_TOP_PX: f64 = 1480.0;
const LINE_HEIGHT_PX: f64 = 64.0;

fn script_duration() -> TimeSec {
    MOCK_SCRIPT.len() as f64 * CAPTION_SECONDS
}

fn limited_duration(max_seconds: Option<f64>) -> TimeSec {
    match max_seconds {
        Some(limit) if limit > 0.0 => script_duration().min(limit),
        _ => script_duration(),
    }
}

fn caption_box(text: &str) -> BoundingBox {
    let width = text.chars().count() as f64 * CHAR_WIDTH_PX;
    let x0 = (f64::from(MOCK_WIDTH) - width) / 2.0;
    BoundingBox::new(x0, LINE_TOP_PX, x0 + width, LINE_TOP_PX + LINE_HEIGHT_PX)
}

/// Probe result of the synthetic video
pub fn mock_media_info(max_seconds: Option<f64>) -> MediaInfo {
    MediaInfo {
        duration_sec: limited_duration(max_seconds),
        width: MOCK_WIDTH,
        height: MOCK_HEIGHT,
        fps: 30.0,
        has_audio: true,
    }
}

/// OCR stream sampled at `fps`, in full-frame coordinates
pub fn mock_ocr_frames(fps: f64, max_seconds: Option<f64>) -> Vec<OcrFrame> {
    let fps = if fps > 0.0 { fps } else { 2.0 };
    let duration = limited_duration(max_seconds);
    let frame_count = (duration * fps).floor() as u32;

    (0..frame_count)
        .map(|index| {
            let timestamp = f64::from(index) / fps;
            let caption = (timestamp / CAPTION_SECONDS) as usize;
            match MOCK_SCRIPT.get(caption) {
                Some(text) => OcrFrame {
                    frame_number: index,
                    timestamp_seconds: timestamp,
                    text: (*text).to_string(),
                    confidence: MOCK_CONFIDENCE,
                    bbox: Some(caption_box(text)),
                },
                None => OcrFrame::empty(index, timestamp),
            }
        })
        .collect()
}

/// Spoken words of the script
pub fn mock_asr_words(max_seconds: Option<f64>) -> Vec<AsrWord> {
    let duration = limited_duration(max_seconds);

    MOCK_SCRIPT
        .iter()
        .enumerate()
        .flat_map(|(caption, text)| {
            let caption_start = caption as f64 * CAPTION_SECONDS;
            text.split_whitespace().enumerate().map(move |(position, word)| {
                let start = caption_start + SPEECH_LEAD_IN + position as f64 * WORD_SECONDS;
                AsrWord::new(word, start, start + WORD_SECONDS * 0.9)
            })
        })
        .filter(|word| word.start_seconds < duration)
        .collect()
}
