//! Word appearances: the per-word view of the OCR stream used by the matcher.

use crate::text::tokenize;
use crate::types::{OcrFrame, OcrWordAppearance};

/// Splits each sufficiently confident frame into `(word, timestamp)` entries.
///
/// Frames below `min_confidence` are dropped, as are tokens without any
/// alphabetic character (numbers, stray symbols).
pub fn extract_word_appearances(frames: &[OcrFrame], min_confidence: f64) -> Vec<OcrWordAppearance> {
    frames
        .iter()
        .filter(|frame| frame.confidence >= min_confidence)
        .flat_map(|frame| {
            tokenize(&frame.text)
                .into_iter()
                .filter(|token| token.chars().any(char::is_alphabetic))
                .map(move |word| OcrWordAppearance {
                    word,
                    timestamp_seconds: frame.timestamp_seconds,
                })
        })
        .collect()
}
