//! Word Matcher
//!
//! Aligns OCR-observed word appearances to ASR word timings. Every spoken
//! word is paired with the time its caption was visible closest to the
//! moment it was said.
//!
//! OCR words are never consumed: one on-screen word may satisfy several
//! spoken occurrences, and the nearest-in-time choice is the only
//! de-duplication.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::text::{is_similar, normalize_text, MIN_TOKEN_LEN};
use crate::types::{AsrWord, OcrWordAppearance, TimeSec};

/// Max gap between the two OCR samples bracketing speech onset (in frame steps)
const ONSET_BRACKET_SPAN_STEPS: f64 = 1.5;
/// Max distance of each bracketing sample from speech onset (in frame steps)
const ONSET_SIDE_STEPS: f64 = 1.0;
/// Nearest-sample tolerance (in frame steps)
const NEAREST_TOLERANCE_STEPS: f64 = 1.1;

/// How the spoken word was paired with the on-screen word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchQuality {
    /// Normalized text is identical
    Exact,
    /// Normalized text is similar (OCR misread)
    Fuzzy,
    /// Reserved: sound-alike matching is not implemented
    Phonetic,
}

/// A spoken word paired with its caption appearance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordMatch {
    pub word: String,
    pub ocr_timestamp: TimeSec,
    pub asr_timestamp: TimeSec,
    /// (ocr - asr) * 1000; negative when the caption shows before the speech
    pub drift_ms: f64,
    pub match_quality: MatchQuality,
}

/// Which rule produced the OCR timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampResolution {
    /// Caption was on screen at speech onset; the onset itself is used
    VisibleAtOnset,
    /// Nearest sample within tolerance
    WithinTolerance,
    /// Nearest sample, however far
    Nearest,
}

/// Index of the sample closest to `target` in an ascending slice.
///
/// Ties resolve to the earlier sample. `None` for an empty slice.
pub fn nearest_timestamp(sorted_timestamps: &[TimeSec], target: TimeSec) -> Option<usize> {
    if sorted_timestamps.is_empty() {
        return None;
    }

    let upper = sorted_timestamps.partition_point(|t| *t < target);
    if upper == 0 {
        return Some(0);
    }
    if upper == sorted_timestamps.len() {
        return Some(upper - 1);
    }

    let before = target - sorted_timestamps[upper - 1];
    let after = sorted_timestamps[upper] - target;
    if after < before {
        Some(upper)
    } else {
        Some(upper - 1)
    }
}

/// Picks the OCR time to pair with a spoken word starting at `target`.
pub fn resolve_timestamp(
    sorted_timestamps: &[TimeSec],
    target: TimeSec,
    frame_step: TimeSec,
) -> Option<(TimeSec, TimestampResolution)> {
    let nearest_index = nearest_timestamp(sorted_timestamps, target)?;

    let at_or_before = sorted_timestamps.partition_point(|t| *t <= target);
    let at_or_after = sorted_timestamps.partition_point(|t| *t < target);
    let lower = at_or_before
        .checked_sub(1)
        .map(|index| sorted_timestamps[index]);
    let upper = sorted_timestamps.get(at_or_after).copied();

    if let (Some(lower), Some(upper)) = (lower, upper) {
        let bracketed = upper - lower <= ONSET_BRACKET_SPAN_STEPS * frame_step
            && target - lower <= ONSET_SIDE_STEPS * frame_step
            && upper - target <= ONSET_SIDE_STEPS * frame_step;
        if bracketed {
            return Some((target, TimestampResolution::VisibleAtOnset));
        }
    }

    let nearest = sorted_timestamps[nearest_index];
    if (nearest - target).abs() <= NEAREST_TOLERANCE_STEPS * frame_step {
        Some((nearest, TimestampResolution::WithinTolerance))
    } else {
        Some((nearest, TimestampResolution::Nearest))
    }
}

/// Sorted appearance times per normalized OCR word
#[derive(Debug, Clone, Default)]
pub struct OcrWordIndex {
    timestamps: BTreeMap<String, Vec<TimeSec>>,
}

impl OcrWordIndex {
    /// Builds the index, skipping words shorter than the minimum token length
    pub fn build(appearances: &[OcrWordAppearance]) -> Self {
        let mut timestamps: BTreeMap<String, Vec<TimeSec>> = BTreeMap::new();
        for appearance in appearances {
            let word = normalize_text(&appearance.word);
            if word.chars().count() < MIN_TOKEN_LEN {
                continue;
            }
            timestamps
                .entry(word)
                .or_default()
                .push(appearance.timestamp_seconds);
        }
        for times in timestamps.values_mut() {
            times.sort_by(|a, b| a.total_cmp(b));
            times.dedup();
        }
        Self { timestamps }
    }

    /// Number of distinct words
    pub fn vocabulary_size(&self) -> usize {
        self.timestamps.len()
    }

    /// Exact entry first, then every similar vocabulary entry
    fn candidates<'a>(&'a self, word: &'a str) -> impl Iterator<Item = (&'a [TimeSec], MatchQuality)> + 'a {
        let exact = self
            .timestamps
            .get(word)
            .map(|times| (times.as_slice(), MatchQuality::Exact));
        let fuzzy = self
            .timestamps
            .iter()
            .filter(move |(entry, _)| entry.as_str() != word && is_similar(entry, word))
            .map(|(_, times)| (times.as_slice(), MatchQuality::Fuzzy));
        exact.into_iter().chain(fuzzy)
    }
}

/// Pairs every usable ASR word with its nearest caption appearance.
pub fn match_words(
    appearances: &[OcrWordAppearance],
    asr_words: &[AsrWord],
    frame_step: TimeSec,
) -> Vec<WordMatch> {
    let index = OcrWordIndex::build(appearances);
    let mut matches = Vec::new();

    for asr_word in asr_words {
        let word = normalize_text(&asr_word.word);
        if word.chars().count() < MIN_TOKEN_LEN {
            continue;
        }

        let mut best: Option<(TimeSec, f64, MatchQuality)> = None;
        for (times, quality) in index.candidates(&word) {
            let Some((timestamp, _)) = resolve_timestamp(times, asr_word.start_seconds, frame_step)
            else {
                continue;
            };
            let diff = (timestamp - asr_word.start_seconds).abs();

            let better = match best {
                None => true,
                Some((_, best_diff, best_quality)) => {
                    diff < best_diff
                        || (diff == best_diff
                            && quality == MatchQuality::Exact
                            && best_quality != MatchQuality::Exact)
                }
            };
            if better {
                best = Some((timestamp, diff, quality));
            }
        }

        if let Some((ocr_timestamp, _, match_quality)) = best {
            matches.push(WordMatch {
                word,
                ocr_timestamp,
                asr_timestamp: asr_word.start_seconds,
                drift_ms: (ocr_timestamp - asr_word.start_seconds) * 1000.0,
                match_quality,
            });
        }
    }

    debug!(
        asr_words = asr_words.len(),
        ocr_vocabulary = index.vocabulary_size(),
        matched = matches.len(),
        "word matching complete"
    );

    matches
}
