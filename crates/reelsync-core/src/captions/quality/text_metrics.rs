//! Text-side caption metrics
//!
//! Metrics that only look at caption text and timing.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use super::{
    clamp01, CaptionCase, CaptionQualityThresholds, CapitalizationReport, CoverageReport,
    DensityReport, DisplayTimeReport, PunctuationReport, RedundancyReport, RhythmReport,
    SegmentationReport,
};
use crate::captions::segmenter::OcrCaptionSegment;
use crate::sync::stats::{mean, population_std_dev};
use crate::text::tokenize;

/// Upper-case share at which a caption counts as ALL CAPS
const ALL_CAPS_RATIO: f64 = 0.8;

const MAX_PUNCTUATION_EXAMPLES: usize = 5;

/// Words that should not end a caption when the sentence continues
const DANGLING_WORDS: &[&str] = &[
    "and", "or", "but", "so", "yet", "nor", "because", "although", "though", "while", "if",
    "when", "that", "which",
];

/// Word endings that are not words on their own; a caption opening with one
/// continues a word split across captions
const SUFFIX_FRAGMENTS: &[&str] = &[
    "ible", "ibly", "tion", "tions", "sion", "sions", "ment", "ments", "ness", "ity", "ities",
    "ence", "ences", "ance", "ances", "ous", "ious", "ize", "ized", "izing", "ise", "ised",
    "ally", "ically", "ful", "fully", "ship", "hood", "ism", "ist", "ists", "ive", "ively",
    "ing", "ings", "ly",
];

fn repeated_punctuation() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"!{2,}|\?{2,}|\.{3,}|…").ok())
        .as_ref()
}

// =============================================================================
// Timing
// =============================================================================

/// Reading-speed stability and range
pub fn score_rhythm(
    segments: &[OcrCaptionSegment],
    thresholds: &CaptionQualityThresholds,
) -> RhythmReport {
    let rates: Vec<f64> = segments
        .iter()
        .filter(|segment| segment.duration_seconds > 0.0)
        .map(|segment| segment.word_count as f64 / segment.duration_seconds)
        .collect();
    if rates.is_empty() {
        return RhythmReport::default();
    }

    let mean_wps = mean(&rates);
    let wps_std_dev = population_std_dev(&rates);
    let stability = clamp01(1.0 - wps_std_dev / 2.0);

    let ideal_width = (thresholds.ideal_wps_max - thresholds.ideal_wps_min).max(f64::EPSILON);
    let ideal_distance = if mean_wps < thresholds.ideal_wps_min {
        thresholds.ideal_wps_min - mean_wps
    } else if mean_wps > thresholds.ideal_wps_max {
        mean_wps - thresholds.ideal_wps_max
    } else {
        0.0
    };
    let ideal_range_penalty = clamp01(1.0 - ideal_distance / ideal_width);

    let outside = rates
        .iter()
        .filter(|&&wps| wps < thresholds.absolute_wps_min || wps > thresholds.absolute_wps_max)
        .count();
    let absolute_range_penalty = clamp01(1.0 - outside as f64 / rates.len() as f64);

    RhythmReport {
        score: clamp01(stability * ideal_range_penalty * absolute_range_penalty),
        mean_wps,
        wps_std_dev,
        stability,
        ideal_range_penalty,
        absolute_range_penalty,
        segments_outside_absolute_range: outside,
    }
}

/// Flashes and over-long captions
pub fn score_display_time(
    segments: &[OcrCaptionSegment],
    thresholds: &CaptionQualityThresholds,
) -> DisplayTimeReport {
    if segments.is_empty() {
        return DisplayTimeReport::default();
    }

    let mut report = DisplayTimeReport::default();
    let mut scores = Vec::with_capacity(segments.len());

    for segment in segments {
        let duration = segment.duration_seconds;
        let score = if duration < thresholds.flash_duration_sec {
            report.flash_count += 1;
            0.0
        } else if duration < thresholds.min_display_sec {
            report.too_short_count += 1;
            let ramp = (thresholds.min_display_sec - thresholds.flash_duration_sec).max(f64::EPSILON);
            clamp01((duration - thresholds.flash_duration_sec) / ramp)
        } else if duration > thresholds.max_display_sec {
            report.too_long_count += 1;
            let span = thresholds.max_display_sec.max(f64::EPSILON);
            clamp01(1.0 - (duration - thresholds.max_display_sec) / span)
        } else {
            1.0
        };
        scores.push(score);
    }

    let durations: Vec<f64> = segments.iter().map(|s| s.duration_seconds).collect();
    report.mean_duration_sec = mean(&durations);
    report.score = clamp01(mean(&scores));
    report
}

/// Share of the video during which a caption is on screen
pub fn score_coverage(segments: &[OcrCaptionSegment], video_duration_seconds: f64) -> CoverageReport {
    let covered_seconds: f64 = segments.iter().map(|s| s.duration_seconds.max(0.0)).sum();
    let coverage_ratio = if video_duration_seconds > 0.0 {
        clamp01(covered_seconds / video_duration_seconds)
    } else {
        0.0
    };

    CoverageReport {
        score: coverage_ratio,
        covered_seconds,
        video_duration_seconds,
        coverage_ratio,
    }
}

// =============================================================================
// Layout of the text
// =============================================================================

/// Line-count and line-length overflow
pub fn score_density(
    segments: &[OcrCaptionSegment],
    thresholds: &CaptionQualityThresholds,
) -> DensityReport {
    if segments.is_empty() {
        return DensityReport::default();
    }

    let mut report = DensityReport::default();
    for segment in segments {
        let lines_over = segment.line_count > thresholds.max_lines;
        let chars_over = segment.max_chars_per_line > thresholds.max_chars_per_line;
        report.line_overflow_count += usize::from(lines_over);
        report.char_overflow_count += usize::from(chars_over);
        report.overflow_segment_count += usize::from(lines_over || chars_over);
        report.max_lines_observed = report.max_lines_observed.max(segment.line_count);
        report.max_chars_per_line_observed = report
            .max_chars_per_line_observed
            .max(segment.max_chars_per_line);
    }

    report.score = clamp01(1.0 - report.overflow_segment_count as f64 / segments.len() as f64);
    report
}

// =============================================================================
// Punctuation & case
// =============================================================================

fn ends_with_terminal(text: &str) -> bool {
    let trimmed = text
        .trim_end()
        .trim_end_matches(['"', '\'', '\u{201D}', '\u{2019}', ')']);
    trimmed.ends_with(['.', '!', '?', '\u{2026}'])
}

fn uppercase_share(text: &str) -> Option<f64> {
    let (letters, upper) = text
        .chars()
        .filter(|c| c.is_alphabetic())
        .fold((0usize, 0usize), |(letters, upper), c| {
            (letters + 1, upper + usize::from(c.is_uppercase()))
        });
    (letters > 0).then(|| upper as f64 / letters as f64)
}

fn first_letter(text: &str) -> Option<char> {
    text.chars().find(|c| c.is_alphabetic())
}

fn looks_like_sentence_start(text: &str) -> bool {
    let capitalized = first_letter(text).is_some_and(char::is_uppercase);
    let shouting = uppercase_share(text).is_some_and(|share| share >= ALL_CAPS_RATIO);
    capitalized && !shouting
}

/// Whether `text` carries on the previous caption's sentence
fn continues_sentence(text: &str) -> bool {
    let first_word = text
        .split_whitespace()
        .next()
        .map(|word| word.trim_start_matches(|c: char| !c.is_alphanumeric()))
        .unwrap_or_default();
    let pronoun_i = first_word == "I" || first_word.starts_with("I'");
    first_letter(text).is_some() && (pronoun_i || !looks_like_sentence_start(text))
}

/// Whether `next` opens with the tail of a word that `current` cut off
fn splits_word(current: &str, next: &str) -> bool {
    if !first_letter(next).is_some_and(char::is_lowercase) {
        return false;
    }
    if let Some(rest) = current.strip_suffix('-') {
        return rest.chars().last().is_some_and(char::is_alphabetic);
    }
    if !current.chars().last().is_some_and(char::is_alphabetic) {
        return false;
    }
    next.split_whitespace()
        .next()
        .map(|word| {
            word.chars()
                .filter(|c| c.is_alphabetic())
                .collect::<String>()
                .to_lowercase()
        })
        .is_some_and(|fragment| SUFFIX_FRAGMENTS.contains(&fragment.as_str()))
}

/// Missing sentence ends and repeated punctuation runs
pub fn score_punctuation(segments: &[OcrCaptionSegment]) -> PunctuationReport {
    if segments.is_empty() {
        return PunctuationReport::default();
    }

    let mut report = PunctuationReport::default();
    let note = |report: &mut PunctuationReport, example: String| {
        if report.examples.len() < MAX_PUNCTUATION_EXAMPLES {
            report.examples.push(example);
        }
    };

    for pair in segments.windows(2) {
        let (current, next) = (&pair[0], &pair[1]);
        if !ends_with_terminal(&current.text) && looks_like_sentence_start(&next.text) {
            report.missing_terminal_count += 1;
            note(
                &mut report,
                format!("missing terminal punctuation: \"{}\"", current.text.trim()),
            );
        }
    }

    if let Some(pattern) = repeated_punctuation() {
        for segment in segments {
            if pattern.is_match(&segment.text) {
                report.repeated_punctuation_count += 1;
                note(
                    &mut report,
                    format!("repeated punctuation: \"{}\"", segment.text.trim()),
                );
            }
        }
    }

    report.issue_count = report.missing_terminal_count + report.repeated_punctuation_count;
    report.score = clamp01(1.0 - report.issue_count as f64 / segments.len() as f64);
    report
}

/// Letter-case convention of a single caption, `None` without letters
pub fn classify_case(text: &str) -> Option<CaptionCase> {
    let share = uppercase_share(text)?;
    if share >= ALL_CAPS_RATIO {
        return Some(CaptionCase::AllCaps);
    }
    match first_letter(text) {
        Some(c) if c.is_uppercase() => Some(CaptionCase::SentenceCase),
        _ => Some(CaptionCase::Lowercase),
    }
}

/// Consistency with the dominant letter-case convention
pub fn score_capitalization(segments: &[OcrCaptionSegment]) -> CapitalizationReport {
    let styles: Vec<CaptionCase> = segments.iter().filter_map(|s| classify_case(&s.text)).collect();
    if styles.is_empty() {
        return CapitalizationReport {
            score: if segments.is_empty() { 0.0 } else { 1.0 },
            ..CapitalizationReport::default()
        };
    }

    let all_text: String = segments.iter().map(|s| s.text.as_str()).collect();
    let count = |style: CaptionCase| styles.iter().filter(|&&s| s == style).count();
    let (all_caps, sentence, lower) = (
        count(CaptionCase::AllCaps),
        count(CaptionCase::SentenceCase),
        count(CaptionCase::Lowercase),
    );

    let dominant_style = if uppercase_share(&all_text).is_some_and(|share| share >= ALL_CAPS_RATIO) {
        CaptionCase::AllCaps
    } else if sentence > lower {
        CaptionCase::SentenceCase
    } else if lower > sentence {
        CaptionCase::Lowercase
    } else {
        CaptionCase::Mixed
    };

    let deviation_count = match dominant_style {
        CaptionCase::Mixed => all_caps + sentence.min(lower),
        style => styles.len() - count(style),
    };

    CapitalizationReport {
        score: clamp01(1.0 - deviation_count as f64 / styles.len() as f64),
        dominant_style,
        deviation_count,
    }
}

// =============================================================================
// Chunking
// =============================================================================

fn shares_edge_tokens(previous: &[String], next: &[String], width: usize) -> bool {
    previous.len() >= width
        && next.len() >= width
        && previous[previous.len() - width..] == next[..width]
}

/// Repeated captions and overlapping adjacent chunks
pub fn score_redundancy(segments: &[OcrCaptionSegment]) -> RedundancyReport {
    if segments.is_empty() {
        return RedundancyReport::default();
    }

    let mut seen: HashSet<&str> = HashSet::new();
    let mut reappearance_count = 0;
    for (index, segment) in segments.iter().enumerate() {
        // Compare against everything before the immediate predecessor.
        if index >= 2 {
            seen.insert(segments[index - 2].normalized_text.as_str());
        }
        if !segment.normalized_text.is_empty() && seen.contains(segment.normalized_text.as_str()) {
            reappearance_count += 1;
        }
    }

    let tokens: Vec<Vec<String>> = segments.iter().map(|s| tokenize(&s.text)).collect();
    let adjacent_overlap_count = tokens
        .windows(2)
        .filter(|pair| (1..=2).rev().any(|width| shares_edge_tokens(&pair[0], &pair[1], width)))
        .count();

    let penalty = reappearance_count as f64 + 0.5 * adjacent_overlap_count as f64;
    RedundancyReport {
        score: clamp01(1.0 - penalty / segments.len() as f64),
        reappearance_count,
        adjacent_overlap_count,
    }
}

/// Captions that break a sentence at an awkward point
pub fn score_segmentation(segments: &[OcrCaptionSegment]) -> SegmentationReport {
    if segments.is_empty() {
        return SegmentationReport::default();
    }

    let mut report = SegmentationReport::default();
    for pair in segments.windows(2) {
        let (current, next) = (&pair[0], &pair[1]);
        let trimmed = current.text.trim_end();

        let dangling = !ends_with_terminal(trimmed)
            && continues_sentence(&next.text)
            && tokenize(trimmed)
                .last()
                .is_some_and(|last| DANGLING_WORDS.contains(&last.as_str()));

        let mid_word = splits_word(trimmed, next.text.trim_start());

        report.dangling_conjunction_count += usize::from(dangling);
        report.mid_word_break_count += usize::from(mid_word);
        report.issue_count += usize::from(dangling || mid_word);
    }

    report.score = clamp01(1.0 - report.issue_count as f64 / segments.len() as f64);
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::normalize_text;

    fn segment(text: &str, start: f64, duration: f64) -> OcrCaptionSegment {
        OcrCaptionSegment {
            text: text.to_string(),
            normalized_text: normalize_text(text),
            start_seconds: start,
            end_seconds: start + duration,
            duration_seconds: duration,
            word_count: text.split_whitespace().count(),
            line_count: text.lines().filter(|l| !l.trim().is_empty()).count(),
            max_chars_per_line: text.lines().map(|l| l.trim().chars().count()).max().unwrap_or(0),
            mean_confidence: 0.9,
            bbox: None,
            center: None,
            bbox_height_px: None,
            bbox_area_px: None,
        }
    }

    fn thresholds() -> CaptionQualityThresholds {
        CaptionQualityThresholds::default()
    }

    #[test]
    fn test_rhythm_steady_ideal_rate_scores_one() {
        let segments = vec![
            segment("one two three four five six", 0.0, 2.0),
            segment("one two three four five six", 2.0, 2.0),
        ];
        let report = score_rhythm(&segments, &thresholds());
        assert_eq!(report.mean_wps, 3.0);
        assert_eq!(report.score, 1.0);
    }

    #[test]
    fn test_rhythm_penalizes_fast_captions() {
        let segments = vec![segment("a b c d e f g h i j k l m n o p", 0.0, 1.0)];
        let report = score_rhythm(&segments, &thresholds());
        assert_eq!(report.segments_outside_absolute_range, 1);
        assert_eq!(report.score, 0.0);
    }

    #[test]
    fn test_display_time_flash_and_long() {
        let segments = vec![
            segment("Quick", 0.0, 0.25),
            segment("Fine caption", 1.0, 2.0),
            segment("Lingering caption", 3.0, 10.5),
        ];
        let report = score_display_time(&segments, &thresholds());
        assert_eq!(report.flash_count, 1);
        assert_eq!(report.too_long_count, 1);
        // (0 + 1 + 0.5) / 3
        assert!((report.score - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_coverage_ratio_clamped() {
        let segments = vec![segment("Hello there", 0.0, 6.0), segment("Again", 6.0, 6.0)];
        assert_eq!(score_coverage(&segments, 10.0).coverage_ratio, 1.0);
        assert_eq!(score_coverage(&segments, 24.0).coverage_ratio, 0.5);
        assert_eq!(score_coverage(&segments, 0.0).score, 0.0);
    }

    #[test]
    fn test_density_counts_line_and_char_overflow() {
        let long_line = "x".repeat(50);
        let segments = vec![
            segment("one\ntwo\nthree\nfour", 0.0, 2.0),
            segment(&long_line, 2.0, 2.0),
            segment("fine", 4.0, 2.0),
            segment("also fine", 6.0, 2.0),
        ];
        let report = score_density(&segments, &thresholds());
        assert_eq!(report.line_overflow_count, 1);
        assert_eq!(report.char_overflow_count, 1);
        assert_eq!(report.overflow_segment_count, 2);
        assert_eq!(report.score, 0.5);
    }

    #[test]
    fn test_punctuation_missing_terminal_and_repeats() {
        let segments = vec![
            segment("This sentence never ends", 0.0, 2.0),
            segment("Another one starts here.", 2.0, 2.0),
            segment("Wow!!", 4.0, 2.0),
            segment("and it keeps going.", 6.0, 2.0),
        ];
        let report = score_punctuation(&segments);
        assert_eq!(report.missing_terminal_count, 1);
        assert_eq!(report.repeated_punctuation_count, 1);
        assert_eq!(report.issue_count, 2);
        assert_eq!(report.score, 0.5);
        assert_eq!(report.examples.len(), 2);
    }

    #[test]
    fn test_shouted_next_caption_is_not_a_sentence_start() {
        let segments = vec![segment("we keep going", 0.0, 2.0), segment("RIGHT NOW", 2.0, 2.0)];
        assert_eq!(score_punctuation(&segments).missing_terminal_count, 0);
    }

    #[test]
    fn test_classify_case() {
        assert_eq!(classify_case("HELLO THERE"), Some(CaptionCase::AllCaps));
        assert_eq!(classify_case("Hello there"), Some(CaptionCase::SentenceCase));
        assert_eq!(classify_case("hello there"), Some(CaptionCase::Lowercase));
        assert_eq!(classify_case("1234"), None);
    }

    #[test]
    fn test_capitalization_deviation_from_sentence_case() {
        let segments = vec![
            segment("Hello there.", 0.0, 2.0),
            segment("How are you?", 2.0, 2.0),
            segment("Fine thanks.", 4.0, 2.0),
            segment("SHOUTING NOW", 6.0, 2.0),
        ];
        let report = score_capitalization(&segments);
        assert_eq!(report.dominant_style, CaptionCase::SentenceCase);
        assert_eq!(report.deviation_count, 1);
        assert_eq!(report.score, 0.75);
    }

    #[test]
    fn test_capitalization_all_caps_dominant() {
        let segments = vec![segment("ALL CAPS HERE", 0.0, 2.0), segment("AND HERE", 2.0, 2.0)];
        let report = score_capitalization(&segments);
        assert_eq!(report.dominant_style, CaptionCase::AllCaps);
        assert_eq!(report.score, 1.0);
    }

    #[test]
    fn test_redundancy_reappearance_and_overlap() {
        let segments = vec![
            segment("follow for more", 0.0, 2.0),
            segment("tips every day", 2.0, 2.0),
            segment("follow for more", 4.0, 2.0),
            segment("more videos soon", 6.0, 2.0),
        ];
        let report = score_redundancy(&segments);
        assert_eq!(report.reappearance_count, 1);
        assert_eq!(report.adjacent_overlap_count, 1);
        assert!((report.score - (1.0 - 1.5 / 4.0)).abs() < 1e-9);
    }

    #[test]
    fn test_segmentation_dangling_and_mid_word() {
        let segments = vec![
            segment("I went to the store and", 0.0, 2.0),
            segment("bought some incred-", 2.0, 2.0),
            segment("ible snacks.", 4.0, 2.0),
            segment("The end.", 6.0, 2.0),
        ];
        let report = score_segmentation(&segments);
        assert_eq!(report.dangling_conjunction_count, 1);
        assert_eq!(report.mid_word_break_count, 1);
        assert_eq!(report.score, 0.5);
    }

    #[test]
    fn test_segmentation_word_split_without_hyphen() {
        let segments = vec![
            segment("I bought some incred", 0.0, 2.0),
            segment("ible snacks today.", 2.0, 2.0),
        ];
        let report = score_segmentation(&segments);
        assert_eq!(report.mid_word_break_count, 1);
        assert_eq!(report.issue_count, 1);
        assert_eq!(report.score, 0.5);
    }

    #[test]
    fn test_segmentation_ordinary_continuation_is_not_a_split() {
        let segments = vec![
            segment("I want to", 0.0, 2.0),
            segment("mention something", 2.0, 2.0),
            segment("We are", 4.0, 2.0),
            segment("living here.", 6.0, 2.0),
        ];
        let report = score_segmentation(&segments);
        assert_eq!(report.mid_word_break_count, 0);
        assert_eq!(report.score, 1.0);
    }

    #[test]
    fn test_dangling_conjunction_needs_a_continuation() {
        let before_new_sentence = vec![segment("I like cats and", 0.0, 2.0), segment("The end.", 2.0, 2.0)];
        assert_eq!(score_segmentation(&before_new_sentence).dangling_conjunction_count, 0);

        let before_pronoun = vec![segment("Cats are fine but", 0.0, 2.0), segment("I prefer dogs.", 2.0, 2.0)];
        assert_eq!(score_segmentation(&before_pronoun).dangling_conjunction_count, 1);
    }

    #[test]
    fn test_empty_segment_list_scores_zero() {
        assert_eq!(score_density(&[], &thresholds()).score, 0.0);
        assert_eq!(score_punctuation(&[]).score, 0.0);
        assert_eq!(score_capitalization(&[]).score, 0.0);
    }
}
