//! Text Normalization Module
//!
//! Case/whitespace/punctuation normalization, tokenization and fuzzy
//! similarity shared by the word matcher and the caption segmenter.
//!
//! All comparisons operate on normalized text: lower-cased, restricted to
//! `[a-z0-9']` plus single spaces.

use std::collections::HashSet;

// =============================================================================
// Constants
// =============================================================================

/// Tokens shorter than this are too ambiguous to match
pub const MIN_TOKEN_LEN: usize = 2;

/// Edit-distance cutoff; distances above it are reported as `MAX_EDIT_DISTANCE + 1`
pub const MAX_EDIT_DISTANCE: usize = 6;

/// Token-overlap ratio at or above which two strings are similar
pub const TOKEN_OVERLAP_THRESHOLD: f64 = 0.8;

/// Edit distance at or below which two strings are always similar
pub const CLOSE_EDIT_DISTANCE: usize = 2;

/// Normalized similarity required when the distance is within the cutoff
pub const NORMALIZED_SIMILARITY_THRESHOLD: f64 = 0.88;

// =============================================================================
// Normalization
// =============================================================================

/// Lower-cases, strips characters outside `[a-z0-9']` and collapses whitespace.
pub fn normalize_text(text: &str) -> String {
    let mut normalized = String::with_capacity(text.len());
    let mut pending_space = false;

    for character in text.chars().flat_map(char::to_lowercase) {
        if character.is_whitespace() {
            pending_space = !normalized.is_empty();
            continue;
        }
        if !(character.is_ascii_lowercase() || character.is_ascii_digit() || character == '\'') {
            continue;
        }
        if pending_space {
            normalized.push(' ');
            pending_space = false;
        }
        normalized.push(character);
    }

    normalized
}

/// Normalized whitespace tokens
pub fn tokenize(text: &str) -> Vec<String> {
    normalize_text(text)
        .split(' ')
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// Normalized tokens long enough to take part in word matching
pub fn match_tokens(text: &str) -> Vec<String> {
    tokenize(text)
        .into_iter()
        .filter(|token| token.chars().count() >= MIN_TOKEN_LEN)
        .collect()
}

// =============================================================================
// Similarity
// =============================================================================

/// |intersection| / max(|tokens a|, |tokens b|) over distinct tokens.
pub fn token_overlap_ratio(a: &str, b: &str) -> f64 {
    let left: HashSet<&str> = a.split_whitespace().collect();
    let right: HashSet<&str> = b.split_whitespace().collect();
    let denominator = left.len().max(right.len());
    if denominator == 0 {
        return 0.0;
    }
    left.intersection(&right).count() as f64 / denominator as f64
}

/// Levenshtein distance with an early exit.
///
/// Returns `max_distance + 1` as soon as the answer is known to exceed
/// `max_distance`: when the length difference alone is larger, or when every
/// cell of the current DP row is.
pub fn bounded_levenshtein(a: &str, b: &str, max_distance: usize) -> usize {
    if a == b {
        return 0;
    }

    let left: Vec<char> = a.chars().collect();
    let right: Vec<char> = b.chars().collect();

    if left.len().abs_diff(right.len()) > max_distance {
        return max_distance + 1;
    }
    if left.is_empty() {
        return right.len();
    }
    if right.is_empty() {
        return left.len();
    }

    let mut previous: Vec<usize> = (0..=right.len()).collect();
    let mut current = vec![0usize; right.len() + 1];

    for (i, left_char) in left.iter().enumerate() {
        current[0] = i + 1;
        let mut row_min = current[0];

        for (j, right_char) in right.iter().enumerate() {
            let substitution = previous[j] + usize::from(left_char != right_char);
            let insertion = current[j] + 1;
            let deletion = previous[j + 1] + 1;
            current[j + 1] = substitution.min(insertion).min(deletion);
            row_min = row_min.min(current[j + 1]);
        }

        if row_min > max_distance {
            return max_distance + 1;
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[right.len()].min(max_distance + 1)
}

/// 1 - distance / max length
pub fn normalized_similarity(distance: usize, a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - distance as f64 / max_len as f64
}

/// Whether two already-normalized strings denote the same caption or word.
///
/// Similar when the token overlap is at least 0.8, the edit distance is at
/// most 2, or the edit distance is within the cutoff with a normalized
/// similarity of at least 0.88. An empty string is only similar to another
/// empty string.
pub fn is_similar(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    if a.is_empty() || b.is_empty() {
        return false;
    }
    if token_overlap_ratio(a, b) >= TOKEN_OVERLAP_THRESHOLD {
        return true;
    }

    let distance = bounded_levenshtein(a, b, MAX_EDIT_DISTANCE);
    if distance <= CLOSE_EDIT_DISTANCE {
        return true;
    }
    distance <= MAX_EDIT_DISTANCE
        && normalized_similarity(distance, a, b) >= NORMALIZED_SIMILARITY_THRESHOLD
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_punctuation_and_case() {
        assert_eq!(normalize_text("Hello, World!"), "hello world");
        assert_eq!(normalize_text("  DON'T   stop\n\nNow. "), "don't stop now");
        assert_eq!(normalize_text("twenty-five"), "twentyfive");
        assert_eq!(normalize_text("!!!"), "");
    }

    #[test]
    fn test_match_tokens_drops_short_tokens() {
        assert_eq!(match_tokens("I saw a cat"), vec!["saw", "cat"]);
        assert!(match_tokens("a b c").is_empty());
    }

    #[test]
    fn test_levenshtein_identity_is_zero() {
        assert_eq!(bounded_levenshtein("caption", "caption", MAX_EDIT_DISTANCE), 0);
        assert_eq!(bounded_levenshtein("", "", MAX_EDIT_DISTANCE), 0);
    }

    #[test]
    fn test_levenshtein_known_distances() {
        assert_eq!(bounded_levenshtein("kitten", "sitting", MAX_EDIT_DISTANCE), 3);
        assert_eq!(bounded_levenshtein("flaw", "lawn", MAX_EDIT_DISTANCE), 2);
        assert_eq!(bounded_levenshtein("", "abc", MAX_EDIT_DISTANCE), 3);
    }

    #[test]
    fn test_levenshtein_short_circuits_on_length_difference() {
        let short = "ab";
        let long = "abcdefghijklmnop";
        assert_eq!(bounded_levenshtein(short, long, 6), 7);
        assert_eq!(bounded_levenshtein(short, long, 2), 3);
    }

    #[test]
    fn test_levenshtein_short_circuits_on_row_minimum() {
        // Same length, every character differs.
        assert_eq!(bounded_levenshtein("aaaaaaaaaa", "bbbbbbbbbb", 3), 4);
    }

    #[test]
    fn test_token_overlap_ratio() {
        assert_eq!(token_overlap_ratio("the quick fox", "the quick fox"), 1.0);
        assert!((token_overlap_ratio("the quick brown fox", "the quick fox") - 0.75).abs() < 1e-9);
        assert_eq!(token_overlap_ratio("", ""), 0.0);
    }

    #[test]
    fn test_is_similar_rules() {
        assert!(is_similar("hello world", "hello world"));
        assert!(is_similar("hello world", "helo world"));
        assert!(is_similar(
            "this is a long caption line",
            "this is a lung captian lime"
        ));
        assert!(!is_similar("hello world", "goodbye moon"));
        assert!(!is_similar("", "ab"));
        assert!(is_similar("", ""));
    }
}
