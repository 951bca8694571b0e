//! Word splitting and word-start counting.
//!
//! A word is a maximal run of Unicode letters (general category L), numbers (N), apostrophes
//! (`'` or `’`) or hyphens. Everything else separates words, including combining marks and
//! letter-like symbols such as `Ⓐ`.

use once_cell::sync::Lazy;
use regex::Regex;
use wordbloom_core::TextStats;

static WORD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\p{L}\p{N}'’\-]+").expect("word pattern compiles"));

/// Split `text` into words, in order. Empty input yields no words.
pub fn tokenize(text: &str) -> Vec<&str> {
    WORD_RE.find_iter(text).map(|m| m.as_str()).collect()
}

/// Count words whose first character, lowercased, equals `target` lowercased.
///
/// An empty `target` matches nothing.
pub fn count_starts_with(words: &[&str], target: &str) -> usize {
    if target.is_empty() {
        return 0;
    }
    let target_lc = target.to_lowercase();
    words
        .iter()
        .filter(|w| {
            w.chars()
                .next()
                .is_some_and(|first| first.to_lowercase().eq(target_lc.chars()))
        })
        .count()
}

pub fn text_stats(text: &str, target: &str) -> TextStats {
    let words = tokenize(text);
    TextStats {
        total_words: words.len(),
        starts_with_count: count_starts_with(&words, target),
    }
}
