//! String utilities for the domain layer.

use std::collections::BTreeSet;

/// Words too common to carry meaning when comparing answers or goals.
const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "in", "is", "it", "of", "on",
    "or", "that", "the", "this", "to", "was", "with",
];

/// Truncate a string to a maximum length with ellipsis (UTF-8 safe)
///
/// Uses byte length for max_len but ensures truncation occurs at valid
/// UTF-8 character boundaries.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        let target = max_len.saturating_sub(3);
        let mut end = target.min(s.len());
        while end > 0 && !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &s[..end])
    }
}

/// Lowercase, replace punctuation with spaces and collapse whitespace.
pub fn normalize(s: &str) -> String {
    let cleaned: String = s
        .chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                ' '
            }
        })
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Set of meaningful words in `s` (normalized, stopwords removed).
pub fn keywords(s: &str) -> BTreeSet<String> {
    normalize(s)
        .split(' ')
        .filter(|w| !w.is_empty() && !STOPWORDS.contains(w))
        .map(str::to_string)
        .collect()
}

/// Jaccard similarity of two keyword sets. Two empty sets are identical.
pub fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    intersection as f64 / union as f64
}

/// Fraction of `reference` keywords that also appear in `candidate`.
///
/// Returns 0.0 when `reference` has no keywords.
pub fn coverage(reference: &BTreeSet<String>, candidate: &BTreeSet<String>) -> f64 {
    if reference.is_empty() {
        return 0.0;
    }
    reference.intersection(candidate).count() as f64 / reference.len() as f64
}

/// Rough token estimate for budget accounting.
pub fn estimate_tokens(s: &str, chars_per_token: usize) -> u64 {
    let per = chars_per_token.max(1);
    s.chars().count().div_ceil(per) as u64
}
