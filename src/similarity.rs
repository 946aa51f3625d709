//! String normalization and edit-distance similarity shared by the matchers.

use regex::Regex;
use std::sync::LazyLock;

static PUNCTUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s]").expect("punctuation pattern is valid"));

static NON_DIGIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^0-9]").expect("non-digit pattern is valid"));

/// Lowercased, punctuation stripped, whitespace collapsed. `None` when nothing
/// is left.
pub fn normalize_name(value: &str) -> Option<String> {
    let lowered = value.trim().to_lowercase();
    let stripped = PUNCTUATION.replace_all(&lowered, "");
    let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}

/// Trimmed and lowercased. `None` for blank input.
pub fn normalize_email(value: &str) -> Option<String> {
    let normalized = value.trim().to_lowercase();
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

/// ASCII digits only. `None` when the value has no digits at all.
pub fn phone_digits(value: &str) -> Option<String> {
    let digits = NON_DIGIT.replace_all(value, "").into_owned();
    if digits.is_empty() {
        None
    } else {
        Some(digits)
    }
}

/// `1 - levenshtein(a, b) / max(len(a), len(b))`, over characters.
pub fn levenshtein_ratio(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    let distance = strsim::levenshtein(a, b);
    1.0 - (distance as f64 / max_len as f64)
}

/// Similarity of two raw strings after [`normalize_name`].
///
/// Returns the ratio and whether it reaches `threshold`. Either side
/// normalizing to nothing scores `0.0`.
pub fn fuzzy_match_score(a: &str, b: &str, threshold: f64) -> (f64, bool) {
    let (Some(left), Some(right)) = (normalize_name(a), normalize_name(b)) else {
        return (0.0, false);
    };

    if left == right {
        return (1.0, true);
    }

    let score = levenshtein_ratio(&left, &right);
    (score, score >= threshold)
}
