//! Approximate string matching between extracted block text and edit
//! requests.
//!
//! Extraction and AI-generated suggestions rarely agree byte-for-byte, so
//! equality is judged after normalization, with a word-set similarity score
//! as the last resort. All functions here are total.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

/// Word-set Jaccard similarity strictly above this value counts as a match.
const JACCARD_THRESHOLD: f32 = 0.70;

/// Normalize text for comparison: trim, collapse internal whitespace runs to
/// a single space, lowercase.
pub fn normalize(text: &str) -> String {
    static RE_WS: OnceLock<Regex> = OnceLock::new();
    let re = RE_WS.get_or_init(|| Regex::new(r"\s+").unwrap());
    re.replace_all(text.trim(), " ").to_lowercase()
}

/// Jaccard similarity of the two strings' word sets (whitespace-split,
/// deduplicated): |intersection| / |union|.
///
/// Identical strings score 1.0 through an explicit early branch. This
/// matters for inputs whose word split is empty (empty strings, pure
/// whitespace), where the generic formula would be undefined; with one empty
/// operand the similarity is 0.
pub fn jaccard_similarity(a: &str, b: &str) -> f32 {
    if a == b {
        return 1.0;
    }

    let words_a: HashSet<&str> = a.split_whitespace().collect();
    let words_b: HashSet<&str> = b.split_whitespace().collect();
    if words_a.is_empty() || words_b.is_empty() {
        return 0.0;
    }

    let intersection = words_a.intersection(&words_b).count();
    let union = words_a.union(&words_b).count();
    intersection as f32 / union as f32
}

/// Whether two fragments refer to the same text, allowing for spacing and
/// case differences, truncation on either side, and minor rewording.
///
/// Succeeds when either normalized operand contains the other, or when the
/// word-set Jaccard similarity exceeds [`JACCARD_THRESHOLD`].
pub fn fuzzy_match(a: &str, b: &str) -> bool {
    let a = normalize(a);
    let b = normalize(b);

    if a.contains(&b) || b.contains(&a) {
        return true;
    }

    jaccard_similarity(&a, &b) > JACCARD_THRESHOLD
}
