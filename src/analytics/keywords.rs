//! Keyword extraction from observation text

use std::collections::HashSet;

use crate::models::Observation;

/// Words too common to carry a product signal
pub const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by", "is",
    "are", "was", "were", "be", "been", "being", "have", "has", "had", "do", "does", "did", "will",
    "would", "could", "should", "may", "might", "can", "this", "that", "these", "those", "i",
    "you", "he", "she", "it", "we", "they", "me", "him", "her", "us", "them", "my", "your", "his",
    "its", "our", "their",
];

fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.contains(&word)
}

/// Split text into candidate keywords
///
/// Lowercases, splits on whitespace, strips non-alphanumeric characters and keeps
/// tokens longer than two characters that are neither stop words nor pure numbers.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split_whitespace()
        .filter_map(|word| {
            let clean: String = word.chars().filter(|c| c.is_alphanumeric()).collect();
            let keep = clean.chars().count() > 2
                && !is_stop_word(&clean)
                && !clean.chars().all(|c| c.is_ascii_digit());
            keep.then_some(clean)
        })
        .collect()
}

/// Tokens from every observation's keyword and context text, in input order
pub fn extract_keywords(observations: &[Observation]) -> Vec<String> {
    let mut keywords = Vec::new();
    for obs in observations {
        keywords.extend(tokenize(&obs.keyword));
        if let Some(text) = &obs.text {
            keywords.extend(tokenize(text));
        }
    }
    keywords
}

/// Jaccard similarity of the token sets of two texts
pub fn jaccard_similarity(a: &str, b: &str) -> f64 {
    let left: HashSet<String> = tokenize(a).into_iter().collect();
    let right: HashSet<String> = tokenize(b).into_iter().collect();

    if left.is_empty() || right.is_empty() {
        return 0.0;
    }

    let intersection = left.intersection(&right).count();
    let union = left.union(&right).count();
    intersection as f64 / union as f64
}
