//! Analysis chain shared by indexing and querying
//!
//! A word becomes a term after possessive stripping, lowercasing and removal
//! of non-alphanumerics; terms under two characters and stopwords are
//! dropped. Every term keeps the word position it had before dropping, so
//! phrase matching sees the gaps left by removed words.

use std::collections::HashSet;
use unicode_segmentation::UnicodeSegmentation;

/// Lucene's English stopword set
const STOPWORDS: [&str; 33] = [
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "if", "in", "into", "is", "it",
    "no", "not", "of", "on", "or", "such", "that", "the", "their", "then", "there", "these",
    "they", "this", "to", "was", "will", "with",
];

/// A term and the word position it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Normalized term
    pub term: String,
    /// Zero-based word position in the source text
    pub position: u32,
}

fn to_term(word: &str) -> Option<String> {
    let lower = word.to_lowercase();
    let base = lower
        .strip_suffix("'s")
        .or_else(|| lower.strip_suffix("\u{2019}s"))
        .unwrap_or(lower.as_str());
    let term: String = base.chars().filter(|c| c.is_alphanumeric()).collect();
    (term.chars().count() >= 2 && !STOPWORDS.contains(&term.as_str())).then_some(term)
}

/// Terms of `text` with their word positions
///
/// ```
/// use quiver_engine::search::tokenizer::analyze;
///
/// let tokens = analyze("The Fox's den");
/// assert_eq!(tokens[0].term, "fox");
/// assert_eq!(tokens[1].position, 2);
/// ```
pub fn analyze(text: &str) -> Vec<Token> {
    text.unicode_words()
        .enumerate()
        .filter_map(|(position, word)| {
            to_term(word).map(|term| Token {
                term,
                position: position as u32,
            })
        })
        .collect()
}

/// Terms of `text` in order
pub fn tokenize(text: &str) -> Vec<String> {
    analyze(text).into_iter().map(|t| t.term).collect()
}

/// Distinct terms of `text`, first occurrence wins
pub fn tokenize_unique(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    tokenize(text)
        .into_iter()
        .filter(|t| seen.insert(t.clone()))
        .collect()
}
