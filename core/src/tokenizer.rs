use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref WORD: Regex = Regex::new(r"(?u)\p{L}[\p{L}\p{N}_']*|\p{N}+").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
    static ref STOPWORDS: HashSet<&'static str> = [
        "a", "about", "after", "all", "also", "an", "and", "any", "are", "as", "at",
        "be", "because", "been", "but", "by", "can", "could", "did", "do", "does",
        "for", "from", "had", "has", "have", "he", "her", "his", "how", "i", "if",
        "in", "into", "is", "it", "it's", "its", "me", "more", "my", "no", "not",
        "of", "on", "or", "other", "our", "she", "so", "some", "such", "than",
        "that", "the", "their", "them", "then", "there", "these", "they", "this",
        "those", "to", "too", "was", "we", "were", "what", "when", "where", "which",
        "while", "who", "why", "will", "with", "would", "you", "your",
    ]
    .into_iter()
    .collect();
}

pub fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(token)
}

/// Tokenize text into (term, position) pairs.
///
/// Text is NFKC-normalized and lowercased; stopwords are dropped (their
/// positions are still consumed) and the rest are stemmed with the English
/// Snowball stemmer. Documents and queries go through the same pipeline so
/// their terms line up in the dictionary.
pub fn tokenize(text: &str) -> Vec<(String, usize)> {
    let normalized = text.nfkc().collect::<String>().to_lowercase();
    WORD.find_iter(&normalized)
        .enumerate()
        .filter(|(_, m)| !is_stopword(m.as_str()))
        .map(|(pos, m)| (STEMMER.stem(m.as_str()).into_owned(), pos))
        .collect()
}

/// Normalized terms without positions.
pub fn terms(text: &str) -> Vec<String> {
    tokenize(text).into_iter().map(|(t, _)| t).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stems_and_keeps_positions() {
        let t = tokenize("the running dogs");
        assert_eq!(t, vec![("run".to_string(), 1), ("dog".to_string(), 2)]);
    }

    #[test]
    fn numbers_are_terms() {
        assert!(terms("released in 2024").contains(&"2024".to_string()));
    }
}
