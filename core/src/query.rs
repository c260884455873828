use std::collections::HashMap;

use crate::tokenizer;

/// A query as an ordered sequence of normalized tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    raw: String,
    tokens: Vec<String>,
}

impl Query {
    /// Normalize raw user input with the document tokenizer.
    pub fn parse(raw: &str) -> Self {
        Self { raw: raw.to_string(), tokens: tokenizer::terms(raw) }
    }

    /// Wrap tokens that are already normalized.
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tokens: Vec<String> = tokens.into_iter().map(Into::into).collect();
        Self { raw: tokens.join(" "), tokens }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Distinct tokens in first-occurrence order.
    pub fn distinct_terms(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::with_capacity(self.tokens.len());
        for t in &self.tokens {
            if !out.contains(&t.as_str()) {
                out.push(t);
            }
        }
        out
    }

    /// Distinct tokens with their query frequency, in first-occurrence order.
    pub fn term_counts(&self) -> Vec<(&str, u32)> {
        let mut counts: HashMap<&str, u32> = HashMap::new();
        for t in &self.tokens {
            *counts.entry(t).or_insert(0) += 1;
        }
        self.distinct_terms().into_iter().map(|t| (t, counts[t])).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distinct_keeps_first_occurrence_order() {
        let q = Query::from_tokens(["b", "a", "b", "c", "a"]);
        assert_eq!(q.distinct_terms(), vec!["b", "a", "c"]);
        assert_eq!(q.term_counts(), vec![("b", 2), ("a", 2), ("c", 1)]);
    }

    #[test]
    fn stopword_only_query_is_empty() {
        assert!(Query::parse("the of and").is_empty());
        assert_eq!(Query::parse("Cats!").tokens(), &["cat".to_string()]);
    }
}
