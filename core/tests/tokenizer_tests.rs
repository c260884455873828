use linkrank_core::query::Query;
use linkrank_core::tokenizer::{terms, tokenize};

#[test]
fn it_normalizes_and_stems() {
    let words = terms("Running Runners RUN! The café's menu.");
    assert!(words.contains(&"run".to_string()));
    // NFKC keeps the accent; lowercase and stemming still apply
    assert!(words.iter().any(|w| w.starts_with("caf")));
}

#[test]
fn it_filters_stopwords_but_keeps_positions() {
    let toks = tokenize("The quick brown fox and the lazy dog");
    let words: Vec<&str> = toks.iter().map(|(w, _)| w.as_str()).collect();
    assert!(!words.contains(&"the"));
    assert!(!words.contains(&"and"));
    assert_eq!(toks.first().map(|(_, p)| *p), Some(1));
}

#[test]
fn queries_and_documents_share_normalization() {
    let q = Query::parse("Cats running");
    let doc = terms("A cat was running home");
    for t in q.tokens() {
        assert!(doc.contains(t), "{t} missing from document terms");
    }
}
