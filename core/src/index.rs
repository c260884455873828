use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::corpus::{extract_text, Corpus};
use crate::cursor::{CorpusStatistics, DocumentView, PostingsCursor};
use crate::error::Result;
use crate::persist::{self, IndexPaths};
use crate::tokenizer::terms;

pub type TermId = u32;
pub type DocId = u32;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocMeta {
    /// Corpus file name; links resolve against this.
    pub name: String,
    pub title: String,
    /// Token count after normalization.
    pub length: u32,
    /// L2 norm of the tf-idf vector, 1.0 when the document has no weighted terms.
    pub norm: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    pub tf: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermStats {
    /// Number of documents containing the term.
    pub df: u32,
    /// Occurrences of the term across the whole corpus.
    pub cf: u64,
}

/// Postings index keyed by dense term and document ids.
#[derive(Debug, Default, Clone)]
pub struct InvertedIndex {
    pub dictionary: HashMap<String, TermId>,
    pub stats: Vec<TermStats>,
    pub postings: Vec<Vec<Posting>>, // indexed by term id, sorted by doc_id
    pub docs: Vec<DocMeta>,          // indexed by doc id
    pub total_tokens: u64,
}

impl InvertedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num_docs(&self) -> u32 {
        self.docs.len() as u32
    }

    pub fn num_terms(&self) -> usize {
        self.dictionary.len()
    }

    pub fn term_id(&self, term: &str) -> Option<TermId> {
        self.dictionary.get(term).copied()
    }

    pub fn term_stats(&self, term: &str) -> TermStats {
        self.term_id(term)
            .and_then(|tid| self.stats.get(tid as usize).copied())
            .unwrap_or_default()
    }

    pub fn postings_for(&self, term: &str) -> &[Posting] {
        self.term_id(term)
            .and_then(|tid| self.postings.get(tid as usize))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn doc(&self, doc_id: DocId) -> Option<&DocMeta> {
        self.docs.get(doc_id as usize)
    }

    /// A fresh cursor over the postings of `terms`. Unknown terms contribute nothing.
    pub fn cursor<S: AsRef<str>>(&self, terms: &[S]) -> PostingsCursor<'_> {
        PostingsCursor::new(terms.iter().map(|t| self.postings_for(t.as_ref())).collect())
    }
}

impl CorpusStatistics for InvertedIndex {
    fn num_docs(&self) -> u32 {
        InvertedIndex::num_docs(self)
    }

    fn total_tokens(&self) -> u64 {
        self.total_tokens
    }

    fn corpus_frequency(&self, term: &str) -> u64 {
        self.term_stats(term).cf
    }

    fn document_frequency(&self, term: &str) -> u32 {
        self.term_stats(term).df
    }
}

impl DocumentView for InvertedIndex {
    fn document_length(&self, doc_id: DocId) -> u32 {
        self.doc(doc_id).map_or(0, |d| d.length)
    }

    fn term_frequency(&self, doc_id: DocId, term: &str) -> u32 {
        let plist = self.postings_for(term);
        plist
            .binary_search_by_key(&doc_id, |p| p.doc_id)
            .map_or(0, |i| plist[i].tf)
    }
}

/// `ln(N / df)`; zero for terms that occur nowhere.
pub fn idf(num_docs: u32, df: u32) -> f64 {
    if df == 0 {
        return 0.0;
    }
    (num_docs.max(1) as f64 / df as f64).ln()
}

/// Sublinear term-frequency weight `1 + ln(tf)`.
pub fn log_tf(tf: u32) -> f64 {
    if tf > 0 { 1.0 + (tf as f64).ln() } else { 0.0 }
}

/// Accumulates documents in id order and produces an [`InvertedIndex`].
#[derive(Debug, Default)]
pub struct IndexBuilder {
    index: InvertedIndex,
}

impl IndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the next document. Ids are handed out in call order, so callers
    /// must feed documents in corpus order.
    pub fn add_document<I, S>(&mut self, name: &str, title: &str, tokens: I) -> DocId
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let idx = &mut self.index;
        let doc_id = idx.docs.len() as DocId;

        let mut length = 0u32;
        let mut tf_counts: HashMap<TermId, u32> = HashMap::new();
        for term in tokens {
            length += 1;
            let next_id = idx.dictionary.len() as TermId;
            let tid = *idx.dictionary.entry(term.into()).or_insert(next_id);
            if tid == next_id {
                idx.stats.push(TermStats::default());
                idx.postings.push(Vec::new());
            }
            *tf_counts.entry(tid).or_insert(0) += 1;
        }

        for (tid, tf) in tf_counts {
            let stats = &mut idx.stats[tid as usize];
            stats.df += 1;
            stats.cf += tf as u64;
            idx.postings[tid as usize].push(Posting { doc_id, tf });
        }

        idx.total_tokens += length as u64;
        idx.docs.push(DocMeta { name: name.to_string(), title: title.to_string(), length, norm: 1.0 });
        doc_id
    }

    pub fn num_docs(&self) -> u32 {
        self.index.num_docs()
    }

    /// Sort postings and compute the per-document tf-idf norms.
    pub fn finish(mut self) -> InvertedIndex {
        let idx = &mut self.index;
        let n = idx.num_docs();
        let mut sq_norms = vec![0.0f64; idx.docs.len()];
        for (plist, stats) in idx.postings.iter_mut().zip(&idx.stats) {
            plist.sort_by_key(|p| p.doc_id);
            let w_idf = idf(n, stats.df);
            for p in plist.iter() {
                let w = log_tf(p.tf) * w_idf;
                sq_norms[p.doc_id as usize] += w * w;
            }
        }
        for (doc, sq) in idx.docs.iter_mut().zip(sq_norms) {
            doc.norm = if sq > 0.0 { sq.sqrt() } else { 1.0 };
        }
        tracing::debug!(num_docs = n, num_terms = idx.num_terms(), total_tokens = idx.total_tokens, "index finished");
        self.index
    }
}

/// The `index` stage: tokenize every document's title and body into a
/// postings index and persist it under `paths`.
///
/// Ids follow the numbering recorded by `mine` in `corpus.bin`, so postings
/// and ranks line up. A corpus that changed since then is a
/// `MalformedArtifact`. Without a recorded numbering this stage records its own.
pub fn index_corpus<P: AsRef<Path>>(corpus_dir: P, paths: &IndexPaths, created_at: String) -> Result<InvertedIndex> {
    let corpus = Corpus::open(corpus_dir)?;
    match persist::load_corpus(paths) {
        Ok(recorded) => corpus.ensure_matches(&recorded, &paths.corpus())?,
        Err(e) if e.is_missing_artifact() => persist::save_corpus(paths, &corpus.names())?,
        Err(e) => return Err(e),
    }

    let mut builder = IndexBuilder::new();
    for doc in corpus.documents() {
        let content = corpus.read(doc)?;
        let (title, body) = extract_text(&content);
        let title = title.unwrap_or_else(|| doc.name.clone());
        let mut tokens = terms(&title);
        tokens.extend(terms(&body));
        builder.add_document(&doc.name, &title, tokens);
    }
    let index = builder.finish();
    tracing::info!(num_docs = index.num_docs(), num_terms = index.num_terms(), "ingested documents");

    persist::save_index(paths, &index, created_at)?;
    tracing::info!(path = %paths.meta().display(), "stored postings index");
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_tracks_frequencies() {
        let mut b = IndexBuilder::new();
        b.add_document("a.html", "A", ["cat", "dog", "cat"]);
        b.add_document("b.html", "B", ["dog"]);
        let idx = b.finish();

        assert_eq!(idx.num_docs(), 2);
        assert_eq!(idx.total_tokens, 4);
        assert_eq!(idx.corpus_frequency("cat"), 2);
        assert_eq!(idx.document_frequency("dog"), 2);
        assert_eq!(idx.term_frequency(0, "cat"), 2);
        assert_eq!(idx.term_frequency(1, "cat"), 0);
        assert_eq!(idx.document_length(0), 3);
        assert_eq!(idx.postings_for("dog").iter().map(|p| p.doc_id).collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn norms_default_to_one_for_unweighted_docs() {
        let mut b = IndexBuilder::new();
        // "dog" is in every document so its idf is zero.
        b.add_document("a", "a", ["dog"]);
        b.add_document("b", "b", ["dog", "cat"]);
        let idx = b.finish();
        assert_eq!(idx.docs[0].norm, 1.0);
        assert!((idx.docs[1].norm - 2f64.ln()).abs() < 1e-12);
    }
}
