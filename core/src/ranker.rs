use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::config::RankingConfig;
use crate::cursor::{for_each_candidate, CorpusStatistics, DocumentView, RetrievalCursor};
use crate::error::{LinkRankError, Result};
use crate::index::{idf, log_tf};
use crate::query::Query;
use crate::snapshot::IndexSnapshot;
use crate::DocId;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoredDocument {
    pub doc_id: DocId,
    pub score: f64,
}

/// Closed set of ranking strategies, selectable by identifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankerKind {
    /// Jelinek-Mercer smoothed query likelihood.
    #[default]
    Ql,
    /// tf-idf vector space.
    Cosine,
    /// Query likelihood plus a weighted log-PageRank prior.
    Comprehensive,
}

impl RankerKind {
    pub const ALL: [RankerKind; 3] = [RankerKind::Ql, RankerKind::Cosine, RankerKind::Comprehensive];

    pub fn as_str(&self) -> &'static str {
        match self {
            RankerKind::Ql => "ql",
            RankerKind::Cosine => "cosine",
            RankerKind::Comprehensive => "comprehensive",
        }
    }
}

impl fmt::Display for RankerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RankerKind {
    type Err = LinkRankError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim().to_ascii_lowercase();
        RankerKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| LinkRankError::config(format!("ranker {s:?} is not valid")))
    }
}

/// The capability every strategy exposes.
pub trait Ranker: Send + Sync {
    fn kind(&self) -> RankerKind;

    /// Best `num_results` documents for `query`. Unmatched queries yield an empty list.
    fn rank(&self, query: &Query, num_results: usize) -> Vec<ScoredDocument>;
}

/// Build the ranker for `kind` over a shared snapshot.
pub fn ranker_for(kind: RankerKind, snapshot: Arc<IndexSnapshot>, config: &RankingConfig) -> Result<Box<dyn Ranker>> {
    config.validate()?;
    Ok(match kind {
        RankerKind::Ql => Box::new(QueryLikelihoodRanker::new(snapshot, config.lambda)),
        RankerKind::Cosine => Box::new(CosineRanker::new(snapshot)),
        RankerKind::Comprehensive => Box::new(ComprehensiveRanker::new(snapshot, config)?),
    })
}

/// Descending score, ascending doc id.
pub fn sort_ranked(results: &mut [ScoredDocument]) {
    results.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.doc_id.cmp(&b.doc_id)));
}

fn collect_ranked<C, F>(cursor: &mut C, num_results: usize, mut score: F) -> Vec<ScoredDocument>
where
    C: RetrievalCursor,
    F: FnMut(DocId) -> f64,
{
    let mut results = Vec::new();
    for_each_candidate(cursor, |doc_id| results.push(ScoredDocument { doc_id, score: score(doc_id) }));
    sort_ranked(&mut results);
    results.truncate(num_results);
    results
}

/// `P(t | doc) = lambda * tf / |doc| + (1 - lambda) * cf / |corpus|`.
pub fn term_probability<S>(stats: &S, doc_id: DocId, term: &str, lambda: f64) -> f64
where
    S: CorpusStatistics + DocumentView + ?Sized,
{
    let doc_len = stats.document_length(doc_id);
    let doc_model = if doc_len == 0 { 0.0 } else { stats.term_frequency(doc_id, term) as f64 / doc_len as f64 };
    let total = stats.total_tokens();
    let corpus_model = if total == 0 { 0.0 } else { stats.corpus_frequency(term) as f64 / total as f64 };
    lambda * doc_model + (1.0 - lambda) * corpus_model
}

/// Sum of `ln P(t | doc)` over `terms`. Callers pass only terms seen in the
/// corpus, so every probability is positive.
pub fn query_likelihood<S>(stats: &S, doc_id: DocId, terms: &[&str], lambda: f64) -> f64
where
    S: CorpusStatistics + DocumentView + ?Sized,
{
    terms.iter().map(|t| term_probability(stats, doc_id, t, lambda).ln()).sum()
}

/// Distinct query terms that occur somewhere in the corpus.
fn scoring_terms<'q, S: CorpusStatistics + ?Sized>(stats: &S, query: &'q Query) -> Vec<&'q str> {
    query.distinct_terms().into_iter().filter(|t| stats.corpus_frequency(t) > 0).collect()
}

/// Unigram query likelihood with Jelinek-Mercer smoothing.
///
/// Repeated query terms count once. Terms with no corpus occurrences are
/// dropped before scoring instead of contributing `ln 0`.
pub struct QueryLikelihoodRanker {
    snapshot: Arc<IndexSnapshot>,
    lambda: f64,
}

impl QueryLikelihoodRanker {
    pub fn new(snapshot: Arc<IndexSnapshot>, lambda: f64) -> Self {
        Self { snapshot, lambda }
    }

    /// Score any document, matched or not. `None` if no query term is in the vocabulary.
    pub fn score_document(&self, query: &Query, doc_id: DocId) -> Option<f64> {
        let index = self.snapshot.index();
        let terms = scoring_terms(index, query);
        (!terms.is_empty()).then(|| query_likelihood(index, doc_id, &terms, self.lambda))
    }
}

impl Ranker for QueryLikelihoodRanker {
    fn kind(&self) -> RankerKind {
        RankerKind::Ql
    }

    fn rank(&self, query: &Query, num_results: usize) -> Vec<ScoredDocument> {
        let index = self.snapshot.index();
        let terms = scoring_terms(index, query);
        if terms.is_empty() || num_results == 0 {
            return Vec::new();
        }
        let mut cursor = index.cursor(&terms);
        let results = collect_ranked(&mut cursor, num_results, |doc| query_likelihood(index, doc, &terms, self.lambda));
        tracing::debug!(query = query.raw(), terms = terms.len(), hits = results.len(), "ql ranked");
        results
    }
}

/// Cosine similarity between l2-normalized tf-idf vectors.
pub struct CosineRanker {
    snapshot: Arc<IndexSnapshot>,
}

impl CosineRanker {
    pub fn new(snapshot: Arc<IndexSnapshot>) -> Self {
        Self { snapshot }
    }
}

impl Ranker for CosineRanker {
    fn kind(&self) -> RankerKind {
        RankerKind::Cosine
    }

    fn rank(&self, query: &Query, num_results: usize) -> Vec<ScoredDocument> {
        let index = self.snapshot.index();
        let n = index.num_docs();
        let mut weights: Vec<(&str, f64)> = query
            .term_counts()
            .into_iter()
            .filter(|(t, _)| index.document_frequency(t) > 0)
            .map(|(t, qtf)| (t, log_tf(qtf) * idf(n, index.document_frequency(t))))
            .collect();
        if weights.is_empty() || num_results == 0 {
            return Vec::new();
        }
        let norm = weights.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
        if norm > 0.0 {
            weights.iter_mut().for_each(|(_, w)| *w /= norm);
        }

        let terms: Vec<&str> = weights.iter().map(|(t, _)| *t).collect();
        let mut cursor = index.cursor(&terms);
        collect_ranked(&mut cursor, num_results, |doc| {
            let doc_norm = index.doc(doc).map_or(1.0, |d| d.norm);
            weights
                .iter()
                .map(|(t, qw)| {
                    let dw = log_tf(index.term_frequency(doc, t)) * idf(n, index.document_frequency(t));
                    qw * dw / doc_norm
                })
                .sum()
        })
    }
}

/// Query likelihood combined with link authority:
/// `ql(doc) + pagerank_weight * ln(pagerank(doc))`.
pub struct ComprehensiveRanker {
    ql: QueryLikelihoodRanker,
    pagerank_weight: f64,
}

impl ComprehensiveRanker {
    /// Fails with `MissingArtifact` if the snapshot carries no rank vector.
    pub fn new(snapshot: Arc<IndexSnapshot>, config: &RankingConfig) -> Result<Self> {
        if snapshot.pagerank().is_none() {
            return Err(LinkRankError::MissingArtifact { path: "pagerank.bin".into() });
        }
        Ok(Self { ql: QueryLikelihoodRanker::new(snapshot, config.lambda), pagerank_weight: config.pagerank_weight })
    }
}

impl Ranker for ComprehensiveRanker {
    fn kind(&self) -> RankerKind {
        RankerKind::Comprehensive
    }

    fn rank(&self, query: &Query, num_results: usize) -> Vec<ScoredDocument> {
        let snapshot = &self.ql.snapshot;
        let Some(ranks) = snapshot.pagerank() else {
            return Vec::new();
        };
        let index = snapshot.index();
        let terms = scoring_terms(index, query);
        if terms.is_empty() || num_results == 0 {
            return Vec::new();
        }
        let mut cursor = index.cursor(&terms);
        collect_ranked(&mut cursor, num_results, |doc| {
            let prior = ranks.get(doc).unwrap_or(0.0).max(f64::MIN_POSITIVE).ln();
            query_likelihood(index, doc, &terms, self.ql.lambda) + self.pagerank_weight * prior
        })
    }
}
