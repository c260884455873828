use std::sync::Arc;

use crate::error::{LinkRankError, Result};
use crate::pagerank::RankVector;
use crate::persist::{self, IndexPaths};
use crate::InvertedIndex;

/// Immutable serving state: the postings index plus the rank vector if one
/// has been computed. Shared across queries behind an `Arc` and never
/// mutated after construction.
#[derive(Debug)]
pub struct IndexSnapshot {
    index: InvertedIndex,
    pagerank: Option<RankVector>,
}

impl IndexSnapshot {
    pub fn new(index: InvertedIndex, pagerank: Option<RankVector>) -> Result<Self> {
        if let Some(ranks) = &pagerank {
            if ranks.len() != index.docs.len() {
                return Err(LinkRankError::malformed(
                    "pagerank",
                    format!("{} ranks for {} indexed documents", ranks.len(), index.docs.len()),
                ));
            }
        }
        Ok(Self { index, pagerank })
    }

    /// Load the postings index and, when present, the rank vector. A missing
    /// `pagerank.bin` only disables the rankers that need it. Anything else,
    /// including a missing `corpus.bin` to check it against, is an error.
    pub fn load(paths: &IndexPaths) -> Result<Self> {
        let index = persist::load_index(paths)?;
        let pagerank = match persist::load_pagerank(paths) {
            Ok(ranks) => Some(ranks),
            Err(LinkRankError::MissingArtifact { ref path }) if *path == paths.pagerank() => {
                tracing::warn!(path = %path.display(), "no rank vector loaded; link-based ranking disabled");
                None
            }
            Err(e) => return Err(e),
        };
        Self::new(index, pagerank)
    }

    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn index(&self) -> &InvertedIndex {
        &self.index
    }

    pub fn pagerank(&self) -> Option<&RankVector> {
        self.pagerank.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::IndexBuilder;
    use tempfile::tempdir;

    fn save_two_docs(paths: &IndexPaths) {
        let mut b = IndexBuilder::new();
        b.add_document("a", "A", ["cat"]);
        b.add_document("b", "B", ["dog"]);
        persist::save_index(paths, &b.finish(), String::new()).unwrap();
    }

    #[test]
    fn missing_rank_vector_disables_pagerank() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        save_two_docs(&paths);
        let snapshot = IndexSnapshot::load(&paths).unwrap();
        assert!(snapshot.pagerank().is_none());
        assert_eq!(snapshot.index().num_docs(), 2);
    }

    #[test]
    fn rank_vector_without_corpus_record_is_an_error() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        save_two_docs(&paths);
        persist::save_pagerank(&paths, &RankVector::from(vec![0.5, 0.5])).unwrap();

        match IndexSnapshot::load(&paths) {
            Err(LinkRankError::MissingArtifact { path }) => assert_eq!(path, paths.corpus()),
            other => panic!("expected missing corpus.bin, got {other:?}"),
        }
    }

    #[test]
    fn loads_matching_rank_vector() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        save_two_docs(&paths);
        persist::save_corpus(&paths, &["a".to_string(), "b".to_string()]).unwrap();
        persist::save_pagerank(&paths, &RankVector::from(vec![0.25, 0.75])).unwrap();
        let snapshot = IndexSnapshot::load(&paths).unwrap();
        assert_eq!(snapshot.pagerank().and_then(|r| r.get(1)), Some(0.75));
    }
}
