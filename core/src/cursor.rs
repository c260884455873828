use crate::{DocId, Posting};

/// Document-at-a-time enumeration of documents matching any query term.
///
/// A cursor carries per-query position state, so every query needs its own.
pub trait RetrievalCursor {
    /// Smallest matching doc id strictly greater than `after` (`None` means
    /// before the first document). Returns `None` once exhausted, and keeps
    /// returning `None` on every later call.
    fn next_matching(&mut self, after: Option<DocId>) -> Option<DocId>;
}

/// Background model counts.
pub trait CorpusStatistics {
    fn num_docs(&self) -> u32;
    fn total_tokens(&self) -> u64;
    fn corpus_frequency(&self, term: &str) -> u64;
    fn document_frequency(&self, term: &str) -> u32;
}

/// Read-only per-document counts.
pub trait DocumentView {
    fn document_length(&self, doc_id: DocId) -> u32;
    fn term_frequency(&self, doc_id: DocId, term: &str) -> u32;
}

/// Disjunctive cursor over sorted posting lists.
#[derive(Debug)]
pub struct PostingsCursor<'a> {
    lists: Vec<&'a [Posting]>,
    positions: Vec<usize>,
    last_after: Option<DocId>,
    exhausted: bool,
}

impl<'a> PostingsCursor<'a> {
    pub fn new(lists: Vec<&'a [Posting]>) -> Self {
        let positions = vec![0; lists.len()];
        Self { lists, positions, last_after: None, exhausted: false }
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}

impl RetrievalCursor for PostingsCursor<'_> {
    fn next_matching(&mut self, after: Option<DocId>) -> Option<DocId> {
        if self.exhausted {
            return None;
        }
        // Positions only move forward; a caller stepping back rescans from the start.
        if after < self.last_after {
            self.positions.iter_mut().for_each(|p| *p = 0);
        }
        self.last_after = after;

        let mut next: Option<DocId> = None;
        for (list, pos) in self.lists.iter().zip(self.positions.iter_mut()) {
            *pos += list[*pos..].partition_point(|p| Some(p.doc_id) <= after);
            if let Some(p) = list.get(*pos) {
                next = Some(next.map_or(p.doc_id, |d| d.min(p.doc_id)));
            }
        }
        if next.is_none() {
            self.exhausted = true;
        }
        next
    }
}

/// Drive `cursor` to exhaustion, calling `visit` for every candidate in id order.
pub fn for_each_candidate<C, F>(cursor: &mut C, mut visit: F)
where
    C: RetrievalCursor + ?Sized,
    F: FnMut(DocId),
{
    let mut after = None;
    while let Some(doc_id) = cursor.next_matching(after) {
        visit(doc_id);
        after = Some(doc_id);
    }
}
