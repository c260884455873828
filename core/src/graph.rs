use rayon::prelude::*;
use std::path::Path;

use crate::corpus::Corpus;
use crate::error::Result;
use crate::links::{HtmlLinkExtractor, LinkExtractor};
use crate::persist::{self, IndexPaths};
use crate::DocId;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkGraph {
    forward: Vec<Vec<DocId>>,
    inverted: Vec<Vec<DocId>>,
}

impl LinkGraph {
    /// Build from out-link lists. Panics if a target is not below `forward.len()`.
    pub fn from_forward(forward: Vec<Vec<DocId>>) -> Self {
        let inverted = invert(&forward);
        Self { forward, inverted }
    }

    pub fn num_nodes(&self) -> usize {
        self.forward.len()
    }

    pub fn num_edges(&self) -> usize {
        self.forward.iter().map(Vec::len).sum()
    }

    pub fn forward(&self) -> &[Vec<DocId>] {
        &self.forward
    }

    pub fn inverted(&self) -> &[Vec<DocId>] {
        &self.inverted
    }

    pub fn into_inverted(self) -> Vec<Vec<DocId>> {
        self.inverted
    }
}

/// Invert an adjacency list in O(V + E) with exactly-sized rows.
///
/// The first pass counts in-degrees, the second fills each row in source
/// order, so `inverted[v]` lists sources in ascending id order.
pub fn invert(forward: &[Vec<DocId>]) -> Vec<Vec<DocId>> {
    let mut in_degree = vec![0usize; forward.len()];
    for &v in forward.iter().flatten() {
        in_degree[v as usize] += 1;
    }
    let mut inverted: Vec<Vec<DocId>> = in_degree.into_iter().map(Vec::with_capacity).collect();
    for (u, targets) in forward.iter().enumerate() {
        for &v in targets {
            inverted[v as usize].push(u as DocId);
        }
    }
    inverted
}

/// Out-degree of every node, recovered from the inverted form.
pub fn out_degrees(inverted: &[Vec<DocId>]) -> Vec<u32> {
    let mut out = vec![0u32; inverted.len()];
    for &u in inverted.iter().flatten() {
        out[u as usize] += 1;
    }
    out
}

pub struct GraphBuilder<E = HtmlLinkExtractor> {
    extractor: E,
}

impl<E: LinkExtractor> GraphBuilder<E> {
    pub fn new(extractor: E) -> Self {
        Self { extractor }
    }

    /// Extract links from every document. Ids are already fixed by the
    /// corpus, so documents are processed in parallel and collected in id order.
    pub fn build(&self, corpus: &Corpus) -> Result<LinkGraph> {
        let forward = corpus
            .documents()
            .par_iter()
            .map(|doc| -> Result<Vec<DocId>> {
                let content = corpus.read(doc)?;
                Ok(self
                    .extractor
                    .extract(&content)
                    .iter()
                    .filter_map(|target| corpus.id_of(target))
                    .collect())
            })
            .collect::<Result<Vec<Vec<DocId>>>>()?;
        let graph = LinkGraph::from_forward(forward);
        tracing::info!(num_docs = graph.num_nodes(), num_edges = graph.num_edges(), "link graph built");
        Ok(graph)
    }
}

/// The mine stage: enumerate the corpus, build the graph, and persist the
/// document order and the inverted adjacency list.
pub fn mine<P: AsRef<Path>>(corpus_dir: P, paths: &IndexPaths) -> Result<LinkGraph> {
    let corpus = Corpus::open(corpus_dir)?;
    let graph = GraphBuilder::new(HtmlLinkExtractor::default()).build(&corpus)?;
    // Everything numbered by the previous corpus.bin goes before it is replaced.
    for stale in [paths.graph(), paths.pagerank(), paths.pagerank_meta()] {
        persist::remove_artifact(&stale)?;
    }
    persist::save_corpus(paths, &corpus.names())?;
    persist::save_graph(paths, graph.inverted())?;
    tracing::info!(path = %paths.graph().display(), "stored corpus graph");
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inverted_mirrors_forward() {
        let g = LinkGraph::from_forward(vec![vec![1, 2], vec![2], vec![0, 2, 2]]);
        assert_eq!(g.inverted().to_vec(), vec![vec![2], vec![0], vec![0, 1, 2, 2]]);
        assert_eq!(g.num_edges(), 6);
        for (u, targets) in g.forward().iter().enumerate() {
            for v in targets {
                assert!(g.inverted()[*v as usize].contains(&(u as DocId)));
            }
        }
    }

    #[test]
    fn out_degrees_from_inverted() {
        let g = LinkGraph::from_forward(vec![vec![1, 2], vec![], vec![0, 0]]);
        assert_eq!(out_degrees(g.inverted()), vec![2, 0, 2]);
    }
}
