use serde::{Deserialize, Serialize};
use std::ops::Index;

use crate::config::PageRankConfig;
use crate::error::Result;
use crate::graph::out_degrees;
use crate::persist::{self, IndexPaths, PageRankMeta};
use crate::DocId;

/// One weight per document, positionally keyed by doc id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RankVector(Vec<f64>);

impl RankVector {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, doc_id: DocId) -> Option<f64> {
        self.0.get(doc_id as usize).copied()
    }

    pub fn sum(&self) -> f64 {
        self.0.iter().sum()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// L1 distance to `other`; vectors of different length are compared over their common prefix.
    pub fn l1_distance(&self, other: &RankVector) -> f64 {
        l1(&self.0, &other.0)
    }
}

impl From<Vec<f64>> for RankVector {
    fn from(v: Vec<f64>) -> Self {
        RankVector(v)
    }
}

impl Index<usize> for RankVector {
    type Output = f64;

    fn index(&self, i: usize) -> &f64 {
        &self.0[i]
    }
}

fn l1(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Convergence {
    pub iterations: usize,
    /// L1 distance between the last two vectors.
    pub delta: f64,
    pub converged: bool,
}

/// Stepwise PageRank state. The graph must have every source id below its length.
pub struct PageRank<'g> {
    inverted: &'g [Vec<DocId>],
    out_degree: Vec<u32>,
    damping: f64,
    current: Vec<f64>,
    next: Vec<f64>,
    iterations: usize,
}

impl<'g> PageRank<'g> {
    /// Start from the uniform vector `1/N`.
    pub fn new(inverted: &'g [Vec<DocId>], damping: f64) -> Self {
        let n = inverted.len();
        let init = if n == 0 { 0.0 } else { 1.0 / n as f64 };
        Self {
            inverted,
            out_degree: out_degrees(inverted),
            damping,
            current: vec![init; n],
            next: vec![0.0; n],
            iterations: 0,
        }
    }

    /// Rank mass held by documents with no out-links.
    fn dangling_mass(&self) -> f64 {
        self.current
            .iter()
            .zip(&self.out_degree)
            .filter(|(_, &deg)| deg == 0)
            .map(|(r, _)| r)
            .sum()
    }

    /// Run one propagation step and return the L1 change.
    ///
    /// `rank'(v) = ((1 - d) + d * dangling) / N + d * sum(rank(u) / out(u) for u -> v)`,
    /// where `dangling` is the rank held by documents without out-links.
    pub fn step(&mut self) -> f64 {
        let n = self.current.len();
        if n == 0 {
            return 0.0;
        }
        let d = self.damping;
        let base = ((1.0 - d) + d * self.dangling_mass()) / n as f64;
        for (v, sources) in self.inverted.iter().enumerate() {
            let inflow: f64 = sources
                .iter()
                .map(|&u| self.current[u as usize] / self.out_degree[u as usize] as f64)
                .sum();
            self.next[v] = base + d * inflow;
        }
        let delta = l1(&self.current, &self.next);
        std::mem::swap(&mut self.current, &mut self.next);
        self.iterations += 1;
        tracing::debug!(iteration = self.iterations, delta, "pagerank step");
        delta
    }

    pub fn ranks(&self) -> &[f64] {
        &self.current
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn into_rank_vector(self) -> RankVector {
        RankVector(self.current)
    }
}

/// Iterate until the L1 change drops below the tolerance or the iteration cap is hit.
pub fn compute(inverted: &[Vec<DocId>], config: &PageRankConfig) -> Result<(RankVector, Convergence)> {
    config.validate()?;
    let mut pr = PageRank::new(inverted, config.damping);
    let mut conv = Convergence { iterations: 0, delta: 0.0, converged: inverted.is_empty() };
    while !conv.converged && pr.iterations() < config.max_iterations {
        conv.delta = pr.step();
        conv.iterations = pr.iterations();
        conv.converged = conv.delta < config.tolerance;
    }
    if !conv.converged {
        tracing::warn!(iterations = conv.iterations, delta = conv.delta, "pagerank hit the iteration cap before converging");
    }
    tracing::info!(num_docs = inverted.len(), iterations = conv.iterations, delta = conv.delta, "pagerank computed");
    Ok((pr.into_rank_vector(), conv))
}

/// The compute stage: load `graph.bin`, run PageRank, write `pagerank.bin` and `pagerank.json`.
pub fn compute_and_persist(paths: &IndexPaths, config: &PageRankConfig, created_at: String) -> Result<(RankVector, Convergence)> {
    config.validate()?;
    let inverted = persist::load_graph(paths)?;
    let recorded = persist::load_corpus(paths)?;
    if recorded.len() != inverted.len() {
        return Err(crate::LinkRankError::malformed(
            paths.graph(),
            format!("{} nodes but corpus.bin records {} documents", inverted.len(), recorded.len()),
        ));
    }
    let (ranks, conv) = compute(&inverted, config)?;
    persist::save_pagerank(paths, &ranks)?;
    persist::save_pagerank_meta(
        paths,
        &PageRankMeta {
            damping: config.damping,
            max_iterations: config.max_iterations,
            tolerance: config.tolerance,
            iterations: conv.iterations,
            delta: conv.delta,
            converged: conv.converged,
            created_at,
        },
    )?;
    Ok((ranks, conv))
}
