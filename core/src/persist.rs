use crate::error::{LinkRankError, Result};
use crate::pagerank::RankVector;
use crate::{DocId, DocMeta, InvertedIndex, Posting, TermId, TermStats};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u32,
    pub total_tokens: u64,
    pub created_at: String,
    pub version: u32,
}

/// Parameters and outcome of the PageRank run that produced `pagerank.bin`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRankMeta {
    pub damping: f64,
    pub max_iterations: usize,
    pub tolerance: f64,
    pub iterations: usize,
    pub delta: f64,
    pub converged: bool,
    pub created_at: String,
}

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn corpus(&self) -> PathBuf { self.root.join("corpus.bin") }
    pub fn graph(&self) -> PathBuf { self.root.join("graph.bin") }
    pub fn pagerank(&self) -> PathBuf { self.root.join("pagerank.bin") }
    pub fn pagerank_meta(&self) -> PathBuf { self.root.join("pagerank.json") }
    pub fn dictionary(&self) -> PathBuf { self.root.join("dictionary.bin") }
    pub fn docs(&self) -> PathBuf { self.root.join("docs.bin") }
    pub fn meta(&self) -> PathBuf { self.root.join("meta.json") }
    pub fn postings_dir(&self) -> PathBuf { self.root.join("postings") }
    pub fn postings(&self, term_id: TermId) -> PathBuf {
        self.postings_dir().join(format!("{term_id:08}.postings.bin"))
    }
}

/// Write through a temporary sibling and rename, so readers never observe a
/// half-written artifact.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Delete an artifact so a later failure cannot leave the previous
/// generation readable next to a partial new one.
pub(crate) fn remove_artifact(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
        _ => Ok(()),
    }
}

fn read_artifact(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => LinkRankError::MissingArtifact { path: path.to_path_buf() },
        _ => LinkRankError::Io(e),
    })
}

fn save_bin<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let bytes = bincode::serialize(value)?;
    write_atomic(path, &bytes)
}

fn load_bin<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let buf = read_artifact(path)?;
    bincode::deserialize(&buf).map_err(|e| LinkRankError::malformed(path, e.to_string()))
}

fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    write_atomic(path, json.as_bytes())
}

fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let buf = read_artifact(path)?;
    serde_json::from_slice(&buf).map_err(|e| LinkRankError::malformed(path, e.to_string()))
}

pub fn save_corpus(paths: &IndexPaths, names: &[String]) -> Result<()> {
    save_bin(&paths.corpus(), names)
}

pub fn load_corpus(paths: &IndexPaths) -> Result<Vec<String>> {
    load_bin(&paths.corpus())
}

/// Persist an inverted adjacency list: entry `i` holds the sources of edges into `i`.
pub fn save_graph(paths: &IndexPaths, inverted: &[Vec<DocId>]) -> Result<()> {
    save_bin(&paths.graph(), inverted)
}

pub fn load_graph(paths: &IndexPaths) -> Result<Vec<Vec<DocId>>> {
    let path = paths.graph();
    let inverted: Vec<Vec<DocId>> = load_bin(&path)?;
    let n = inverted.len();
    if let Some(bad) = inverted.iter().flatten().find(|&&u| u as usize >= n) {
        return Err(LinkRankError::malformed(&path, format!("source id {bad} out of range for {n} documents")));
    }
    Ok(inverted)
}

pub fn save_pagerank(paths: &IndexPaths, ranks: &RankVector) -> Result<()> {
    save_bin(&paths.pagerank(), ranks)
}

/// Load the rank vector, checking its length against the recorded corpus.
pub fn load_pagerank(paths: &IndexPaths) -> Result<RankVector> {
    let path = paths.pagerank();
    let ranks: RankVector = load_bin(&path)?;
    let num_docs = load_corpus(paths)?.len();
    if ranks.len() != num_docs {
        return Err(LinkRankError::malformed(&path, format!("{} ranks for {num_docs} documents", ranks.len())));
    }
    Ok(ranks)
}

pub fn save_pagerank_meta(paths: &IndexPaths, meta: &PageRankMeta) -> Result<()> {
    save_json(&paths.pagerank_meta(), meta)
}

pub fn load_pagerank_meta(paths: &IndexPaths) -> Result<PageRankMeta> {
    load_json(&paths.pagerank_meta())
}

pub fn save_dictionary(paths: &IndexPaths, dict: &(HashMap<String, TermId>, Vec<TermStats>)) -> Result<()> {
    save_bin(&paths.dictionary(), dict)
}

pub fn load_dictionary(paths: &IndexPaths) -> Result<(HashMap<String, TermId>, Vec<TermStats>)> {
    load_bin(&paths.dictionary())
}

pub fn save_docs(paths: &IndexPaths, docs: &[DocMeta]) -> Result<()> {
    save_bin(&paths.docs(), docs)
}

pub fn load_docs(paths: &IndexPaths) -> Result<Vec<DocMeta>> {
    load_bin(&paths.docs())
}

pub fn save_postings_for_term(paths: &IndexPaths, term_id: TermId, postings: &[Posting]) -> Result<()> {
    save_bin(&paths.postings(term_id), postings)
}

pub fn load_postings_for_term(paths: &IndexPaths, term_id: TermId) -> Result<Vec<Posting>> {
    load_bin(&paths.postings(term_id))
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    save_json(&paths.meta(), meta)
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    load_json(&paths.meta())
}

/// Persist every part of a postings index. `meta.json` is removed first and
/// written last, so its presence marks a complete index of one generation.
pub fn save_index(paths: &IndexPaths, index: &InvertedIndex, created_at: String) -> Result<()> {
    remove_artifact(&paths.meta())?;
    for (term_id, plist) in index.postings.iter().enumerate() {
        save_postings_for_term(paths, term_id as TermId, plist)?;
    }
    save_dictionary(paths, &(index.dictionary.clone(), index.stats.clone()))?;
    save_docs(paths, &index.docs)?;
    let meta = MetaFile {
        num_docs: index.num_docs(),
        total_tokens: index.total_tokens,
        created_at,
        version: FORMAT_VERSION,
    };
    save_meta(paths, &meta)
}

/// Load a complete postings index into memory.
pub fn load_index(paths: &IndexPaths) -> Result<InvertedIndex> {
    let meta = load_meta(paths)?;
    if meta.version != FORMAT_VERSION {
        return Err(LinkRankError::malformed(paths.meta(), format!("unsupported version {}", meta.version)));
    }
    let (dictionary, stats) = load_dictionary(paths)?;
    if stats.len() != dictionary.len() {
        return Err(LinkRankError::malformed(
            paths.dictionary(),
            format!("{} terms but {} stats entries", dictionary.len(), stats.len()),
        ));
    }
    let docs = load_docs(paths)?;
    if docs.len() != meta.num_docs as usize {
        return Err(LinkRankError::malformed(
            paths.docs(),
            format!("{} documents, meta.json records {}", docs.len(), meta.num_docs),
        ));
    }

    let mut postings = Vec::with_capacity(stats.len());
    for term_id in 0..stats.len() as TermId {
        let plist = load_postings_for_term(paths, term_id)?;
        let sorted = plist.windows(2).all(|w| w[0].doc_id < w[1].doc_id);
        if !sorted || plist.last().is_some_and(|p| p.doc_id >= meta.num_docs) {
            return Err(LinkRankError::malformed(paths.postings(term_id), "postings unsorted or out of range"));
        }
        postings.push(plist);
    }

    tracing::info!(num_docs = meta.num_docs, num_terms = dictionary.len(), "index loaded");
    Ok(InvertedIndex { dictionary, stats, postings, docs, total_tokens: meta.total_tokens })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_files_are_reported_as_missing() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        assert!(load_graph(&paths).unwrap_err().is_missing_artifact());
        assert!(load_pagerank(&paths).unwrap_err().is_missing_artifact());
        assert!(load_index(&paths).unwrap_err().is_missing_artifact());
    }

    #[test]
    fn garbage_graph_is_malformed() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        fs::write(paths.graph(), b"\xff\xff").unwrap();
        assert!(matches!(load_graph(&paths), Err(LinkRankError::MalformedArtifact { .. })));
    }

    #[test]
    fn out_of_range_source_is_malformed() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        save_graph(&paths, &[vec![], vec![5]]).unwrap();
        assert!(matches!(load_graph(&paths), Err(LinkRankError::MalformedArtifact { .. })));
    }

    #[test]
    fn pagerank_length_must_match_corpus() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        save_corpus(&paths, &["a".to_string(), "b".to_string()]).unwrap();
        save_pagerank(&paths, &RankVector::from(vec![1.0])).unwrap();
        assert!(matches!(load_pagerank(&paths), Err(LinkRankError::MalformedArtifact { .. })));
    }

    fn two_doc_index(a: &str, b: &str) -> InvertedIndex {
        let mut builder = crate::IndexBuilder::new();
        builder.add_document(a, a, [a]);
        builder.add_document(b, b, [b]);
        builder.finish()
    }

    #[test]
    fn interrupted_rebuild_leaves_no_loadable_index() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        save_index(&paths, &two_doc_index("alpha", "beta"), String::new()).unwrap();
        assert_eq!(load_index(&paths).unwrap().num_terms(), 2);

        // Occupy the temporary name of the second postings list so its write fails.
        fs::create_dir_all(paths.postings_dir().join("00000001.postings.tmp")).unwrap();
        assert!(save_index(&paths, &two_doc_index("gamma", "delta"), String::new()).is_err());

        let err = load_index(&paths).unwrap_err();
        assert!(err.is_missing_artifact(), "unexpected error: {err}");
    }
}
