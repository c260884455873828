use lazy_static::lazy_static;
use scraper::{Html, Selector};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{LinkRankError, Result};
use crate::DocId;

lazy_static! {
    static ref TITLE: Selector = Selector::parse("title").expect("valid selector");
    static ref BODY: Selector = Selector::parse("body").expect("valid selector");
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusDocument {
    pub name: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct Corpus {
    root: PathBuf,
    documents: Vec<CorpusDocument>,
    ids: HashMap<String, DocId>,
}

impl Corpus {
    /// List the files directly under `root` and number them by file name.
    /// Hidden files are skipped. Any failure to read the directory is fatal.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let corpus_err = |path: &Path, source: io::Error| LinkRankError::Corpus { path: path.to_path_buf(), source };

        let meta = fs::metadata(&root).map_err(|e| corpus_err(&root, e))?;
        if !meta.is_dir() {
            return Err(corpus_err(&root, io::Error::new(io::ErrorKind::InvalidInput, "not a directory")));
        }

        let mut documents = Vec::new();
        for entry in WalkDir::new(&root).min_depth(1).max_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(&root).to_path_buf();
                corpus_err(&path, io::Error::from(e))
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            documents.push(CorpusDocument { name, path: entry.into_path() });
        }

        let ids = documents
            .iter()
            .enumerate()
            .map(|(i, d)| (d.name.clone(), i as DocId))
            .collect();
        tracing::info!(root = %root.display(), num_docs = documents.len(), "corpus enumerated");
        Ok(Self { root, documents, ids })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn documents(&self) -> &[CorpusDocument] {
        &self.documents
    }

    pub fn names(&self) -> Vec<String> {
        self.documents.iter().map(|d| d.name.clone()).collect()
    }

    pub fn id_of(&self, name: &str) -> Option<DocId> {
        self.ids.get(name).copied()
    }

    /// Read a document, decoding invalid UTF-8 lossily.
    pub fn read(&self, doc: &CorpusDocument) -> Result<String> {
        let bytes = fs::read(&doc.path).map_err(|source| LinkRankError::Corpus { path: doc.path.clone(), source })?;
        Ok(match String::from_utf8(bytes) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(doc = %doc.name, "document is not valid UTF-8, decoding lossily");
                String::from_utf8_lossy(e.as_bytes()).into_owned()
            }
        })
    }

    /// Fail if the document order recorded at `recorded_path` no longer matches this corpus.
    pub fn ensure_matches(&self, recorded: &[String], recorded_path: &Path) -> Result<()> {
        if recorded.len() != self.documents.len() {
            return Err(LinkRankError::malformed(
                recorded_path,
                format!("recorded {} documents, corpus has {}", recorded.len(), self.documents.len()),
            ));
        }
        if let Some((i, (name, doc))) = recorded.iter().zip(&self.documents).enumerate().find(|(_, (n, d))| **n != d.name) {
            return Err(LinkRankError::malformed(
                recorded_path,
                format!("doc {i} recorded as {name:?}, corpus has {:?}", doc.name),
            ));
        }
        Ok(())
    }
}

/// Title and visible text of an HTML (or plain-text) document.
pub fn extract_text(content: &str) -> (Option<String>, String) {
    let html = Html::parse_document(content);
    let title = html
        .select(&TITLE)
        .next()
        .map(|n| n.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty());
    let body = html
        .select(&BODY)
        .next()
        .map(|n| n.text().collect::<Vec<_>>().join(" "))
        .unwrap_or_default();
    (title, body)
}
