use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LinkRankError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The corpus directory (or a document inside it) could not be read.
    #[error("corpus error at {}: {source}", .path.display())]
    Corpus {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed artifact {}: {reason}", .path.display())]
    MalformedArtifact { path: PathBuf, reason: String },

    #[error("missing artifact {}", .path.display())]
    MissingArtifact { path: PathBuf },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("encoding error: {0}")]
    Encode(#[from] bincode::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LinkRankError>;

impl LinkRankError {
    pub fn malformed<P: Into<PathBuf>, S: Into<String>>(path: P, reason: S) -> Self {
        LinkRankError::MalformedArtifact { path: path.into(), reason: reason.into() }
    }

    pub fn config<S: Into<String>>(msg: S) -> Self {
        LinkRankError::Config(msg.into())
    }

    pub fn is_missing_artifact(&self) -> bool {
        matches!(self, LinkRankError::MissingArtifact { .. })
    }
}
