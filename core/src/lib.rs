pub mod config;
pub mod corpus;
pub mod cursor;
pub mod error;
pub mod graph;
pub mod index;
pub mod links;
pub mod pagerank;
pub mod persist;
pub mod query;
pub mod ranker;
pub mod snapshot;
pub mod tokenizer;

pub use error::{LinkRankError, Result};
pub use index::*;
