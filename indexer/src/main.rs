use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use linkrank_core::config::{PageRankConfig, DEFAULT_DAMPING, DEFAULT_MAX_ITERATIONS, DEFAULT_TOLERANCE};
use linkrank_core::graph::mine;
use linkrank_core::index_corpus;
use linkrank_core::pagerank::compute_and_persist;
use linkrank_core::persist::IndexPaths;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Offline pipeline: mine the link graph, compute PageRank, build the postings index", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract the internal link graph and store its inverted form
    Mine {
        /// Corpus directory (one document per file)
        #[arg(long)]
        corpus: String,
        /// Index directory for persisted artifacts
        #[arg(long)]
        index: String,
    },
    /// Compute PageRank from the stored graph
    Compute {
        #[arg(long)]
        index: String,
        /// Probability of following a link rather than teleporting
        #[arg(long, default_value_t = DEFAULT_DAMPING)]
        damping: f64,
        #[arg(long, default_value_t = DEFAULT_MAX_ITERATIONS)]
        max_iterations: usize,
        /// Stop once the L1 change between iterations is below this
        #[arg(long, default_value_t = DEFAULT_TOLERANCE)]
        tolerance: f64,
    },
    /// Build the postings index used for query-time ranking
    Index {
        #[arg(long)]
        corpus: String,
        #[arg(long)]
        index: String,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Mine { corpus, index } => {
            let paths = IndexPaths::new(&index);
            let graph = mine(&corpus, &paths).with_context(|| format!("mining corpus {corpus}"))?;
            tracing::info!(num_docs = graph.num_nodes(), num_edges = graph.num_edges(), index = %index, "mine complete");
            Ok(())
        }
        Commands::Compute { index, damping, max_iterations, tolerance } => {
            let paths = IndexPaths::new(&index);
            let config = PageRankConfig { damping, max_iterations, tolerance };
            let (ranks, conv) = compute_and_persist(&paths, &config, now_rfc3339())
                .with_context(|| format!("computing pagerank in {index}"))?;
            tracing::info!(
                num_docs = ranks.len(),
                iterations = conv.iterations,
                converged = conv.converged,
                path = %paths.pagerank().display(),
                "stored page rank"
            );
            Ok(())
        }
        Commands::Index { corpus, index } => {
            let paths = IndexPaths::new(&index);
            let built = index_corpus(&corpus, &paths, now_rfc3339())
                .with_context(|| format!("indexing corpus {corpus}"))?;
            tracing::info!(num_docs = built.num_docs(), num_terms = built.num_terms(), index = %index, "index build complete");
            Ok(())
        }
    }
}

fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default()
}
