use anyhow::Result;
use axum::Router;
use clap::Parser;
use linkrank_core::config::{RankingConfig, DEFAULT_LAMBDA, DEFAULT_PAGERANK_WEIGHT};
use linkrank_core::ranker::RankerKind;
use server::build_app;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Index directory path
    #[arg(long, default_value = "./index")]
    index: String,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
    /// Jelinek-Mercer smoothing weight on the document model, in (0,1)
    #[arg(long, default_value_t = DEFAULT_LAMBDA)]
    lambda: f64,
    /// Weight of ln(pagerank) in the comprehensive ranker
    #[arg(long, default_value_t = DEFAULT_PAGERANK_WEIGHT)]
    pagerank_weight: f64,
    /// Ranker used when a request does not name one (ql, cosine, comprehensive)
    #[arg(long, default_value = "ql")]
    ranker: RankerKind,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let ranking = RankingConfig { lambda: args.lambda, pagerank_weight: args.pagerank_weight };
    let app: Router = build_app(&args.index, ranking, args.ranker)?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, ranker = %args.ranker, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
