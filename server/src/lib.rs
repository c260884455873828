use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use linkrank_core::config::RankingConfig;
use linkrank_core::persist::IndexPaths;
use linkrank_core::query::Query as SearchQuery;
use linkrank_core::ranker::{ranker_for, RankerKind, ScoredDocument};
use linkrank_core::snapshot::IndexSnapshot;
use linkrank_core::{DocId, LinkRankError};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub const MAX_RESULTS: usize = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Text,
}

#[derive(Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub query: String,
    #[serde(default = "default_num")]
    pub num: usize,
    pub ranker: Option<RankerKind>,
    #[serde(default)]
    pub format: OutputFormat,
}
fn default_num() -> usize { 10 }

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub ranker: RankerKind,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
pub struct SearchHit {
    pub doc_id: DocId,
    pub score: f64,
    pub name: String,
    pub title: String,
    pub pagerank: Option<f64>,
}

/// Shared, read-only serving state. Each request builds its own ranker (and
/// with it its own cursor) over the same snapshot.
#[derive(Clone)]
pub struct AppState {
    pub snapshot: Arc<IndexSnapshot>,
    pub ranking: RankingConfig,
    pub default_ranker: RankerKind,
}

pub struct ApiError(LinkRankError);

impl From<LinkRankError> for ApiError {
    fn from(e: LinkRankError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            LinkRankError::MissingArtifact { .. } => StatusCode::SERVICE_UNAVAILABLE,
            LinkRankError::Config(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        tracing::warn!(error = %self.0, %status, "request failed");
        (status, Json(serde_json::json!({ "error": self.0.to_string() }))).into_response()
    }
}

/// Load the snapshot under `index_dir` and build the router around it.
pub fn build_app(index_dir: &str, ranking: RankingConfig, default_ranker: RankerKind) -> Result<Router> {
    ranking.validate()?;
    let snapshot = IndexSnapshot::load(&IndexPaths::new(index_dir))?.into_shared();
    let state = AppState { snapshot, ranking, default_ranker };
    Ok(router(state))
}

pub fn router(state: AppState) -> Router {
    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val.split(',').filter_map(|s| s.trim().parse().ok()).collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/doc/:doc_id", get(doc_handler))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn search_handler(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Result<Response, ApiError> {
    let start = std::time::Instant::now();
    let kind = params.ranker.unwrap_or(state.default_ranker);
    let ranker = ranker_for(kind, state.snapshot.clone(), &state.ranking)?;

    let query = SearchQuery::parse(&params.query);
    let num = params.num.clamp(1, MAX_RESULTS);
    let scored = ranker.rank(&query, num);
    let results: Vec<SearchHit> = scored.iter().map(|s| hit(&state, s)).collect();
    let elapsed = start.elapsed();
    tracing::info!(query = %params.query, ranker = %kind, hits = results.len(), took_s = elapsed.as_secs_f64(), "search");

    Ok(match params.format {
        OutputFormat::Json => Json(SearchResponse {
            query: params.query,
            ranker: kind,
            took_s: elapsed.as_secs_f64(),
            total_hits: results.len(),
            results,
        })
        .into_response(),
        OutputFormat::Text => ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], text_output(&results)).into_response(),
    })
}

fn hit(state: &AppState, scored: &ScoredDocument) -> SearchHit {
    let meta = state.snapshot.index().doc(scored.doc_id);
    SearchHit {
        doc_id: scored.doc_id,
        score: scored.score,
        name: meta.map(|m| m.name.clone()).unwrap_or_default(),
        title: meta.map(|m| m.title.clone()).unwrap_or_default(),
        pagerank: state.snapshot.pagerank().and_then(|r| r.get(scored.doc_id)),
    }
}

/// One `doc_id<TAB>title<TAB>score` line per result.
fn text_output(results: &[SearchHit]) -> String {
    let mut out = String::new();
    for h in results {
        let _ = writeln!(out, "{}\t{}\t{}", h.doc_id, h.title, h.score);
    }
    out
}

pub async fn doc_handler(State(state): State<AppState>, Path(doc_id): Path<DocId>) -> Response {
    match state.snapshot.index().doc(doc_id) {
        Some(meta) => Json(serde_json::json!({
            "doc_id": doc_id,
            "name": meta.name,
            "title": meta.title,
            "length": meta.length,
            "pagerank": state.snapshot.pagerank().and_then(|r| r.get(doc_id)),
        }))
        .into_response(),
        None => (StatusCode::NOT_FOUND, Json(serde_json::json!({ "error": "not found" }))).into_response(),
    }
}
