use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use linkrank_core::config::{PageRankConfig, RankingConfig};
use linkrank_core::graph::mine;
use linkrank_core::pagerank::compute_and_persist;
use linkrank_core::persist::{save_corpus, save_index, IndexPaths};
use linkrank_core::ranker::RankerKind;
use linkrank_core::{index_corpus, IndexBuilder};
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::tempdir;
use tower::ServiceExt;

fn build_tiny_index(dir: &Path) {
    let paths = IndexPaths::new(dir);
    let mut b = IndexBuilder::new();
    b.add_document("doc0", "Doc 0", ["rust", "rust", "system", "program"]);
    b.add_document("doc1", "Doc 1", ["learn", "rust", "today", "slowly"]);
    b.add_document("doc2", "Doc 2", ["python", "script"]);
    save_corpus(&paths, &["doc0".to_string(), "doc1".to_string(), "doc2".to_string()]).unwrap();
    save_index(&paths, &b.finish(), "2024-01-01T00:00:00Z".into()).unwrap();
}

fn app(dir: &Path) -> Router {
    server::build_app(&dir.to_string_lossy(), RankingConfig::default(), RankerKind::Ql).unwrap()
}

async fn call(app: Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let req = Request::get(uri).body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes().to_vec();
    (status, body)
}

async fn call_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let (status, body) = call(app, uri).await;
    (status, serde_json::from_slice(&body).unwrap())
}

fn doc_ids(json: &Value) -> Vec<u64> {
    json["results"].as_array().unwrap().iter().map(|r| r["doc_id"].as_u64().unwrap()).collect()
}

#[tokio::test]
async fn search_returns_ranked_results() {
    let dir = tempdir().unwrap();
    build_tiny_index(dir.path());

    let (status, json) = call_json(app(dir.path()), "/search?query=rust&num=5").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["ranker"], "ql");
    assert_eq!(doc_ids(&json), vec![0, 1]);
    assert_eq!(json["results"][0]["title"], "Doc 0");
}

#[tokio::test]
async fn unmatched_and_empty_queries_are_empty_not_errors() {
    let dir = tempdir().unwrap();
    build_tiny_index(dir.path());

    for uri in ["/search?query=haskell", "/search?query=the", "/search"] {
        let (status, json) = call_json(app(dir.path()), uri).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert_eq!(json["total_hits"], 0, "{uri}");
    }
}

#[tokio::test]
async fn text_format_lists_one_result_per_line() {
    let dir = tempdir().unwrap();
    build_tiny_index(dir.path());

    let (status, body) = call(app(dir.path()), "/search?query=rust&format=text&ranker=cosine").await;
    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8(body).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("0\tDoc 0\t"));
}

#[tokio::test]
async fn comprehensive_without_pagerank_is_unavailable() {
    let dir = tempdir().unwrap();
    build_tiny_index(dir.path());

    let (status, json) = call_json(app(dir.path()), "/search?query=rust&ranker=comprehensive").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(json["error"].as_str().unwrap().contains("pagerank"));

    let (status, _) = call(app(dir.path()), "/search?query=rust&ranker=phrase").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn missing_index_fails_at_startup() {
    let dir = tempdir().unwrap();
    let err = server::build_app(&dir.path().to_string_lossy(), RankingConfig::default(), RankerKind::Ql).err();
    assert!(err.is_some());
}

fn page(title: &str, body: &str, links: &[&str]) -> String {
    let anchors: String = links.iter().map(|l| format!(r#" <a href="{l}">{l}</a>"#)).collect();
    format!("<html><head><title>{title}</title></head><body><p>{body}</p>{anchors}</body></html>")
}

#[tokio::test]
async fn full_pipeline_serves_comprehensive_ranking() {
    let corpus = tempdir().unwrap();
    let index = tempdir().unwrap();
    fs::write(corpus.path().join("alpha"), page("Alpha", "graph ranking", &["beta"])).unwrap();
    fs::write(corpus.path().join("beta"), page("Beta", "graph ranking", &["alpha"])).unwrap();
    fs::write(corpus.path().join("gamma"), page("Gamma", "graph ranking", &["beta"])).unwrap();

    let paths = IndexPaths::new(index.path());
    mine(corpus.path(), &paths).unwrap();
    compute_and_persist(&paths, &PageRankConfig::default(), String::new()).unwrap();

    let built = index_corpus(corpus.path(), &paths, String::new()).unwrap();
    // Equal lengths and one "graph" each, so the query-likelihood part ties.
    let lengths: Vec<u32> = (0..3).map(|id| built.doc(id).unwrap().length).collect();
    assert!(lengths.iter().all(|&l| l == lengths[0]));

    let (status, json) = call_json(app(index.path()), "/search?query=graph&ranker=comprehensive").await;
    assert_eq!(status, StatusCode::OK);
    // beta is linked from both others
    assert_eq!(doc_ids(&json)[0], 1);
    assert!(json["results"][0]["pagerank"].as_f64().unwrap() > json["results"][2]["pagerank"].as_f64().unwrap());

    let (status, doc) = call_json(app(index.path()), "/doc/1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(doc["name"], "beta");
    assert_eq!(doc["title"], "Beta");
    let (status, _) = call_json(app(index.path()), "/doc/99").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
