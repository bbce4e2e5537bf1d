use arxiv_search::config::{SearchSettings, Settings};
use arxiv_search::create_app;
use arxiv_search::search::{self, SearchIndex};
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt; // for `oneshot`

async fn app(create: bool) -> Router {
    let engine = search::connect(&SearchSettings::embedded()).unwrap();
    let index = SearchIndex::new(engine, "arxiv-papers");
    if create {
        index.create_index(false).await.unwrap();
    }
    let settings = Settings::from_lookup(|_| None).unwrap();
    create_app(index, Arc::new(settings))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn health_check_works() {
    let app = app(true).await;
    let (status, body) = send(&app, get("/api/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["search"]["healthy"], true);
    assert_eq!(body["environment"], "development");
}

#[tokio::test]
async fn ingested_papers_are_searchable() {
    let app = app(true).await;
    let papers = json!([
        {
            "arxiv_id": "2401.00001",
            "title": "Graph Nets",
            "authors": ["A Doe", "B Roe"],
            "categories": ["cs.AI"],
            "published_date": "2024-01-01"
        },
        {"title": "No identifier"}
    ]);
    let (status, body) = send(&app, post_json("/api/index/papers", &papers)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": 1, "failed": 1}));

    let (status, body) = send(&app, get("/api/search?q=graph&categories=cs.AI,cs.LG")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    let hit = &body["hits"][0];
    assert_eq!(hit["arxiv_id"], "2401.00001");
    assert_eq!(hit["authors"], "A Doe, B Roe");
    assert!(hit["score"].is_number());
    assert!(body.get("error").is_none());

    let (_, body) = send(&app, get("/api/search?q=graph&categories=math.CO")).await;
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn search_without_index_degrades() {
    let app = app(false).await;
    let (status, body) = send(&app, get("/api/search?q=anything")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"total": 0, "hits": [], "error": "Index not found"}));
}

#[tokio::test]
async fn invalid_field_boost_is_reported_in_results() {
    let app = app(true).await;
    let (status, body) = send(&app, get("/api/search?q=graph&fields=title%5Ehigh")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["error"].as_str().unwrap().contains("title^high"));
}

#[tokio::test]
async fn index_stats_and_mapping_are_exposed() {
    let app = app(true).await;
    let (status, body) = send(&app, get("/api/index/stats")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["index_name"], "arxiv-papers");
    assert_eq!(body["document_count"], 0);
    assert_eq!(body["health"], "green");

    let (status, body) = send(&app, get("/api/index/mapping")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["properties"]["arxiv_id"]["type"], "keyword");

    let (status, body) = send(&app, get("/api/index/settings")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["index"]["number_of_replicas"], 0);
}

#[tokio::test]
async fn stats_for_missing_index_is_not_found() {
    let app = app(false).await;
    let (status, body) = send(&app, get("/api/index/stats")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("arxiv-papers"));
}
