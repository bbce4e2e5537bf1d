use axum::{
    body::Body,
    extract::{Query, State},
    http::{Request, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod config;
pub mod db;
pub mod logging;
pub mod search;

use config::Settings;
use search::{
    BulkIndexResult, FieldBoost, IndexStats, PaperDocument, QuerySpec, SearchError, SearchIndex,
    SearchResults, SortMode,
};

/// Largest page the API hands out, whatever the caller asks for.
pub const MAX_PAGE_SIZE: usize = 100;
const DEFAULT_PAGE_SIZE: usize = 10;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
pub struct Message {
    pub message: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ApiError {
    pub error: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub environment: String,
    pub service_name: String,
    pub search: ServiceStatus,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ServiceStatus {
    pub healthy: bool,
    pub message: String,
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

fn engine_error(e: SearchError) -> (StatusCode, Json<ApiError>) {
    let status = match e {
        SearchError::IndexNotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status, Json(ApiError { error: e.to_string() }))
}

// ============================================================================
// Query Parameters
// ============================================================================

#[derive(Deserialize, Debug, Default)]
pub struct SearchParams {
    pub q: Option<String>,
    /// Comma-separated category filter.
    pub categories: Option<String>,
    /// Comma-separated `field^boost` list.
    pub fields: Option<String>,
    pub size: Option<usize>,
    pub from: Option<usize>,
    /// Newest first instead of relevance.
    pub latest: Option<bool>,
    pub track_total_hits: Option<bool>,
}

impl SearchParams {
    pub fn to_spec(&self) -> Result<QuerySpec, String> {
        let fields = split_list(self.fields.as_deref())
            .map(|f| f.parse::<FieldBoost>().map_err(|e| e.to_string()))
            .collect::<Result<Vec<_>, _>>()?;

        let sort_mode = if self.latest.unwrap_or(false) {
            SortMode::Recency
        } else {
            SortMode::Relevance
        };

        Ok(QuerySpec::new(self.q.clone().unwrap_or_default())
            .with_fields(fields)
            .with_categories(split_list(self.categories.as_deref()))
            .with_size(self.size.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE))
            .with_from(self.from.unwrap_or(0))
            .with_track_total_hits(self.track_total_hits.unwrap_or(true))
            .with_sort_mode(sort_mode))
    }
}

fn split_list(raw: Option<&str>) -> impl Iterator<Item = &str> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

// ============================================================================
// App State
// ============================================================================

#[derive(Clone)]
pub struct AppState {
    pub index: SearchIndex,
    pub settings: Arc<Settings>,
}

// ============================================================================
// Router Setup
// ============================================================================

pub fn create_app(index: SearchIndex, settings: Arc<Settings>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let state = AppState { index, settings };

    Router::new()
        .route("/", get(root))
        .route("/api/health", get(health_check))
        // Search
        .route("/api/search", get(search_papers))
        // Index administration
        .route("/api/index/stats", get(index_stats))
        .route("/api/index/mapping", get(index_mapping))
        .route("/api/index/settings", get(index_settings))
        .route("/api/index/papers", post(index_papers))
        .layer(cors)
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
            tracing::info_span!(
                "request",
                id = %uuid::Uuid::new_v4(),
                method = %request.method(),
                uri = %request.uri(),
            )
        }))
        .with_state(state)
}

// ============================================================================
// Handlers: Health
// ============================================================================

async fn root(State(state): State<AppState>) -> Json<Message> {
    Json(Message {
        message: format!("{} - v{}", state.settings.service_name, state.settings.app_version),
    })
}

async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let search = match state.index.health_check().await {
        Ok(true) => ServiceStatus {
            healthy: true,
            message: format!("{} reachable", state.index.engine().kind()),
        },
        Ok(false) => ServiceStatus {
            healthy: false,
            message: "cluster status is red".to_string(),
        },
        Err(e) => {
            tracing::warn!(error = %e, "search engine health check failed");
            ServiceStatus {
                healthy: false,
                message: e.to_string(),
            }
        }
    };

    let (code, status) = if search.healthy {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };
    let settings = &state.settings;
    (
        code,
        Json(HealthResponse {
            status: status.to_string(),
            version: settings.app_version.clone(),
            environment: settings.environment.as_str().to_string(),
            service_name: settings.service_name.clone(),
            search,
        }),
    )
}

// ============================================================================
// Handlers: Search
// ============================================================================

async fn search_papers(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Json<SearchResults> {
    match params.to_spec() {
        Ok(spec) => Json(state.index.search(&spec).await),
        Err(message) => Json(SearchResults::failed(message)),
    }
}

// ============================================================================
// Handlers: Index administration
// ============================================================================

async fn index_stats(State(state): State<AppState>) -> ApiResult<IndexStats> {
    state.index.index_stats().await.map(Json).map_err(engine_error)
}

async fn index_mapping(State(state): State<AppState>) -> ApiResult<serde_json::Value> {
    state.index.mapping().await.map(Json).map_err(engine_error)
}

async fn index_settings(State(state): State<AppState>) -> ApiResult<serde_json::Value> {
    state.index.settings().await.map(Json).map_err(engine_error)
}

async fn index_papers(
    State(state): State<AppState>,
    Json(papers): Json<Vec<PaperDocument>>,
) -> Json<BulkIndexResult> {
    Json(state.index.bulk_index(&papers).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_map_onto_query_spec() {
        let params = SearchParams {
            q: Some("graph networks".to_string()),
            categories: Some("cs.AI, cs.LG,".to_string()),
            fields: Some("title^5,abstract".to_string()),
            size: Some(500),
            from: Some(20),
            latest: Some(true),
            track_total_hits: Some(false),
        };
        let spec = params.to_spec().unwrap();
        assert_eq!(spec.text, "graph networks");
        assert_eq!(spec.categories, vec!["cs.AI", "cs.LG"]);
        assert_eq!(spec.fields, vec![FieldBoost::new("title", 5.0), FieldBoost::new("abstract", 1.0)]);
        assert_eq!(spec.size, MAX_PAGE_SIZE);
        assert_eq!(spec.from, 20);
        assert_eq!(spec.sort_mode, SortMode::Recency);
        assert!(!spec.track_total_hits);
    }

    #[test]
    fn empty_params_use_defaults() {
        let spec = SearchParams::default().to_spec().unwrap();
        assert_eq!(spec, QuerySpec::default().with_size(DEFAULT_PAGE_SIZE));
    }

    #[test]
    fn bad_field_boost_is_reported() {
        let params = SearchParams {
            fields: Some("title^x".to_string()),
            ..Default::default()
        };
        assert!(params.to_spec().is_err());
    }
}
