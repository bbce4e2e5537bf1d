//! The search engine seam. Everything above this module talks to an
//! `Arc<dyn SearchEngine>`; the two backends are the OpenSearch REST API and
//! an embedded tantivy engine speaking the same request model.

pub mod embedded;
pub mod http;
#[cfg(test)]
pub(crate) mod stub;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::{EngineKind, SearchSettings};
use crate::search::error::Result;
use crate::search::request::{RawSearchResponse, SearchRequest};
use crate::search::schema::IndexMapping;

pub use embedded::TantivyEngine;
pub use http::OpenSearchEngine;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Green,
    Yellow,
    Red,
}

impl HealthStatus {
    /// Green and yellow clusters serve reads and writes.
    pub fn is_healthy(self) -> bool {
        matches!(self, HealthStatus::Green | HealthStatus::Yellow)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ClusterHealth {
    #[serde(default)]
    pub cluster_name: String,
    pub status: HealthStatus,
    #[serde(default)]
    pub number_of_nodes: u32,
}

/// Outcome of a single-document write.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WriteResult {
    Created,
    Updated,
    #[serde(other)]
    Other,
}

impl WriteResult {
    pub fn is_written(self) -> bool {
        matches!(self, WriteResult::Created | WriteResult::Updated)
    }
}

#[async_trait]
pub trait SearchEngine: Send + Sync {
    /// Short backend name for logs.
    fn kind(&self) -> &'static str;

    async fn index_exists(&self, index: &str) -> Result<bool>;

    /// Create `index` with `mapping`; returns whether the engine acknowledged.
    /// An existing index is [`SearchError::IndexAlreadyExists`](crate::search::SearchError).
    async fn create_index(&self, index: &str, mapping: &IndexMapping) -> Result<bool>;

    async fn delete_index(&self, index: &str) -> Result<()>;

    /// Upsert `source` under `id`. With `refresh` the document is searchable
    /// before the call returns.
    async fn index_document(
        &self,
        index: &str,
        id: &str,
        source: &serde_json::Value,
        refresh: bool,
    ) -> Result<WriteResult>;

    async fn search(&self, index: &str, request: &SearchRequest) -> Result<RawSearchResponse>;

    async fn count(&self, index: &str) -> Result<u64>;

    /// Bytes on disk (or in memory) used by the index.
    async fn store_size(&self, index: &str) -> Result<u64>;

    async fn cluster_health(&self, index: Option<&str>) -> Result<ClusterHealth>;

    async fn cluster_info(&self) -> Result<serde_json::Value>;

    async fn get_mapping(&self, index: &str) -> Result<serde_json::Value>;

    async fn get_settings(&self, index: &str) -> Result<serde_json::Value>;
}

/// Construct the configured engine. Called once per process; the handle is
/// shared by every component.
pub fn connect(settings: &SearchSettings) -> anyhow::Result<Arc<dyn SearchEngine>> {
    let engine: Arc<dyn SearchEngine> = match settings.engine {
        EngineKind::OpenSearch => Arc::new(OpenSearchEngine::new(settings)?),
        EngineKind::Embedded => match settings.embedded_path {
            Some(ref path) => Arc::new(TantivyEngine::open(path, settings.writer_heap_bytes)?),
            None => Arc::new(TantivyEngine::in_memory(settings.writer_heap_bytes)),
        },
    };

    tracing::info!(
        engine = engine.kind(),
        host = %settings.host,
        index = %settings.index_name,
        "search engine client initialized"
    );
    Ok(engine)
}
