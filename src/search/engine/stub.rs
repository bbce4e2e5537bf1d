//! Scripted engine for exercising the index client without a backend.

use async_trait::async_trait;
use serde_json::Value;

use super::{ClusterHealth, SearchEngine, WriteResult};
use crate::search::error::{Result, SearchError};
use crate::search::request::{RawSearchResponse, SearchRequest};
use crate::search::schema::IndexMapping;

#[derive(Debug, Clone)]
pub(crate) struct StubEngine {
    /// What `create_index` reports as acknowledged.
    pub acknowledged: bool,
    /// `(status, type)` every document write fails with.
    pub write_failure: Option<(u16, &'static str)>,
}

impl Default for StubEngine {
    fn default() -> Self {
        Self {
            acknowledged: true,
            write_failure: None,
        }
    }
}

fn unsupported() -> SearchError {
    SearchError::bad_request("unsupported_operation", "not scripted")
}

#[async_trait]
impl SearchEngine for StubEngine {
    fn kind(&self) -> &'static str {
        "stub"
    }

    async fn index_exists(&self, _index: &str) -> Result<bool> {
        Ok(false)
    }

    async fn create_index(&self, _index: &str, _mapping: &IndexMapping) -> Result<bool> {
        Ok(self.acknowledged)
    }

    async fn delete_index(&self, index: &str) -> Result<()> {
        Err(SearchError::IndexNotFound(index.to_string()))
    }

    async fn index_document(
        &self,
        _index: &str,
        _id: &str,
        _source: &Value,
        _refresh: bool,
    ) -> Result<WriteResult> {
        match self.write_failure {
            Some((status, kind)) => Err(SearchError::Api {
                status,
                kind: kind.to_string(),
                reason: format!("{kind} on write"),
            }),
            None => Ok(WriteResult::Created),
        }
    }

    async fn search(&self, _index: &str, _request: &SearchRequest) -> Result<RawSearchResponse> {
        Err(unsupported())
    }

    async fn count(&self, _index: &str) -> Result<u64> {
        Err(unsupported())
    }

    async fn store_size(&self, _index: &str) -> Result<u64> {
        Err(unsupported())
    }

    async fn cluster_health(&self, _index: Option<&str>) -> Result<ClusterHealth> {
        Err(unsupported())
    }

    async fn cluster_info(&self) -> Result<Value> {
        Err(unsupported())
    }

    async fn get_mapping(&self, _index: &str) -> Result<Value> {
        Err(unsupported())
    }

    async fn get_settings(&self, _index: &str) -> Result<Value> {
        Err(unsupported())
    }
}
