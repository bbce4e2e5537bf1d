//! Operator-facing introspection. Every call propagates engine errors.

use serde::{Deserialize, Serialize};

use crate::search::engine::{ClusterHealth, HealthStatus};
use crate::search::error::Result;
use crate::search::index::SearchIndex;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct IndexStats {
    pub index_name: String,
    pub document_count: u64,
    pub size_in_bytes: u64,
    pub health: HealthStatus,
}

impl SearchIndex {
    /// True for a green or yellow cluster.
    pub async fn health_check(&self) -> Result<bool> {
        Ok(self.cluster_health().await?.status.is_healthy())
    }

    pub async fn cluster_health(&self) -> Result<ClusterHealth> {
        self.engine.cluster_health(None).await
    }

    pub async fn document_count(&self) -> Result<u64> {
        self.engine.count(&self.name).await
    }

    pub async fn size_in_bytes(&self) -> Result<u64> {
        self.engine.store_size(&self.name).await
    }

    /// Count, size and index-level health in one call.
    pub async fn index_stats(&self) -> Result<IndexStats> {
        let document_count = self.document_count().await?;
        let size_in_bytes = self.size_in_bytes().await?;
        let health = self.engine.cluster_health(Some(self.name.as_str())).await?;
        Ok(IndexStats {
            index_name: self.name.clone(),
            document_count,
            size_in_bytes,
            health: health.status,
        })
    }

    pub async fn cluster_info(&self) -> Result<serde_json::Value> {
        self.engine.cluster_info().await
    }

    pub async fn mapping(&self) -> Result<serde_json::Value> {
        self.engine.get_mapping(&self.name).await
    }

    pub async fn settings(&self) -> Result<serde_json::Value> {
        self.engine.get_settings(&self.name).await
    }
}
