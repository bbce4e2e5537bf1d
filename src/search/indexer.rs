//! Single and bulk document upserts.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::search::document::PaperDocument;
use crate::search::error::{Result, SearchError};
use crate::search::index::SearchIndex;

/// Aggregate outcome of a bulk run. Per-document errors are logged, not kept.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkIndexResult {
    pub success: usize,
    pub failed: usize,
}

impl BulkIndexResult {
    pub fn total(&self) -> usize {
        self.success + self.failed
    }
}

impl SearchIndex {
    /// Upsert one paper under its `arxiv_id` and wait until it is searchable.
    ///
    /// A record without an id, or one the engine rejects as malformed, gives
    /// `Ok(false)` and nothing is written. Transport failures and a missing
    /// index are errors.
    pub async fn index_document(&self, doc: &PaperDocument) -> Result<bool> {
        let Some(prepared) = doc.prepared(Utc::now()) else {
            tracing::warn!(index = %self.name, title = %doc.title, "document has no arxiv_id, skipping");
            return Ok(false);
        };

        let source = serde_json::to_value(&prepared)?;
        match self
            .engine
            .index_document(&self.name, &prepared.arxiv_id, &source, true)
            .await
        {
            Ok(result) => {
                tracing::debug!(index = %self.name, arxiv_id = %prepared.arxiv_id, ?result, "indexed document");
                Ok(result.is_written())
            }
            Err(SearchError::IndexNotFound(name)) => Err(SearchError::IndexNotFound(name)),
            Err(e) if e.is_document_rejection() => {
                tracing::warn!(index = %self.name, arxiv_id = %prepared.arxiv_id, error = %e, "engine rejected document");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Index each document in turn. One write per document, no atomicity:
    /// a failure midway leaves earlier documents written.
    pub async fn bulk_index(&self, docs: &[PaperDocument]) -> BulkIndexResult {
        let mut result = BulkIndexResult::default();

        for doc in docs {
            match self.index_document(doc).await {
                Ok(true) => result.success += 1,
                Ok(false) => result.failed += 1,
                Err(e) => {
                    tracing::error!(index = %self.name, arxiv_id = %doc.arxiv_id, error = %e, "failed to index document");
                    result.failed += 1;
                }
            }
        }

        tracing::info!(
            index = %self.name,
            success = result.success,
            failed = result.failed,
            "bulk indexing finished"
        );
        result
    }
}
