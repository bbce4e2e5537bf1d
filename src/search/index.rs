//! Index lifecycle for the paper index.

use std::sync::Arc;

use crate::search::engine::SearchEngine;
use crate::search::error::{Result, SearchError};
use crate::search::schema::paper_index_mapping;

/// Handle on one named paper index. Cheap to clone; every clone shares the
/// same engine connection.
#[derive(Clone)]
pub struct SearchIndex {
    pub(crate) engine: Arc<dyn SearchEngine>,
    pub(crate) name: String,
}

impl SearchIndex {
    pub fn new(engine: Arc<dyn SearchEngine>, name: impl Into<String>) -> Self {
        Self {
            engine,
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn engine(&self) -> &Arc<dyn SearchEngine> {
        &self.engine
    }

    /// Create the index with the paper mapping.
    ///
    /// Returns `false` when the index already exists and `force` is not set,
    /// or when the engine does not acknowledge the create.
    /// With `force` an existing index is dropped first, so anything written
    /// concurrently with the recreate may be lost.
    pub async fn create_index(&self, force: bool) -> Result<bool> {
        if force {
            self.delete().await?;
        } else if self.exists().await? {
            tracing::info!(index = %self.name, "index already exists");
            return Ok(false);
        }

        match self.engine.create_index(&self.name, &paper_index_mapping()).await {
            Ok(true) => {
                tracing::info!(index = %self.name, "created index");
                Ok(true)
            }
            Ok(false) => {
                tracing::error!(index = %self.name, "index creation was not acknowledged");
                Ok(false)
            }
            // Lost a race with another creator.
            Err(SearchError::IndexAlreadyExists(_)) => {
                tracing::info!(index = %self.name, "index already exists");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn exists(&self) -> Result<bool> {
        self.engine.index_exists(&self.name).await
    }

    /// Drop the index. Deleting a missing index succeeds.
    pub async fn delete(&self) -> Result<()> {
        match self.engine.delete_index(&self.name).await {
            Ok(()) => {
                tracing::info!(index = %self.name, "deleted index");
                Ok(())
            }
            Err(SearchError::IndexNotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }
}
