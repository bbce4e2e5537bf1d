//! Runs built queries and shapes engine responses for callers.

use serde::{Deserialize, Serialize};

use crate::search::document::{PaperDocument, PaperHit};
use crate::search::error::SearchError;
use crate::search::index::SearchIndex;
use crate::search::query::{build_request, QuerySpec};
use crate::search::request::{RawHit, RawSearchResponse};

pub const INDEX_NOT_FOUND: &str = "Index not found";

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct SearchResults {
    pub total: u64,
    pub hits: Vec<PaperHit>,
    /// Set instead of raising when the search could not run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SearchResults {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            total: 0,
            hits: Vec::new(),
            error: Some(message.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

impl SearchIndex {
    /// Search the index. Never fails: a missing index or an engine error
    /// comes back as an empty result with `error` set.
    pub async fn search(&self, spec: &QuerySpec) -> SearchResults {
        let request = build_request(spec);
        match self.engine.search(&self.name, &request).await {
            Ok(response) => {
                let results = format_results(response);
                tracing::debug!(index = %self.name, total = results.total, returned = results.hits.len(), "search finished");
                results
            }
            Err(SearchError::IndexNotFound(_)) => {
                tracing::warn!(index = %self.name, "search against missing index");
                SearchResults::failed(INDEX_NOT_FOUND)
            }
            Err(e) => {
                tracing::error!(index = %self.name, error = %e, "search failed");
                SearchResults::failed(e.to_string())
            }
        }
    }
}

fn format_results(response: RawSearchResponse) -> SearchResults {
    let hits: Vec<PaperHit> = response.hits.hits.into_iter().filter_map(format_hit).collect();
    let total = response
        .hits
        .total
        .map(|total| total.value)
        .unwrap_or(hits.len() as u64);
    SearchResults {
        total,
        hits,
        error: None,
    }
}

fn format_hit(hit: RawHit) -> Option<PaperHit> {
    let mut paper: PaperDocument = match serde_json::from_value(hit.source) {
        Ok(paper) => paper,
        Err(e) => {
            tracing::warn!(id = %hit.id, error = %e, "skipping hit with unreadable source");
            return None;
        }
    };
    if paper.arxiv_id.is_empty() {
        paper.arxiv_id = hit.id;
    }

    Some(PaperHit {
        paper,
        score: hit.score,
        highlights: hit.highlight,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::document::Authors;
    use serde_json::json;

    fn response(value: serde_json::Value) -> RawSearchResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn hits_carry_score_and_highlights() {
        let results = format_results(response(json!({
            "hits": {
                "total": {"value": 42, "relation": "eq"},
                "hits": [{
                    "_id": "2401.00001",
                    "_score": 3.5,
                    "_source": {"arxiv_id": "2401.00001", "title": "Graph Nets", "authors": "A Doe, B Roe"},
                    "highlight": {"title": ["<mark>Graph</mark> Nets"]}
                }]
            }
        })));

        assert_eq!(results.total, 42);
        assert!(results.is_ok());
        let hit = &results.hits[0];
        assert_eq!(hit.paper.arxiv_id, "2401.00001");
        assert_eq!(hit.paper.authors, Authors::Joined("A Doe, B Roe".to_string()));
        assert_eq!(hit.score, Some(3.5));
        assert_eq!(hit.highlights.as_ref().unwrap()["title"], vec!["<mark>Graph</mark> Nets"]);
    }

    #[test]
    fn missing_total_counts_returned_hits() {
        let results = format_results(response(json!({
            "hits": {"hits": [{"_id": "a", "_source": {"title": "x"}}]}
        })));
        assert_eq!(results.total, 1);
        assert_eq!(results.hits[0].paper.arxiv_id, "a");
        assert!(results.hits[0].highlights.is_none());
    }

    #[test]
    fn failed_results_serialize_the_error() {
        let value = serde_json::to_value(SearchResults::failed(INDEX_NOT_FOUND)).unwrap();
        assert_eq!(value, json!({"total": 0, "hits": [], "error": "Index not found"}));
        let ok = serde_json::to_value(SearchResults::default()).unwrap();
        assert!(ok.get("error").is_none());
    }
}
