//! Errors raised by the search engine seam and the index client.

use thiserror::Error;

/// Engine error types that describe a malformed document.
const DOCUMENT_REJECTIONS: &[&str] = &[
    "mapper_parsing_exception",
    "strict_dynamic_mapping_exception",
    "document_parsing_exception",
    "illegal_argument_exception",
];

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("index {0} not found")]
    IndexNotFound(String),
    #[error("index {0} already exists")]
    IndexAlreadyExists(String),
    /// The engine answered but rejected the request.
    #[error("engine returned {status} ({kind}): {reason}")]
    Api {
        status: u16,
        kind: String,
        reason: String,
    },
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("tantivy error: {0}")]
    Tantivy(#[from] tantivy::TantivyError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid engine URL: {0}")]
    InvalidUrl(String),
}

impl SearchError {
    pub(crate) fn bad_request(kind: &str, reason: impl Into<String>) -> Self {
        SearchError::Api {
            status: 400,
            kind: kind.to_string(),
            reason: reason.into(),
        }
    }

    /// True when the engine refused one document rather than the whole call
    /// failing (bad field value, mapping violation). Auth, throttling and
    /// size limits are engine failures, not rejections.
    pub fn is_document_rejection(&self) -> bool {
        matches!(
            self,
            SearchError::Api { status: 400, kind, .. } if DOCUMENT_REJECTIONS.contains(&kind.as_str())
        )
    }
}

pub type Result<T> = std::result::Result<T, SearchError>;
