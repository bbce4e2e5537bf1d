//! Paper search: index lifecycle, ingestion, query building and execution
//! against a pluggable search engine.

pub mod diagnostics;
pub mod document;
pub mod engine;
pub mod error;
pub mod executor;
pub mod index;
pub mod indexer;
pub mod query;
pub mod request;
pub mod schema;

pub use diagnostics::IndexStats;
pub use document::{Authors, PaperDocument, PaperHit};
pub use engine::{connect, SearchEngine};
pub use error::{Result, SearchError};
pub use executor::{SearchResults, INDEX_NOT_FOUND};
pub use index::SearchIndex;
pub use indexer::BulkIndexResult;
pub use query::{build_request, FieldBoost, QuerySpec, SortMode};
pub use schema::paper_index_mapping;
