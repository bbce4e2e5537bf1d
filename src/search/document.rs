//! The indexable paper record and its query-time view.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashMap;

/// Separator used when an author list is flattened for storage.
pub const AUTHOR_SEPARATOR: &str = ", ";

/// Authors as supplied by ingestion (ordered names) or as stored in the
/// index (one delimited string).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum Authors {
    List(Vec<String>),
    Joined(String),
}

impl Default for Authors {
    fn default() -> Self {
        Authors::Joined(String::new())
    }
}

impl Authors {
    pub fn joined(&self) -> Cow<'_, str> {
        match self {
            Authors::List(names) => Cow::Owned(names.join(AUTHOR_SEPARATOR)),
            Authors::Joined(joined) => Cow::Borrowed(joined),
        }
    }

    /// Collapse an ordered list into its stored string form.
    pub fn normalized(self) -> Self {
        match self {
            Authors::List(names) => Authors::Joined(names.join(AUTHOR_SEPARATOR)),
            joined => joined,
        }
    }
}

impl From<Vec<String>> for Authors {
    fn from(names: Vec<String>) -> Self {
        Authors::List(names)
    }
}

/// A paper as written to the search index. `arxiv_id` doubles as the
/// engine-level document id, so re-indexing the same id overwrites.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct PaperDocument {
    #[serde(default)]
    pub arxiv_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub authors: Authors,
    #[serde(default)]
    pub r#abstract: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl PaperDocument {
    pub fn has_id(&self) -> bool {
        !self.arxiv_id.trim().is_empty()
    }

    /// Normalize a copy for writing: fill missing timestamps with `now` and
    /// join the author list. Returns `None` when the record has no id.
    pub fn prepared(&self, now: DateTime<Utc>) -> Option<PaperDocument> {
        if !self.has_id() {
            return None;
        }

        let mut prepared = self.clone();
        prepared.created_at.get_or_insert(now);
        prepared.updated_at.get_or_insert(now);
        prepared.authors = prepared.authors.normalized();
        Some(prepared)
    }
}

/// One search hit: the stored fields plus the score and highlight fragments
/// attached by the executor. Neither is ever written to the index.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PaperHit {
    #[serde(flatten)]
    pub paper: PaperDocument,
    pub score: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlights: Option<HashMap<String, Vec<String>>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> PaperDocument {
        PaperDocument {
            arxiv_id: "2401.00001".to_string(),
            title: "Graph Nets".to_string(),
            authors: Authors::List(vec!["A Doe".to_string(), "B Roe".to_string()]),
            ..Default::default()
        }
    }

    #[test]
    fn prepared_joins_authors() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let prepared = sample().prepared(now).unwrap();
        assert_eq!(prepared.authors, Authors::Joined("A Doe, B Roe".to_string()));
    }

    #[test]
    fn prepared_fills_only_missing_timestamps() {
        let created = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let mut doc = sample();
        doc.created_at = Some(created);

        let prepared = doc.prepared(now).unwrap();
        assert_eq!(prepared.created_at, Some(created));
        assert_eq!(prepared.updated_at, Some(now));
    }

    #[test]
    fn prepared_rejects_blank_id() {
        let mut doc = sample();
        doc.arxiv_id = "   ".to_string();
        assert!(doc.prepared(Utc::now()).is_none());
    }

    #[test]
    fn authors_accept_either_shape() {
        let listed: PaperDocument =
            serde_json::from_str(r#"{"arxiv_id":"1","authors":["A","B"]}"#).unwrap();
        let joined: PaperDocument =
            serde_json::from_str(r#"{"arxiv_id":"1","authors":"A, B"}"#).unwrap();
        assert_eq!(listed.authors.joined(), "A, B");
        assert_eq!(joined.authors.joined(), "A, B");
    }

    #[test]
    fn missing_id_deserializes_as_empty() {
        let doc: PaperDocument = serde_json::from_str(r#"{"title":"No id"}"#).unwrap();
        assert!(!doc.has_id());
    }

    #[test]
    fn hit_flattens_paper_fields() {
        let hit = PaperHit {
            paper: sample().prepared(Utc::now()).unwrap(),
            score: Some(1.5),
            highlights: None,
        };
        let value = serde_json::to_value(&hit).unwrap();
        assert_eq!(value["arxiv_id"], "2401.00001");
        assert_eq!(value["authors"], "A Doe, B Roe");
        assert_eq!(value["score"], 1.5);
        assert!(value.get("highlights").is_none());
    }
}
