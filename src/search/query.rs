//! Query specification and the builder that turns it into a ranked,
//! filtered, highlighted search request.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::search::request::{
    BoolQuery, Highlight, HighlightField, MatchAll, MultiMatch, MultiMatchType, Operator,
    QueryClause, SearchRequest, SortKey, SortOrder,
};
use crate::search::schema::{
    ABSTRACT, ARXIV_ID, AUTHORS, CATEGORIES, PDF_URL, PUBLISHED_DATE, TITLE,
};

/// Fields returned in each hit's source. Score and highlights are attached
/// when results are formatted, never requested here.
pub const SOURCE_FIELDS: [&str; 7] = [
    ARXIV_ID,
    TITLE,
    AUTHORS,
    ABSTRACT,
    CATEGORIES,
    PUBLISHED_DATE,
    PDF_URL,
];

pub const HIGHLIGHT_PRE_TAG: &str = "<mark>";
pub const HIGHLIGHT_POST_TAG: &str = "</mark>";
const ABSTRACT_FRAGMENT_SIZE: usize = 150;
const ABSTRACT_FRAGMENTS: usize = 3;
/// Leading characters of each term that must match exactly before
/// fuzziness applies.
const FUZZY_PREFIX_LENGTH: usize = 2;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    /// Engine relevance order; an explicit date sort only when there is no text.
    #[default]
    Relevance,
    /// Newest first, relevance as tie-break.
    Recency,
}

/// A searchable field and the multiplier applied to its relevance score.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldBoost {
    pub field: String,
    pub boost: f32,
}

impl FieldBoost {
    pub fn new(field: &str, boost: f32) -> Self {
        Self {
            field: field.to_string(),
            boost,
        }
    }
}

impl fmt::Display for FieldBoost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}^{}", self.field, self.boost)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFieldBoostError(String);

impl fmt::Display for ParseFieldBoostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid field boost {:?}", self.0)
    }
}

impl std::error::Error for ParseFieldBoostError {}

impl FromStr for FieldBoost {
    type Err = ParseFieldBoostError;

    /// Parses `title` or `title^3`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseFieldBoostError(s.to_string());
        let (field, boost) = match s.trim().split_once('^') {
            Some((field, boost)) => (field, boost.parse::<f32>().map_err(|_| invalid())?),
            None => (s.trim(), 1.0),
        };
        if field.is_empty() || !boost.is_finite() || boost < 0.0 {
            return Err(invalid());
        }
        Ok(FieldBoost::new(field, boost))
    }
}

pub fn default_search_fields() -> Vec<FieldBoost> {
    vec![
        FieldBoost::new(TITLE, 3.0),
        FieldBoost::new(ABSTRACT, 2.0),
        FieldBoost::new(AUTHORS, 1.0),
    ]
}

/// One search request's parameters. Built fresh per request.
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySpec {
    /// Raw query text; blank text matches every document.
    pub text: String,
    pub fields: Vec<FieldBoost>,
    /// Restrict to documents carrying any of these categories.
    pub categories: Vec<String>,
    pub size: usize,
    pub from: usize,
    pub track_total_hits: bool,
    pub sort_mode: SortMode,
}

impl Default for QuerySpec {
    fn default() -> Self {
        Self {
            text: String::new(),
            fields: default_search_fields(),
            categories: Vec::new(),
            size: 10,
            from: 0,
            track_total_hits: true,
            sort_mode: SortMode::Relevance,
        }
    }
}

impl QuerySpec {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// Replace the weighted field list. An empty list keeps the defaults.
    pub fn with_fields(mut self, fields: Vec<FieldBoost>) -> Self {
        if !fields.is_empty() {
            self.fields = fields;
        }
        self
    }

    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = categories.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    pub fn with_from(mut self, from: usize) -> Self {
        self.from = from;
        self
    }

    pub fn with_track_total_hits(mut self, track: bool) -> Self {
        self.track_total_hits = track;
        self
    }

    pub fn with_sort_mode(mut self, sort_mode: SortMode) -> Self {
        self.sort_mode = sort_mode;
        self
    }

    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }

    /// True when the request must carry the explicit date-then-score sort.
    pub fn sorts_by_date(&self) -> bool {
        self.sort_mode == SortMode::Recency || !self.has_text()
    }
}

/// Build the engine request body for a query specification.
pub fn build_request(spec: &QuerySpec) -> SearchRequest {
    SearchRequest {
        query: build_query(spec),
        size: spec.size,
        from: spec.from,
        track_total_hits: spec.track_total_hits,
        source: SOURCE_FIELDS.iter().map(|f| f.to_string()).collect(),
        highlight: build_highlight(),
        sort: build_sort(spec),
    }
}

fn build_query(spec: &QuerySpec) -> QueryClause {
    let must = if spec.has_text() {
        build_text_query(spec)
    } else {
        QueryClause::MatchAll(MatchAll {})
    };

    QueryClause::Bool(BoolQuery {
        must: vec![must],
        filter: build_filters(spec),
    })
}

fn build_text_query(spec: &QuerySpec) -> QueryClause {
    QueryClause::MultiMatch(MultiMatch {
        query: spec.text.clone(),
        fields: spec.fields.iter().map(ToString::to_string).collect(),
        kind: MultiMatchType::BestFields,
        operator: Operator::Or,
        fuzziness: Some("AUTO".to_string()),
        prefix_length: FUZZY_PREFIX_LENGTH,
    })
}

fn build_filters(spec: &QuerySpec) -> Vec<QueryClause> {
    let mut filters = Vec::new();

    if !spec.categories.is_empty() {
        let mut terms = BTreeMap::new();
        terms.insert(CATEGORIES.to_string(), spec.categories.clone());
        filters.push(QueryClause::Terms(terms));
    }

    filters
}

fn build_highlight() -> Highlight {
    let marked = |fragment_size, number_of_fragments| HighlightField {
        fragment_size,
        number_of_fragments,
        pre_tags: Some(vec![HIGHLIGHT_PRE_TAG.to_string()]),
        post_tags: Some(vec![HIGHLIGHT_POST_TAG.to_string()]),
    };

    let mut fields = BTreeMap::new();
    // Short fields come back whole.
    fields.insert(TITLE.to_string(), marked(0, 0));
    fields.insert(AUTHORS.to_string(), marked(0, 0));
    fields.insert(
        ABSTRACT.to_string(),
        marked(ABSTRACT_FRAGMENT_SIZE, ABSTRACT_FRAGMENTS),
    );

    Highlight {
        fields,
        require_field_match: false,
    }
}

fn build_sort(spec: &QuerySpec) -> Option<Vec<SortKey>> {
    if spec.sorts_by_date() {
        Some(vec![
            SortKey::field(PUBLISHED_DATE, SortOrder::Desc),
            SortKey::score(),
        ])
    } else {
        None
    }
}
