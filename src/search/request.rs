//! Typed search request and response bodies, serialized in the engine's
//! JSON query DSL.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub query: QueryClause,
    pub size: usize,
    pub from: usize,
    pub track_total_hits: bool,
    #[serde(rename = "_source")]
    pub source: Vec<String>,
    pub highlight: Highlight,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<Vec<SortKey>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum QueryClause {
    Bool(BoolQuery),
    MatchAll(MatchAll),
    MultiMatch(MultiMatch),
    /// Exact-match on any of the listed values, keyed by field name.
    Terms(BTreeMap<String, Vec<String>>),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct BoolQuery {
    #[serde(default)]
    pub must: Vec<QueryClause>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filter: Vec<QueryClause>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct MatchAll {}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MultiMatch {
    pub query: String,
    /// Field names, optionally boosted as `name^boost`.
    pub fields: Vec<String>,
    #[serde(rename = "type", default)]
    pub kind: MultiMatchType,
    #[serde(default)]
    pub operator: Operator,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fuzziness: Option<String>,
    #[serde(default)]
    pub prefix_length: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MultiMatchType {
    /// Score with the single best-matching field.
    #[default]
    BestFields,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    #[default]
    Or,
    And,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Highlight {
    pub fields: BTreeMap<String, HighlightField>,
    pub require_field_match: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct HighlightField {
    /// Window size in characters; ignored when `number_of_fragments` is 0.
    pub fragment_size: usize,
    /// 0 returns the whole field with matches marked.
    pub number_of_fragments: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_tags: Option<Vec<String>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum SortKey {
    /// A built-in key such as `_score`.
    Special(String),
    Field(BTreeMap<String, FieldSort>),
}

pub const SCORE_KEY: &str = "_score";

impl SortKey {
    pub fn score() -> Self {
        SortKey::Special(SCORE_KEY.to_string())
    }

    pub fn field(name: &str, order: SortOrder) -> Self {
        let mut key = BTreeMap::new();
        key.insert(name.to_string(), FieldSort { order });
        SortKey::Field(key)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct FieldSort {
    pub order: SortOrder,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RawSearchResponse {
    pub hits: RawHits,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RawHits {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<TotalHits>,
    #[serde(default)]
    pub hits: Vec<RawHit>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct TotalHits {
    pub value: u64,
    #[serde(default)]
    pub relation: TotalRelation,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TotalRelation {
    #[default]
    Eq,
    Gte,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RawHit {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(rename = "_score", default)]
    pub score: Option<f32>,
    #[serde(rename = "_source", default)]
    pub source: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlight: Option<HashMap<String, Vec<String>>>,
}
