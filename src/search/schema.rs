//! The fixed paper index mapping and its tantivy rendition.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tantivy::schema::{
    Field, IndexRecordOption, Schema, TextFieldIndexing, TextOptions, FAST, INDEXED, STORED,
    STRING,
};
use tantivy::tokenizer::{
    Language, LowerCaser, RemoveLongFilter, SimpleTokenizer, Stemmer, TextAnalyzer,
};
use tantivy::Index;

use crate::search::error::{Result, SearchError};

pub const ARXIV_PAPERS_INDEX: &str = "arxiv-papers";

pub const ARXIV_ID: &str = "arxiv_id";
pub const TITLE: &str = "title";
pub const ABSTRACT: &str = "abstract";
pub const AUTHORS: &str = "authors";
pub const CATEGORIES: &str = "categories";
pub const PUBLISHED_DATE: &str = "published_date";
pub const PDF_URL: &str = "pdf_url";
pub const CREATED_AT: &str = "created_at";
pub const UPDATED_AT: &str = "updated_at";

/// Stemming analyzer for long free-text fields.
pub const TEXT_ANALYZER: &str = "text_analyzer";
/// Lowercasing analyzer for names, no stemming.
pub const STANDARD_ANALYZER: &str = "standard_analyzer";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct IndexMapping {
    pub settings: IndexSettings,
    pub mappings: Mappings,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct IndexSettings {
    pub number_of_shards: u32,
    pub number_of_replicas: u32,
    pub analysis: Analysis,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Analysis {
    pub analyzer: BTreeMap<String, AnalyzerDef>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AnalyzerDef {
    #[serde(rename = "type")]
    pub kind: String,
    pub tokenizer: String,
    #[serde(default)]
    pub filter: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Mappings {
    pub dynamic: String,
    pub properties: BTreeMap<String, FieldMapping>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Keyword,
    Date,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FieldMapping {
    #[serde(rename = "type")]
    pub kind: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analyzer: Option<String>,
}

impl FieldMapping {
    fn text(analyzer: &str) -> Self {
        Self {
            kind: FieldType::Text,
            analyzer: Some(analyzer.to_string()),
        }
    }

    fn keyword() -> Self {
        Self {
            kind: FieldType::Keyword,
            analyzer: None,
        }
    }

    fn date() -> Self {
        Self {
            kind: FieldType::Date,
            analyzer: None,
        }
    }
}

impl Mappings {
    pub fn is_strict(&self) -> bool {
        self.dynamic == "strict"
    }
}

/// The mapping every paper index is created with. Field names and the
/// analyzed-vs-exact split must stay stable for existing indexed data.
pub fn paper_index_mapping() -> IndexMapping {
    let mut analyzer = BTreeMap::new();
    analyzer.insert(
        TEXT_ANALYZER.to_string(),
        AnalyzerDef {
            kind: "custom".to_string(),
            tokenizer: "standard".to_string(),
            filter: vec!["lowercase".to_string(), "snowball".to_string()],
        },
    );
    analyzer.insert(
        STANDARD_ANALYZER.to_string(),
        AnalyzerDef {
            kind: "custom".to_string(),
            tokenizer: "standard".to_string(),
            filter: vec!["lowercase".to_string()],
        },
    );

    let mut properties = BTreeMap::new();
    properties.insert(ARXIV_ID.to_string(), FieldMapping::keyword());
    properties.insert(TITLE.to_string(), FieldMapping::text(TEXT_ANALYZER));
    properties.insert(ABSTRACT.to_string(), FieldMapping::text(TEXT_ANALYZER));
    properties.insert(AUTHORS.to_string(), FieldMapping::text(STANDARD_ANALYZER));
    properties.insert(CATEGORIES.to_string(), FieldMapping::keyword());
    properties.insert(PUBLISHED_DATE.to_string(), FieldMapping::date());
    properties.insert(PDF_URL.to_string(), FieldMapping::keyword());
    properties.insert(CREATED_AT.to_string(), FieldMapping::date());
    properties.insert(UPDATED_AT.to_string(), FieldMapping::date());

    IndexMapping {
        settings: IndexSettings {
            number_of_shards: 1,
            number_of_replicas: 0,
            analysis: Analysis { analyzer },
        },
        mappings: Mappings {
            dynamic: "strict".to_string(),
            properties,
        },
    }
}

/// Engine-internal document id.
pub const ID_FIELD: &str = "_id";
/// Full source JSON, stored only.
pub const SOURCE_FIELD: &str = "_source";

/// Tantivy schema derived from an [`IndexMapping`], with field handles.
#[derive(Clone)]
pub struct IndexSchema {
    pub schema: Schema,
    pub id: Field,
    pub source: Field,
    pub fields: BTreeMap<String, (Field, FieldType)>,
}

impl IndexSchema {
    pub fn from_mapping(mapping: &IndexMapping) -> Result<Self> {
        let mut schema_builder = Schema::builder();

        let id = schema_builder.add_text_field(ID_FIELD, STRING | STORED);
        let source = schema_builder.add_text_field(SOURCE_FIELD, STORED);

        let mut fields = BTreeMap::new();
        for (name, field_mapping) in &mapping.mappings.properties {
            let field = match field_mapping.kind {
                FieldType::Text => {
                    let analyzer = field_mapping.analyzer.as_deref().unwrap_or(STANDARD_ANALYZER);
                    if analyzer != STANDARD_ANALYZER
                        && !mapping.settings.analysis.analyzer.contains_key(analyzer)
                    {
                        return Err(SearchError::bad_request(
                            "mapper_parsing_exception",
                            format!("analyzer [{analyzer}] has not been configured in mappings"),
                        ));
                    }
                    let text_options = TextOptions::default().set_indexing_options(
                        TextFieldIndexing::default()
                            .set_tokenizer(analyzer)
                            .set_index_option(IndexRecordOption::WithFreqsAndPositions),
                    );
                    schema_builder.add_text_field(name, text_options)
                }
                FieldType::Keyword => schema_builder.add_text_field(name, STRING),
                FieldType::Date => schema_builder.add_date_field(name, INDEXED | FAST),
            };
            fields.insert(name.clone(), (field, field_mapping.kind));
        }

        Ok(Self {
            schema: schema_builder.build(),
            id,
            source,
            fields,
        })
    }

    pub fn field(&self, name: &str) -> Option<(Field, FieldType)> {
        self.fields.get(name).copied()
    }
}

/// Register the analyzers a mapping declares with a tantivy index.
pub fn register_analyzers(index: &Index, mapping: &IndexMapping) {
    let tokenizer_manager = index.tokenizers();
    tokenizer_manager.register(STANDARD_ANALYZER, build_analyzer(&[]));
    for (name, def) in &mapping.settings.analysis.analyzer {
        tokenizer_manager.register(name, build_analyzer(&def.filter));
    }
}

fn build_analyzer(filters: &[String]) -> TextAnalyzer {
    let stem = filters.iter().any(|f| f == "snowball" || f == "stemmer");
    let builder = TextAnalyzer::builder(SimpleTokenizer::default())
        .filter(RemoveLongFilter::limit(40))
        .filter(LowerCaser);
    if stem {
        builder.filter(Stemmer::new(Language::English)).build()
    } else {
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapping_types_exact_and_analyzed_fields() {
        let mapping = paper_index_mapping();
        let props = &mapping.mappings.properties;
        assert_eq!(props[TITLE].kind, FieldType::Text);
        assert_eq!(props[ABSTRACT].kind, FieldType::Text);
        assert_eq!(props[CATEGORIES].kind, FieldType::Keyword);
        assert_eq!(props[ARXIV_ID].kind, FieldType::Keyword);
        assert_eq!(props[PDF_URL].kind, FieldType::Keyword);
        assert_eq!(props[PUBLISHED_DATE].kind, FieldType::Date);
        assert!(mapping.mappings.is_strict());
    }

    #[test]
    fn mapping_serializes_in_engine_shape() {
        let value = serde_json::to_value(paper_index_mapping()).unwrap();
        assert_eq!(value["mappings"]["properties"]["title"]["type"], "text");
        assert_eq!(value["mappings"]["properties"]["title"]["analyzer"], TEXT_ANALYZER);
        assert_eq!(value["mappings"]["properties"]["categories"]["type"], "keyword");
        assert!(value["mappings"]["properties"]["categories"].get("analyzer").is_none());
        assert_eq!(value["settings"]["analysis"]["analyzer"]["text_analyzer"]["type"], "custom");
    }

    #[test]
    fn schema_has_every_mapped_field() {
        let schema = IndexSchema::from_mapping(&paper_index_mapping()).unwrap();
        for name in [ARXIV_ID, TITLE, ABSTRACT, AUTHORS, CATEGORIES, PUBLISHED_DATE, PDF_URL] {
            assert!(schema.field(name).is_some(), "missing {name}");
        }
        assert!(schema.schema.get_field(ID_FIELD).is_ok());
    }

    #[test]
    fn unknown_analyzer_is_rejected() {
        let mut mapping = paper_index_mapping();
        mapping
            .mappings
            .properties
            .insert("notes".to_string(), FieldMapping::text("missing_analyzer"));
        assert!(IndexSchema::from_mapping(&mapping).is_err());
    }
}
