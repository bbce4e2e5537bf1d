//! In-process engine on tantivy. Interprets the same request model the
//! OpenSearch backend sends over the wire, so the query builder can be run
//! end to end without a cluster.

mod highlight;
mod translate;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde_json::{json, Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tantivy::collector::{Count, TopDocs};
use tantivy::query::TermQuery;
use tantivy::schema::{IndexRecordOption, Value as _};
use tantivy::{DocAddress, Index, IndexReader, IndexWriter, ReloadPolicy, Searcher, TantivyDocument, Term};

use crate::search::engine::{ClusterHealth, HealthStatus, SearchEngine, WriteResult};
use crate::search::error::{Result, SearchError};
use crate::search::request::{
    RawHit, RawHits, RawSearchResponse, SearchRequest, SortKey, SortOrder, TotalHits,
    TotalRelation, SCORE_KEY,
};
use crate::search::schema::{register_analyzers, FieldType, IndexMapping, IndexSchema};

/// Tantivy refuses smaller per-thread writer budgets.
const MIN_WRITER_HEAP: usize = 15_000_000;
/// Hit count reported as a lower bound when exact totals are not tracked.
const UNTRACKED_TOTAL_LIMIT: u64 = 10_000;
const MAPPING_FILE: &str = "mapping.json";

pub struct TantivyEngine {
    /// `None` keeps every index in RAM.
    root: Option<PathBuf>,
    writer_heap_bytes: usize,
    indices: RwLock<HashMap<String, Arc<EmbeddedIndex>>>,
}

struct EmbeddedIndex {
    index: Index,
    reader: IndexReader,
    writer: Mutex<IndexWriter>,
    schema: IndexSchema,
    mapping: IndexMapping,
}

impl EmbeddedIndex {
    fn new(index: Index, schema: IndexSchema, mapping: IndexMapping, heap: usize) -> Result<Self> {
        register_analyzers(&index, &mapping);

        let writer = index.writer_with_num_threads(1, heap.max(MIN_WRITER_HEAP))?;
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;

        Ok(Self {
            index,
            reader,
            writer: Mutex::new(writer),
            schema,
            mapping,
        })
    }

    /// Replace whatever is stored under `id_term` with `doc` and commit.
    /// A failed commit rolls the writer back so the staged operations never
    /// reach a later commit. Returns whether the id was already present.
    fn upsert(&self, id_term: Term, doc: TantivyDocument) -> Result<bool> {
        let mut writer = self.writer.lock();
        let existed = self
            .reader
            .searcher()
            .search(&TermQuery::new(id_term.clone(), IndexRecordOption::Basic), &Count)?
            > 0;

        writer.delete_term(id_term);
        let staged = writer.add_document(doc).and_then(|_| writer.commit());
        if let Err(err) = staged {
            writer.rollback()?;
            return Err(err.into());
        }
        self.reader.reload()?;
        Ok(existed)
    }

    /// Convert a source object into a tantivy document, enforcing the mapping.
    fn to_document(&self, id: &str, source: &Value) -> Result<TantivyDocument> {
        let object = source.as_object().ok_or_else(|| {
            SearchError::bad_request("mapper_parsing_exception", "document source must be a JSON object")
        })?;

        let mut doc = TantivyDocument::default();
        doc.add_text(self.schema.id, id);
        doc.add_text(self.schema.source, serde_json::to_string(source)?);

        for (name, value) in object {
            let Some((field, kind)) = self.schema.field(name) else {
                if self.mapping.mappings.is_strict() {
                    return Err(SearchError::bad_request(
                        "strict_dynamic_mapping_exception",
                        format!("mapping set to strict, dynamic introduction of [{name}] is not allowed"),
                    ));
                }
                continue;
            };

            for scalar in scalars(value) {
                match kind {
                    FieldType::Text | FieldType::Keyword => match scalar_text(scalar) {
                        Some(text) => doc.add_text(field, text),
                        None => {
                            return Err(SearchError::bad_request(
                                "mapper_parsing_exception",
                                format!("failed to parse field [{name}]: expected a scalar value"),
                            ))
                        }
                    },
                    FieldType::Date => match scalar.as_str().and_then(parse_date) {
                        Some(secs) => doc.add_date(field, tantivy::DateTime::from_timestamp_secs(secs)),
                        None => {
                            return Err(SearchError::bad_request(
                                "mapper_parsing_exception",
                                format!("failed to parse field [{name}] of type [date]: {scalar}"),
                            ))
                        }
                    },
                }
            }
        }

        Ok(doc)
    }

    fn load_source(&self, searcher: &Searcher, address: DocAddress) -> Result<Map<String, Value>> {
        let doc: TantivyDocument = searcher.doc(address)?;
        let raw = doc.get_first(self.schema.source).and_then(|v| v.as_str()).unwrap_or("{}");
        Ok(serde_json::from_str(raw)?)
    }

    fn load_id(&self, searcher: &Searcher, address: DocAddress) -> Result<String> {
        let doc: TantivyDocument = searcher.doc(address)?;
        Ok(doc
            .get_first(self.schema.id)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string())
    }

    fn validate_sort(&self, sort: &[SortKey]) -> Result<()> {
        for key in sort {
            match key {
                SortKey::Special(name) if name == SCORE_KEY => {}
                SortKey::Special(name) => {
                    return Err(SearchError::bad_request(
                        "query_shard_exception",
                        format!("unsupported sort key [{name}]"),
                    ))
                }
                SortKey::Field(fields) => {
                    if let Some(name) = fields.keys().find(|name| self.schema.field(name).is_none()) {
                        return Err(SearchError::bad_request(
                            "query_shard_exception",
                            format!("No mapping found for [{name}] in order to sort on"),
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    /// Value of a sort field for one hit; dates compare by timestamp.
    fn sort_value(&self, source: &Map<String, Value>, name: &str) -> Option<SortValue> {
        let value = scalars(source.get(name)?).next()?;
        match self.schema.field(name) {
            Some((_, FieldType::Date)) => value.as_str().and_then(parse_date).map(|s| SortValue::Num(s as f64)),
            _ => match value {
                Value::Number(n) => n.as_f64().map(SortValue::Num),
                Value::String(s) => Some(SortValue::Str(s.clone())),
                Value::Bool(b) => Some(SortValue::Num(f64::from(u8::from(*b)))),
                _ => None,
            },
        }
    }
}

#[derive(Debug, PartialEq, PartialOrd)]
enum SortValue {
    Num(f64),
    Str(String),
}

struct Candidate {
    score: f32,
    address: DocAddress,
    source: Option<Map<String, Value>>,
}

/// Compare two hits by the request's sort keys. Missing values sort last in
/// either direction.
fn compare_hits(
    index: &EmbeddedIndex,
    sort: &[SortKey],
    a: &Candidate,
    b: &Candidate,
) -> Ordering {
    for key in sort {
        let ordering = match key {
            SortKey::Special(_) => b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal),
            SortKey::Field(fields) => fields
                .iter()
                .map(|(name, spec)| {
                    let left = a.source.as_ref().and_then(|s| index.sort_value(s, name));
                    let right = b.source.as_ref().and_then(|s| index.sort_value(s, name));
                    match (left, right) {
                        (Some(l), Some(r)) => {
                            let natural = l.partial_cmp(&r).unwrap_or(Ordering::Equal);
                            match spec.order {
                                SortOrder::Asc => natural,
                                SortOrder::Desc => natural.reverse(),
                            }
                        }
                        (Some(_), None) => Ordering::Less,
                        (None, Some(_)) => Ordering::Greater,
                        (None, None) => Ordering::Equal,
                    }
                })
                .find(|o| o.is_ne())
                .unwrap_or(Ordering::Equal),
        };
        if ordering.is_ne() {
            return ordering;
        }
    }
    Ordering::Equal
}

/// Flatten one level of arrays, skipping nulls.
fn scalars(value: &Value) -> impl Iterator<Item = &Value> {
    let items: Vec<&Value> = match value {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    };
    items.into_iter().filter(|v| !v.is_null())
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Parse RFC 3339 timestamps, naive date-times and plain dates (UTC).
fn parse_date(raw: &str) -> Option<i64> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Some(dt.timestamp());
    }
    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt.and_utc().timestamp());
    }
    chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp())
}

fn validate_index_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name != "."
        && name != ".."
        && !name.starts_with(['_', '-'])
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(SearchError::bad_request(
            "invalid_index_name_exception",
            format!("invalid index name [{name}]"),
        ))
    }
}

impl TantivyEngine {
    pub fn in_memory(writer_heap_bytes: usize) -> Self {
        Self {
            root: None,
            writer_heap_bytes,
            indices: RwLock::new(HashMap::new()),
        }
    }

    /// Keep indices under `root`, one sub-directory each.
    pub fn open<P: AsRef<Path>>(root: P, writer_heap_bytes: usize) -> Result<Self> {
        std::fs::create_dir_all(root.as_ref())?;
        Ok(Self {
            root: Some(root.as_ref().to_path_buf()),
            writer_heap_bytes,
            indices: RwLock::new(HashMap::new()),
        })
    }

    fn index_dir(&self, name: &str) -> Option<PathBuf> {
        self.root.as_ref().map(|root| root.join(name))
    }

    fn on_disk(&self, name: &str) -> bool {
        self.index_dir(name)
            .map(|dir| dir.join("meta.json").exists() && dir.join(MAPPING_FILE).exists())
            .unwrap_or(false)
    }

    fn lookup(&self, name: &str) -> Result<Arc<EmbeddedIndex>> {
        if let Some(index) = self.indices.read().get(name) {
            return Ok(Arc::clone(index));
        }
        validate_index_name(name)?;

        let mut indices = self.indices.write();
        if let Some(index) = indices.get(name) {
            return Ok(Arc::clone(index));
        }
        let dir = match self.index_dir(name) {
            Some(dir) if self.on_disk(name) => dir,
            _ => return Err(SearchError::IndexNotFound(name.to_string())),
        };

        let mapping: IndexMapping =
            serde_json::from_slice(&std::fs::read(dir.join(MAPPING_FILE))?)?;
        let schema = IndexSchema::from_mapping(&mapping)?;
        let index = Index::open_in_dir(&dir)?;
        let loaded = Arc::new(EmbeddedIndex::new(index, schema, mapping, self.writer_heap_bytes)?);
        tracing::debug!(index = name, path = ?dir, "opened embedded index");

        indices.insert(name.to_string(), Arc::clone(&loaded));
        Ok(loaded)
    }
}

#[async_trait]
impl SearchEngine for TantivyEngine {
    fn kind(&self) -> &'static str {
        "embedded"
    }

    async fn index_exists(&self, index: &str) -> Result<bool> {
        match self.lookup(index) {
            Ok(_) => Ok(true),
            Err(SearchError::IndexNotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn create_index(&self, name: &str, mapping: &IndexMapping) -> Result<bool> {
        validate_index_name(name)?;
        let mut indices = self.indices.write();
        if indices.contains_key(name) || self.on_disk(name) {
            return Err(SearchError::IndexAlreadyExists(name.to_string()));
        }

        let schema = IndexSchema::from_mapping(mapping)?;
        let index = match self.index_dir(name) {
            Some(dir) => {
                std::fs::create_dir_all(&dir)?;
                let index = Index::create_in_dir(&dir, schema.schema.clone())?;
                std::fs::write(dir.join(MAPPING_FILE), serde_json::to_vec_pretty(mapping)?)?;
                index
            }
            None => Index::create_in_ram(schema.schema.clone()),
        };

        let created = EmbeddedIndex::new(index, schema, mapping.clone(), self.writer_heap_bytes)?;
        indices.insert(name.to_string(), Arc::new(created));
        Ok(true)
    }

    async fn delete_index(&self, name: &str) -> Result<()> {
        let mut indices = self.indices.write();
        let was_loaded = indices.remove(name).is_some();
        let was_on_disk = self.on_disk(name);

        if was_on_disk {
            if let Some(dir) = self.index_dir(name) {
                std::fs::remove_dir_all(dir)?;
            }
        }
        if was_loaded || was_on_disk {
            Ok(())
        } else {
            Err(SearchError::IndexNotFound(name.to_string()))
        }
    }

    async fn index_document(
        &self,
        name: &str,
        id: &str,
        source: &Value,
        _refresh: bool,
    ) -> Result<WriteResult> {
        // Every write is committed and the reader reloaded, so documents are
        // always visible on return whatever `refresh` asks for.
        let index = self.lookup(name)?;
        let doc = index.to_document(id, source)?;
        let id_term = Term::from_field_text(index.schema.id, id);

        let existed = index.upsert(id_term, doc)?;

        Ok(if existed {
            WriteResult::Updated
        } else {
            WriteResult::Created
        })
    }

    async fn search(&self, name: &str, request: &SearchRequest) -> Result<RawSearchResponse> {
        let index = self.lookup(name)?;
        let searcher = index.reader.searcher();
        let compiled = translate::compile(&request.query, &index, &searcher)?;
        let sort = request.sort.as_deref().unwrap_or_default();
        index.validate_sort(sort)?;

        let total = searcher.search(&*compiled.query, &Count)? as u64;
        let end = request.from.saturating_add(request.size);

        let mut candidates: Vec<Candidate> = Vec::new();
        if request.size > 0 && total > 0 {
            // Explicit sorts rank every match; otherwise only the page end.
            let limit = if sort.is_empty() {
                end.min(total as usize)
            } else {
                total as usize
            };
            for (score, address) in searcher.search(&*compiled.query, &TopDocs::with_limit(limit.max(1)))? {
                let source = if sort.is_empty() {
                    None
                } else {
                    Some(index.load_source(&searcher, address)?)
                };
                candidates.push(Candidate { score, address, source });
            }
            if !sort.is_empty() {
                candidates.sort_by(|a, b| compare_hits(&index, sort, a, b));
            }
        }

        let mut hits = Vec::new();
        for candidate in candidates.into_iter().skip(request.from).take(request.size) {
            let source = match candidate.source {
                Some(source) => source,
                None => index.load_source(&searcher, candidate.address)?,
            };
            let highlight = highlight::highlight_hit(&index, &source, &request.highlight, &compiled.terms)?;
            let filtered: Map<String, Value> = if request.source.is_empty() {
                source
            } else {
                source
                    .into_iter()
                    .filter(|(key, _)| request.source.iter().any(|f| f == key))
                    .collect()
            };

            hits.push(RawHit {
                id: index.load_id(&searcher, candidate.address)?,
                score: Some(candidate.score),
                source: Value::Object(filtered),
                highlight,
            });
        }

        let total = if !request.track_total_hits && total > UNTRACKED_TOTAL_LIMIT {
            TotalHits {
                value: UNTRACKED_TOTAL_LIMIT,
                relation: TotalRelation::Gte,
            }
        } else {
            TotalHits {
                value: total,
                relation: TotalRelation::Eq,
            }
        };

        Ok(RawSearchResponse {
            hits: RawHits {
                total: Some(total),
                hits,
            },
        })
    }

    async fn count(&self, name: &str) -> Result<u64> {
        Ok(self.lookup(name)?.reader.searcher().num_docs())
    }

    async fn store_size(&self, name: &str) -> Result<u64> {
        let usage = self.lookup(name)?.reader.searcher().space_usage()?;
        Ok(usage.total().get_bytes())
    }

    async fn cluster_health(&self, index: Option<&str>) -> Result<ClusterHealth> {
        if let Some(name) = index {
            self.lookup(name)?;
        }
        Ok(ClusterHealth {
            cluster_name: "embedded".to_string(),
            status: HealthStatus::Green,
            number_of_nodes: 1,
        })
    }

    async fn cluster_info(&self) -> Result<Value> {
        Ok(json!({
            "name": "embedded",
            "cluster_name": "embedded",
            "version": {
                "distribution": "tantivy",
                "number": env!("CARGO_PKG_VERSION"),
            },
            "persistent": self.root.is_some(),
        }))
    }

    async fn get_mapping(&self, name: &str) -> Result<Value> {
        Ok(serde_json::to_value(&self.lookup(name)?.mapping.mappings)?)
    }

    async fn get_settings(&self, name: &str) -> Result<Value> {
        Ok(json!({ "index": self.lookup(name)?.mapping.settings }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::query::{build_request, QuerySpec};
    use crate::search::schema::paper_index_mapping;
    use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
    use tantivy::directory::error::{DeleteError, OpenReadError, OpenWriteError};
    use tantivy::directory::{Directory, FileHandle, RamDirectory, WatchCallback, WatchHandle, WritePtr};
    use tantivy::IndexSettings;

    const HEAP: usize = 15_000_000;

    #[test]
    fn dates_parse_in_common_shapes() {
        assert_eq!(parse_date("1970-01-02"), Some(86_400));
        assert_eq!(parse_date("1970-01-01T00:01:00Z"), Some(60));
        assert_eq!(parse_date("1970-01-01T00:00:30.5"), Some(30));
        assert_eq!(parse_date("yesterday"), None);
    }

    #[test]
    fn index_names_follow_engine_rules() {
        assert!(validate_index_name("arxiv-papers").is_ok());
        assert!(validate_index_name("../etc").is_err());
        assert!(validate_index_name("Papers").is_err());
        assert!(validate_index_name("_hidden").is_err());
    }

    #[tokio::test]
    async fn strict_mapping_rejects_unknown_fields() {
        let engine = TantivyEngine::in_memory(HEAP);
        engine.create_index("papers", &paper_index_mapping()).await.unwrap();
        let err = engine
            .index_document("papers", "1", &json!({"arxiv_id": "1", "color": "red"}), true)
            .await
            .unwrap_err();
        assert!(err.is_document_rejection());
    }

    #[tokio::test]
    async fn bad_dates_are_rejected() {
        let engine = TantivyEngine::in_memory(HEAP);
        engine.create_index("papers", &paper_index_mapping()).await.unwrap();
        let err = engine
            .index_document("papers", "1", &json!({"arxiv_id": "1", "published_date": "soon"}), true)
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::Api { ref kind, .. } if kind == "mapper_parsing_exception"));
    }

    #[tokio::test]
    async fn second_write_reports_update() {
        let engine = TantivyEngine::in_memory(HEAP);
        engine.create_index("papers", &paper_index_mapping()).await.unwrap();
        let doc = json!({"arxiv_id": "1", "title": "First"});
        assert_eq!(engine.index_document("papers", "1", &doc, true).await.unwrap(), WriteResult::Created);
        assert_eq!(engine.index_document("papers", "1", &doc, true).await.unwrap(), WriteResult::Updated);
        assert_eq!(engine.count("papers").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn indices_survive_reopen_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        {
            let engine = TantivyEngine::open(dir.path(), HEAP).unwrap();
            engine.create_index("papers", &paper_index_mapping()).await.unwrap();
            engine
                .index_document("papers", "1", &json!({"arxiv_id": "1", "title": "Kept"}), true)
                .await
                .unwrap();
        }

        let engine = TantivyEngine::open(dir.path(), HEAP).unwrap();
        assert!(engine.index_exists("papers").await.unwrap());
        assert_eq!(engine.count("papers").await.unwrap(), 1);
        assert!(matches!(
            engine.create_index("papers", &paper_index_mapping()).await,
            Err(SearchError::IndexAlreadyExists(_))
        ));

        engine.delete_index("papers").await.unwrap();
        assert!(!engine.index_exists("papers").await.unwrap());
        assert!(!dir.path().join("papers").exists());
    }

    /// RAM directory whose `meta.json` writes can be made to fail, which
    /// makes the next commit fail after the segment is already staged.
    #[derive(Clone, Debug, Default)]
    struct FlakyDirectory {
        inner: RamDirectory,
        fail_commits: Arc<AtomicBool>,
    }

    impl Directory for FlakyDirectory {
        fn get_file_handle(&self, path: &Path) -> std::result::Result<Arc<dyn FileHandle>, OpenReadError> {
            self.inner.get_file_handle(path)
        }

        fn delete(&self, path: &Path) -> std::result::Result<(), DeleteError> {
            self.inner.delete(path)
        }

        fn exists(&self, path: &Path) -> std::result::Result<bool, OpenReadError> {
            self.inner.exists(path)
        }

        fn open_write(&self, path: &Path) -> std::result::Result<WritePtr, OpenWriteError> {
            self.inner.open_write(path)
        }

        fn atomic_read(&self, path: &Path) -> std::result::Result<Vec<u8>, OpenReadError> {
            self.inner.atomic_read(path)
        }

        fn atomic_write(&self, path: &Path, data: &[u8]) -> std::io::Result<()> {
            if path == Path::new("meta.json") && self.fail_commits.load(AtomicOrdering::SeqCst) {
                return Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full"));
            }
            self.inner.atomic_write(path, data)
        }

        fn sync_directory(&self) -> std::io::Result<()> {
            self.inner.sync_directory()
        }

        fn watch(&self, callback: WatchCallback) -> tantivy::Result<WatchHandle> {
            self.inner.watch(callback)
        }
    }

    #[test]
    fn failed_commit_does_not_leak_into_the_next_one() {
        let directory = FlakyDirectory::default();
        let mapping = paper_index_mapping();
        let schema = IndexSchema::from_mapping(&mapping).unwrap();
        let index = Index::create(directory.clone(), schema.schema.clone(), IndexSettings::default()).unwrap();
        let embedded = EmbeddedIndex::new(index, schema, mapping, HEAP).unwrap();
        let write = |id: &str| {
            let doc = embedded.to_document(id, &json!({ "arxiv_id": id })).unwrap();
            embedded.upsert(Term::from_field_text(embedded.schema.id, id), doc)
        };

        directory.fail_commits.store(true, AtomicOrdering::SeqCst);
        assert!(write("lost").is_err());

        directory.fail_commits.store(false, AtomicOrdering::SeqCst);
        assert!(!write("kept").unwrap());

        let searcher = embedded.reader.searcher();
        assert_eq!(searcher.num_docs(), 1);
        let lost = TermQuery::new(Term::from_field_text(embedded.schema.id, "lost"), IndexRecordOption::Basic);
        assert_eq!(searcher.search(&lost, &Count).unwrap(), 0);
    }

    #[tokio::test]
    async fn untracked_totals_are_capped_as_a_lower_bound() {
        let engine = TantivyEngine::in_memory(HEAP);
        engine.create_index("papers", &paper_index_mapping()).await.unwrap();
        let index = engine.lookup("papers").unwrap();
        {
            let mut writer = index.writer.lock();
            for i in 0..=UNTRACKED_TOTAL_LIMIT {
                let id = format!("p{i}");
                writer
                    .add_document(index.to_document(&id, &json!({ "arxiv_id": &id, "title": "Graph" })).unwrap())
                    .unwrap();
            }
            writer.commit().unwrap();
        }
        index.reader.reload().unwrap();

        let spec = QuerySpec::new("graph").with_size(3);
        let exact = engine.search("papers", &build_request(&spec)).await.unwrap();
        let total = exact.hits.total.unwrap();
        assert_eq!((total.value, total.relation), (UNTRACKED_TOTAL_LIMIT + 1, TotalRelation::Eq));

        let capped = build_request(&spec.with_track_total_hits(false));
        let response = engine.search("papers", &capped).await.unwrap();
        let total = response.hits.total.unwrap();
        assert_eq!((total.value, total.relation), (UNTRACKED_TOTAL_LIMIT, TotalRelation::Gte));
        assert_eq!(response.hits.hits.len(), 3);
    }

    #[tokio::test]
    async fn missing_index_is_typed_everywhere() {
        let engine = TantivyEngine::in_memory(HEAP);
        assert!(!engine.index_exists("papers").await.unwrap());
        assert!(matches!(engine.count("papers").await, Err(SearchError::IndexNotFound(_))));
        assert!(matches!(engine.delete_index("papers").await, Err(SearchError::IndexNotFound(_))));
        assert!(matches!(
            engine.cluster_health(Some("papers")).await,
            Err(SearchError::IndexNotFound(_))
        ));
    }
}
