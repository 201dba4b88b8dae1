//! In-memory document store.
//!
//! Implements [`DocumentStore`] by evaluating the query DSL subset the core emits
//! against documents held in memory. It is used by the test suite and for
//! embedding the search core without a cluster. Fault injection hooks let tests
//! exercise partial write failures, unavailable search and degraded health.

pub(crate) mod aggregation;
pub(crate) mod mapping;
pub(crate) mod query;

use std::cmp::Ordering;
use std::sync::Arc;

use ahash::{AHashMap, AHashSet};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{Map, Value, json};

use crate::storage::memory::aggregation::{parse_aggregations, run_aggregations};
use crate::storage::memory::mapping::{FieldMappings, FieldType, Term, leaves, terms_at, values_at};
use crate::storage::memory::query::Query;
use crate::storage::traits::{
    BulkItem, BulkResponse, DocumentStore, IndexStats, StoreError, StoreHealth, StoreResult,
    StoredDocument,
};

#[derive(Debug)]
struct StoredEntry {
    id: String,
    source: Value,
}

#[derive(Debug)]
struct MemoryIndex {
    mappings: Value,
    fields: FieldMappings,
    documents: Vec<StoredEntry>,
    positions: AHashMap<String, usize>,
}

impl MemoryIndex {
    fn new(mappings: Value) -> StoreResult<Self> {
        let fields = FieldMappings::parse(&mappings)?;
        Ok(MemoryIndex {
            mappings,
            fields,
            documents: Vec::new(),
            positions: AHashMap::new(),
        })
    }

    fn upsert(&mut self, id: &str, source: Value) {
        match self.positions.get(id) {
            Some(position) => self.documents[*position].source = source,
            None => {
                self.positions.insert(id.to_string(), self.documents.len());
                self.documents.push(StoredEntry {
                    id: id.to_string(),
                    source,
                });
            }
        }
    }

    fn retain(&mut self, keep: impl Fn(&StoredEntry) -> bool) -> u64 {
        let before = self.documents.len();
        self.documents.retain(|entry| keep(entry));
        self.positions = self
            .documents
            .iter()
            .enumerate()
            .map(|(position, entry)| (entry.id.clone(), position))
            .collect();
        (before - self.documents.len()) as u64
    }

    /// Mapping conflicts of a document, if any.
    fn validate(&self, source: &Value) -> Option<String> {
        leaves(source).into_iter().find_map(|(path, value)| {
            let field_type = self.fields.stored_type(&path);
            (!field_type.accepts(value)).then(|| {
                format!(
                    "mapper_parsing_exception: failed to parse field [{path}] of type [{}]",
                    field_type.name()
                )
            })
        })
    }
}

#[derive(Debug, Default)]
struct Faults {
    rejected_ids: AHashSet<String>,
    fail_searches: bool,
    health: Option<StoreHealth>,
}

/// A [`DocumentStore`] kept entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    indexes: Arc<RwLock<AHashMap<String, MemoryIndex>>>,
    faults: Arc<RwLock<Faults>>,
}

#[derive(Debug)]
enum SortKey {
    Score { descending: bool },
    Field { path: String, descending: bool },
}

fn parse_sort(body: &Value) -> StoreResult<Vec<SortKey>> {
    let entries = match body.get("sort") {
        None => return Ok(vec![SortKey::Score { descending: true }]),
        Some(Value::Array(entries)) => entries.clone(),
        Some(entry) => vec![entry.clone()],
    };

    let mut keys = Vec::with_capacity(entries.len());
    for entry in entries {
        let (path, order) = match &entry {
            Value::String(path) => (path.clone(), None),
            Value::Object(map) if map.len() == 1 => {
                let Some((path, options)) = map.iter().next() else {
                    continue;
                };
                let order = match options {
                    Value::String(order) => Some(order.clone()),
                    Value::Object(options) => options
                        .get("order")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    _ => None,
                };
                (path.clone(), order)
            }
            _ => return Err(StoreError::rejected(400, "[sort] entry malformed")),
        };

        let key = if path == "_score" {
            SortKey::Score {
                descending: order.as_deref() != Some("asc"),
            }
        } else {
            SortKey::Field {
                path,
                descending: order.as_deref() == Some("desc"),
            }
        };
        keys.push(key);
    }
    Ok(keys)
}

struct Hit<'a> {
    entry: &'a StoredEntry,
    score: f64,
    sort_values: Vec<Option<Term>>,
}

fn compare_hits(keys: &[SortKey], a: &Hit<'_>, b: &Hit<'_>) -> Ordering {
    for (position, key) in keys.iter().enumerate() {
        let ordering = match key {
            SortKey::Score { descending } => {
                let ordering = a.score.partial_cmp(&b.score).unwrap_or(Ordering::Equal);
                if *descending { ordering.reverse() } else { ordering }
            }
            SortKey::Field { descending, .. } => {
                match (&a.sort_values[position], &b.sort_values[position]) {
                    (Some(a), Some(b)) => {
                        let ordering = a.compare(b).unwrap_or(Ordering::Equal);
                        if *descending { ordering.reverse() } else { ordering }
                    }
                    // missing values sort last in both directions
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                }
            }
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

fn sort_value(terms: Vec<Term>, descending: bool) -> Option<Term> {
    terms.into_iter().reduce(|best, term| {
        let better = match term.compare(&best) {
            Some(Ordering::Greater) => descending,
            Some(Ordering::Less) => !descending,
            _ => false,
        };
        if better { term } else { best }
    })
}

fn size_param(body: &Value, name: &str, default: usize) -> StoreResult<usize> {
    match body.get(name) {
        None | Some(Value::Null) => Ok(default),
        Some(value) => value
            .as_u64()
            .map(|value| value as usize)
            .ok_or_else(|| StoreError::rejected(400, format!("[{name}] must be a positive integer"))),
    }
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every future write of the given document id.
    pub fn reject_document<S: Into<String>>(&self, id: S) {
        self.faults.write().rejected_ids.insert(id.into());
    }

    /// Make every search fail with a transport error.
    pub fn fail_searches(&self, fail: bool) {
        self.faults.write().fail_searches = fail;
    }

    /// Override the health reported by [`DocumentStore::stats`].
    pub fn set_health(&self, health: StoreHealth) {
        self.faults.write().health = Some(health);
    }

    /// Mappings an index was created with.
    pub fn mappings(&self, index: &str) -> Option<Value> {
        self.indexes.read().get(index).map(|index| index.mappings.clone())
    }

    /// Ids of the documents in an index, in insertion order.
    pub fn document_ids(&self, index: &str) -> Vec<String> {
        self.indexes
            .read()
            .get(index)
            .map(|index| index.documents.iter().map(|entry| entry.id.clone()).collect())
            .unwrap_or_default()
    }

    /// Stored source of a document.
    pub fn document(&self, index: &str, id: &str) -> Option<Value> {
        let indexes = self.indexes.read();
        let index = indexes.get(index)?;
        let position = index.positions.get(id)?;
        Some(index.documents[*position].source.clone())
    }

    fn execute_search(&self, index: &MemoryIndex, name: &str, body: &Value) -> StoreResult<Value> {
        let query = match body.get("query") {
            Some(query) => Query::parse(query)?,
            None => Query::match_all(),
        };
        let post_filter = body.get("post_filter").map(Query::parse).transpose()?;
        let aggregations = body.get("aggs").or_else(|| body.get("aggregations"));
        let aggregations = aggregations.map(parse_aggregations).transpose()?;
        let sort = parse_sort(body)?;
        let from = size_param(body, "from", 0)?;
        let size = size_param(body, "size", 10)?;

        for key in &sort {
            if let SortKey::Field { path, .. } = key {
                if index.fields.resolve(path).field_type == FieldType::Text {
                    return Err(StoreError::rejected(
                        400,
                        format!("text field [{path}] is not sortable, use a keyword field instead"),
                    ));
                }
            }
        }

        let matched: Vec<(&StoredEntry, f64)> = index
            .documents
            .iter()
            .filter_map(|entry| {
                query
                    .score(&entry.source, &index.fields)
                    .map(|score| (entry, score))
            })
            .collect();

        let mut response = Map::new();
        if let Some(aggregations) = &aggregations {
            let sources: Vec<&Value> = matched.iter().map(|(entry, _)| &entry.source).collect();
            let results = run_aggregations(aggregations, &sources, &index.fields)?;
            response.insert("aggregations".to_string(), Value::Object(results));
        }

        let mut hits: Vec<Hit<'_>> = matched
            .into_iter()
            .filter(|(entry, _)| {
                post_filter
                    .as_ref()
                    .is_none_or(|filter| filter.score(&entry.source, &index.fields).is_some())
            })
            .map(|(entry, score)| {
                let sort_values = sort
                    .iter()
                    .map(|key| match key {
                        SortKey::Score { .. } => None,
                        SortKey::Field { path, descending } => {
                            sort_value(terms_at(&entry.source, path, &index.fields), *descending)
                        }
                    })
                    .collect();
                Hit {
                    entry,
                    score,
                    sort_values,
                }
            })
            .collect();
        hits.sort_by(|a, b| compare_hits(&sort, a, b));

        let include_source = body.get("_source") != Some(&Value::Bool(false));
        let requested_fields: Vec<&str> = body
            .get("fields")
            .and_then(Value::as_array)
            .map(|fields| fields.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        let total = hits.len();
        let page: Vec<Value> = hits
            .iter()
            .skip(from)
            .take(size)
            .map(|hit| {
                let mut rendered = Map::new();
                rendered.insert("_index".to_string(), json!(name));
                rendered.insert("_id".to_string(), json!(hit.entry.id));
                rendered.insert("_score".to_string(), json!(hit.score));
                if include_source {
                    rendered.insert("_source".to_string(), hit.entry.source.clone());
                }
                if !requested_fields.is_empty() {
                    let mut fields = Map::new();
                    for field in &requested_fields {
                        let values: Vec<Value> = values_at(&hit.entry.source, field)
                            .into_iter()
                            .cloned()
                            .collect();
                        if !values.is_empty() {
                            fields.insert(field.to_string(), Value::Array(values));
                        }
                    }
                    rendered.insert("fields".to_string(), Value::Object(fields));
                }
                Value::Object(rendered)
            })
            .collect();

        response.insert("took".to_string(), json!(0));
        response.insert("timed_out".to_string(), json!(false));
        response.insert(
            "hits".to_string(),
            json!({
                "total": { "value": total, "relation": "eq" },
                "hits": page,
            }),
        );
        Ok(Value::Object(response))
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn index_exists(&self, index: &str) -> StoreResult<bool> {
        Ok(self.indexes.read().contains_key(index))
    }

    async fn create_index(&self, index: &str, mappings: &Value) -> StoreResult<()> {
        let mut indexes = self.indexes.write();
        if indexes.contains_key(index) {
            return Err(StoreError::rejected(
                400,
                format!("resource_already_exists_exception: index [{index}] already exists"),
            ));
        }
        indexes.insert(index.to_string(), MemoryIndex::new(mappings.clone())?);
        Ok(())
    }

    async fn delete_index(&self, index: &str) -> StoreResult<()> {
        match self.indexes.write().remove(index) {
            Some(_) => Ok(()),
            None => Err(StoreError::IndexNotFound(index.to_string())),
        }
    }

    async fn bulk_index(
        &self,
        index: &str,
        documents: &[StoredDocument],
    ) -> StoreResult<BulkResponse> {
        let faults = self.faults.read();
        let mut indexes = self.indexes.write();
        if !indexes.contains_key(index) {
            // writes auto-create the index without mappings
            indexes.insert(index.to_string(), MemoryIndex::new(json!({}))?);
        }
        let Some(target) = indexes.get_mut(index) else {
            return Err(StoreError::IndexNotFound(index.to_string()));
        };

        let mut items = Vec::with_capacity(documents.len());
        for document in documents {
            let error = if faults.rejected_ids.contains(&document.id) {
                Some(format!("document [{}] rejected", document.id))
            } else {
                target.validate(&document.source)
            };
            if error.is_none() {
                target.upsert(&document.id, document.source.clone());
            }
            items.push(BulkItem {
                id: document.id.clone(),
                error,
            });
        }
        Ok(BulkResponse { items })
    }

    async fn delete_by_query(&self, index: &str, query: &Value) -> StoreResult<u64> {
        let query = Query::parse(query)?;
        let mut indexes = self.indexes.write();
        let Some(target) = indexes.get_mut(index) else {
            return Err(StoreError::IndexNotFound(index.to_string()));
        };
        let fields = std::mem::take(&mut target.fields);
        let deleted = target.retain(|entry| query.score(&entry.source, &fields).is_none());
        target.fields = fields;
        Ok(deleted)
    }

    async fn search(&self, index: &str, body: &Value) -> StoreResult<Value> {
        if self.faults.read().fail_searches {
            return Err(StoreError::Transport("connection refused".to_string()));
        }
        let indexes = self.indexes.read();
        let Some(target) = indexes.get(index) else {
            return Err(StoreError::IndexNotFound(index.to_string()));
        };
        self.execute_search(target, index, body)
    }

    async fn stats(&self, index: &str) -> StoreResult<IndexStats> {
        let health = self.faults.read().health.unwrap_or(StoreHealth::Green);
        let indexes = self.indexes.read();
        let Some(target) = indexes.get(index) else {
            return Err(StoreError::IndexNotFound(index.to_string()));
        };
        Ok(IndexStats {
            document_count: target.documents.len() as u64,
            health,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::base_mappings;

    fn document(id: &str, culture: &str, count: i64) -> StoredDocument {
        StoredDocument {
            id: id.to_string(),
            source: json!({
                "key": id,
                "objectType": "Document",
                "culture": culture,
                "fields": { "count_integers": [count] }
            }),
        }
    }

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        store.create_index("test", &base_mappings()).await.unwrap();
        store
            .bulk_index(
                "test",
                &[
                    document("a", "en-us", 3),
                    document("b", "da-dk", 1),
                    document("c", "en-us", 2),
                ],
            )
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_search_sort_and_fields() {
        let store = seeded().await;
        let response = store
            .search(
                "test",
                &json!({
                    "query": {"bool": {"must": [{"terms": {"culture": ["en-us"]}}]}},
                    "sort": [{"fields.count_integers": {"order": "asc", "numeric_type": "long"}}],
                    "_source": false,
                    "fields": ["key", "objectType"]
                }),
            )
            .await
            .unwrap();

        assert_eq!(response["hits"]["total"]["value"], 2);
        let hits = response["hits"]["hits"].as_array().unwrap();
        assert_eq!(hits[0]["fields"]["key"], json!(["c"]));
        assert_eq!(hits[1]["fields"]["key"], json!(["a"]));
        assert!(hits[0].get("_source").is_none());
    }

    #[tokio::test]
    async fn test_aggregations_ignore_post_filter() {
        let store = seeded().await;
        let response = store
            .search(
                "test",
                &json!({
                    "post_filter": {"term": {"culture": "da-dk"}},
                    "aggs": {"culture": {"terms": {"field": "culture"}}}
                }),
            )
            .await
            .unwrap();

        assert_eq!(response["hits"]["total"]["value"], 1);
        assert_eq!(
            response["aggregations"]["culture"]["buckets"],
            json!([{"key": "en-us", "doc_count": 2}, {"key": "da-dk", "doc_count": 1}])
        );
    }

    #[tokio::test]
    async fn test_bulk_replaces_and_reports_rejections() {
        let store = seeded().await;
        store.reject_document("d");

        let response = store
            .bulk_index("test", &[document("a", "inv", 9), document("d", "inv", 1)])
            .await
            .unwrap();

        assert_eq!(response.failures().count(), 1);
        assert_eq!(store.document_ids("test"), vec!["a", "b", "c"]);
        assert_eq!(store.document("test", "a").unwrap()["culture"], "inv");
    }

    #[tokio::test]
    async fn test_mapping_conflict_is_item_error() {
        let store = seeded().await;
        let bad = StoredDocument {
            id: "x".to_string(),
            source: json!({"fields": {"count_integers": ["many"]}}),
        };

        let response = store.bulk_index("test", &[bad]).await.unwrap();
        let error = response.items[0].error.clone().unwrap();
        assert!(error.contains("mapper_parsing_exception"), "{error}");
    }

    #[tokio::test]
    async fn test_delete_by_query() {
        let store = seeded().await;
        let deleted = store
            .delete_by_query("test", &json!({"terms": {"key": ["a", "b"]}}))
            .await
            .unwrap();

        assert_eq!(deleted, 2);
        assert_eq!(store.document_ids("test"), vec!["c"]);
        assert_eq!(store.stats("test").await.unwrap().document_count, 1);
    }

    #[tokio::test]
    async fn test_missing_index_and_faults() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.search("missing", &json!({})).await,
            Err(StoreError::IndexNotFound(_))
        ));

        let store = seeded().await;
        store.fail_searches(true);
        assert!(matches!(
            store.search("test", &json!({})).await,
            Err(StoreError::Transport(_))
        ));
    }
}
