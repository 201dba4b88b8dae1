//! Indexing operations.
//!
//! The [`Indexer`] writes materialized documents to a [`DocumentStore`] and manages
//! index lifecycles. Backend failures are logged and returned inside a
//! [`WriteReport`]; only requests the core cannot process at all return `Err`.
//! On nodes whose [`Topology`] forbids mutation every operation is a no-op.
//!
//! # Physical documents
//!
//! Every variation an item declares becomes one stored document with the id
//! `{key}.{culture}.{segment}`, where an absent culture is `inv` and an absent
//! segment is `def`. Field values are resolved per variation with the fallback
//! rules of [`crate::variance`], and the free-text blobs are built by
//! [`aggregate`]. After a successful write, documents of variations the item no
//! longer declares are deleted.
//!
//! # Operations
//!
//! - [`Indexer::add_or_update`]: write every variation of an item
//! - [`Indexer::delete`]: remove items and everything below them
//! - [`Indexer::reset`]: drop and recreate an index
//! - [`Indexer::ensure`]: create an index when it is missing
//! - [`Indexer::metadata`]: document count and health
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use varia::config::IndexerConfig;
//! use varia::document::field::{ContentItem, IndexField, ObjectType, Variation};
//! use varia::document::field_value::IndexValue;
//! use varia::indexer::Indexer;
//! use varia::storage::MemoryStore;
//! use uuid::Uuid;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> varia::error::Result<()> {
//! let store = MemoryStore::new();
//! let indexer = Indexer::new(Arc::new(store.clone()), IndexerConfig::default())?;
//! indexer.ensure("content").await?;
//!
//! let item = ContentItem::new(Uuid::from_u128(1), ObjectType::Document)
//!     .with_variation(Variation::culture("en-US"))
//!     .with_variation(Variation::culture("da-DK"))
//!     .with_field(IndexField::new("title", IndexValue::new().with_texts(["Hello"])).with_culture("en-US"))
//!     .with_field(IndexField::new("title", IndexValue::new().with_texts(["Hej"])).with_culture("da-DK"));
//!
//! let report = indexer.add_or_update("content", &item).await?;
//! assert!(report.is_success());
//! assert_eq!(report.written, 2);
//! # Ok(())
//! # }
//! ```

pub mod aggregate;
pub mod materializer;

use std::fmt;
use std::sync::Arc;

use log::{debug, error, info, warn};
use serde::Serialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::alias::IndexAliasResolver;
use crate::config::IndexerConfig;
use crate::document::field::ContentItem;
use crate::error::{Result, VariaError};
use crate::schema::{FieldKind, base_mappings, culture_tag, field_path, names, segment_tag};
use crate::storage::{DocumentStore, StoreError, StoreHealth, StoredDocument};
use crate::topology::{ServerRole, Topology};

pub use materializer::DocumentMaterializer;

/// Index-mutating operation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteOperation {
    AddOrUpdate,
    Delete,
    Reset,
    Ensure,
}

impl fmt::Display for WriteOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WriteOperation::AddOrUpdate => "add_or_update",
            WriteOperation::Delete => "delete",
            WriteOperation::Reset => "reset",
            WriteOperation::Ensure => "ensure",
        };
        f.write_str(name)
    }
}

/// A unit of a write the backend did not accept.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WriteFailure {
    /// Physical document id, when the failure concerns a single document.
    pub document_id: Option<String>,
    pub reason: String,
}

/// Outcome of an index-mutating operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WriteReport {
    pub index: String,
    pub operation: WriteOperation,
    /// The operation did not run because this node may not mutate indexes.
    pub skipped: bool,
    pub written: usize,
    pub deleted: u64,
    pub failures: Vec<WriteFailure>,
}

impl WriteReport {
    fn new(index: &str, operation: WriteOperation) -> Self {
        WriteReport {
            index: index.to_string(),
            operation,
            skipped: false,
            written: 0,
            deleted: 0,
            failures: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    fn fail(&mut self, document_id: Option<String>, error: &StoreError) {
        error!(
            "{} on index [{}] failed{}: {}",
            self.operation,
            self.index,
            document_id
                .as_deref()
                .map(|id| format!(" for document [{id}]"))
                .unwrap_or_default(),
            error
        );
        self.failures.push(WriteFailure {
            document_id,
            reason: error.to_string(),
        });
    }
}

/// Coarse health of an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexHealth {
    Healthy,
    Empty,
    Corrupted,
    Unknown,
}

/// Document count and health of an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IndexMetadata {
    pub document_count: u64,
    pub health: IndexHealth,
}

/// Writes content items to a document store.
#[derive(Clone)]
pub struct Indexer {
    store: Arc<dyn DocumentStore>,
    topology: Arc<dyn Topology>,
    aliases: IndexAliasResolver,
    materializer: DocumentMaterializer,
    config: IndexerConfig,
}

impl fmt::Debug for Indexer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Indexer")
            .field("store", &self.store)
            .field("aliases", &self.aliases)
            .field("config", &self.config)
            .finish()
    }
}

fn require_index(index: &str) -> Result<()> {
    if index.trim().is_empty() {
        return Err(VariaError::invalid_argument("index name must not be empty"));
    }
    Ok(())
}

impl Indexer {
    /// Create an indexer on a single-server topology without an environment suffix.
    pub fn new(store: Arc<dyn DocumentStore>, config: IndexerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Indexer {
            store,
            topology: Arc::new(ServerRole::Single),
            aliases: IndexAliasResolver::default(),
            materializer: DocumentMaterializer::new(config.clone()),
            config,
        })
    }

    pub fn with_topology(mut self, topology: Arc<dyn Topology>) -> Self {
        self.topology = topology;
        self
    }

    pub fn with_aliases(mut self, aliases: IndexAliasResolver) -> Self {
        self.aliases = aliases;
        self
    }

    /// Resolve the index name and check the topology.
    fn begin(&self, index: &str, operation: WriteOperation) -> Result<(String, Option<WriteReport>)> {
        require_index(index)?;
        let resolved = self.aliases.resolve(index);
        if self.topology.can_mutate_indexes() {
            return Ok((resolved, None));
        }
        debug!("Skipping {operation} on index [{resolved}]: this node may not mutate indexes");
        let mut report = WriteReport::new(&resolved, operation);
        report.skipped = true;
        Ok((resolved, Some(report)))
    }

    /// Write or replace the physical documents of a content item.
    ///
    /// Documents of variations the item no longer declares are removed afterwards.
    pub async fn add_or_update(&self, index: &str, item: &ContentItem) -> Result<WriteReport> {
        let (index, skipped) = self.begin(index, WriteOperation::AddOrUpdate)?;
        if let Some(report) = skipped {
            return Ok(report);
        }

        let documents = self.materializer.materialize(item)?;
        let stored = documents
            .iter()
            .map(|document| {
                Ok(StoredDocument {
                    id: document.id.clone(),
                    source: document.to_source()?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut report = WriteReport::new(&index, WriteOperation::AddOrUpdate);
        if !stored.is_empty() {
            match self.store.bulk_index(&index, &stored).await {
                Ok(response) => {
                    for item in &response.items {
                        match &item.error {
                            Some(reason) => {
                                let error = StoreError::rejected(400, reason.clone());
                                report.fail(Some(item.id.clone()), &error);
                            }
                            None => report.written += 1,
                        }
                    }
                }
                Err(error) => {
                    for document in &stored {
                        report.failures.push(WriteFailure {
                            document_id: Some(document.id.clone()),
                            reason: error.to_string(),
                        });
                    }
                    error!("add_or_update on index [{index}] failed for {}: {error}", item.key);
                    return Ok(report);
                }
            }
        }

        let stale = stale_variations_query(item);
        match self.store.delete_by_query(&index, &stale).await {
            Ok(deleted) => report.deleted = deleted,
            Err(error) => report.fail(None, &error),
        }

        Ok(report)
    }

    /// Remove every document of the given keys and of their descendants.
    pub async fn delete(&self, index: &str, keys: &[Uuid]) -> Result<WriteReport> {
        let (index, skipped) = self.begin(index, WriteOperation::Delete)?;
        if let Some(report) = skipped {
            return Ok(report);
        }

        let mut report = WriteReport::new(&index, WriteOperation::Delete);
        if keys.is_empty() {
            return Ok(report);
        }

        let keys: Vec<String> = keys.iter().map(Uuid::to_string).collect();
        let ancestry = field_path(&self.config.ancestry_field, FieldKind::Keywords);
        let query = json!({
            "bool": {
                "should": [
                    { "terms": { (names::KEY): keys } },
                    { "terms": { ancestry: keys } },
                ],
                "minimum_should_match": 1,
            }
        });

        match self.store.delete_by_query(&index, &query).await {
            Ok(deleted) => report.deleted = deleted,
            Err(error) => report.fail(None, &error),
        }
        Ok(report)
    }

    /// Drop the index and recreate it with the base schema.
    pub async fn reset(&self, index: &str) -> Result<WriteReport> {
        let (index, skipped) = self.begin(index, WriteOperation::Reset)?;
        if let Some(report) = skipped {
            return Ok(report);
        }

        let mut report = WriteReport::new(&index, WriteOperation::Reset);
        match self.store.index_exists(&index).await {
            Ok(true) => {
                info!("Deleting index [{index}]");
                if let Err(error) = self.store.delete_index(&index).await {
                    report.fail(None, &error);
                    return Ok(report);
                }
            }
            Ok(false) => {}
            Err(error) => {
                report.fail(None, &error);
                return Ok(report);
            }
        }

        self.create_if_absent(&mut report).await;
        Ok(report)
    }

    /// Create the index with the base schema unless it already exists.
    pub async fn ensure(&self, index: &str) -> Result<WriteReport> {
        let (index, skipped) = self.begin(index, WriteOperation::Ensure)?;
        if let Some(report) = skipped {
            return Ok(report);
        }

        let mut report = WriteReport::new(&index, WriteOperation::Ensure);
        self.create_if_absent(&mut report).await;
        Ok(report)
    }

    async fn create_if_absent(&self, report: &mut WriteReport) {
        let index = report.index.clone();
        match self.store.index_exists(&index).await {
            Ok(true) => debug!("Index [{index}] already exists"),
            Ok(false) => {
                info!("Creating index [{index}]");
                match self.store.create_index(&index, &base_mappings()).await {
                    Ok(()) => info!("Index [{index}] has been created"),
                    Err(error) => report.fail(None, &error),
                }
            }
            Err(error) => report.fail(None, &error),
        }
    }

    /// Document count and health of an index. Never fails; problems report `Unknown`.
    pub async fn metadata(&self, index: &str) -> IndexMetadata {
        let index = self.aliases.resolve(index);
        match self.store.stats(&index).await {
            Ok(stats) => {
                let health = match stats.health {
                    StoreHealth::Green | StoreHealth::Yellow if stats.document_count == 0 => {
                        IndexHealth::Empty
                    }
                    StoreHealth::Green | StoreHealth::Yellow => IndexHealth::Healthy,
                    StoreHealth::Red => IndexHealth::Corrupted,
                    StoreHealth::Unknown => IndexHealth::Unknown,
                };
                IndexMetadata {
                    document_count: stats.document_count,
                    health,
                }
            }
            Err(error) => {
                warn!("Could not read metadata of index [{index}]: {error}");
                IndexMetadata {
                    document_count: 0,
                    health: IndexHealth::Unknown,
                }
            }
        }
    }
}

/// Matches documents of an item whose variation is no longer declared.
fn stale_variations_query(item: &ContentItem) -> Value {
    let current: Vec<Value> = item
        .variations
        .iter()
        .map(|variation| {
            json!({
                "bool": {
                    "filter": [
                        { "term": { (names::CULTURE): culture_tag(variation.culture.as_deref()) } },
                        { "term": { (names::SEGMENT): segment_tag(variation.segment.as_deref()) } },
                    ]
                }
            })
        })
        .collect();

    json!({
        "bool": {
            "filter": [ { "term": { (names::KEY): item.key.to_string() } } ],
            "must_not": current,
        }
    })
}
