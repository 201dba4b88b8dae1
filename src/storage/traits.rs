//! Document store abstraction and common types.
//!
//! The core never talks to a concrete backend directly. Everything it needs is
//! expressed through [`DocumentStore`], whose requests and responses follow the
//! Elasticsearch wire shapes (query DSL bodies in, raw JSON responses out).

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Errors reported by a document store.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("index not found: {0}")]
    IndexNotFound(String),

    /// The backend answered but refused the request.
    #[error("request rejected ({status}): {reason}")]
    Rejected { status: u16, reason: String },

    /// The request never got a usable answer (connection, timeout, ...).
    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The request uses a construct the store does not implement.
    #[error("unsupported request: {0}")]
    Unsupported(String),
}

impl StoreError {
    pub fn rejected<S: Into<String>>(status: u16, reason: S) -> Self {
        StoreError::Rejected {
            status,
            reason: reason.into(),
        }
    }

    pub fn unsupported<S: Into<String>>(msg: S) -> Self {
        StoreError::Unsupported(msg.into())
    }

    pub fn invalid_response<S: Into<String>>(msg: S) -> Self {
        StoreError::InvalidResponse(msg.into())
    }
}

/// Result type of store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// A serialized document ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub source: Value,
}

/// Outcome of one document in a bulk write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkItem {
    pub id: String,
    /// Backend diagnostic when the document was rejected.
    pub error: Option<String>,
}

/// Outcome of a bulk write.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkResponse {
    pub items: Vec<BulkItem>,
}

impl BulkResponse {
    /// Items the store rejected.
    pub fn failures(&self) -> impl Iterator<Item = &BulkItem> {
        self.items.iter().filter(|item| item.error.is_some())
    }

    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }
}

/// Health reported by the store for an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreHealth {
    Green,
    Yellow,
    Red,
    Unknown,
}

impl StoreHealth {
    pub fn parse(status: &str) -> Self {
        match status {
            "green" => StoreHealth::Green,
            "yellow" => StoreHealth::Yellow,
            "red" => StoreHealth::Red,
            _ => StoreHealth::Unknown,
        }
    }
}

impl fmt::Display for StoreHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StoreHealth::Green => "green",
            StoreHealth::Yellow => "yellow",
            StoreHealth::Red => "red",
            StoreHealth::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Document count and health of an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub document_count: u64,
    pub health: StoreHealth,
}

/// A backend that stores physical documents and answers DSL queries.
///
/// Implementations must be safe to share between concurrent calls; the core keeps
/// no state of its own between calls.
#[async_trait]
pub trait DocumentStore: Send + Sync + fmt::Debug {
    /// Check whether an index exists.
    async fn index_exists(&self, index: &str) -> StoreResult<bool>;

    /// Create an index with the given mappings.
    async fn create_index(&self, index: &str, mappings: &Value) -> StoreResult<()>;

    /// Delete an index and all of its documents.
    async fn delete_index(&self, index: &str) -> StoreResult<()>;

    /// Write or replace documents by id. Individual rejections are reported per item.
    async fn bulk_index(&self, index: &str, documents: &[StoredDocument])
    -> StoreResult<BulkResponse>;

    /// Delete every document matching a query, returning the number deleted.
    async fn delete_by_query(&self, index: &str, query: &Value) -> StoreResult<u64>;

    /// Run a search request body and return the raw response.
    async fn search(&self, index: &str, body: &Value) -> StoreResult<Value>;

    /// Document count and health of an index.
    async fn stats(&self, index: &str) -> StoreResult<IndexStats>;
}
