//! Document store abstraction.
//!
//! The search core talks to its backend only through [`DocumentStore`]. Two
//! implementations ship with the crate: [`HttpStore`] for Elasticsearch-compatible
//! clusters and [`MemoryStore`] for tests and embedded use.
//!
//! # Store types
//!
//! ## HttpStore
//! - Talks JSON over HTTP through reqwest
//! - Bulk writes as NDJSON, deletes by query, searches with the query DSL
//! - API-key or basic authentication, configurable refresh and timeout
//!
//! ## MemoryStore
//! - Evaluates the query DSL subset the planner emits, including aggregations
//!   and post filters
//! - Applies dynamic templates from the index mappings
//! - Can reject documents, fail searches or report a health status on demand
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use varia::schema::base_mappings;
//! use varia::storage::{DocumentStore, MemoryStore, StoredDocument};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), varia::storage::StoreError> {
//! let store = MemoryStore::new();
//! store.create_index("content", &base_mappings()).await?;
//!
//! let document = StoredDocument {
//!     id: "a.inv.def".to_string(),
//!     source: json!({"culture": "inv", "segment": "def"}),
//! };
//! let response = store.bulk_index("content", &[document]).await?;
//! assert!(!response.has_failures());
//!
//! let found = store
//!     .search("content", &json!({"query": {"term": {"culture": "inv"}}}))
//!     .await?;
//! assert_eq!(found["hits"]["total"]["value"], 1);
//! # Ok(())
//! # }
//! ```

pub mod http;
pub mod memory;
pub mod traits;

// Re-export commonly used types
pub use http::HttpStore;
pub use memory::MemoryStore;
pub use traits::*;
