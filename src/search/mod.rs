//! Searching.
//!
//! The [`QueryPlanner`] turns a [`SearchRequest`](crate::query::SearchRequest)
//! into a store request, the [`Searcher`] runs it and the
//! [`projector`] maps the response back to a [`SearchResult`].
//!
//! # Visibility
//!
//! A search only sees documents of its own variation:
//!
//! - with a culture, that culture's documents and the invariant ones;
//! - with a segment, that segment's documents, otherwise the default segment's;
//! - documents whose access keys meet the caller's, public documents always.
//!
//! # Facets
//!
//! Filters on a faceted field narrow the hits but not their own facet, so a
//! facet keeps offering the values the caller could switch to. Filters on fields
//! without a facet narrow everything.
//!
//! # Failures
//!
//! A store that cannot answer yields an empty [`SearchResult`]; the error is
//! logged. Only requests that cannot be expressed as a store query return `Err`.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use varia::config::{IndexerConfig, SearcherConfig};
//! use varia::document::field::{ContentItem, IndexField, ObjectType, Variation};
//! use varia::document::field_value::IndexValue;
//! use varia::indexer::Indexer;
//! use varia::query::{Facet, Filter, SearchRequest};
//! use varia::search::Searcher;
//! use varia::storage::MemoryStore;
//! use uuid::Uuid;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> varia::error::Result<()> {
//! let store = MemoryStore::new();
//! let indexer = Indexer::new(Arc::new(store.clone()), IndexerConfig::default())?;
//! let searcher = Searcher::new(Arc::new(store), SearcherConfig::default())?;
//! indexer.ensure("content").await?;
//!
//! for (i, color) in [(1, "red"), (2, "blue"), (3, "red")] {
//!     let item = ContentItem::new(Uuid::from_u128(i), ObjectType::Document)
//!         .with_variation(Variation::invariant())
//!         .with_field(IndexField::new("title", IndexValue::new().with_texts(["Running shoe"])))
//!         .with_field(IndexField::new("color", IndexValue::new().with_keywords([color])));
//!     indexer.add_or_update("content", &item).await?;
//! }
//!
//! let request = SearchRequest::new()
//!     .with_query("shoe")
//!     .with_filter(Filter::keyword("color", ["red"]))
//!     .with_facet(Facet::keyword("color"));
//! let result = searcher.search("content", &request).await?;
//!
//! assert_eq!(result.total, 2);
//! let colors = result.facet("color").expect("color facet");
//! assert_eq!(colors.count_of("red"), Some(2));
//! assert_eq!(colors.count_of("blue"), Some(1));
//! # Ok(())
//! # }
//! ```

pub mod dsl;
pub mod facet;
pub mod planner;
pub mod projector;
pub mod searcher;

use serde::Serialize;
use uuid::Uuid;

use crate::document::field::ObjectType;

pub use self::facet::{FacetResult, FacetValue};
pub use self::planner::{QueryPlan, QueryPlanner};
pub use self::searcher::Searcher;

/// A matching content item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchDocument {
    pub key: Uuid,
    pub object_type: ObjectType,
}

/// Outcome of a search. Empty when the store could not answer.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchResult {
    /// Number of matching documents across all pages.
    pub total: u64,
    pub documents: Vec<SearchDocument>,
    pub facets: Vec<FacetResult>,
}

impl SearchResult {
    pub fn keys(&self) -> Vec<Uuid> {
        self.documents.iter().map(|document| document.key).collect()
    }

    pub fn facet(&self, field_name: &str) -> Option<&FacetResult> {
        self.facets
            .iter()
            .find(|facet| facet.field_name == field_name)
    }
}
