//! # Varia
//!
//! A search provider core for content whose documents vary by culture and
//! audience segment, backed by an Elasticsearch-compatible document store.
//!
//! ## Features
//!
//! - One physical document per (content key, culture, segment) with field fallback
//! - Schema-less field encoding through type postfixes and dynamic templates
//! - Multi-select facets: facet filters are applied after aggregation
//! - Typed filters, facets and sorters over text, keyword, integer, decimal and date values
//! - Pluggable stores: HTTP for real clusters, in-memory for tests and embedding

pub mod alias;
pub mod cli;
pub mod config;
pub mod document;
pub mod error;
pub mod indexer;
pub mod query;
pub mod schema;
pub mod search;
pub mod storage;
pub mod topology;
pub mod variance;

pub mod prelude {
    pub use crate::config::{IndexerConfig, ProviderConfig, SearcherConfig};
    pub use crate::document::field::{
        ContentItem, ContentProtection, IndexField, ObjectType, Variation,
    };
    pub use crate::document::field_value::{IndexValue, TextTier};
    pub use crate::error::{Result, VariaError};
    pub use crate::indexer::{Indexer, WriteReport};
    pub use crate::query::{
        AccessContext, Direction, Facet, FacetRange, Filter, FilterRange, SearchRequest, Sorter,
    };
    pub use crate::search::{FacetResult, FacetValue, SearchResult, Searcher};
    pub use crate::storage::{DocumentStore, HttpStore, MemoryStore};
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
