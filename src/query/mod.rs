//! Logical search requests.
//!
//! Filters, facets and sorters form closed sets of kinds. The planner matches on
//! them exhaustively, so a kind added here must be handled there before the
//! crate compiles again.

pub mod facet;
pub mod filter;
pub mod request;
pub mod sorter;

pub use self::facet::{Facet, FacetKind, FacetRange};
pub use self::filter::{Filter, FilterKind, FilterRange};
pub use self::request::{AccessContext, SearchRequest};
pub use self::sorter::{Direction, Sorter};
