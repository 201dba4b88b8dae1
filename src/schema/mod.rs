//! Field encoding scheme and index mapping.

pub mod field;
pub mod mapping;

// Re-export commonly used types
pub use field::*;
pub use mapping::{BASE_FIELDS, base_mappings};
