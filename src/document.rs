//! Logical and physical document model.
//!
//! # Core Components
//!
//! - [`field_value::IndexValue`] - typed value slots of one logical field
//! - [`field::ContentItem`] - a content item with its fields, variations and protection
//! - [`document::PhysicalDocument`] - one stored document per (key, culture, segment)
//!
//! # Examples
//!
//! ```
//! use uuid::Uuid;
//! use varia::document::field::{ContentItem, IndexField, ObjectType, Variation};
//! use varia::document::field_value::IndexValue;
//!
//! let item = ContentItem::new(Uuid::new_v4(), ObjectType::Document)
//!     .with_variation(Variation::culture("en-US"))
//!     .with_variation(Variation::culture("da-DK"))
//!     .with_field(IndexField::new("title", IndexValue::new().with_texts(["Hello"])).with_culture("en-US"))
//!     .with_field(IndexField::new("title", IndexValue::new().with_texts(["Hej"])).with_culture("da-DK"));
//!
//! assert_eq!(item.variations.len(), 2);
//! ```

pub mod document;
pub mod field;
pub mod field_value;
