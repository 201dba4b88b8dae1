//! Physical documents.
//!
//! A [`PhysicalDocument`] is the unit written to the document store: one per
//! (content key, culture, segment). Field values live in a map from physical
//! field path to a closed set of typed arrays ([`PhysicalValues`]); maps are
//! ordered so that serializing the same document twice yields identical bytes.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use uuid::Uuid;

use crate::document::field::ObjectType;
use crate::error::Result;

/// Typed value array stored under one physical field path.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PhysicalValues {
    Texts(Vec<String>),
    Keywords(Vec<String>),
    Integers(Vec<i64>),
    Decimals(Vec<f64>),
    DateTimes(Vec<DateTime<FixedOffset>>),
}

impl PhysicalValues {
    /// Number of values in the array.
    pub fn len(&self) -> usize {
        match self {
            PhysicalValues::Texts(values) | PhysicalValues::Keywords(values) => values.len(),
            PhysicalValues::Integers(values) => values.len(),
            PhysicalValues::Decimals(values) => values.len(),
            PhysicalValues::DateTimes(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A document as stored in the backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhysicalDocument {
    /// Store document id, `{key}.{culture}.{segment}`.
    pub id: String,
    pub key: Uuid,
    pub object_type: ObjectType,
    /// Culture tag (lower-cased culture or the invariant tag).
    pub culture: String,
    /// Segment tag (lower-cased segment or the default tag).
    pub segment: String,
    pub access_keys: Vec<Uuid>,
    /// Free-text blobs keyed by aggregate field name.
    #[serde(flatten)]
    pub aggregates: BTreeMap<String, String>,
    /// Field values keyed by field path below the `fields` object.
    pub fields: BTreeMap<String, PhysicalValues>,
}

impl PhysicalDocument {
    /// The JSON source sent to the store.
    pub fn to_source(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Values stored under a field path (without the `fields.` prefix).
    pub fn field(&self, path: &str) -> Option<&PhysicalValues> {
        self.fields.get(path)
    }

    /// Aggregate blob stored under the given name.
    pub fn aggregate(&self, name: &str) -> Option<&str> {
        self.aggregates.get(name).map(String::as_str)
    }
}
