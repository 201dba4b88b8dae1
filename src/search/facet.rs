//! Typed facet results.

use chrono::{DateTime, FixedOffset};
use serde::Serialize;

/// One bucket of a facet.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FacetValue {
    Keyword {
        key: String,
        count: u64,
    },
    IntegerExact {
        key: i64,
        count: u64,
    },
    IntegerRange {
        key: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        min: Option<i64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        max: Option<i64>,
        count: u64,
    },
    DecimalExact {
        key: f64,
        count: u64,
    },
    DecimalRange {
        key: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
        count: u64,
    },
    DateTimeExact {
        key: DateTime<FixedOffset>,
        count: u64,
    },
    DateTimeRange {
        key: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        min: Option<DateTime<FixedOffset>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        max: Option<DateTime<FixedOffset>>,
        count: u64,
    },
}

impl FacetValue {
    pub fn count(&self) -> u64 {
        match self {
            FacetValue::Keyword { count, .. }
            | FacetValue::IntegerExact { count, .. }
            | FacetValue::IntegerRange { count, .. }
            | FacetValue::DecimalExact { count, .. }
            | FacetValue::DecimalRange { count, .. }
            | FacetValue::DateTimeExact { count, .. }
            | FacetValue::DateTimeRange { count, .. } => *count,
        }
    }

    /// Bucket key as display text.
    pub fn label(&self) -> String {
        match self {
            FacetValue::Keyword { key, .. }
            | FacetValue::IntegerRange { key, .. }
            | FacetValue::DecimalRange { key, .. }
            | FacetValue::DateTimeRange { key, .. } => key.clone(),
            FacetValue::IntegerExact { key, .. } => key.to_string(),
            FacetValue::DecimalExact { key, .. } => key.to_string(),
            FacetValue::DateTimeExact { key, .. } => key.to_rfc3339(),
        }
    }
}

/// Buckets of one requested facet.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FacetResult {
    pub field_name: String,
    pub values: Vec<FacetValue>,
}

impl FacetResult {
    /// Count of the bucket labelled `label`, if present.
    pub fn count_of(&self, label: &str) -> Option<u64> {
        self.values
            .iter()
            .find(|value| value.label() == label)
            .map(FacetValue::count)
    }
}
