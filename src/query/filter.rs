//! Search filters.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// A half-open `[min, max)` range. A missing bound is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterRange<T> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<T>,
}

impl<T> FilterRange<T> {
    pub fn new(min: Option<T>, max: Option<T>) -> Self {
        FilterRange { min, max }
    }

    pub fn between(min: T, max: T) -> Self {
        FilterRange {
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn at_least(min: T) -> Self {
        FilterRange {
            min: Some(min),
            max: None,
        }
    }

    pub fn below(max: T) -> Self {
        FilterRange {
            min: None,
            max: Some(max),
        }
    }
}

/// The kind-specific part of a filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FilterKind {
    /// Case-insensitive prefix match against any text tier.
    Text { values: Vec<String> },
    Keyword { values: Vec<String> },
    IntegerExact { values: Vec<i64> },
    IntegerRange { ranges: Vec<FilterRange<i64>> },
    DecimalExact { values: Vec<f64> },
    DecimalRange { ranges: Vec<FilterRange<f64>> },
    DateTimeExact { values: Vec<DateTime<FixedOffset>> },
    DateTimeRange { ranges: Vec<FilterRange<DateTime<FixedOffset>>> },
}

impl FilterKind {
    pub fn name(&self) -> &'static str {
        match self {
            FilterKind::Text { .. } => "text",
            FilterKind::Keyword { .. } => "keyword",
            FilterKind::IntegerExact { .. } => "integer_exact",
            FilterKind::IntegerRange { .. } => "integer_range",
            FilterKind::DecimalExact { .. } => "decimal_exact",
            FilterKind::DecimalRange { .. } => "decimal_range",
            FilterKind::DateTimeExact { .. } => "date_time_exact",
            FilterKind::DateTimeRange { .. } => "date_time_range",
        }
    }

    /// Number of ranges, or `None` for exact-value kinds.
    pub fn range_count(&self) -> Option<usize> {
        match self {
            FilterKind::IntegerRange { ranges } => Some(ranges.len()),
            FilterKind::DecimalRange { ranges } => Some(ranges.len()),
            FilterKind::DateTimeRange { ranges } => Some(ranges.len()),
            FilterKind::Text { .. }
            | FilterKind::Keyword { .. }
            | FilterKind::IntegerExact { .. }
            | FilterKind::DecimalExact { .. }
            | FilterKind::DateTimeExact { .. } => None,
        }
    }
}

/// A filter on one logical field. Any value or range of a filter may match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filter {
    pub field_name: String,
    #[serde(flatten)]
    pub kind: FilterKind,
    /// Exclude matching documents instead of requiring them.
    #[serde(default)]
    pub negate: bool,
}

impl Filter {
    fn of<S: Into<String>>(field_name: S, kind: FilterKind) -> Self {
        Filter {
            field_name: field_name.into(),
            kind,
            negate: false,
        }
    }

    pub fn text<S: Into<String>, V: Into<String>>(
        field_name: S,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        Filter::of(field_name, FilterKind::Text { values })
    }

    pub fn keyword<S: Into<String>, V: Into<String>>(
        field_name: S,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        Filter::of(field_name, FilterKind::Keyword { values })
    }

    pub fn integers<S: Into<String>>(field_name: S, values: impl IntoIterator<Item = i64>) -> Self {
        let values = values.into_iter().collect();
        Filter::of(field_name, FilterKind::IntegerExact { values })
    }

    pub fn integer_ranges<S: Into<String>>(
        field_name: S,
        ranges: impl IntoIterator<Item = FilterRange<i64>>,
    ) -> Self {
        let ranges = ranges.into_iter().collect();
        Filter::of(field_name, FilterKind::IntegerRange { ranges })
    }

    pub fn decimals<S: Into<String>>(field_name: S, values: impl IntoIterator<Item = f64>) -> Self {
        let values = values.into_iter().collect();
        Filter::of(field_name, FilterKind::DecimalExact { values })
    }

    pub fn decimal_ranges<S: Into<String>>(
        field_name: S,
        ranges: impl IntoIterator<Item = FilterRange<f64>>,
    ) -> Self {
        let ranges = ranges.into_iter().collect();
        Filter::of(field_name, FilterKind::DecimalRange { ranges })
    }

    pub fn date_times<S: Into<String>>(
        field_name: S,
        values: impl IntoIterator<Item = DateTime<FixedOffset>>,
    ) -> Self {
        let values = values.into_iter().collect();
        Filter::of(field_name, FilterKind::DateTimeExact { values })
    }

    pub fn date_time_ranges<S: Into<String>>(
        field_name: S,
        ranges: impl IntoIterator<Item = FilterRange<DateTime<FixedOffset>>>,
    ) -> Self {
        let ranges = ranges.into_iter().collect();
        Filter::of(field_name, FilterKind::DateTimeRange { ranges })
    }

    pub fn negated(mut self) -> Self {
        self.negate = true;
        self
    }
}
