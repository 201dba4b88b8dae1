//! Facet requests.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// A named half-open `[min, max)` facet bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacetRange<T> {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<T>,
}

impl<T> FacetRange<T> {
    pub fn new<S: Into<String>>(key: S, min: Option<T>, max: Option<T>) -> Self {
        FacetRange {
            key: key.into(),
            min,
            max,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FacetKind {
    Keyword,
    IntegerExact,
    IntegerRange { ranges: Vec<FacetRange<i64>> },
    DecimalExact,
    DecimalRange { ranges: Vec<FacetRange<f64>> },
    DateTimeExact,
    DateTimeRange { ranges: Vec<FacetRange<DateTime<FixedOffset>>> },
}

impl FacetKind {
    pub fn name(&self) -> &'static str {
        match self {
            FacetKind::Keyword => "keyword",
            FacetKind::IntegerExact => "integer_exact",
            FacetKind::IntegerRange { .. } => "integer_range",
            FacetKind::DecimalExact => "decimal_exact",
            FacetKind::DecimalRange { .. } => "decimal_range",
            FacetKind::DateTimeExact => "date_time_exact",
            FacetKind::DateTimeRange { .. } => "date_time_range",
        }
    }
}

/// A request for value counts of one logical field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Facet {
    pub field_name: String,
    #[serde(flatten)]
    pub kind: FacetKind,
}

impl Facet {
    fn of<S: Into<String>>(field_name: S, kind: FacetKind) -> Self {
        Facet {
            field_name: field_name.into(),
            kind,
        }
    }

    pub fn keyword<S: Into<String>>(field_name: S) -> Self {
        Facet::of(field_name, FacetKind::Keyword)
    }

    pub fn integers<S: Into<String>>(field_name: S) -> Self {
        Facet::of(field_name, FacetKind::IntegerExact)
    }

    pub fn integer_ranges<S: Into<String>>(
        field_name: S,
        ranges: impl IntoIterator<Item = FacetRange<i64>>,
    ) -> Self {
        let ranges = ranges.into_iter().collect();
        Facet::of(field_name, FacetKind::IntegerRange { ranges })
    }

    pub fn decimals<S: Into<String>>(field_name: S) -> Self {
        Facet::of(field_name, FacetKind::DecimalExact)
    }

    pub fn decimal_ranges<S: Into<String>>(
        field_name: S,
        ranges: impl IntoIterator<Item = FacetRange<f64>>,
    ) -> Self {
        let ranges = ranges.into_iter().collect();
        Facet::of(field_name, FacetKind::DecimalRange { ranges })
    }

    pub fn date_times<S: Into<String>>(field_name: S) -> Self {
        Facet::of(field_name, FacetKind::DateTimeExact)
    }

    pub fn date_time_ranges<S: Into<String>>(
        field_name: S,
        ranges: impl IntoIterator<Item = FacetRange<DateTime<FixedOffset>>>,
    ) -> Self {
        let ranges = ranges.into_iter().collect();
        Facet::of(field_name, FacetKind::DateTimeRange { ranges })
    }

    /// Name of the store aggregation computing this facet.
    pub fn aggregation_name(&self) -> String {
        format!("{}_{}", self.field_name, self.kind.name())
    }

    /// Whether the facet defines ranges but none of them.
    pub fn has_no_ranges(&self) -> bool {
        match &self.kind {
            FacetKind::IntegerRange { ranges } => ranges.is_empty(),
            FacetKind::DecimalRange { ranges } => ranges.is_empty(),
            FacetKind::DateTimeRange { ranges } => ranges.is_empty(),
            FacetKind::Keyword
            | FacetKind::IntegerExact
            | FacetKind::DecimalExact
            | FacetKind::DateTimeExact => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregation_name() {
        assert_eq!(Facet::keyword("color").aggregation_name(), "color_keyword");
        assert_eq!(
            Facet::integer_ranges("price", []).aggregation_name(),
            "price_integer_range"
        );
    }

    #[test]
    fn test_parse_range_facet() {
        let facet: Facet = serde_json::from_str(
            r#"{"fieldName": "price", "type": "decimal_range", "ranges": [{"key": "cheap", "max": 10.0}]}"#,
        )
        .unwrap();

        assert_eq!(
            facet,
            Facet::decimal_ranges("price", [FacetRange::new("cheap", None, Some(10.0))])
        );
        assert!(!facet.has_no_ranges());
        assert!(Facet::date_time_ranges("published", []).has_no_ranges());
    }
}
