//! Result projection.
//!
//! Maps a raw store search response back to logical documents and typed facet
//! results. Bad hits and mismatched facets are dropped with a warning; the rest
//! of the result is kept.

use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use log::warn;
use serde_json::Value;
use uuid::Uuid;

use crate::document::field::ObjectType;
use crate::query::{Facet, FacetKind, FacetRange};
use crate::schema::names;
use crate::search::facet::{FacetResult, FacetValue};
use crate::search::{SearchDocument, SearchResult};

/// Project a store response onto the planned facets.
pub fn project(response: &Value, facets: &[Facet]) -> SearchResult {
    let documents: Vec<SearchDocument> = response
        .pointer("/hits/hits")
        .and_then(Value::as_array)
        .map(|hits| hits.iter().filter_map(document).collect())
        .unwrap_or_default();

    let total = match response.pointer("/hits/total") {
        Some(Value::Object(total)) => total.get("value").and_then(Value::as_u64),
        Some(total) => total.as_u64(),
        None => None,
    }
    .unwrap_or(documents.len() as u64);

    let facets = match response.get("aggregations") {
        Some(aggregations) => facets
            .iter()
            .filter_map(|facet| facet_result(aggregations, facet))
            .collect(),
        None => Vec::new(),
    };

    SearchResult {
        total,
        documents,
        facets,
    }
}

fn first_field<'a>(hit: &'a Value, name: &str) -> Option<&'a Value> {
    let values = hit.get("fields").and_then(|fields| fields.get(name));
    match values {
        Some(Value::Array(values)) => values.first(),
        Some(value) => Some(value),
        None => hit.get("_source").and_then(|source| source.get(name)),
    }
}

fn document(hit: &Value) -> Option<SearchDocument> {
    let id = hit.get("_id").and_then(Value::as_str).unwrap_or("?");
    let key = first_field(hit, names::KEY)
        .and_then(Value::as_str)
        .and_then(|key| Uuid::parse_str(key).ok());
    let Some(key) = key else {
        warn!("Skipping hit [{id}]: missing or malformed [{}]", names::KEY);
        return None;
    };
    let object_type = first_field(hit, names::OBJECT_TYPE)
        .and_then(Value::as_str)
        .map(|tag| ObjectType::from(tag.to_string()))
        .unwrap_or_else(|| {
            warn!("Hit [{id}] has no [{}]", names::OBJECT_TYPE);
            ObjectType::Unknown
        });
    Some(SearchDocument { key, object_type })
}

/// Buckets of a facet aggregation, looking through a filter wrapper.
fn buckets<'a>(aggregations: &'a Value, name: &str) -> Option<&'a Vec<Value>> {
    let aggregation = aggregations.get(name)?;
    aggregation
        .get("buckets")
        .or_else(|| aggregation.get(name).and_then(|inner| inner.get("buckets")))
        .and_then(Value::as_array)
}

fn facet_result(aggregations: &Value, facet: &Facet) -> Option<FacetResult> {
    let name = facet.aggregation_name();
    let Some(buckets) = buckets(aggregations, &name) else {
        warn!("No buckets for facet [{name}] in the search response");
        return None;
    };

    let values: Option<Vec<FacetValue>> = buckets
        .iter()
        .map(|bucket| facet_value(&facet.kind, bucket))
        .collect();
    match values {
        Some(values) => Some(FacetResult {
            field_name: facet.field_name.clone(),
            values,
        }),
        None => {
            warn!(
                "Dropping facet [{name}]: buckets do not match a {} facet",
                facet.kind.name()
            );
            None
        }
    }
}

fn millis_to_date(millis: i64) -> Option<DateTime<FixedOffset>> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .map(|date| date.fixed_offset())
}

/// Key and bounds of a range bucket. Bounds come from the requested range with
/// the same key, falling back to what the store reports.
fn range_bucket<'a, T: Clone>(
    bucket: &'a Value,
    ranges: &[FacetRange<T>],
    reported: impl Fn(&Value) -> Option<T>,
) -> Option<(&'a str, Option<T>, Option<T>)> {
    if bucket.get("key_as_string").is_some() {
        return None;
    }
    let key = bucket.get("key")?.as_str()?;
    match ranges.iter().find(|range| range.key == key) {
        Some(range) => Some((key, range.min.clone(), range.max.clone())),
        None => Some((
            key,
            bucket.get("from").and_then(&reported),
            bucket.get("to").and_then(&reported),
        )),
    }
}

fn facet_value(kind: &FacetKind, bucket: &Value) -> Option<FacetValue> {
    let count = bucket.get("doc_count")?.as_u64()?;
    let key = bucket.get("key")?;
    let keyed_as_string = bucket.get("key_as_string").is_some();

    let value = match kind {
        FacetKind::Keyword => FacetValue::Keyword {
            key: key.as_str()?.to_string(),
            count,
        },
        FacetKind::IntegerExact if !keyed_as_string => FacetValue::IntegerExact {
            key: key.as_i64()?,
            count,
        },
        FacetKind::DecimalExact if !keyed_as_string && key.is_f64() => FacetValue::DecimalExact {
            key: key.as_f64()?,
            count,
        },
        FacetKind::DateTimeExact if keyed_as_string => FacetValue::DateTimeExact {
            key: millis_to_date(key.as_i64()?)?,
            count,
        },
        FacetKind::IntegerExact | FacetKind::DecimalExact | FacetKind::DateTimeExact => {
            return None;
        }
        FacetKind::IntegerRange { ranges } => {
            let (key, min, max) =
                range_bucket(bucket, ranges, |value| value.as_f64().map(|v| v as i64))?;
            FacetValue::IntegerRange {
                key: key.to_string(),
                min,
                max,
                count,
            }
        }
        FacetKind::DecimalRange { ranges } => {
            let (key, min, max) = range_bucket(bucket, ranges, Value::as_f64)?;
            FacetValue::DecimalRange {
                key: key.to_string(),
                min,
                max,
                count,
            }
        }
        FacetKind::DateTimeRange { ranges } => {
            let (key, min, max) = range_bucket(bucket, ranges, |value| {
                value.as_f64().and_then(|millis| millis_to_date(millis as i64))
            })?;
            FacetValue::DateTimeRange {
                key: key.to_string(),
                min,
                max,
                count,
            }
        }
    };
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(aggregations: Value) -> Value {
        json!({
            "hits": {
                "total": {"value": 3, "relation": "eq"},
                "hits": [
                    {"_id": "a", "fields": {"key": ["00000000-0000-0000-0000-000000000001"], "objectType": ["Media"]}},
                    {"_id": "b", "fields": {"objectType": ["Document"]}},
                    {"_id": "c", "fields": {"key": ["00000000-0000-0000-0000-000000000003"], "objectType": ["Widget"]}}
                ]
            },
            "aggregations": aggregations
        })
    }

    #[test]
    fn test_hits_without_key_are_skipped() {
        let result = project(&response(json!({})), &[]);

        assert_eq!(result.total, 3);
        assert_eq!(result.documents.len(), 2);
        assert_eq!(result.documents[0].key, Uuid::from_u128(1));
        assert_eq!(result.documents[0].object_type, ObjectType::Media);
        assert_eq!(result.documents[1].object_type, ObjectType::Unknown);
    }

    #[test]
    fn test_filter_wrapper_is_unwrapped() {
        let aggregations = json!({
            "color_keyword": {
                "doc_count": 4,
                "color_keyword": {"buckets": [{"key": "red", "doc_count": 3}, {"key": "blue", "doc_count": 1}]}
            }
        });

        let result = project(&response(aggregations), &[Facet::keyword("color")]);
        assert_eq!(result.facets.len(), 1);
        assert_eq!(result.facets[0].field_name, "color");
        assert_eq!(
            result.facets[0].values,
            vec![
                FacetValue::Keyword { key: "red".to_string(), count: 3 },
                FacetValue::Keyword { key: "blue".to_string(), count: 1 },
            ]
        );
    }

    #[test]
    fn test_mismatched_facet_is_dropped() {
        let aggregations = json!({
            "price_integer_exact": {"buckets": [{"key": 9.5, "doc_count": 1}]},
            "count_integer_exact": {"buckets": [{"key": 5, "doc_count": 2}]}
        });

        let result = project(
            &response(aggregations),
            &[Facet::integers("price"), Facet::integers("count")],
        );
        assert_eq!(result.facets.len(), 1);
        assert_eq!(
            result.facets[0].values,
            vec![FacetValue::IntegerExact { key: 5, count: 2 }]
        );
    }

    #[test]
    fn test_date_and_decimal_buckets() {
        let aggregations = json!({
            "published_date_time_exact": {"buckets": [
                {"key": 1704067200000_i64, "key_as_string": "2024-01-01T00:00:00.000Z", "doc_count": 2}
            ]},
            "price_decimal_exact": {"buckets": [{"key": 10.0, "doc_count": 1}]},
            "count_decimal_exact": {"buckets": [{"key": 10, "doc_count": 1}]}
        });

        let result = project(
            &response(aggregations),
            &[
                Facet::date_times("published"),
                Facet::decimals("price"),
                Facet::decimals("count"),
            ],
        );

        assert_eq!(result.facets.len(), 2);
        assert_eq!(
            result.facets[0].values[0],
            FacetValue::DateTimeExact {
                key: DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z").unwrap(),
                count: 2
            }
        );
        assert_eq!(
            result.facets[1].values[0],
            FacetValue::DecimalExact { key: 10.0, count: 1 }
        );
    }

    #[test]
    fn test_range_buckets_keep_requested_bounds() {
        let facet = Facet::integer_ranges(
            "count",
            [FacetRange::new("low", None, Some(10)), FacetRange::new("high", Some(10), None)],
        );
        let aggregations = json!({
            "count_integer_range": {"buckets": [
                {"key": "low", "to": 10.0, "doc_count": 4},
                {"key": "high", "from": 10.0, "doc_count": 1}
            ]}
        });

        let result = project(&response(aggregations), &[facet]);
        assert_eq!(
            result.facets[0].values,
            vec![
                FacetValue::IntegerRange { key: "low".to_string(), min: None, max: Some(10), count: 4 },
                FacetValue::IntegerRange { key: "high".to_string(), min: Some(10), max: None, count: 1 },
            ]
        );
    }

    #[test]
    fn test_empty_buckets_give_empty_facet() {
        let aggregations = json!({ "tags_keyword": {"buckets": []} });

        let result = project(&response(aggregations), &[Facet::keyword("tags")]);
        assert_eq!(result.facets[0].values, vec![]);
    }

    #[test]
    fn test_missing_hits() {
        let result = project(&json!({}), &[Facet::keyword("tags")]);

        assert_eq!(result, SearchResult::default());
    }
}
