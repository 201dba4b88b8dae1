//! Aggregations for the in-memory store: `terms`, `range` and `filter`.

use std::cmp::Ordering;

use ahash::AHashMap;
use serde_json::{Map, Value, json};

use crate::storage::memory::mapping::{FieldMappings, FieldType, Term, format_date, terms_at};
use crate::storage::memory::query::Query;
use crate::storage::traits::{StoreError, StoreResult};

#[derive(Debug)]
pub(crate) struct RangeBucket {
    key: Option<String>,
    from: Option<Value>,
    to: Option<Value>,
}

#[derive(Debug)]
pub(crate) enum Aggregation {
    Terms {
        field: String,
        size: usize,
    },
    Range {
        field: String,
        ranges: Vec<RangeBucket>,
    },
    Filter {
        query: Query,
        aggregations: Vec<(String, Aggregation)>,
    },
}

/// Parse an `aggs` object into named aggregations.
pub(crate) fn parse_aggregations(body: &Value) -> StoreResult<Vec<(String, Aggregation)>> {
    let Some(named) = body.as_object() else {
        return Err(StoreError::rejected(400, "[aggs] must be an object"));
    };
    named
        .iter()
        .map(|(name, definition)| Ok((name.clone(), Aggregation::parse(name, definition)?)))
        .collect()
}

fn field_of(name: &str, body: &Value) -> StoreResult<String> {
    body.get("field")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| StoreError::rejected(400, format!("aggregation [{name}] requires a field")))
}

impl Aggregation {
    fn parse(name: &str, definition: &Value) -> StoreResult<Self> {
        let Some(map) = definition.as_object() else {
            return Err(StoreError::rejected(400, format!("aggregation [{name}] malformed")));
        };
        let sub = map
            .get("aggs")
            .or_else(|| map.get("aggregations"))
            .map(parse_aggregations)
            .transpose()?
            .unwrap_or_default();

        if let Some(body) = map.get("terms") {
            let size = body.get("size").and_then(Value::as_u64).unwrap_or(10) as usize;
            return Ok(Aggregation::Terms {
                field: field_of(name, body)?,
                size,
            });
        }
        if let Some(body) = map.get("range") {
            let ranges = body
                .get("ranges")
                .and_then(Value::as_array)
                .ok_or_else(|| {
                    StoreError::rejected(400, format!("range aggregation [{name}] requires ranges"))
                })?
                .iter()
                .map(|range| RangeBucket {
                    key: range.get("key").and_then(Value::as_str).map(str::to_string),
                    from: range.get("from").filter(|v| !v.is_null()).cloned(),
                    to: range.get("to").filter(|v| !v.is_null()).cloned(),
                })
                .collect();
            return Ok(Aggregation::Range {
                field: field_of(name, body)?,
                ranges,
            });
        }
        if let Some(body) = map.get("filter") {
            return Ok(Aggregation::Filter {
                query: Query::parse(body)?,
                aggregations: sub,
            });
        }
        Err(StoreError::unsupported(format!("aggregation type of [{name}]")))
    }

    fn run(&self, documents: &[&Value], mappings: &FieldMappings) -> StoreResult<Value> {
        match self {
            Aggregation::Terms { field, size } => terms(field, *size, documents, mappings),
            Aggregation::Range { field, ranges } => range(field, ranges, documents, mappings),
            Aggregation::Filter {
                query,
                aggregations,
            } => {
                let matching: Vec<&Value> = documents
                    .iter()
                    .copied()
                    .filter(|document| query.score(document, mappings).is_some())
                    .collect();
                let mut result = run_aggregations(aggregations, &matching, mappings)?;
                result.insert("doc_count".to_string(), json!(matching.len()));
                Ok(Value::Object(result))
            }
        }
    }
}

/// Run named aggregations over a document set.
pub(crate) fn run_aggregations(
    aggregations: &[(String, Aggregation)],
    documents: &[&Value],
    mappings: &FieldMappings,
) -> StoreResult<Map<String, Value>> {
    let mut results = Map::new();
    for (name, aggregation) in aggregations {
        results.insert(name.clone(), aggregation.run(documents, mappings)?);
    }
    Ok(results)
}

fn reject_text(field: &str, field_type: FieldType) -> StoreResult<()> {
    if field_type == FieldType::Text {
        return Err(StoreError::rejected(
            400,
            format!("text field [{field}] is not aggregatable, use a keyword field instead"),
        ));
    }
    Ok(())
}

fn bucket_key(field_type: FieldType, term: &Term) -> Map<String, Value> {
    let mut bucket = Map::new();
    match (field_type, term) {
        (FieldType::Long, Term::Num(value)) => {
            bucket.insert("key".to_string(), json!(*value as i64));
        }
        (FieldType::Date, Term::Date(millis)) => {
            bucket.insert("key".to_string(), json!(millis));
            bucket.insert("key_as_string".to_string(), json!(format_date(*millis)));
        }
        (_, Term::Num(value)) => {
            bucket.insert("key".to_string(), json!(value));
        }
        (_, Term::Str(value)) => {
            bucket.insert("key".to_string(), json!(value));
        }
        (_, Term::Date(millis)) => {
            bucket.insert("key".to_string(), json!(millis));
        }
    }
    bucket
}

fn terms(
    field: &str,
    size: usize,
    documents: &[&Value],
    mappings: &FieldMappings,
) -> StoreResult<Value> {
    let field_type = mappings.resolve(field).field_type;
    reject_text(field, field_type)?;

    let mut counts: AHashMap<_, (Term, u64)> = AHashMap::new();
    for document in documents {
        let mut seen = Vec::new();
        for term in terms_at(document, field, mappings) {
            let key = term.key();
            if seen.contains(&key) {
                continue;
            }
            seen.push(key.clone());
            counts.entry(key).or_insert((term, 0)).1 += 1;
        }
    }

    let mut buckets: Vec<(Term, u64)> = counts.into_values().collect();
    buckets.sort_by(|(a_term, a_count), (b_term, b_count)| {
        b_count
            .cmp(a_count)
            .then_with(|| a_term.compare(b_term).unwrap_or(Ordering::Equal))
    });

    let other: u64 = buckets.iter().skip(size).map(|(_, count)| count).sum();
    let buckets: Vec<Value> = buckets
        .into_iter()
        .take(size)
        .map(|(term, count)| {
            let mut bucket = bucket_key(field_type, &term);
            bucket.insert("doc_count".to_string(), json!(count));
            Value::Object(bucket)
        })
        .collect();

    Ok(json!({
        "doc_count_error_upper_bound": 0,
        "sum_other_doc_count": other,
        "buckets": buckets,
    }))
}

fn format_bound(value: Option<f64>) -> String {
    match value {
        Some(value) => format!("{value:?}"),
        None => "*".to_string(),
    }
}

fn range(
    field: &str,
    ranges: &[RangeBucket],
    documents: &[&Value],
    mappings: &FieldMappings,
) -> StoreResult<Value> {
    let field_type = mappings.resolve(field).field_type;
    reject_text(field, field_type)?;

    let values: Vec<Vec<f64>> = documents
        .iter()
        .map(|document| {
            terms_at(document, field, mappings)
                .iter()
                .filter_map(Term::as_f64)
                .collect()
        })
        .collect();

    let bound = |value: &Option<Value>| -> Option<f64> {
        value
            .as_ref()
            .and_then(|value| field_type.operand(value))
            .and_then(|term| term.as_f64())
    };

    let mut buckets = Vec::with_capacity(ranges.len());
    for range in ranges {
        let from = bound(&range.from);
        let to = bound(&range.to);
        let count = values
            .iter()
            .filter(|document_values| {
                document_values.iter().any(|value| {
                    from.is_none_or(|from| *value >= from) && to.is_none_or(|to| *value < to)
                })
            })
            .count();

        let key = range
            .key
            .clone()
            .unwrap_or_else(|| format!("{}-{}", format_bound(from), format_bound(to)));
        let mut bucket = Map::new();
        bucket.insert("key".to_string(), json!(key));
        if let Some(from) = from {
            bucket.insert("from".to_string(), json!(from));
            if field_type == FieldType::Date {
                bucket.insert("from_as_string".to_string(), json!(format_date(from as i64)));
            }
        }
        if let Some(to) = to {
            bucket.insert("to".to_string(), json!(to));
            if field_type == FieldType::Date {
                bucket.insert("to_as_string".to_string(), json!(format_date(to as i64)));
            }
        }
        bucket.insert("doc_count".to_string(), json!(count));
        buckets.push(Value::Object(bucket));
    }

    Ok(json!({ "buckets": buckets }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mappings() -> FieldMappings {
        FieldMappings::parse(&crate::schema::base_mappings()).unwrap()
    }

    fn documents() -> Vec<Value> {
        (1..=5)
            .map(|i| {
                json!({
                    "fields": {
                        "parity_keywords": [if i % 2 == 0 { "even" } else { "odd" }],
                        "count_integers": [i, i * 10],
                        "price_decimals": [i as f64 + 0.5]
                    }
                })
            })
            .collect()
    }

    fn run(definition: Value) -> Value {
        let documents = documents();
        let refs: Vec<&Value> = documents.iter().collect();
        let aggregations = parse_aggregations(&definition).unwrap();
        Value::Object(run_aggregations(&aggregations, &refs, &mappings()).unwrap())
    }

    #[test]
    fn test_terms_order_and_types() {
        let result = run(json!({
            "parity": {"terms": {"field": "fields.parity_keywords", "size": 10}},
            "count": {"terms": {"field": "fields.count_integers", "size": 2}},
            "price": {"terms": {"field": "fields.price_decimals", "size": 1}}
        }));

        assert_eq!(
            result["parity"]["buckets"],
            json!([{"key": "odd", "doc_count": 3}, {"key": "even", "doc_count": 2}])
        );
        assert_eq!(
            result["count"]["buckets"],
            json!([{"key": 1, "doc_count": 1}, {"key": 2, "doc_count": 1}])
        );
        assert_eq!(result["count"]["sum_other_doc_count"], 8);
        assert!(result["price"]["buckets"][0]["key"].is_f64());
    }

    #[test]
    fn test_range_is_half_open() {
        let result = run(json!({
            "count": {"range": {"field": "fields.count_integers", "ranges": [
                {"key": "low", "from": 1, "to": 3},
                {"key": "high", "from": 30}
            ]}}
        }));

        let buckets = &result["count"]["buckets"];
        assert_eq!(buckets[0]["key"], "low");
        assert_eq!(buckets[0]["doc_count"], 2);
        assert_eq!(buckets[1]["doc_count"], 3);
        assert!(buckets[1].get("to").is_none());
    }

    #[test]
    fn test_filter_wraps_sub_aggregation() {
        let result = run(json!({
            "parity": {
                "filter": {"range": {"fields.count_integers": {"gte": 3, "lt": 10}}},
                "aggs": {"parity": {"terms": {"field": "fields.parity_keywords"}}}
            }
        }));

        assert_eq!(result["parity"]["doc_count"], 3);
        assert_eq!(
            result["parity"]["parity"]["buckets"],
            json!([{"key": "odd", "doc_count": 2}, {"key": "even", "doc_count": 1}])
        );
    }

    #[test]
    fn test_text_fields_are_not_aggregatable() {
        let documents = documents();
        let refs: Vec<&Value> = documents.iter().collect();
        let aggregations =
            parse_aggregations(&json!({"t": {"terms": {"field": "fields.title_texts"}}})).unwrap();

        assert!(run_aggregations(&aggregations, &refs, &mappings()).is_err());
    }
}
