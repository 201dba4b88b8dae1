//! Builders for the store query DSL.

use serde_json::{Map, Value, json};

pub fn term<V: Into<Value>>(field: &str, value: V) -> Value {
    json!({ "term": { field: value.into() } })
}

pub fn terms<V: Into<Value>>(field: &str, values: impl IntoIterator<Item = V>) -> Value {
    let values: Vec<Value> = values.into_iter().map(Into::into).collect();
    json!({ "terms": { field: values } })
}

/// Half-open `[gte, lt)` range; a missing bound is left out.
pub fn range(field: &str, gte: Option<Value>, lt: Option<Value>) -> Value {
    let mut bounds = Map::new();
    if let Some(gte) = gte {
        bounds.insert("gte".to_string(), gte);
    }
    if let Some(lt) = lt {
        bounds.insert("lt".to_string(), lt);
    }
    json!({ "range": { field: bounds } })
}

pub fn wildcard(field: &str, pattern: &str, boost: f32) -> Value {
    json!({
        "wildcard": {
            field: { "value": pattern, "case_insensitive": true, "boost": boost }
        }
    })
}

/// Every analyzed term of `query` must match, the last one as a prefix.
pub fn match_bool_prefix(field: &str, query: &str, boost: f32) -> Value {
    json!({
        "match_bool_prefix": {
            field: { "query": query, "operator": "and", "boost": boost }
        }
    })
}

/// Clauses of a `bool` query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoolQuery {
    pub must: Vec<Value>,
    pub filter: Vec<Value>,
    pub should: Vec<Value>,
    pub must_not: Vec<Value>,
}

impl BoolQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Any of `clauses` must match.
    pub fn any_of(clauses: Vec<Value>) -> Value {
        BoolQuery {
            should: clauses,
            ..Default::default()
        }
        .into_query()
    }

    /// The `bool` query with empty clause lists left out. `should` clauses
    /// require at least one match.
    pub fn into_query(self) -> Value {
        let mut clauses = Map::new();
        for (occur, list) in [
            ("must", self.must),
            ("filter", self.filter),
            ("should", self.should),
            ("must_not", self.must_not),
        ] {
            if !list.is_empty() {
                if occur == "should" {
                    clauses.insert("minimum_should_match".to_string(), json!(1));
                }
                clauses.insert(occur.to_string(), Value::Array(list));
            }
        }
        json!({ "bool": clauses })
    }
}
