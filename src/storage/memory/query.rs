//! Query DSL evaluation for the in-memory store.
//!
//! Queries are compiled once per request into [`Query`] and then scored against
//! each stored document. `None` means the document does not match.

use regex::{Regex, RegexBuilder};
use serde_json::{Map, Value};

use crate::storage::memory::mapping::{FieldMappings, FieldType, Term, analyze, terms_at};
use crate::storage::traits::{StoreError, StoreResult};

#[derive(Debug)]
pub(crate) enum Query {
    MatchAll {
        boost: f64,
    },
    Bool {
        must: Vec<Query>,
        filter: Vec<Query>,
        should: Vec<Query>,
        must_not: Vec<Query>,
        minimum_should_match: Option<usize>,
        boost: f64,
    },
    Terms {
        field: String,
        values: Vec<Value>,
        boost: f64,
    },
    Range {
        field: String,
        gt: Option<Value>,
        gte: Option<Value>,
        lt: Option<Value>,
        lte: Option<Value>,
        boost: f64,
    },
    Wildcard {
        field: String,
        pattern: Regex,
        boost: f64,
    },
    MatchBoolPrefix {
        field: String,
        terms: Vec<String>,
        require_all: bool,
        boost: f64,
    },
}

fn single_entry<'a>(body: &'a Value, kind: &str) -> StoreResult<(&'a String, &'a Value)> {
    body.as_object()
        .filter(|map| map.len() == 1)
        .and_then(|map| map.iter().next())
        .ok_or_else(|| StoreError::rejected(400, format!("[{kind}] query malformed")))
}

fn boost_of(map: Option<&Map<String, Value>>) -> f64 {
    map.and_then(|map| map.get("boost"))
        .and_then(Value::as_f64)
        .unwrap_or(1.0)
}

fn clauses(body: &Map<String, Value>, name: &str) -> StoreResult<Vec<Query>> {
    match body.get(name) {
        None => Ok(Vec::new()),
        Some(Value::Array(items)) => items.iter().map(Query::parse).collect(),
        Some(item) => Ok(vec![Query::parse(item)?]),
    }
}

fn wildcard_regex(pattern: &str, case_insensitive: bool) -> StoreResult<Regex> {
    let mut expression = String::from("^");
    for ch in pattern.chars() {
        match ch {
            '*' => expression.push_str(".*"),
            '?' => expression.push('.'),
            other => expression.push_str(&regex::escape(&other.to_string())),
        }
    }
    expression.push('$');
    RegexBuilder::new(&expression)
        .case_insensitive(case_insensitive)
        .build()
        .map_err(|e| StoreError::rejected(400, format!("invalid wildcard [{pattern}]: {e}")))
}

impl Query {
    pub(crate) fn match_all() -> Self {
        Query::MatchAll { boost: 1.0 }
    }

    pub(crate) fn parse(body: &Value) -> StoreResult<Self> {
        let (kind, inner) = single_entry(body, "query")?;

        match kind.as_str() {
            "match_all" => Ok(Query::MatchAll {
                boost: boost_of(inner.as_object()),
            }),
            "bool" => {
                let map = inner
                    .as_object()
                    .ok_or_else(|| StoreError::rejected(400, "[bool] query malformed"))?;
                let minimum_should_match = match map.get("minimum_should_match") {
                    None => None,
                    Some(Value::Number(n)) => n.as_u64().map(|n| n as usize),
                    Some(Value::String(s)) => s.parse().ok(),
                    Some(_) => None,
                };
                Ok(Query::Bool {
                    must: clauses(map, "must")?,
                    filter: clauses(map, "filter")?,
                    should: clauses(map, "should")?,
                    must_not: clauses(map, "must_not")?,
                    minimum_should_match,
                    boost: boost_of(Some(map)),
                })
            }
            "term" => {
                let (field, operand) = single_entry(inner, "term")?;
                let (value, boost) = match operand {
                    Value::Object(map) => (
                        map.get("value").cloned().unwrap_or(Value::Null),
                        boost_of(Some(map)),
                    ),
                    value => (value.clone(), 1.0),
                };
                Ok(Query::Terms {
                    field: field.clone(),
                    values: vec![value],
                    boost,
                })
            }
            "terms" => {
                let map = inner
                    .as_object()
                    .ok_or_else(|| StoreError::rejected(400, "[terms] query malformed"))?;
                let boost = boost_of(Some(map));
                let mut fields = map.iter().filter(|(name, _)| name.as_str() != "boost");
                let (Some((field, values)), None) = (fields.next(), fields.next()) else {
                    return Err(StoreError::rejected(400, "[terms] query requires one field"));
                };
                let values = values
                    .as_array()
                    .cloned()
                    .ok_or_else(|| StoreError::rejected(400, "[terms] values must be an array"))?;
                Ok(Query::Terms {
                    field: field.clone(),
                    values,
                    boost,
                })
            }
            "range" => {
                let (field, bounds) = single_entry(inner, "range")?;
                let bounds = bounds
                    .as_object()
                    .ok_or_else(|| StoreError::rejected(400, "[range] query malformed"))?;
                Ok(Query::Range {
                    field: field.clone(),
                    gt: bounds.get("gt").cloned(),
                    gte: bounds.get("gte").cloned(),
                    lt: bounds.get("lt").cloned(),
                    lte: bounds.get("lte").cloned(),
                    boost: boost_of(Some(bounds)),
                })
            }
            "wildcard" => {
                let (field, operand) = single_entry(inner, "wildcard")?;
                let (pattern, case_insensitive, boost) = match operand {
                    Value::Object(map) => (
                        map.get("value")
                            .or_else(|| map.get("wildcard"))
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_string(),
                        map.get("case_insensitive")
                            .and_then(Value::as_bool)
                            .unwrap_or(false),
                        boost_of(Some(map)),
                    ),
                    Value::String(pattern) => (pattern.clone(), false, 1.0),
                    _ => return Err(StoreError::rejected(400, "[wildcard] query malformed")),
                };
                Ok(Query::Wildcard {
                    field: field.clone(),
                    pattern: wildcard_regex(&pattern, case_insensitive)?,
                    boost,
                })
            }
            "match_bool_prefix" => {
                let (field, operand) = single_entry(inner, "match_bool_prefix")?;
                let (query, require_all, boost) = match operand {
                    Value::Object(map) => (
                        map.get("query")
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_string(),
                        map.get("operator")
                            .and_then(Value::as_str)
                            .is_some_and(|operator| operator.eq_ignore_ascii_case("and")),
                        boost_of(Some(map)),
                    ),
                    Value::String(query) => (query.clone(), false, 1.0),
                    _ => {
                        return Err(StoreError::rejected(
                            400,
                            "[match_bool_prefix] query malformed",
                        ));
                    }
                };
                Ok(Query::MatchBoolPrefix {
                    field: field.clone(),
                    terms: analyze(&query),
                    require_all,
                    boost,
                })
            }
            other => Err(StoreError::unsupported(format!("query type [{other}]"))),
        }
    }

    /// Score a document, or `None` when it does not match.
    pub(crate) fn score(&self, source: &Value, mappings: &FieldMappings) -> Option<f64> {
        match self {
            Query::MatchAll { boost } => Some(*boost),
            Query::Bool {
                must,
                filter,
                should,
                must_not,
                minimum_should_match,
                boost,
            } => {
                let mut score = 0.0;
                for clause in must {
                    score += clause.score(source, mappings)?;
                }
                for clause in filter {
                    clause.score(source, mappings)?;
                }
                if must_not
                    .iter()
                    .any(|clause| clause.score(source, mappings).is_some())
                {
                    return None;
                }

                let mut matched_should = 0;
                for clause in should {
                    if let Some(clause_score) = clause.score(source, mappings) {
                        matched_should += 1;
                        score += clause_score;
                    }
                }
                let required = match minimum_should_match {
                    Some(required) => *required,
                    None if must.is_empty() && filter.is_empty() && !should.is_empty() => 1,
                    None => 0,
                };
                if matched_should < required {
                    return None;
                }

                if must.is_empty() && should.is_empty() && filter.is_empty() {
                    score = 1.0;
                }
                Some(score * boost)
            }
            Query::Terms {
                field,
                values,
                boost,
            } => {
                let field_type = mappings.resolve(field).field_type;
                let wanted: Vec<Term> = values
                    .iter()
                    .filter_map(|value| field_type.operand(value))
                    .collect();
                terms_at(source, field, mappings)
                    .iter()
                    .any(|term| wanted.contains(term))
                    .then_some(*boost)
            }
            Query::Range {
                field,
                gt,
                gte,
                lt,
                lte,
                boost,
            } => {
                let field_type = mappings.resolve(field).field_type;
                let bound = |value: &Option<Value>| value.as_ref().and_then(|v| field_type.operand(v));
                let (gt, gte, lt, lte) = (bound(gt), bound(gte), bound(lt), bound(lte));

                let in_range = |term: &Term| {
                    use std::cmp::Ordering::*;
                    let check = |bound: &Option<Term>, accept: &[std::cmp::Ordering]| {
                        bound
                            .as_ref()
                            .is_none_or(|bound| term.compare(bound).is_some_and(|o| accept.contains(&o)))
                    };
                    check(&gt, &[Greater])
                        && check(&gte, &[Greater, Equal])
                        && check(&lt, &[Less])
                        && check(&lte, &[Less, Equal])
                };
                terms_at(source, field, mappings)
                    .iter()
                    .any(in_range)
                    .then_some(*boost)
            }
            Query::Wildcard {
                field,
                pattern,
                boost,
            } => terms_at(source, field, mappings)
                .iter()
                .any(|term| match term {
                    Term::Str(text) => pattern.is_match(text),
                    _ => false,
                })
                .then_some(*boost),
            Query::MatchBoolPrefix {
                field,
                terms,
                require_all,
                boost,
            } => {
                let Some((last, leading)) = terms.split_last() else {
                    return None;
                };
                let tokens: Vec<String> = match mappings.resolve(field).field_type {
                    FieldType::Text | FieldType::Dynamic => terms_at(source, field, mappings)
                        .into_iter()
                        .filter_map(|term| match term {
                            Term::Str(text) => Some(text.to_lowercase()),
                            _ => None,
                        })
                        .collect(),
                    _ => return None,
                };

                let mut matched = leading
                    .iter()
                    .filter(|term| tokens.contains(term))
                    .count();
                if tokens.iter().any(|token| token.starts_with(last.as_str())) {
                    matched += 1;
                }

                let satisfied = if *require_all {
                    matched == terms.len()
                } else {
                    matched > 0
                };
                satisfied.then_some(boost * matched as f64)
            }
        }
    }
}
