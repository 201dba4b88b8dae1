//! Field typing for the in-memory store.
//!
//! Fields are typed the way a schema-less Elasticsearch index types them: declared
//! properties first, then the first dynamic template whose `match` pattern fits the
//! leaf name, then inference from the JSON value itself.

use std::cmp::Ordering;

use ahash::AHashMap;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use regex::Regex;
use serde_json::Value;
use unicode_segmentation::UnicodeSegmentation;

use crate::storage::traits::{StoreError, StoreResult};

/// Index-level type of a field path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FieldType {
    Keyword,
    Text,
    Long,
    Double,
    Date,
    /// No mapping; values are compared as they appear in JSON.
    Dynamic,
}

impl FieldType {
    fn parse(name: &str) -> StoreResult<Self> {
        match name {
            "keyword" => Ok(FieldType::Keyword),
            "text" => Ok(FieldType::Text),
            "long" | "integer" => Ok(FieldType::Long),
            "double" | "float" => Ok(FieldType::Double),
            "date" => Ok(FieldType::Date),
            other => Err(StoreError::unsupported(format!("field type [{other}]"))),
        }
    }

    pub(crate) fn name(&self) -> &'static str {
        match self {
            FieldType::Keyword => "keyword",
            FieldType::Text => "text",
            FieldType::Long => "long",
            FieldType::Double => "double",
            FieldType::Date => "date",
            FieldType::Dynamic => "dynamic",
        }
    }
}

/// A comparable field value.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Term {
    Str(String),
    Num(f64),
    /// Epoch milliseconds.
    Date(i64),
}

/// Hashable identity of a [`Term`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum TermKey {
    Str(String),
    Num(u64),
    Date(i64),
}

impl Term {
    pub(crate) fn compare(&self, other: &Term) -> Option<Ordering> {
        match (self, other) {
            (Term::Str(a), Term::Str(b)) => Some(a.cmp(b)),
            (Term::Num(a), Term::Num(b)) => a.partial_cmp(b),
            (Term::Date(a), Term::Date(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    pub(crate) fn key(&self) -> TermKey {
        match self {
            Term::Str(value) => TermKey::Str(value.clone()),
            // -0.0 and 0.0 are the same bucket
            Term::Num(value) => TermKey::Num((value + 0.0).to_bits()),
            Term::Date(value) => TermKey::Date(*value),
        }
    }

    pub(crate) fn as_f64(&self) -> Option<f64> {
        match self {
            Term::Num(value) => Some(*value),
            Term::Date(value) => Some(*value as f64),
            Term::Str(_) => None,
        }
    }
}

/// Lower-cased Unicode word tokens, as a standard analyzer produces them.
pub(crate) fn analyze(text: &str) -> Vec<String> {
    text.unicode_words().map(str::to_lowercase).collect()
}

pub(crate) fn parse_date(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64().or_else(|| number.as_f64().map(|v| v as i64)),
        Value::String(text) => DateTime::parse_from_rfc3339(text)
            .map(|date| date.timestamp_millis())
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(text, "%Y-%m-%d")
                    .ok()
                    .and_then(|date| date.and_hms_opt(0, 0, 0))
                    .map(|date| date.and_utc().timestamp_millis())
            }),
        _ => None,
    }
}

pub(crate) fn format_date(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|date| date.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_else(|| millis.to_string())
}

fn parse_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.parse().ok(),
        _ => None,
    }
}

impl FieldType {
    /// Convert a query operand to a term without analysis.
    pub(crate) fn operand(&self, value: &Value) -> Option<Term> {
        match self {
            FieldType::Keyword | FieldType::Text => match value {
                Value::String(text) => Some(Term::Str(text.clone())),
                Value::Number(number) => Some(Term::Str(number.to_string())),
                Value::Bool(flag) => Some(Term::Str(flag.to_string())),
                _ => None,
            },
            FieldType::Long | FieldType::Double => parse_number(value).map(Term::Num),
            FieldType::Date => parse_date(value).map(Term::Date),
            FieldType::Dynamic => match value {
                Value::String(text) => Some(Term::Str(text.clone())),
                Value::Number(number) => number.as_f64().map(Term::Num),
                Value::Bool(flag) => Some(Term::Str(flag.to_string())),
                _ => None,
            },
        }
    }

    /// Indexed terms of a stored value; text is analyzed into tokens.
    pub(crate) fn indexed(&self, value: &Value) -> Vec<Term> {
        match (self, value) {
            (FieldType::Text, Value::String(text)) => {
                analyze(text).into_iter().map(Term::Str).collect()
            }
            _ => self.operand(value).into_iter().collect(),
        }
    }

    /// Check that a stored value can be indexed as this type.
    pub(crate) fn accepts(&self, value: &Value) -> bool {
        match self {
            FieldType::Long => match value {
                Value::Number(number) => number.is_i64() || number.is_u64(),
                Value::String(text) => text.parse::<i64>().is_ok(),
                _ => false,
            },
            FieldType::Double => parse_number(value).is_some(),
            FieldType::Date => parse_date(value).is_some(),
            FieldType::Keyword | FieldType::Text | FieldType::Dynamic => !value.is_object(),
        }
    }
}

/// Resolved type of a field path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ResolvedPath {
    pub field_type: FieldType,
    /// Whether the path addresses the `keyword` companion of a text field.
    pub keyword_companion: bool,
}

#[derive(Debug)]
struct DynamicTemplate {
    pattern: Regex,
    field_type: FieldType,
    has_keyword: bool,
}

fn glob_to_regex(glob: &str) -> StoreResult<Regex> {
    let pattern = glob
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    Regex::new(&format!("^{pattern}$"))
        .map_err(|e| StoreError::unsupported(format!("pattern [{glob}]: {e}")))
}

/// Property and dynamic-template typing of one index.
#[derive(Debug, Default)]
pub(crate) struct FieldMappings {
    properties: AHashMap<String, (FieldType, bool)>,
    templates: Vec<DynamicTemplate>,
}

fn mapping_type(mapping: &Value) -> StoreResult<(FieldType, bool)> {
    let field_type = mapping
        .get("type")
        .and_then(Value::as_str)
        .map(FieldType::parse)
        .transpose()?
        .unwrap_or(FieldType::Dynamic);
    let has_keyword = mapping
        .pointer("/fields/keyword/type")
        .and_then(Value::as_str)
        == Some("keyword");
    Ok((field_type, has_keyword))
}

impl FieldMappings {
    pub(crate) fn parse(mappings: &Value) -> StoreResult<Self> {
        let mut parsed = FieldMappings::default();

        if let Some(properties) = mappings.get("properties").and_then(Value::as_object) {
            for (name, mapping) in properties {
                parsed.properties.insert(name.clone(), mapping_type(mapping)?);
            }
        }

        if let Some(templates) = mappings.get("dynamic_templates").and_then(Value::as_array) {
            for template in templates {
                let Some((_, body)) = template.as_object().and_then(|named| named.iter().next())
                else {
                    return Err(StoreError::unsupported("empty dynamic template"));
                };
                let Some(glob) = body.get("match").and_then(Value::as_str) else {
                    return Err(StoreError::unsupported("dynamic template without match"));
                };
                let (field_type, has_keyword) =
                    mapping_type(body.get("mapping").unwrap_or(&Value::Null))?;
                parsed.templates.push(DynamicTemplate {
                    pattern: glob_to_regex(glob)?,
                    field_type,
                    has_keyword,
                });
            }
        }

        Ok(parsed)
    }

    fn lookup(&self, path: &str) -> Option<(FieldType, bool)> {
        if let Some(mapping) = self.properties.get(path) {
            return Some(*mapping);
        }
        let leaf = path.rsplit('.').next().unwrap_or(path);
        self.templates
            .iter()
            .find(|template| template.pattern.is_match(leaf))
            .map(|template| (template.field_type, template.has_keyword))
    }

    /// Type of a path as a query, sort or aggregation addresses it.
    pub(crate) fn resolve(&self, path: &str) -> ResolvedPath {
        if let Some(base) = path.strip_suffix(".keyword") {
            if let Some((FieldType::Text, true)) = self.lookup(base) {
                return ResolvedPath {
                    field_type: FieldType::Keyword,
                    keyword_companion: true,
                };
            }
        }
        let field_type = self
            .lookup(path)
            .map(|(field_type, _)| field_type)
            .unwrap_or(FieldType::Dynamic);
        ResolvedPath {
            field_type,
            keyword_companion: false,
        }
    }

    /// Type a stored leaf is indexed as.
    pub(crate) fn stored_type(&self, path: &str) -> FieldType {
        self.lookup(path)
            .map(|(field_type, _)| field_type)
            .unwrap_or(FieldType::Dynamic)
    }
}

/// Raw JSON values stored at a dotted path.
pub(crate) fn values_at<'a>(source: &'a Value, path: &str) -> Vec<&'a Value> {
    let mut current = source;
    for segment in path.split('.') {
        match current.get(segment) {
            Some(next) => current = next,
            None => return Vec::new(),
        }
    }
    match current {
        Value::Array(values) => values.iter().filter(|value| !value.is_null()).collect(),
        Value::Null => Vec::new(),
        value => vec![value],
    }
}

/// Indexed terms of a document at a path.
pub(crate) fn terms_at(source: &Value, path: &str, mappings: &FieldMappings) -> Vec<Term> {
    let resolved = mappings.resolve(path);
    let stored_path = if resolved.keyword_companion {
        path.trim_end_matches(".keyword")
    } else {
        path
    };
    values_at(source, stored_path)
        .into_iter()
        .flat_map(|value| resolved.field_type.indexed(value))
        .collect()
}

/// Every leaf of a document with its dotted path.
pub(crate) fn leaves(source: &Value) -> Vec<(String, &Value)> {
    fn walk<'a>(prefix: &str, value: &'a Value, out: &mut Vec<(String, &'a Value)>) {
        match value {
            Value::Object(map) => {
                for (name, child) in map {
                    let path = if prefix.is_empty() {
                        name.clone()
                    } else {
                        format!("{prefix}.{name}")
                    };
                    walk(&path, child, out);
                }
            }
            Value::Array(values) => {
                for child in values {
                    walk(prefix, child, out);
                }
            }
            Value::Null => {}
            leaf => out.push((prefix.to_string(), leaf)),
        }
    }

    let mut out = Vec::new();
    walk("", source, &mut out);
    out
}
