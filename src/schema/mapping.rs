//! Base index mapping.
//!
//! Only the fixed document fields are declared up front. Everything below
//! `fields` and the aggregate blobs are typed by dynamic templates that match on
//! the path suffixes from [`crate::schema::field`].

use serde_json::{Value, json};

use crate::schema::field::{FieldKind, names};

/// The fixed fields declared in every index, all exact-match.
pub const BASE_FIELDS: [&str; 5] = [
    names::KEY,
    names::OBJECT_TYPE,
    names::CULTURE,
    names::SEGMENT,
    names::ACCESS_KEYS,
];

fn text_with_keyword() -> Value {
    json!({
        "type": "text",
        "fields": {
            "keyword": { "type": "keyword", "ignore_above": 256 }
        }
    })
}

fn template_mapping(kind: FieldKind) -> Value {
    match kind {
        FieldKind::Texts
        | FieldKind::TextsR1
        | FieldKind::TextsR2
        | FieldKind::TextsR3
        | FieldKind::Sortable => text_with_keyword(),
        FieldKind::Keywords => json!({ "type": "keyword" }),
        FieldKind::Integers => json!({ "type": "long" }),
        FieldKind::Decimals => json!({ "type": "double" }),
        FieldKind::DateTimes => json!({ "type": "date" }),
    }
}

/// Mappings body used when creating an index.
pub fn base_mappings() -> Value {
    let mut templates: Vec<Value> = FieldKind::ALL
        .iter()
        .map(|kind| {
            let name = kind.postfix().trim_start_matches('_');
            json!({
                name: {
                    "match": format!("*{}", kind.postfix()),
                    "mapping": template_mapping(*kind),
                }
            })
        })
        .collect();
    templates.push(json!({
        "aggregate_texts": {
            "match": format!("*{}*", names::ALL_TEXTS),
            "mapping": { "type": "text" },
        }
    }));

    let properties: serde_json::Map<String, Value> = BASE_FIELDS
        .iter()
        .map(|field| (field.to_string(), json!({ "type": "keyword" })))
        .collect();

    json!({
        "dynamic_templates": templates,
        "properties": properties,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_properties_are_keywords() {
        let mappings = base_mappings();
        let properties = mappings["properties"].as_object().unwrap();

        assert_eq!(properties.len(), BASE_FIELDS.len());
        for field in BASE_FIELDS {
            assert_eq!(properties[field]["type"], "keyword", "field {field}");
        }
    }

    #[test]
    fn test_dynamic_templates_by_suffix() {
        let mappings = base_mappings();
        let templates = mappings["dynamic_templates"].as_array().unwrap();

        let find = |name: &str| {
            templates
                .iter()
                .find_map(|template| template.get(name))
                .cloned()
                .unwrap()
        };

        assert_eq!(find("keywords")["match"], "*_keywords");
        assert_eq!(find("keywords")["mapping"]["type"], "keyword");
        assert_eq!(find("decimals")["mapping"]["type"], "double");
        assert_eq!(find("integers")["mapping"]["type"], "long");
        assert_eq!(find("datetimeoffsets")["mapping"]["type"], "date");
        assert_eq!(find("texts_sort")["mapping"]["fields"]["keyword"]["type"], "keyword");
        assert_eq!(find("aggregate_texts")["match"], "*allTexts*");
    }
}
