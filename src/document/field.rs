//! Logical content model handed over by the host.
//!
//! A [`ContentItem`] owns its logical fields ([`IndexField`]), the variations a
//! physical document must exist for ([`Variation`]) and an optional
//! [`ContentProtection`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::document::field_value::IndexValue;

/// Object type tag of a content item.
///
/// Unrecognized tags parse to [`ObjectType::Unknown`] instead of failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ObjectType {
    Document,
    Media,
    Member,
    DocumentType,
    #[default]
    Unknown,
}

impl ObjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::Document => "Document",
            ObjectType::Media => "Media",
            ObjectType::Member => "Member",
            ObjectType::DocumentType => "DocumentType",
            ObjectType::Unknown => "Unknown",
        }
    }
}

impl FromStr for ObjectType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let object_type = match s.to_ascii_lowercase().as_str() {
            "document" => ObjectType::Document,
            "media" => ObjectType::Media,
            "member" => ObjectType::Member,
            "documenttype" => ObjectType::DocumentType,
            _ => ObjectType::Unknown,
        };
        Ok(object_type)
    }
}

impl From<String> for ObjectType {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(object_type) => object_type,
            Err(never) => match never {},
        }
    }
}

impl From<ObjectType> for String {
    fn from(value: ObjectType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A (culture, segment) pair a physical document must exist for.
///
/// `culture: None` is the invariant culture, `segment: None` the default segment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Variation {
    #[serde(default)]
    pub culture: Option<String>,
    #[serde(default)]
    pub segment: Option<String>,
}

impl Variation {
    pub fn new(culture: Option<&str>, segment: Option<&str>) -> Self {
        Variation {
            culture: culture.map(str::to_string),
            segment: segment.map(str::to_string),
        }
    }

    /// The invariant culture in the default segment.
    pub fn invariant() -> Self {
        Self::default()
    }

    /// A culture in the default segment.
    pub fn culture(culture: &str) -> Self {
        Self::new(Some(culture), None)
    }
}

/// One logical field value scoped to an optional culture and segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexField {
    pub name: String,
    pub value: IndexValue,
    #[serde(default)]
    pub culture: Option<String>,
    #[serde(default)]
    pub segment: Option<String>,
}

impl IndexField {
    /// Create an invariant, unsegmented field.
    pub fn new<S: Into<String>>(name: S, value: IndexValue) -> Self {
        IndexField {
            name: name.into(),
            value,
            culture: None,
            segment: None,
        }
    }

    pub fn with_culture<S: Into<String>>(mut self, culture: S) -> Self {
        self.culture = Some(culture.into());
        self
    }

    pub fn with_segment<S: Into<String>>(mut self, segment: S) -> Self {
        self.segment = Some(segment.into());
        self
    }
}

/// Principal and group ids allowed to see a content item.
///
/// An empty set means the item is public.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentProtection {
    pub access_ids: Vec<Uuid>,
}

impl ContentProtection {
    pub fn new(access_ids: impl IntoIterator<Item = Uuid>) -> Self {
        ContentProtection {
            access_ids: access_ids.into_iter().collect(),
        }
    }
}

/// A content item as the host hands it to the indexer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    pub key: Uuid,
    pub object_type: ObjectType,
    #[serde(default)]
    pub variations: Vec<Variation>,
    #[serde(default)]
    pub fields: Vec<IndexField>,
    #[serde(default)]
    pub protection: Option<ContentProtection>,
}

impl ContentItem {
    pub fn new(key: Uuid, object_type: ObjectType) -> Self {
        ContentItem {
            key,
            object_type,
            variations: Vec::new(),
            fields: Vec::new(),
            protection: None,
        }
    }

    pub fn with_variation(mut self, variation: Variation) -> Self {
        self.variations.push(variation);
        self
    }

    pub fn with_field(mut self, field: IndexField) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_protection(mut self, protection: ContentProtection) -> Self {
        self.protection = Some(protection);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_type_parsing() {
        assert_eq!("Document".parse::<ObjectType>().unwrap(), ObjectType::Document);
        assert_eq!("media".parse::<ObjectType>().unwrap(), ObjectType::Media);
        assert_eq!("Folder".parse::<ObjectType>().unwrap(), ObjectType::Unknown);
    }

    #[test]
    fn test_object_type_serde() {
        let json = serde_json::to_string(&ObjectType::Member).unwrap();
        assert_eq!(json, "\"Member\"");

        let parsed: ObjectType = serde_json::from_str("\"Something\"").unwrap();
        assert_eq!(parsed, ObjectType::Unknown);
    }

    #[test]
    fn test_content_item_from_json() {
        let item: ContentItem = serde_json::from_str(
            r#"{
                "key": "3f1c6a9e-8d8e-4b8a-9a51-5a7c0f6c2d11",
                "objectType": "Document",
                "variations": [{"culture": "en-US"}, {"culture": "da-DK", "segment": "seg1"}],
                "fields": [{"name": "title", "value": {"texts": ["Hello"]}, "culture": "en-US"}]
            }"#,
        )
        .unwrap();

        assert_eq!(item.object_type, ObjectType::Document);
        assert_eq!(item.variations[1], Variation::new(Some("da-DK"), Some("seg1")));
        assert_eq!(item.fields[0].value.texts(), &["Hello".to_string()]);
        assert!(item.protection.is_none());
    }
}
