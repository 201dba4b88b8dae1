//! Field encoding.
//!
//! Maps a logical (field name, value kind) pair to the physical path the store
//! indexes it under. The path suffix alone determines how a schema-less store
//! types the field (see [`crate::schema::mapping`]), so the postfixes below are
//! part of the stored format and must not change.

use uuid::Uuid;

use crate::document::field_value::TextTier;

/// Culture tag written for invariant documents.
pub const INVARIANT_CULTURE: &str = "inv";

/// Segment tag written for default-segment documents.
pub const DEFAULT_SEGMENT: &str = "def";

/// Access key of public (unprotected) documents.
pub const PUBLIC_ACCESS_KEY: Uuid = Uuid::nil();

/// Names of the fixed document fields.
pub mod names {
    pub const ID: &str = "id";
    pub const KEY: &str = "key";
    pub const OBJECT_TYPE: &str = "objectType";
    pub const CULTURE: &str = "culture";
    pub const SEGMENT: &str = "segment";
    pub const ACCESS_KEYS: &str = "accessKeys";
    pub const ALL_TEXTS: &str = "allTexts";
    pub const ALL_TEXTS_R1: &str = "allTextsR1";
    pub const ALL_TEXTS_R2: &str = "allTextsR2";
    pub const ALL_TEXTS_R3: &str = "allTextsR3";
    pub const FIELDS: &str = "fields";
}

/// Physical value kind of a field path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Texts,
    TextsR1,
    TextsR2,
    TextsR3,
    Keywords,
    Integers,
    Decimals,
    DateTimes,
    /// Sortable composite of a text field.
    Sortable,
}

impl FieldKind {
    pub const ALL: [FieldKind; 9] = [
        FieldKind::Texts,
        FieldKind::TextsR1,
        FieldKind::TextsR2,
        FieldKind::TextsR3,
        FieldKind::Keywords,
        FieldKind::Integers,
        FieldKind::Decimals,
        FieldKind::DateTimes,
        FieldKind::Sortable,
    ];

    /// Path suffix of this kind.
    pub const fn postfix(self) -> &'static str {
        match self {
            FieldKind::Texts => "_texts",
            FieldKind::TextsR1 => "_texts_r1",
            FieldKind::TextsR2 => "_texts_r2",
            FieldKind::TextsR3 => "_texts_r3",
            FieldKind::Keywords => "_keywords",
            FieldKind::Integers => "_integers",
            FieldKind::Decimals => "_decimals",
            FieldKind::DateTimes => "_datetimeoffsets",
            FieldKind::Sortable => "_texts_sort",
        }
    }

    /// Kind holding text of the given tier.
    pub const fn text(tier: TextTier) -> FieldKind {
        match tier {
            TextTier::Base => FieldKind::Texts,
            TextTier::R1 => FieldKind::TextsR1,
            TextTier::R2 => FieldKind::TextsR2,
            TextTier::R3 => FieldKind::TextsR3,
        }
    }

    /// Whether the store analyses values of this kind as free text.
    pub const fn is_text(self) -> bool {
        matches!(
            self,
            FieldKind::Texts
                | FieldKind::TextsR1
                | FieldKind::TextsR2
                | FieldKind::TextsR3
                | FieldKind::Sortable
        )
    }
}

/// Key of a field inside the `fields` object, `{name}{postfix}`.
pub fn field_key(name: &str, kind: FieldKind) -> String {
    format!("{name}{}", kind.postfix())
}

/// Full dotted path of a field, `fields.{name}{postfix}`.
pub fn field_path(name: &str, kind: FieldKind) -> String {
    format!("{}.{}", names::FIELDS, field_key(name, kind))
}

/// Path used to sort by a text field: the exact-match companion of its sortable composite.
pub fn text_sort_path(name: &str) -> String {
    format!("{}.keyword", field_path(name, FieldKind::Sortable))
}

/// Aggregate free-text field of a tier in the default segment.
pub const fn aggregate_field(tier: TextTier) -> &'static str {
    match tier {
        TextTier::Base => names::ALL_TEXTS,
        TextTier::R1 => names::ALL_TEXTS_R1,
        TextTier::R2 => names::ALL_TEXTS_R2,
        TextTier::R3 => names::ALL_TEXTS_R3,
    }
}

/// Aggregate free-text field of a tier for a named segment, `{segment}_{aggregate}`.
pub fn segmented_aggregate_field(tier: TextTier, segment: &str) -> String {
    format!("{}_{}", segment_tag(Some(segment)), aggregate_field(tier))
}

/// Aggregate field for a tier under an optional segment.
pub fn aggregate_field_for(tier: TextTier, segment: Option<&str>) -> String {
    match segment {
        Some(segment) => segmented_aggregate_field(tier, segment),
        None => aggregate_field(tier).to_string(),
    }
}

/// Stored culture tag.
pub fn culture_tag(culture: Option<&str>) -> String {
    culture
        .map(str::to_lowercase)
        .unwrap_or_else(|| INVARIANT_CULTURE.to_string())
}

/// Stored segment tag.
pub fn segment_tag(segment: Option<&str>) -> String {
    segment
        .map(str::to_lowercase)
        .unwrap_or_else(|| DEFAULT_SEGMENT.to_string())
}

/// Store id of the physical document for a key and variation.
pub fn document_id(key: &Uuid, culture: Option<&str>, segment: Option<&str>) -> String {
    format!("{key}.{}.{}", culture_tag(culture), segment_tag(segment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_field_paths() {
        assert_eq!(field_path("title", FieldKind::Texts), "fields.title_texts");
        assert_eq!(field_path("title", FieldKind::TextsR2), "fields.title_texts_r2");
        assert_eq!(field_path("price", FieldKind::Decimals), "fields.price_decimals");
        assert_eq!(
            field_path("published", FieldKind::DateTimes),
            "fields.published_datetimeoffsets"
        );
        assert_eq!(text_sort_path("title"), "fields.title_texts_sort.keyword");
    }

    #[test]
    fn test_paths_are_unique_across_kinds() {
        let paths: HashSet<String> = FieldKind::ALL
            .iter()
            .map(|kind| field_path("field", *kind))
            .collect();

        assert_eq!(paths.len(), FieldKind::ALL.len());
    }

    #[test]
    fn test_segmented_aggregates_do_not_collide() {
        assert_eq!(aggregate_field_for(TextTier::Base, None), "allTexts");
        assert_eq!(aggregate_field_for(TextTier::R1, Some("Seg1")), "seg1_allTextsR1");
        assert_ne!(
            segmented_aggregate_field(TextTier::Base, "seg1"),
            aggregate_field(TextTier::Base)
        );
    }

    #[test]
    fn test_variation_tags() {
        assert_eq!(culture_tag(None), "inv");
        assert_eq!(culture_tag(Some("da-DK")), "da-dk");
        assert_eq!(segment_tag(None), "def");
        assert_eq!(segment_tag(Some("VIP")), "vip");

        let key = Uuid::nil();
        assert_eq!(
            document_id(&key, Some("en-US"), None),
            "00000000-0000-0000-0000-000000000000.en-us.def"
        );
    }
}
