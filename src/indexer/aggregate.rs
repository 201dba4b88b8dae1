//! Aggregate text fields.
//!
//! Builds the per-tier free-text blobs that full-text queries run against and the
//! short sortable composite of each text field.

use std::collections::BTreeMap;

use crate::config::SegmentTextMode;
use crate::document::field_value::{IndexValue, TextTier};
use crate::schema::{aggregate_field, segmented_aggregate_field};
use crate::variance::ResolvedField;

/// Distinct values in first-seen order.
fn ordered_union<'a>(values: impl IntoIterator<Item = &'a str>) -> Vec<&'a str> {
    let mut union: Vec<&str> = Vec::new();
    for value in values {
        if !union.contains(&value) {
            union.push(value);
        }
    }
    union
}

fn join_lowercase(values: &[&str]) -> Option<String> {
    if values.is_empty() {
        return None;
    }
    Some(
        values
            .iter()
            .map(|value| value.to_lowercase())
            .collect::<Vec<_>>()
            .join(" "),
    )
}

/// Sortable composite of a field: R1, R2, R3 then base text, distinct, capped at `limit`.
pub fn sortable_composite(value: &IndexValue, limit: usize) -> Option<String> {
    let ordered = [TextTier::R1, TextTier::R2, TextTier::R3, TextTier::Base]
        .into_iter()
        .flat_map(|tier| value.tier_texts(tier).iter().map(String::as_str));
    let distinct: Vec<&str> = ordered_union(ordered).into_iter().take(limit).collect();
    join_lowercase(&distinct)
}

fn tier_texts<'a>(fields: &'a [ResolvedField], tier: TextTier) -> Vec<&'a str> {
    fields
        .iter()
        .flat_map(|field| field.value.tier_texts(tier).iter().map(String::as_str))
        .collect()
}

fn segment_specific_texts<'a>(fields: &'a [ResolvedField], tier: TextTier) -> Vec<&'a str> {
    fields
        .iter()
        .filter(|field| field.segment_specific)
        .flat_map(|field| field.value.tier_texts(tier).iter().map(String::as_str))
        .collect()
}

/// Aggregate blobs of one physical document, keyed by aggregate field name.
///
/// `fields` is the resolution against the document's own variation and `defaults`
/// the resolution against the same culture without a segment. The plain tier
/// fields always carry default-segment text. For a named segment, the
/// segment-prefixed fields carry segment-specific text, followed by the
/// default-segment text when `mode` is [`SegmentTextMode::Union`]. A field
/// overridden for the segment therefore contributes both of its values in union
/// mode.
pub fn aggregate_blobs(
    fields: &[ResolvedField],
    defaults: &[ResolvedField],
    segment: Option<&str>,
    mode: SegmentTextMode,
) -> BTreeMap<String, String> {
    let mut blobs = BTreeMap::new();

    for tier in TextTier::ALL {
        let default_texts = tier_texts(defaults, tier);
        if let Some(blob) = join_lowercase(&default_texts) {
            blobs.insert(aggregate_field(tier).to_string(), blob);
        }

        let Some(segment) = segment else {
            continue;
        };
        let mut segment_texts = segment_specific_texts(fields, tier);
        if mode == SegmentTextMode::Union {
            segment_texts.extend(default_texts.iter().copied());
            segment_texts = ordered_union(segment_texts);
        }
        if let Some(blob) = join_lowercase(&segment_texts) {
            blobs.insert(segmented_aggregate_field(tier, segment), blob);
        }
    }

    blobs
}
