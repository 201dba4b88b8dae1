//! Document materialization.
//!
//! Expands one [`ContentItem`] into one [`PhysicalDocument`] per declared
//! variation. Materialization is pure: the same item always yields the same
//! documents, which is what makes re-indexing idempotent.

use std::collections::BTreeMap;

use log::debug;
use uuid::Uuid;

use crate::config::IndexerConfig;
use crate::document::document::{PhysicalDocument, PhysicalValues};
use crate::document::field::{ContentItem, ContentProtection, Variation};
use crate::document::field_value::TextTier;
use crate::error::{Result, VariaError};
use crate::indexer::aggregate::{aggregate_blobs, sortable_composite};
use crate::schema::{FieldKind, PUBLIC_ACCESS_KEY, culture_tag, document_id, field_key, segment_tag};
use crate::variance::{ResolvedField, resolve_all};

/// Builds physical documents from content items.
#[derive(Debug, Clone)]
pub struct DocumentMaterializer {
    config: IndexerConfig,
}

impl DocumentMaterializer {
    pub fn new(config: IndexerConfig) -> Self {
        DocumentMaterializer { config }
    }

    /// Physical documents of an item, one per distinct variation, in declaration order.
    pub fn materialize(&self, item: &ContentItem) -> Result<Vec<PhysicalDocument>> {
        if item.key.is_nil() {
            return Err(VariaError::invalid_argument("content key must not be the nil uuid"));
        }
        let access_keys = access_keys(item.protection.as_ref())?;

        let mut seen: Vec<(String, String)> = Vec::new();
        let mut documents = Vec::with_capacity(item.variations.len());
        for variation in &item.variations {
            let tags = (
                culture_tag(variation.culture.as_deref()),
                segment_tag(variation.segment.as_deref()),
            );
            if seen.contains(&tags) {
                debug!(
                    "Skipping duplicate variation {}/{} of {}",
                    tags.0, tags.1, item.key
                );
                continue;
            }
            seen.push(tags);
            documents.push(self.materialize_variation(item, variation, &access_keys));
        }
        Ok(documents)
    }

    fn materialize_variation(
        &self,
        item: &ContentItem,
        variation: &Variation,
        access_keys: &[Uuid],
    ) -> PhysicalDocument {
        let culture = variation.culture.as_deref();
        let segment = variation.segment.as_deref();
        let resolved = resolve_all(&item.fields, variation);
        let defaults = match segment {
            Some(_) => resolve_all(&item.fields, &Variation::new(culture, None)),
            None => resolved.clone(),
        };

        PhysicalDocument {
            id: document_id(&item.key, culture, segment),
            key: item.key,
            object_type: item.object_type,
            culture: culture_tag(culture),
            segment: segment_tag(segment),
            access_keys: access_keys.to_vec(),
            aggregates: aggregate_blobs(
                &resolved,
                &defaults,
                segment,
                self.config.segment_text_mode,
            ),
            fields: self.field_map(&resolved),
        }
    }

    fn field_map(&self, resolved: &[ResolvedField]) -> BTreeMap<String, PhysicalValues> {
        let mut fields = BTreeMap::new();

        for field in resolved {
            let name = field.name.as_str();
            let value = &field.value;

            for tier in TextTier::ALL {
                let texts = value.tier_texts(tier);
                if !texts.is_empty() {
                    fields.insert(
                        field_key(name, FieldKind::text(tier)),
                        PhysicalValues::Texts(texts.to_vec()),
                    );
                }
            }
            if let Some(sortable) = sortable_composite(value, self.config.sortable_token_limit) {
                fields.insert(
                    field_key(name, FieldKind::Sortable),
                    PhysicalValues::Texts(vec![sortable]),
                );
            }
            if !value.keywords().is_empty() {
                fields.insert(
                    field_key(name, FieldKind::Keywords),
                    PhysicalValues::Keywords(value.keywords().to_vec()),
                );
            }
            if !value.integers().is_empty() {
                fields.insert(
                    field_key(name, FieldKind::Integers),
                    PhysicalValues::Integers(value.integers().to_vec()),
                );
            }
            if !value.decimals().is_empty() {
                fields.insert(
                    field_key(name, FieldKind::Decimals),
                    PhysicalValues::Decimals(value.decimals().to_vec()),
                );
            }
            if !value.date_times().is_empty() {
                fields.insert(
                    field_key(name, FieldKind::DateTimes),
                    PhysicalValues::DateTimes(value.date_times().to_vec()),
                );
            }
        }

        fields
    }
}

/// Access keys of an item: its protection ids, or the public key when unprotected.
pub fn access_keys(protection: Option<&ContentProtection>) -> Result<Vec<Uuid>> {
    let ids = protection.map(|p| p.access_ids.as_slice()).unwrap_or_default();
    if ids.contains(&PUBLIC_ACCESS_KEY) {
        return Err(VariaError::invalid_argument(
            "the nil uuid is reserved for public access and cannot be a protection id",
        ));
    }
    if ids.is_empty() {
        return Ok(vec![PUBLIC_ACCESS_KEY]);
    }

    let mut keys: Vec<Uuid> = Vec::with_capacity(ids.len());
    for id in ids {
        if !keys.contains(id) {
            keys.push(*id);
        }
    }
    Ok(keys)
}
