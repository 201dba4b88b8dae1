//! Integration tests for index lifecycle and document writes.

mod common;

use std::sync::Arc;

use serde_json::json;
use uuid::Uuid;

use common::{Fixture, INDEX, key, numbered_item};
use varia::alias::IndexAliasResolver;
use varia::config::{IndexerConfig, SegmentTextMode};
use varia::document::field::{ContentItem, ContentProtection, IndexField, ObjectType, Variation};
use varia::document::field_value::IndexValue;
use varia::error::Result;
use varia::indexer::{IndexHealth, Indexer};
use varia::schema::base_mappings;
use varia::storage::{MemoryStore, StoreHealth};
use varia::topology::ServerRole;

fn localized(i: u128) -> ContentItem {
    ContentItem::new(key(i), ObjectType::Document)
        .with_variation(Variation::culture("en-US"))
        .with_variation(Variation::culture("da-DK"))
        .with_field(IndexField::new("title", IndexValue::new().with_texts(["Hello"])).with_culture("en-US"))
        .with_field(IndexField::new("title", IndexValue::new().with_texts(["Hej"])).with_culture("da-DK"))
        .with_field(IndexField::new("price", IndexValue::new().with_integers([10])))
}

#[tokio::test]
async fn test_one_document_per_variation() -> Result<()> {
    let fixture = Fixture::new().await?;
    let report = fixture.indexer.add_or_update(INDEX, &localized(1)).await?;

    assert!(report.is_success());
    assert_eq!(report.written, 2);
    assert_eq!(
        fixture.store.document_ids(INDEX),
        vec![
            "00000000-0000-0000-0000-000000000001.en-us.def",
            "00000000-0000-0000-0000-000000000001.da-dk.def",
        ]
    );

    let danish = fixture
        .store
        .document(INDEX, "00000000-0000-0000-0000-000000000001.da-dk.def")
        .expect("danish document");
    assert_eq!(danish["culture"], "da-dk");
    assert_eq!(danish["segment"], "def");
    assert_eq!(danish["allTexts"], "hej");
    assert_eq!(danish["fields"]["title_texts"], json!(["Hej"]));
    // invariant fields fall back into every culture
    assert_eq!(danish["fields"]["price_integers"], json!([10]));
    assert_eq!(danish["accessKeys"], json!([Uuid::nil().to_string()]));

    Ok(())
}

#[tokio::test]
async fn test_reindex_is_idempotent() -> Result<()> {
    let fixture = Fixture::new().await?;
    let item = numbered_item(7);
    let id = format!("{}.inv.def", key(7));

    fixture.add(&item).await?;
    let first = fixture.store.document(INDEX, &id);
    fixture.add(&item).await?;
    let second = fixture.store.document(INDEX, &id);

    assert!(first.is_some());
    assert_eq!(first, second);
    assert_eq!(fixture.store.document_ids(INDEX), vec![id]);

    Ok(())
}

#[tokio::test]
async fn test_removed_variations_are_deleted() -> Result<()> {
    let fixture = Fixture::new().await?;
    fixture.add(&localized(1)).await?;
    fixture.add(&localized(2)).await?;

    let mut english_only = localized(1);
    english_only.variations.retain(|variation| variation.culture.as_deref() == Some("en-US"));
    let report = fixture.indexer.add_or_update(INDEX, &english_only).await?;

    assert_eq!(report.written, 1);
    assert_eq!(report.deleted, 1);
    let ids = fixture.store.document_ids(INDEX);
    assert!(ids.contains(&format!("{}.en-us.def", key(1))));
    assert!(!ids.contains(&format!("{}.da-dk.def", key(1))));
    // other items keep all their variations
    assert!(ids.contains(&format!("{}.da-dk.def", key(2))));

    Ok(())
}

#[tokio::test]
async fn test_rejected_document_is_reported() -> Result<()> {
    let fixture = Fixture::new().await?;
    let rejected = format!("{}.da-dk.def", key(1));
    fixture.store.reject_document(rejected.clone());

    let report = fixture.indexer.add_or_update(INDEX, &localized(1)).await?;

    assert!(!report.is_success());
    assert_eq!(report.written, 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].document_id.as_deref(), Some(rejected.as_str()));
    assert_eq!(
        fixture.store.document_ids(INDEX),
        vec![format!("{}.en-us.def", key(1))]
    );

    Ok(())
}

#[tokio::test]
async fn test_isolated_segment_text() -> Result<()> {
    let store = MemoryStore::new();
    let config = IndexerConfig {
        segment_text_mode: SegmentTextMode::Isolated,
        ..IndexerConfig::default()
    };
    let indexer = Indexer::new(Arc::new(store.clone()), config)?;
    indexer.ensure(INDEX).await?;

    let item = ContentItem::new(key(1), ObjectType::Document)
        .with_variation(Variation::new(None, Some("VIP")))
        .with_field(IndexField::new("title", IndexValue::new().with_texts(["Exclusive"])).with_segment("vip"))
        .with_field(IndexField::new("summary", IndexValue::new().with_texts(["Common"])));
    indexer.add_or_update(INDEX, &item).await?;

    let document = store
        .document(INDEX, &format!("{}.inv.vip", key(1)))
        .expect("segment document");
    assert_eq!(document["vip_allTexts"], "exclusive");
    assert_eq!(document["allTexts"], "common");

    Ok(())
}

#[tokio::test]
async fn test_delete_removes_descendants() -> Result<()> {
    let fixture = Fixture::new().await?;
    let parent = localized(1);
    let child = ContentItem::new(key(2), ObjectType::Document)
        .with_variation(Variation::invariant())
        .with_field(IndexField::new(
            "pathIds",
            IndexValue::new().with_keywords([key(1).to_string()]),
        ));
    fixture.add(&parent).await?;
    fixture.add(&child).await?;
    fixture.add(&numbered_item(3)).await?;

    let report = fixture.indexer.delete(INDEX, &[key(1)]).await?;

    assert!(report.is_success());
    assert_eq!(report.deleted, 3);
    assert_eq!(
        fixture.store.document_ids(INDEX),
        vec![format!("{}.inv.def", key(3))]
    );

    let report = fixture.indexer.delete(INDEX, &[]).await?;
    assert_eq!(report.deleted, 0);

    Ok(())
}

#[tokio::test]
async fn test_subscriber_skips_mutations() -> Result<()> {
    let fixture = Fixture::with_numbered(2).await?;
    let subscriber = Indexer::new(Arc::new(fixture.store.clone()), IndexerConfig::default())?
        .with_topology(Arc::new(ServerRole::Subscriber));

    let report = subscriber.add_or_update(INDEX, &numbered_item(3)).await?;
    assert!(report.skipped);
    assert_eq!(report.written, 0);

    assert!(subscriber.delete(INDEX, &[key(1)]).await?.skipped);
    assert!(subscriber.reset(INDEX).await?.skipped);
    assert!(subscriber.ensure("other").await?.skipped);

    assert_eq!(fixture.store.document_ids(INDEX).len(), 2);
    assert!(fixture.store.mappings("other").is_none());

    Ok(())
}

#[tokio::test]
async fn test_reset_then_ensure() -> Result<()> {
    let fixture = Fixture::with_numbered(5).await?;

    let report = fixture.indexer.reset(INDEX).await?;
    assert!(report.is_success());
    assert!(fixture.store.document_ids(INDEX).is_empty());
    assert_eq!(fixture.store.mappings(INDEX), Some(base_mappings()));

    let report = fixture.indexer.ensure(INDEX).await?;
    assert!(report.is_success());
    assert_eq!(fixture.store.mappings(INDEX), Some(base_mappings()));

    // reset also creates a missing index
    assert!(fixture.indexer.reset("fresh").await?.is_success());
    assert_eq!(fixture.store.mappings("fresh"), Some(base_mappings()));

    Ok(())
}

#[tokio::test]
async fn test_metadata_health() -> Result<()> {
    let fixture = Fixture::new().await?;

    let metadata = fixture.indexer.metadata(INDEX).await;
    assert_eq!(metadata.health, IndexHealth::Empty);
    assert_eq!(metadata.document_count, 0);

    fixture.add(&localized(1)).await?;
    let metadata = fixture.indexer.metadata(INDEX).await;
    assert_eq!(metadata.health, IndexHealth::Healthy);
    assert_eq!(metadata.document_count, 2);

    assert_eq!(fixture.indexer.metadata("missing").await.health, IndexHealth::Unknown);

    fixture.store.set_health(StoreHealth::Red);
    assert_eq!(fixture.indexer.metadata(INDEX).await.health, IndexHealth::Corrupted);

    Ok(())
}

#[tokio::test]
async fn test_environment_suffix() -> Result<()> {
    let store = MemoryStore::new();
    let indexer = Indexer::new(Arc::new(store.clone()), IndexerConfig::default())?
        .with_aliases(IndexAliasResolver::new(Some("Staging".to_string())));

    let report = indexer.ensure("Products").await?;
    assert_eq!(report.index, "products_staging");
    assert!(store.mappings("products_staging").is_some());

    indexer.add_or_update("Products", &numbered_item(1)).await?;
    assert_eq!(store.document_ids("products_staging").len(), 1);
    assert_eq!(indexer.metadata("Products").await.document_count, 1);

    Ok(())
}

#[tokio::test]
async fn test_invalid_requests_fail() -> Result<()> {
    let fixture = Fixture::new().await?;

    let nil_key = ContentItem::new(Uuid::nil(), ObjectType::Document)
        .with_variation(Variation::invariant());
    assert!(fixture.indexer.add_or_update(INDEX, &nil_key).await.is_err());

    let public_protection = numbered_item(1).with_protection(ContentProtection::new([Uuid::nil()]));
    assert!(fixture.indexer.add_or_update(INDEX, &public_protection).await.is_err());

    assert!(fixture.indexer.add_or_update(" ", &numbered_item(1)).await.is_err());
    assert!(fixture.store.document_ids(INDEX).is_empty());

    Ok(())
}

#[tokio::test]
async fn test_item_without_variations_writes_nothing() -> Result<()> {
    let fixture = Fixture::with_numbered(1).await?;

    // an item without variations clears everything stored for its key
    let cleared = ContentItem::new(key(1), ObjectType::Document);
    let report = fixture.indexer.add_or_update(INDEX, &cleared).await?;

    assert_eq!(report.written, 0);
    assert_eq!(report.deleted, 1);
    assert!(fixture.store.document_ids(INDEX).is_empty());

    Ok(())
}
