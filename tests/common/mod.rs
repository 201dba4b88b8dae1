#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Duration, FixedOffset};
use uuid::Uuid;

use varia::config::{IndexerConfig, SearcherConfig};
use varia::document::field::{ContentItem, IndexField, ObjectType, Variation};
use varia::document::field_value::IndexValue;
use varia::error::Result;
use varia::indexer::Indexer;
use varia::search::Searcher;
use varia::storage::MemoryStore;

pub const INDEX: &str = "content";

pub const COLORS: [&str; 3] = ["red", "green", "blue"];

/// A memory store with an indexer and a searcher on top.
pub struct Fixture {
    pub store: MemoryStore,
    pub indexer: Indexer,
    pub searcher: Searcher,
}

impl Fixture {
    pub async fn new() -> Result<Self> {
        let store = MemoryStore::new();
        let indexer = Indexer::new(Arc::new(store.clone()), IndexerConfig::default())?;
        let searcher = Searcher::new(Arc::new(store.clone()), SearcherConfig::default())?;
        indexer.ensure(INDEX).await?;
        Ok(Fixture {
            store,
            indexer,
            searcher,
        })
    }

    pub async fn add(&self, item: &ContentItem) -> Result<()> {
        let report = self.indexer.add_or_update(INDEX, item).await?;
        assert!(report.is_success(), "indexing failed: {report:?}");
        Ok(())
    }

    /// Index `numbered_item(1..=count)`.
    pub async fn with_numbered(count: u128) -> Result<Self> {
        let fixture = Fixture::new().await?;
        for i in 1..=count {
            fixture.add(&numbered_item(i)).await?;
        }
        Ok(fixture)
    }
}

pub fn key(i: u128) -> Uuid {
    Uuid::from_u128(i)
}

pub fn epoch() -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339("2024-01-01T00:00:00+00:00").unwrap()
}

pub fn parity(i: u128) -> &'static str {
    if i % 2 == 0 { "even" } else { "odd" }
}

pub fn color(i: u128) -> &'static str {
    COLORS[(i % 3) as usize]
}

/// An invariant item `i` with:
/// - `number`: integers `[i, i * 10]`
/// - `parity`, `color`: keywords
/// - `title`: text `"Document {i}"`
/// - `price`: decimal `i + 0.5`
/// - `published`: `i` days after 2024-01-01
pub fn numbered_item(i: u128) -> ContentItem {
    let n = i as i64;
    ContentItem::new(key(i), ObjectType::Document)
        .with_variation(Variation::invariant())
        .with_field(IndexField::new("number", IndexValue::new().with_integers([n, n * 10])))
        .with_field(IndexField::new("parity", IndexValue::new().with_keywords([parity(i)])))
        .with_field(IndexField::new("color", IndexValue::new().with_keywords([color(i)])))
        .with_field(IndexField::new(
            "title",
            IndexValue::new().with_texts([format!("Document {i}")]),
        ))
        .with_field(IndexField::new("price", IndexValue::new().with_decimals([n as f64 + 0.5])))
        .with_field(IndexField::new(
            "published",
            IndexValue::new().with_date_times([epoch() + Duration::days(n)]),
        ))
}
