//! Logical field values.
//!
//! An [`IndexValue`] is the bag of typed, multi-valued slots the host supplies for
//! one (field name, culture, segment) triple. Every slot is optional and an empty
//! sequence is normalized to an absent slot, both when built through the `with_*`
//! methods and when deserialized.
//!
//! # Examples
//!
//! ```
//! use varia::document::field_value::IndexValue;
//!
//! let value = IndexValue::new()
//!     .with_texts(["The quick brown fox"])
//!     .with_keywords(Vec::<String>::new())
//!     .with_integers([1, 2, 3]);
//!
//! assert_eq!(value.texts().len(), 1);
//! assert!(!value.has_keywords());
//! assert_eq!(value.integers(), &[1, 2, 3]);
//! ```

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Deserializer, Serialize};

/// Relevance tier of a text value.
///
/// Tiers escalate from [`TextTier::Base`] to [`TextTier::R1`]; R1 text is the most
/// relevant text a field can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextTier {
    /// Plain text.
    Base,
    /// Highest relevance.
    R1,
    /// Second highest relevance.
    R2,
    /// Third highest relevance.
    R3,
}

impl TextTier {
    /// All tiers, base first.
    pub const ALL: [TextTier; 4] = [TextTier::Base, TextTier::R1, TextTier::R2, TextTier::R3];
}

/// The typed value slots of one logical field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexValue {
    #[serde(default, deserialize_with = "non_empty", skip_serializing_if = "Option::is_none")]
    texts: Option<Vec<String>>,
    #[serde(default, deserialize_with = "non_empty", skip_serializing_if = "Option::is_none")]
    texts_r1: Option<Vec<String>>,
    #[serde(default, deserialize_with = "non_empty", skip_serializing_if = "Option::is_none")]
    texts_r2: Option<Vec<String>>,
    #[serde(default, deserialize_with = "non_empty", skip_serializing_if = "Option::is_none")]
    texts_r3: Option<Vec<String>>,
    #[serde(default, deserialize_with = "non_empty", skip_serializing_if = "Option::is_none")]
    keywords: Option<Vec<String>>,
    #[serde(default, deserialize_with = "non_empty", skip_serializing_if = "Option::is_none")]
    integers: Option<Vec<i64>>,
    #[serde(default, deserialize_with = "non_empty", skip_serializing_if = "Option::is_none")]
    decimals: Option<Vec<f64>>,
    #[serde(default, deserialize_with = "non_empty", skip_serializing_if = "Option::is_none")]
    date_times: Option<Vec<DateTime<FixedOffset>>>,
}

fn non_empty<'de, D, T>(deserializer: D) -> std::result::Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let values = Option::<Vec<T>>::deserialize(deserializer)?;
    Ok(values.filter(|values| !values.is_empty()))
}

fn collect_non_empty<T>(values: impl IntoIterator<Item = T>) -> Option<Vec<T>> {
    let values: Vec<T> = values.into_iter().collect();
    if values.is_empty() { None } else { Some(values) }
}

impl IndexValue {
    /// Create a value with every slot absent.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base text slot.
    pub fn with_texts<S: Into<String>>(mut self, texts: impl IntoIterator<Item = S>) -> Self {
        self.texts = collect_non_empty(texts.into_iter().map(Into::into));
        self
    }

    /// Set the text slot of the given tier.
    pub fn with_tier_texts<S: Into<String>>(
        mut self,
        tier: TextTier,
        texts: impl IntoIterator<Item = S>,
    ) -> Self {
        let texts = collect_non_empty(texts.into_iter().map(Into::into));
        match tier {
            TextTier::Base => self.texts = texts,
            TextTier::R1 => self.texts_r1 = texts,
            TextTier::R2 => self.texts_r2 = texts,
            TextTier::R3 => self.texts_r3 = texts,
        }
        self
    }

    /// Set the keyword slot.
    pub fn with_keywords<S: Into<String>>(mut self, keywords: impl IntoIterator<Item = S>) -> Self {
        self.keywords = collect_non_empty(keywords.into_iter().map(Into::into));
        self
    }

    /// Set the integer slot.
    pub fn with_integers(mut self, integers: impl IntoIterator<Item = i64>) -> Self {
        self.integers = collect_non_empty(integers);
        self
    }

    /// Set the decimal slot.
    pub fn with_decimals(mut self, decimals: impl IntoIterator<Item = f64>) -> Self {
        self.decimals = collect_non_empty(decimals);
        self
    }

    /// Set the date-time slot.
    pub fn with_date_times(
        mut self,
        date_times: impl IntoIterator<Item = DateTime<FixedOffset>>,
    ) -> Self {
        self.date_times = collect_non_empty(date_times);
        self
    }

    /// Base text values.
    pub fn texts(&self) -> &[String] {
        self.texts.as_deref().unwrap_or_default()
    }

    /// Text values of the given tier.
    pub fn tier_texts(&self, tier: TextTier) -> &[String] {
        let slot = match tier {
            TextTier::Base => &self.texts,
            TextTier::R1 => &self.texts_r1,
            TextTier::R2 => &self.texts_r2,
            TextTier::R3 => &self.texts_r3,
        };
        slot.as_deref().unwrap_or_default()
    }

    pub fn keywords(&self) -> &[String] {
        self.keywords.as_deref().unwrap_or_default()
    }

    pub fn integers(&self) -> &[i64] {
        self.integers.as_deref().unwrap_or_default()
    }

    pub fn decimals(&self) -> &[f64] {
        self.decimals.as_deref().unwrap_or_default()
    }

    pub fn date_times(&self) -> &[DateTime<FixedOffset>] {
        self.date_times.as_deref().unwrap_or_default()
    }

    /// Whether any tier carries text.
    pub fn has_text(&self) -> bool {
        TextTier::ALL.iter().any(|tier| !self.tier_texts(*tier).is_empty())
    }

    pub fn has_keywords(&self) -> bool {
        self.keywords.is_some()
    }

    /// Whether every slot is absent.
    pub fn is_empty(&self) -> bool {
        !self.has_text()
            && self.keywords.is_none()
            && self.integers.is_none()
            && self.decimals.is_none()
            && self.date_times.is_none()
    }

    /// Append the values of `other` slot by slot.
    ///
    /// Used when several candidates resolve in the same fallback tier.
    pub fn merge(&mut self, other: &IndexValue) {
        fn extend<T: Clone>(slot: &mut Option<Vec<T>>, values: &Option<Vec<T>>) {
            if let Some(values) = values {
                slot.get_or_insert_with(Vec::new).extend(values.iter().cloned());
            }
        }

        extend(&mut self.texts, &other.texts);
        extend(&mut self.texts_r1, &other.texts_r1);
        extend(&mut self.texts_r2, &other.texts_r2);
        extend(&mut self.texts_r3, &other.texts_r3);
        extend(&mut self.keywords, &other.keywords);
        extend(&mut self.integers, &other.integers);
        extend(&mut self.decimals, &other.decimals);
        extend(&mut self.date_times, &other.date_times);
    }
}
