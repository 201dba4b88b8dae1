//! Variance resolution.
//!
//! For one field name and a target [`Variation`], selects the candidate values that
//! apply, most specific first:
//!
//! 1. culture and segment both match,
//! 2. culture matches and the candidate has no segment,
//! 3. segment matches and the candidate has no culture,
//! 4. the candidate is fully invariant.
//!
//! Only the first tier with a match contributes. Culture and segment tags compare
//! case-insensitively. Resolution is a pure function of its inputs.

use crate::document::field::{IndexField, Variation};
use crate::document::field_value::IndexValue;

/// Fallback tier a resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FallbackTier {
    Exact,
    Culture,
    Segment,
    Invariant,
}

/// The value of one field for one variation.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedField {
    pub name: String,
    pub value: IndexValue,
    pub tier: FallbackTier,
    /// Whether the value is specific to the variation's named segment.
    pub segment_specific: bool,
}

fn same_tag(candidate: Option<&str>, target: Option<&str>) -> bool {
    match (candidate, target) {
        (None, None) => true,
        (Some(candidate), Some(target)) => candidate.eq_ignore_ascii_case(target),
        _ => false,
    }
}

fn tier_of(field: &IndexField, variation: &Variation) -> Option<FallbackTier> {
    let culture = variation.culture.as_deref();
    let segment = variation.segment.as_deref();
    let field_culture = field.culture.as_deref();
    let field_segment = field.segment.as_deref();

    if same_tag(field_culture, culture) && same_tag(field_segment, segment) {
        Some(FallbackTier::Exact)
    } else if culture.is_some() && same_tag(field_culture, culture) && field_segment.is_none() {
        Some(FallbackTier::Culture)
    } else if segment.is_some() && field_culture.is_none() && same_tag(field_segment, segment) {
        Some(FallbackTier::Segment)
    } else if field_culture.is_none() && field_segment.is_none() {
        Some(FallbackTier::Invariant)
    } else {
        None
    }
}

/// Resolve the candidates of a single field name against a variation.
///
/// Returns `None` when no tier matches; the field then contributes nothing to the
/// variation's document. Candidates in the winning tier are merged in input order.
pub fn resolve<'a, I>(candidates: I, variation: &Variation) -> Option<ResolvedField>
where
    I: IntoIterator<Item = &'a IndexField>,
{
    let mut best: Option<(FallbackTier, Vec<&IndexField>)> = None;

    for candidate in candidates {
        let Some(tier) = tier_of(candidate, variation) else {
            continue;
        };
        let more_specific = match &best {
            Some((best_tier, _)) => tier < *best_tier,
            None => true,
        };
        if more_specific {
            best = Some((tier, vec![candidate]));
        } else if let Some((best_tier, matches)) = &mut best {
            if *best_tier == tier {
                matches.push(candidate);
            }
        }
    }

    let (tier, matches) = best?;
    let mut value = IndexValue::new();
    for candidate in &matches {
        value.merge(&candidate.value);
    }
    if value.is_empty() {
        return None;
    }

    let segment_specific = variation.segment.is_some()
        && matches.iter().all(|candidate| candidate.segment.is_some());

    Some(ResolvedField {
        name: matches[0].name.clone(),
        value,
        tier,
        segment_specific,
    })
}

/// Resolve every field name of an item against a variation.
///
/// Field names are visited in order of first appearance.
pub fn resolve_all(fields: &[IndexField], variation: &Variation) -> Vec<ResolvedField> {
    let mut names: Vec<&str> = Vec::new();
    for field in fields {
        if !names.contains(&field.name.as_str()) {
            names.push(&field.name);
        }
    }

    names
        .into_iter()
        .filter_map(|name| {
            resolve(fields.iter().filter(|field| field.name == name), variation)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(name: &str, value: &str) -> IndexField {
        IndexField::new(name, IndexValue::new().with_texts([value]))
    }

    fn candidates() -> Vec<IndexField> {
        vec![
            text("title", "invariant"),
            text("title", "english").with_culture("en-US"),
            text("title", "english vip").with_culture("en-US").with_segment("vip"),
            text("title", "any vip").with_segment("vip"),
        ]
    }

    fn resolved_text(variation: &Variation) -> Option<(String, FallbackTier)> {
        let fields = candidates();
        resolve(fields.iter(), variation).map(|field| (field.value.texts()[0].clone(), field.tier))
    }

    #[test]
    fn test_fallback_precedence() {
        assert_eq!(
            resolved_text(&Variation::new(Some("en-US"), Some("vip"))),
            Some(("english vip".to_string(), FallbackTier::Exact))
        );
        assert_eq!(
            resolved_text(&Variation::new(Some("en-US"), None)),
            Some(("english".to_string(), FallbackTier::Exact))
        );
        assert_eq!(
            resolved_text(&Variation::new(Some("da-DK"), Some("vip"))),
            Some(("any vip".to_string(), FallbackTier::Segment))
        );
        assert_eq!(
            resolved_text(&Variation::new(Some("da-DK"), None)),
            Some(("invariant".to_string(), FallbackTier::Invariant))
        );
        assert_eq!(
            resolved_text(&Variation::new(Some("en-us"), Some("other"))),
            Some(("english".to_string(), FallbackTier::Culture))
        );
    }

    #[test]
    fn test_no_matching_tier() {
        let fields = vec![text("title", "danish").with_culture("da-DK")];

        assert!(resolve(fields.iter(), &Variation::culture("en-US")).is_none());
        assert!(resolve(fields.iter(), &Variation::invariant()).is_none());
    }

    #[test]
    fn test_same_tier_candidates_merge() {
        let fields = vec![
            text("tags", "one").with_culture("en-US"),
            text("tags", "ignored"),
            text("tags", "two").with_culture("en-US"),
        ];

        let resolved = resolve(fields.iter(), &Variation::culture("en-US")).unwrap();
        assert_eq!(resolved.value.texts(), &["one".to_string(), "two".to_string()]);
    }

    #[test]
    fn test_segment_specific_flag() {
        let fields = candidates();

        let exact = resolve(fields.iter(), &Variation::new(Some("en-US"), Some("vip"))).unwrap();
        assert!(exact.segment_specific);

        let culture = resolve(fields.iter(), &Variation::new(Some("en-US"), Some("other"))).unwrap();
        assert!(!culture.segment_specific);
    }

    #[test]
    fn test_resolve_all_is_deterministic() {
        let mut fields = candidates();
        fields.push(IndexField::new("count", IndexValue::new().with_integers([3])));
        let variation = Variation::new(Some("en-US"), Some("vip"));

        let first = resolve_all(&fields, &variation);
        let second = resolve_all(&fields, &variation);

        assert_eq!(first, second);
        assert_eq!(
            first.iter().map(|field| field.name.as_str()).collect::<Vec<_>>(),
            vec!["title", "count"]
        );
    }
}
