//! Query planning.
//!
//! Translates a [`SearchRequest`] into a store search body:
//!
//! - pre-filters on culture, segment and access keys plus full text and regular
//!   filters form the main query;
//! - filters on faceted fields become a post filter, so they narrow the hits
//!   without narrowing the facet they belong to;
//! - every facet aggregation is wrapped in a filter holding the facet filters of
//!   the *other* faceted fields.

use chrono::{DateTime, FixedOffset, SecondsFormat};
use log::warn;
use serde_json::{Map, Value, json};

use crate::config::SearcherConfig;
use crate::document::field_value::TextTier;
use crate::error::{Result, VariaError};
use crate::query::{
    AccessContext, Facet, FacetKind, FacetRange, Filter, FilterKind, FilterRange, SearchRequest,
    Sorter,
};
use crate::schema::{
    FieldKind, INVARIANT_CULTURE, aggregate_field_for, culture_tag, field_path, names,
    segment_tag, text_sort_path,
};
use crate::search::dsl::{self, BoolQuery};

/// Fields every search returns.
pub const PROJECTED_FIELDS: [&str; 2] = [names::KEY, names::OBJECT_TYPE];

/// A planned search: the store request body and the facets it aggregates.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    pub body: Value,
    /// Facets with an aggregation in `body`, deduplicated, in request order.
    pub facets: Vec<Facet>,
}

fn date_value(value: &DateTime<FixedOffset>) -> Value {
    json!(value.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

/// Clauses of a filter, split by negation.
#[derive(Debug, Default)]
struct Clauses {
    must: Vec<Value>,
    must_not: Vec<Value>,
}

impl Clauses {
    fn push(&mut self, negate: bool, clause: Value) {
        if negate {
            self.must_not.push(clause);
        } else {
            self.must.push(clause);
        }
    }

    fn is_empty(&self) -> bool {
        self.must.is_empty() && self.must_not.is_empty()
    }

    fn to_query(&self) -> Value {
        BoolQuery {
            must: self.must.clone(),
            must_not: self.must_not.clone(),
            ..Default::default()
        }
        .into_query()
    }
}

/// Field names pair filters with facets case-insensitively.
fn same_field(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

/// Builds store queries from search requests.
#[derive(Debug, Clone, Default)]
pub struct QueryPlanner {
    config: SearcherConfig,
}

impl QueryPlanner {
    pub fn new(config: SearcherConfig) -> Self {
        QueryPlanner { config }
    }

    pub fn config(&self) -> &SearcherConfig {
        &self.config
    }

    fn boost(&self, tier: TextTier) -> f32 {
        match tier {
            TextTier::Base => 1.0,
            TextTier::R1 => self.config.boost_text_r1,
            TextTier::R2 => self.config.boost_text_r2,
            TextTier::R3 => self.config.boost_text_r3,
        }
    }

    /// Plan a request. Fails only on filters that cannot be expressed.
    pub fn plan(&self, request: &SearchRequest) -> Result<QueryPlan> {
        let facets = self.planned_facets(&request.facets);

        let mut query = BoolQuery::new();
        query.filter = self.pre_filters(request);
        if let Some(text) = request.query_text() {
            query.must.push(self.full_text(text, request.segment.as_deref()));
        }

        let mut facet_filters: Vec<(&str, Clauses)> = Vec::new();
        for filter in &request.filters {
            let clause = self.filter_clause(filter)?;
            let faceted = request
                .facets
                .iter()
                .any(|facet| same_field(&facet.field_name, &filter.field_name));
            if faceted {
                let position = facet_filters
                    .iter()
                    .position(|(field, _)| same_field(field, &filter.field_name));
                let clauses = match position {
                    Some(position) => &mut facet_filters[position].1,
                    None => {
                        facet_filters.push((filter.field_name.as_str(), Clauses::default()));
                        let last = facet_filters.len() - 1;
                        &mut facet_filters[last].1
                    }
                };
                clauses.push(filter.negate, clause);
            } else if filter.negate {
                query.must_not.push(clause);
            } else {
                query.must.push(clause);
            }
        }

        let mut body = Map::new();
        body.insert("from".to_string(), json!(request.skip));
        body.insert("size".to_string(), json!(request.take));
        body.insert("query".to_string(), query.into_query());

        let mut aggregations = Map::new();
        for facet in &facets {
            let aggregation = self.facet_aggregation(facet);
            let others = Self::merge(&facet_filters, Some(facet.field_name.as_str()));
            let aggregation = if others.is_empty() {
                aggregation
            } else {
                json!({
                    "filter": others.to_query(),
                    "aggs": { facet.aggregation_name(): aggregation },
                })
            };
            aggregations.insert(facet.aggregation_name(), aggregation);
        }
        if !aggregations.is_empty() {
            body.insert("aggs".to_string(), Value::Object(aggregations));
        }

        let all_facet_filters = Self::merge(&facet_filters, None);
        if !all_facet_filters.is_empty() {
            body.insert("post_filter".to_string(), all_facet_filters.to_query());
        }

        body.insert("sort".to_string(), Value::Array(self.sort(&request.sorters)));
        body.insert("_source".to_string(), json!(false));
        body.insert("fields".to_string(), json!(PROJECTED_FIELDS));
        body.insert("track_total_hits".to_string(), json!(true));

        Ok(QueryPlan {
            body: Value::Object(body),
            facets,
        })
    }

    /// Facet filters of every field except `excluded`.
    fn merge(facet_filters: &[(&str, Clauses)], excluded: Option<&str>) -> Clauses {
        let mut merged = Clauses::default();
        for (field, clauses) in facet_filters {
            if !excluded.is_some_and(|excluded| same_field(field, excluded)) {
                merged.must.extend(clauses.must.iter().cloned());
                merged.must_not.extend(clauses.must_not.iter().cloned());
            }
        }
        merged
    }

    /// Requested facets without duplicates or empty range sets.
    fn planned_facets(&self, requested: &[Facet]) -> Vec<Facet> {
        let mut planned: Vec<Facet> = Vec::with_capacity(requested.len());
        for facet in requested {
            if facet.has_no_ranges() {
                warn!(
                    "Skipping {} facet on [{}]: no ranges defined",
                    facet.kind.name(),
                    facet.field_name
                );
                continue;
            }
            let name = facet.aggregation_name();
            if planned.iter().any(|existing| existing.aggregation_name() == name) {
                continue;
            }
            planned.push(facet.clone());
        }
        planned
    }

    /// Variation and access restrictions every search carries.
    fn pre_filters(&self, request: &SearchRequest) -> Vec<Value> {
        let cultures = match request.culture.as_deref() {
            Some(culture) => vec![culture_tag(Some(culture)), INVARIANT_CULTURE.to_string()],
            None => vec![INVARIANT_CULTURE.to_string()],
        };
        let access_keys: Vec<String> = AccessContext::access_keys(request.access_context.as_ref())
            .iter()
            .map(ToString::to_string)
            .collect();

        vec![
            dsl::terms(names::CULTURE, cultures),
            dsl::term(names::SEGMENT, segment_tag(request.segment.as_deref())),
            dsl::terms(names::ACCESS_KEYS, access_keys),
        ]
    }

    /// Prefix match of the query text against the aggregate text of every tier.
    fn full_text(&self, text: &str, segment: Option<&str>) -> Value {
        let clauses = TextTier::ALL
            .into_iter()
            .map(|tier| {
                dsl::match_bool_prefix(&aggregate_field_for(tier, segment), text, self.boost(tier))
            })
            .collect();
        BoolQuery::any_of(clauses)
    }

    fn filter_clause(&self, filter: &Filter) -> Result<Value> {
        let name = filter.field_name.as_str();
        if let Some(0) = filter.kind.range_count() {
            return Err(VariaError::query(format!(
                "{} filter on [{name}] defines no ranges",
                filter.kind.name()
            )));
        }

        let clause = match &filter.kind {
            FilterKind::Text { values } => {
                let mut clauses = Vec::with_capacity(values.len() * TextTier::ALL.len());
                for value in values {
                    let pattern = format!("{}*", value.replace('*', ""));
                    for tier in TextTier::ALL {
                        clauses.push(dsl::wildcard(
                            &field_path(name, FieldKind::text(tier)),
                            &pattern,
                            self.boost(tier),
                        ));
                    }
                }
                BoolQuery::any_of(clauses)
            }
            FilterKind::Keyword { values } => {
                dsl::terms(&field_path(name, FieldKind::Keywords), values.iter().cloned())
            }
            FilterKind::IntegerExact { values } => {
                dsl::terms(&field_path(name, FieldKind::Integers), values.iter().copied())
            }
            FilterKind::IntegerRange { ranges } => {
                let path = field_path(name, FieldKind::Integers);
                Self::ranges(&path, ranges, |value| json!(value))
            }
            FilterKind::DecimalExact { values } => {
                dsl::terms(&field_path(name, FieldKind::Decimals), values.iter().copied())
            }
            FilterKind::DecimalRange { ranges } => {
                let path = field_path(name, FieldKind::Decimals);
                Self::ranges(&path, ranges, |value| json!(value))
            }
            FilterKind::DateTimeExact { values } => {
                dsl::terms(&field_path(name, FieldKind::DateTimes), values.iter().map(date_value))
            }
            FilterKind::DateTimeRange { ranges } => {
                let path = field_path(name, FieldKind::DateTimes);
                Self::ranges(&path, ranges, date_value)
            }
        };
        Ok(clause)
    }

    fn ranges<T>(path: &str, ranges: &[FilterRange<T>], value: impl Fn(&T) -> Value) -> Value {
        let clauses = ranges
            .iter()
            .map(|range| dsl::range(path, range.min.as_ref().map(&value), range.max.as_ref().map(&value)))
            .collect();
        BoolQuery::any_of(clauses)
    }

    fn facet_aggregation(&self, facet: &Facet) -> Value {
        let name = facet.field_name.as_str();
        let terms = |kind: FieldKind| {
            json!({
                "terms": { "field": field_path(name, kind), "size": self.config.max_facet_values }
            })
        };

        match &facet.kind {
            FacetKind::Keyword => terms(FieldKind::Keywords),
            FacetKind::IntegerExact => terms(FieldKind::Integers),
            FacetKind::DecimalExact => terms(FieldKind::Decimals),
            FacetKind::DateTimeExact => terms(FieldKind::DateTimes),
            FacetKind::IntegerRange { ranges } => {
                Self::range_aggregation(&field_path(name, FieldKind::Integers), ranges, |v| json!(v))
            }
            FacetKind::DecimalRange { ranges } => {
                Self::range_aggregation(&field_path(name, FieldKind::Decimals), ranges, |v| json!(v))
            }
            FacetKind::DateTimeRange { ranges } => Self::range_aggregation(
                &field_path(name, FieldKind::DateTimes),
                ranges,
                |value| json!(value.timestamp_millis()),
            ),
        }
    }

    fn range_aggregation<T>(
        path: &str,
        ranges: &[FacetRange<T>],
        value: impl Fn(&T) -> Value,
    ) -> Value {
        let ranges: Vec<Value> = ranges
            .iter()
            .map(|range| {
                let mut bucket = Map::new();
                bucket.insert("key".to_string(), json!(range.key));
                if let Some(min) = &range.min {
                    bucket.insert("from".to_string(), value(min));
                }
                if let Some(max) = &range.max {
                    bucket.insert("to".to_string(), value(max));
                }
                Value::Object(bucket)
            })
            .collect();
        json!({ "range": { "field": path, "ranges": ranges } })
    }

    fn sort(&self, sorters: &[Sorter]) -> Vec<Value> {
        if sorters.is_empty() {
            return vec![json!({ "_score": { "order": "desc" } })];
        }

        sorters
            .iter()
            .map(|sorter| {
                let order = sorter.direction().as_order();
                match sorter {
                    Sorter::Score { .. } => json!({ "_score": { "order": order } }),
                    Sorter::Keyword { field_name, .. } => json!({
                        field_path(field_name, FieldKind::Keywords): { "order": order }
                    }),
                    Sorter::Text { field_name, .. } => json!({
                        text_sort_path(field_name): { "order": order }
                    }),
                    Sorter::Integer { field_name, .. } => json!({
                        field_path(field_name, FieldKind::Integers): {
                            "order": order, "numeric_type": "long"
                        }
                    }),
                    Sorter::Decimal { field_name, .. } => json!({
                        field_path(field_name, FieldKind::Decimals): {
                            "order": order, "numeric_type": "double"
                        }
                    }),
                    Sorter::DateTime { field_name, .. } => json!({
                        field_path(field_name, FieldKind::DateTimes): {
                            "order": order, "numeric_type": "date"
                        }
                    }),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Direction;
    use uuid::Uuid;

    fn planner() -> QueryPlanner {
        QueryPlanner::new(SearcherConfig::default())
    }

    #[test]
    fn test_pre_filters() {
        let request = SearchRequest::new()
            .with_query("shoe")
            .with_culture("en-US")
            .with_access_context(AccessContext::new(Uuid::from_u128(1), []));

        let plan = planner().plan(&request).unwrap();
        let filters = &plan.body["query"]["bool"]["filter"];

        assert_eq!(filters[0], json!({"terms": {"culture": ["en-us", "inv"]}}));
        assert_eq!(filters[1], json!({"term": {"segment": "def"}}));
        assert_eq!(
            filters[2],
            json!({"terms": {"accessKeys": [
                "00000000-0000-0000-0000-000000000000",
                "00000000-0000-0000-0000-000000000001"
            ]}})
        );
    }

    #[test]
    fn test_full_text_uses_segment_blobs() {
        let request = SearchRequest::new().with_query("  red shoe ").with_segment("VIP");
        let plan = planner().plan(&request).unwrap();
        let should = &plan.body["query"]["bool"]["must"][0]["bool"]["should"];

        assert_eq!(
            should[0],
            json!({"match_bool_prefix": {"vip_allTexts": {"query": "red shoe", "operator": "and", "boost": 1.0}}})
        );
        assert_eq!(should[1]["match_bool_prefix"]["vip_allTextsR1"]["boost"], json!(3.0));
        assert_eq!(plan.body["query"]["bool"]["filter"][1], json!({"term": {"segment": "vip"}}));
    }

    #[test]
    fn test_facet_filters_become_post_filters() {
        let request = SearchRequest::new()
            .with_filter(Filter::keyword("color", ["red"]))
            .with_filter(Filter::integers("size", [42]).negated())
            .with_filter(Filter::keyword("brand", ["acme"]))
            .with_facet(Facet::keyword("color"))
            .with_facet(Facet::integers("size"));

        let plan = planner().plan(&request).unwrap();
        let body = &plan.body;

        assert_eq!(
            body["query"]["bool"]["must"],
            json!([{"terms": {"fields.brand_keywords": ["acme"]}}])
        );
        assert_eq!(
            body["post_filter"],
            json!({"bool": {
                "must": [{"terms": {"fields.color_keywords": ["red"]}}],
                "must_not": [{"terms": {"fields.size_integers": [42]}}]
            }})
        );

        let color = &body["aggs"]["color_keyword"];
        assert_eq!(
            color["filter"],
            json!({"bool": {"must_not": [{"terms": {"fields.size_integers": [42]}}]}})
        );
        assert_eq!(
            color["aggs"]["color_keyword"]["terms"]["field"],
            "fields.color_keywords"
        );
        assert_eq!(
            body["aggs"]["size_integer_exact"]["filter"],
            json!({"bool": {"must": [{"terms": {"fields.color_keywords": ["red"]}}]}})
        );
    }

    #[test]
    fn test_facet_filters_match_field_names_case_insensitively() {
        let request = SearchRequest::new()
            .with_filter(Filter::keyword("Color", ["red"]))
            .with_filter(Filter::keyword("brand", ["acme"]))
            .with_facet(Facet::keyword("color"))
            .with_facet(Facet::keyword("Brand"));

        let plan = planner().plan(&request).unwrap();
        let body = &plan.body;

        assert!(body["query"]["bool"].get("must").is_none());
        assert_eq!(
            body["post_filter"],
            json!({"bool": {"must": [
                {"terms": {"fields.Color_keywords": ["red"]}},
                {"terms": {"fields.brand_keywords": ["acme"]}}
            ]}})
        );
        assert_eq!(
            body["aggs"]["color_keyword"]["filter"],
            json!({"bool": {"must": [{"terms": {"fields.brand_keywords": ["acme"]}}]}})
        );
        assert_eq!(
            body["aggs"]["Brand_keyword"]["filter"],
            json!({"bool": {"must": [{"terms": {"fields.Color_keywords": ["red"]}}]}})
        );
    }

    #[test]
    fn test_unfiltered_facet_is_not_wrapped() {
        let request = SearchRequest::new().with_facet(Facet::decimals("price"));
        let plan = planner().plan(&request).unwrap();

        assert_eq!(
            plan.body["aggs"]["price_decimal_exact"],
            json!({"terms": {"field": "fields.price_decimals", "size": 100}})
        );
        assert!(plan.body.get("post_filter").is_none());
    }

    #[test]
    fn test_range_facets() {
        let date = DateTime::parse_from_rfc3339("2024-01-01T00:00:00+00:00").unwrap();
        let request = SearchRequest::new()
            .with_facet(Facet::integer_ranges(
                "count",
                [FacetRange::new("low", None, Some(10)), FacetRange::new("high", Some(10), None)],
            ))
            .with_facet(Facet::date_time_ranges(
                "published",
                [FacetRange::new("recent", Some(date), None)],
            ))
            .with_facet(Facet::decimal_ranges("price", []));

        let plan = planner().plan(&request).unwrap();

        assert_eq!(
            plan.body["aggs"]["count_integer_range"]["range"]["ranges"],
            json!([{"key": "low", "to": 10}, {"key": "high", "from": 10}])
        );
        assert_eq!(
            plan.body["aggs"]["published_date_time_range"]["range"]["ranges"][0]["from"],
            json!(1704067200000_i64)
        );
        assert!(plan.body["aggs"].get("price_decimal_range").is_none());
        assert_eq!(plan.facets.len(), 2);
    }

    #[test]
    fn test_duplicate_facets_are_dropped() {
        let request = SearchRequest::new()
            .with_facet(Facet::keyword("color"))
            .with_facet(Facet::keyword("color"))
            .with_facet(Facet::integers("color"));

        let plan = planner().plan(&request).unwrap();
        assert_eq!(plan.facets, vec![Facet::keyword("color"), Facet::integers("color")]);
    }

    #[test]
    fn test_range_filter_without_ranges_is_rejected() {
        let request = SearchRequest::new().with_filter(Filter::decimal_ranges("price", []));

        assert!(planner().plan(&request).is_err());
    }

    #[test]
    fn test_text_filter() {
        let request = SearchRequest::new().with_filter(Filter::text("title", ["Sing*"]));
        let plan = planner().plan(&request).unwrap();
        let should = &plan.body["query"]["bool"]["must"][0]["bool"]["should"];

        assert_eq!(should.as_array().map(Vec::len), Some(4));
        assert_eq!(
            should[0],
            json!({"wildcard": {"fields.title_texts": {"value": "Sing*", "case_insensitive": true, "boost": 1.0}}})
        );
        assert_eq!(should[3]["wildcard"]["fields.title_texts_r3"]["boost"], json!(1.5));
    }

    #[test]
    fn test_sort() {
        let plan = planner().plan(&SearchRequest::new().with_query("x")).unwrap();
        assert_eq!(plan.body["sort"], json!([{"_score": {"order": "desc"}}]));

        let request = SearchRequest::new()
            .with_sorter(Sorter::keyword("parity", Direction::Ascending))
            .with_sorter(Sorter::integer("count", Direction::Descending))
            .with_sorter(Sorter::text("title", Direction::Ascending));
        let plan = planner().plan(&request).unwrap();

        assert_eq!(
            plan.body["sort"],
            json!([
                {"fields.parity_keywords": {"order": "asc"}},
                {"fields.count_integers": {"order": "desc", "numeric_type": "long"}},
                {"fields.title_texts_sort.keyword": {"order": "asc"}}
            ])
        );
    }

    #[test]
    fn test_projection_and_paging() {
        let request = SearchRequest::new().with_query("x").with_paging(20, 5);
        let plan = planner().plan(&request).unwrap();

        assert_eq!(plan.body["from"], 20);
        assert_eq!(plan.body["size"], 5);
        assert_eq!(plan.body["_source"], false);
        assert_eq!(plan.body["fields"], json!(["key", "objectType"]));
        assert_eq!(plan.body["track_total_hits"], true);
    }
}
