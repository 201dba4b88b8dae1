//! Search request model.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::query::facet::Facet;
use crate::query::filter::Filter;
use crate::query::sorter::Sorter;
use crate::schema::PUBLIC_ACCESS_KEY;

/// Identity a search runs on behalf of.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessContext {
    pub principal_id: Uuid,
    #[serde(default)]
    pub group_ids: Vec<Uuid>,
}

impl AccessContext {
    pub fn new(principal_id: Uuid, group_ids: impl IntoIterator<Item = Uuid>) -> Self {
        AccessContext {
            principal_id,
            group_ids: group_ids.into_iter().collect(),
        }
    }

    /// Access keys a document may carry to be visible, the public key first.
    pub fn access_keys(context: Option<&AccessContext>) -> Vec<Uuid> {
        let mut keys = vec![PUBLIC_ACCESS_KEY];
        if let Some(context) = context {
            for key in std::iter::once(&context.principal_id).chain(&context.group_ids) {
                if !keys.contains(key) {
                    keys.push(*key);
                }
            }
        }
        keys
    }
}

fn default_take() -> usize {
    10
}

/// A logical search: free text, filters, facets, sorters, variation and paging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default)]
    pub filters: Vec<Filter>,
    #[serde(default)]
    pub facets: Vec<Facet>,
    #[serde(default)]
    pub sorters: Vec<Sorter>,
    /// Culture to search in; `None` searches invariant documents only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub culture: Option<String>,
    /// Segment to search in; `None` searches the default segment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segment: Option<String>,
    /// Anonymous searches see public documents only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_context: Option<AccessContext>,
    #[serde(default)]
    pub skip: usize,
    #[serde(default = "default_take")]
    pub take: usize,
}

impl Default for SearchRequest {
    fn default() -> Self {
        SearchRequest {
            query: None,
            filters: Vec::new(),
            facets: Vec::new(),
            sorters: Vec::new(),
            culture: None,
            segment: None,
            access_context: None,
            skip: 0,
            take: default_take(),
        }
    }
}

impl SearchRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query<S: Into<String>>(mut self, query: S) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn with_facet(mut self, facet: Facet) -> Self {
        self.facets.push(facet);
        self
    }

    pub fn with_sorter(mut self, sorter: Sorter) -> Self {
        self.sorters.push(sorter);
        self
    }

    pub fn with_culture<S: Into<String>>(mut self, culture: S) -> Self {
        self.culture = Some(culture.into());
        self
    }

    pub fn with_segment<S: Into<String>>(mut self, segment: S) -> Self {
        self.segment = Some(segment.into());
        self
    }

    pub fn with_access_context(mut self, access_context: AccessContext) -> Self {
        self.access_context = Some(access_context);
        self
    }

    pub fn with_paging(mut self, skip: usize, take: usize) -> Self {
        self.skip = skip;
        self.take = take;
        self
    }

    /// Trimmed query text, if any is left.
    pub fn query_text(&self) -> Option<&str> {
        self.query
            .as_deref()
            .map(str::trim)
            .filter(|query| !query.is_empty())
    }

    /// Whether the request asks for anything at all.
    pub fn has_criteria(&self) -> bool {
        self.query_text().is_some()
            || !self.filters.is_empty()
            || !self.facets.is_empty()
            || !self.sorters.is_empty()
    }
}
