//! Search execution.

use std::fmt;
use std::sync::Arc;

use log::{debug, error};

use crate::alias::IndexAliasResolver;
use crate::config::SearcherConfig;
use crate::error::{Result, VariaError};
use crate::query::SearchRequest;
use crate::search::planner::QueryPlanner;
use crate::search::{SearchResult, projector};
use crate::storage::DocumentStore;

/// Runs search requests against a document store.
#[derive(Clone)]
pub struct Searcher {
    store: Arc<dyn DocumentStore>,
    planner: QueryPlanner,
    aliases: IndexAliasResolver,
}

impl fmt::Debug for Searcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Searcher")
            .field("store", &self.store)
            .field("planner", &self.planner)
            .field("aliases", &self.aliases)
            .finish()
    }
}

impl Searcher {
    pub fn new(store: Arc<dyn DocumentStore>, config: SearcherConfig) -> Result<Self> {
        config.validate()?;
        Ok(Searcher {
            store,
            planner: QueryPlanner::new(config),
            aliases: IndexAliasResolver::default(),
        })
    }

    pub fn with_aliases(mut self, aliases: IndexAliasResolver) -> Self {
        self.aliases = aliases;
        self
    }

    pub fn planner(&self) -> &QueryPlanner {
        &self.planner
    }

    /// Search an index.
    ///
    /// Returns `Err` only for requests that cannot be planned. When the store
    /// fails the error is logged and an empty result is returned.
    pub async fn search(&self, index: &str, request: &SearchRequest) -> Result<SearchResult> {
        if index.trim().is_empty() {
            return Err(VariaError::invalid_argument("index name must not be empty"));
        }
        if !request.has_criteria() {
            debug!("Empty search request on index [{index}]");
            return Ok(SearchResult::default());
        }

        let index = self.aliases.resolve(index);
        let plan = self.planner.plan(request)?;
        match self.store.search(&index, &plan.body).await {
            Ok(response) => Ok(projector::project(&response, &plan.facets)),
            Err(error) => {
                error!("search on index [{index}] failed: {error}");
                Ok(SearchResult::default())
            }
        }
    }
}
