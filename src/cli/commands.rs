//! Command implementations for the Varia CLI.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt};
use log::{debug, info};

use crate::alias::IndexAliasResolver;
use crate::cli::args::*;
use crate::cli::output::*;
use crate::config::ProviderConfig;
use crate::document::field::ContentItem;
use crate::error::{Result, VariaError};
use crate::indexer::Indexer;
use crate::search::Searcher;
use crate::storage::{DocumentStore, HttpStore};

/// Execute a CLI command against the configured store.
pub async fn execute_command(args: VariaArgs) -> Result<()> {
    let config = args.client.provider_config()?;
    let store: Arc<dyn DocumentStore> = Arc::new(HttpStore::new(&config.client)?);
    debug!("Using store {store:?}");
    run(args, config, store).await
}

/// Execute a CLI command against the given store.
pub async fn run(args: VariaArgs, config: ProviderConfig, store: Arc<dyn DocumentStore>) -> Result<()> {
    let aliases = IndexAliasResolver::new(config.client.environment.clone());
    let indexer = || -> Result<Indexer> {
        Ok(Indexer::new(store.clone(), config.indexer.clone())?.with_aliases(aliases.clone()))
    };

    match &args.command {
        Command::Ensure(ensure) => {
            let report = indexer()?.ensure(&ensure.index).await?;
            output_result(&report, &args)
        }
        Command::Reset(reset) => {
            require_confirmation(reset)?;
            let report = indexer()?.reset(&reset.index).await?;
            output_result(&report, &args)
        }
        Command::Index(index_args) => {
            let summary = index_items(&indexer()?, index_args).await?;
            output_result(&summary, &args)
        }
        Command::Delete(delete) => {
            let report = indexer()?.delete(&delete.index, &delete.keys).await?;
            output_result(&report, &args)
        }
        Command::Search(search) => {
            let request = search.search_request()?;
            let searcher =
                Searcher::new(store.clone(), config.searcher.clone())?.with_aliases(aliases.clone());
            let result = searcher.search(&search.index, &request).await?;
            output_result(&result, &args)
        }
        Command::Stats(stats) => {
            let metadata = indexer()?.metadata(&stats.index).await;
            let output = IndexStatsOutput {
                index: aliases.resolve(&stats.index),
                metadata,
            };
            output_result(&output, &args)
        }
    }
}

/// Content items from a JSON array or JSON lines file.
pub fn load_items(path: &Path) -> Result<Vec<ContentItem>> {
    let content = fs::read_to_string(path)?;
    if content.trim_start().starts_with('[') {
        return Ok(serde_json::from_str(&content)?);
    }

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(number, line)| {
            serde_json::from_str(line).map_err(|e| {
                VariaError::invalid_argument(format!(
                    "{}: line {}: {e}",
                    path.display(),
                    number + 1
                ))
            })
        })
        .collect()
}

async fn index_items(indexer: &Indexer, args: &IndexItemsArgs) -> Result<IndexingSummary> {
    let items = load_items(&args.items_file)?;
    info!(
        "Indexing {} items from {} into [{}]",
        items.len(),
        args.items_file.display(),
        args.index
    );

    let start = Instant::now();
    let reports: Vec<_> = stream::iter(items.iter())
        .map(|item| indexer.add_or_update(&args.index, item))
        .buffer_unordered(args.concurrency.max(1))
        .collect()
        .await;

    let mut summary = IndexingSummary {
        index: args.index.clone(),
        ..Default::default()
    };
    for report in reports {
        summary.add(report?);
    }
    summary.duration_ms = start.elapsed().as_millis() as u64;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_json_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{"key": "00000000-0000-0000-0000-000000000001", "objectType": "Document", "variations": [{{}}]}}"#
        )
        .unwrap();
        writeln!(file).unwrap();
        writeln!(
            file,
            r#"{{"key": "00000000-0000-0000-0000-000000000002", "objectType": "Media"}}"#
        )
        .unwrap();

        let items = load_items(file.path()).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].variations.len(), 1);
    }

    #[test]
    fn test_load_reports_bad_line() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{{\"key\": 1}}").unwrap();

        let error = load_items(file.path()).unwrap_err();
        assert!(error.to_string().contains("line 1"));
    }
}
