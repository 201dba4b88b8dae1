//! Command line argument parsing for the Varia CLI using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::{Authentication, ProviderConfig};
use crate::error::{Result, VariaError};
use crate::query::{Direction, Facet, Filter, SearchRequest, Sorter};

/// Varia - manage and query variant-aware search indexes
#[derive(Parser, Debug, Clone)]
#[command(name = "varia")]
#[command(about = "Manage and query variant-aware search indexes")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct VariaArgs {
    /// Verbosity level (0=quiet, 1=normal, 2=verbose, 3=debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format
    #[arg(short = 'f', long = "format", default_value = "human", global = true)]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    #[command(flatten)]
    pub client: ClientArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl VariaArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            match self.verbose {
                0 => 1,
                n => n,
            }
        }
    }
}

/// Connection settings. Flags override the configuration file.
#[derive(Args, Debug, Clone, Default)]
pub struct ClientArgs {
    /// Provider configuration file (JSON)
    #[arg(long, env = "VARIA_CONFIG", value_name = "CONFIG_FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Store endpoint, e.g. http://localhost:9200
    #[arg(long, env = "VARIA_HOST", global = true)]
    pub host: Option<String>,

    /// API key for the store
    #[arg(long, env = "VARIA_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    /// User name for basic authentication
    #[arg(long, env = "VARIA_USERNAME", requires = "password", global = true)]
    pub username: Option<String>,

    /// Password for basic authentication
    #[arg(long, env = "VARIA_PASSWORD", hide_env_values = true, global = true)]
    pub password: Option<String>,

    /// Environment suffix appended to index names
    #[arg(long, env = "VARIA_ENVIRONMENT", global = true)]
    pub environment: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, env = "VARIA_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Log request bodies at debug level
    #[arg(long, env = "VARIA_DEBUG_REQUESTS", global = true)]
    pub debug_requests: bool,
}

impl ClientArgs {
    /// Configuration file contents with flag overrides applied.
    pub fn provider_config(&self) -> Result<ProviderConfig> {
        let mut config = match &self.config {
            Some(path) => ProviderConfig::from_file(path)?,
            None => ProviderConfig::default(),
        };

        let client = &mut config.client;
        if let Some(host) = &self.host {
            client.host = host.clone();
        }
        if let Some(key) = &self.api_key {
            client.authentication = Some(Authentication::ApiKey { key: key.clone() });
        }
        if let (Some(username), Some(password)) = (&self.username, &self.password) {
            client.authentication = Some(Authentication::Basic {
                username: username.clone(),
                password: password.clone(),
            });
        }
        if let Some(environment) = &self.environment {
            client.environment = Some(environment.clone());
        }
        if let Some(timeout) = self.timeout {
            client.timeout_secs = Some(timeout);
        }
        client.enable_debug_mode |= self.debug_requests;

        config.validate()?;
        Ok(config)
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create an index with the base schema unless it exists
    Ensure(IndexNameArgs),

    /// Drop an index and recreate it empty
    Reset(ResetArgs),

    /// Add or update content items from a file
    Index(IndexItemsArgs),

    /// Delete content items and their descendants
    Delete(DeleteArgs),

    /// Search an index
    Search(SearchArgs),

    /// Show document count and health of an index
    Stats(IndexNameArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct IndexNameArgs {
    /// Index name
    #[arg(value_name = "INDEX")]
    pub index: String,
}

#[derive(Parser, Debug, Clone)]
pub struct ResetArgs {
    /// Index name
    #[arg(value_name = "INDEX")]
    pub index: String,

    /// Confirm that every document of the index may be lost
    #[arg(long)]
    pub yes: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct IndexItemsArgs {
    /// Index name
    #[arg(value_name = "INDEX")]
    pub index: String,

    /// Content items as a JSON array or JSON lines
    #[arg(value_name = "ITEMS_FILE")]
    pub items_file: PathBuf,

    /// Number of items written concurrently
    #[arg(short, long, default_value = "4")]
    pub concurrency: usize,
}

#[derive(Parser, Debug, Clone)]
pub struct DeleteArgs {
    /// Index name
    #[arg(value_name = "INDEX")]
    pub index: String,

    /// Content keys to delete
    #[arg(value_name = "KEY", required = true)]
    pub keys: Vec<Uuid>,
}

/// Arguments for searching
#[derive(Parser, Debug, Clone)]
pub struct SearchArgs {
    /// Index name
    #[arg(value_name = "INDEX")]
    pub index: String,

    /// Query text
    #[arg(value_name = "QUERY")]
    pub query: Option<String>,

    /// Full search request file (JSON); other search flags are applied on top
    #[arg(short, long, value_name = "REQUEST_FILE")]
    pub request: Option<PathBuf>,

    /// Culture to search in
    #[arg(long)]
    pub culture: Option<String>,

    /// Segment to search in
    #[arg(long)]
    pub segment: Option<String>,

    /// Keyword filter as FIELD=VALUE
    #[arg(long = "filter", value_name = "FIELD=VALUE", value_parser = parse_keyword_filter)]
    pub filters: Vec<Filter>,

    /// Keyword facet fields (comma-separated)
    #[arg(long = "facet", value_delimiter = ',')]
    pub facets: Vec<String>,

    /// Keyword sort as FIELD or FIELD:desc
    #[arg(long = "sort", value_name = "FIELD[:asc|desc]", value_parser = parse_keyword_sorter)]
    pub sorters: Vec<Sorter>,

    /// Number of results to skip
    #[arg(long)]
    pub skip: Option<usize>,

    /// Maximum number of results to return
    #[arg(short = 'n', long)]
    pub take: Option<usize>,
}

impl SearchArgs {
    /// The request file, if any, with flags applied on top.
    pub fn search_request(&self) -> Result<SearchRequest> {
        let mut request = match &self.request {
            Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
            None => SearchRequest::new(),
        };

        if let Some(query) = &self.query {
            request.query = Some(query.clone());
        }
        if let Some(culture) = &self.culture {
            request.culture = Some(culture.clone());
        }
        if let Some(segment) = &self.segment {
            request.segment = Some(segment.clone());
        }
        request.filters.extend(self.filters.iter().cloned());
        request
            .facets
            .extend(self.facets.iter().map(|field| Facet::keyword(field.as_str())));
        request.sorters.extend(self.sorters.iter().cloned());
        if let Some(skip) = self.skip {
            request.skip = skip;
        }
        if let Some(take) = self.take {
            request.take = take;
        }
        Ok(request)
    }
}

fn parse_keyword_filter(value: &str) -> std::result::Result<Filter, String> {
    let (field, values) = value
        .split_once('=')
        .ok_or_else(|| format!("expected FIELD=VALUE, got [{value}]"))?;
    if field.is_empty() {
        return Err(format!("missing field name in [{value}]"));
    }
    Ok(Filter::keyword(field, values.split(',')))
}

fn parse_keyword_sorter(value: &str) -> std::result::Result<Sorter, String> {
    let (field, direction) = match value.split_once(':') {
        Some((field, "asc")) => (field, Direction::Ascending),
        Some((field, "desc")) => (field, Direction::Descending),
        Some((_, other)) => return Err(format!("unknown sort direction [{other}]")),
        None => (value, Direction::Ascending),
    };
    Ok(Sorter::keyword(field, direction))
}

/// Output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text
    Human,
    /// JSON
    Json,
}

/// Reject a reset that was not confirmed.
pub fn require_confirmation(args: &ResetArgs) -> Result<()> {
    if args.yes {
        return Ok(());
    }
    Err(VariaError::invalid_argument(format!(
        "resetting [{}] deletes all of its documents, pass --yes to confirm",
        args.index
    )))
}
