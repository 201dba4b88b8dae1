//! Configuration types.
//!
//! [`ProviderConfig`] bundles the client, searcher and indexer sections and can be
//! loaded from a JSON file. Every section and every field is optional in the file
//! and falls back to its default.
//!
//! ```
//! use varia::config::{ProviderConfig, SegmentTextMode};
//!
//! let config: ProviderConfig = serde_json::from_str(r#"{
//!     "client": { "host": "http://search:9200", "environment": "staging" },
//!     "searcher": { "max_facet_values": 500 },
//!     "indexer": { "segment_text_mode": "isolated" }
//! }"#).unwrap();
//!
//! assert_eq!(config.searcher.max_facet_values, 500);
//! assert_eq!(config.indexer.segment_text_mode, SegmentTextMode::Isolated);
//! assert!(config.validate().is_ok());
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VariaError};

/// Query-time settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearcherConfig {
    /// Boost of R1 text matches (base text has weight 1.0).
    pub boost_text_r1: f32,
    /// Boost of R2 text matches.
    pub boost_text_r2: f32,
    /// Boost of R3 text matches.
    pub boost_text_r3: f32,
    /// Maximum number of buckets returned per exact-value facet.
    pub max_facet_values: usize,
}

impl Default for SearcherConfig {
    fn default() -> Self {
        SearcherConfig {
            boost_text_r1: 3.0,
            boost_text_r2: 2.0,
            boost_text_r3: 1.5,
            max_facet_values: 100,
        }
    }
}

impl SearcherConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, boost) in [
            ("boost_text_r1", self.boost_text_r1),
            ("boost_text_r2", self.boost_text_r2),
            ("boost_text_r3", self.boost_text_r3),
        ] {
            if !boost.is_finite() || boost <= 0.0 {
                return Err(VariaError::config(format!(
                    "{name} must be a positive number, got {boost}"
                )));
            }
        }
        if self.max_facet_values == 0 {
            return Err(VariaError::config("max_facet_values must be at least 1"));
        }
        Ok(())
    }
}

/// How per-segment free-text blobs relate to the default-segment blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentTextMode {
    /// Segment blobs contain segment-specific text followed by default-segment text.
    #[default]
    Union,
    /// Segment blobs contain segment-specific text only.
    Isolated,
}

/// Index-time settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerConfig {
    /// Keyword field holding the ancestor keys of an item, used by delete.
    pub ancestry_field: String,
    pub segment_text_mode: SegmentTextMode,
    /// Number of distinct values kept in a sortable text composite.
    pub sortable_token_limit: usize,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        IndexerConfig {
            ancestry_field: "pathIds".to_string(),
            segment_text_mode: SegmentTextMode::Union,
            sortable_token_limit: 5,
        }
    }
}

impl IndexerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.ancestry_field.trim().is_empty() {
            return Err(VariaError::config("ancestry_field must not be empty"));
        }
        if self.sortable_token_limit == 0 {
            return Err(VariaError::config("sortable_token_limit must be at least 1"));
        }
        Ok(())
    }
}

/// Credentials for the document store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Authentication {
    ApiKey { key: String },
    Basic { username: String, password: String },
}

/// Refresh policy attached to write requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Refresh {
    #[default]
    False,
    True,
    WaitFor,
}

impl Refresh {
    pub fn as_str(&self) -> &'static str {
        match self {
            Refresh::False => "false",
            Refresh::True => "true",
            Refresh::WaitFor => "wait_for",
        }
    }
}

/// Connection settings for the HTTP store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub host: String,
    pub authentication: Option<Authentication>,
    /// Suffix appended to every index name, e.g. `products` becomes `products_staging`.
    pub environment: Option<String>,
    /// Log request bodies at debug level.
    pub enable_debug_mode: bool,
    pub timeout_secs: Option<u64>,
    pub refresh: Refresh,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            host: "http://localhost:9200".to_string(),
            authentication: None,
            environment: None,
            enable_debug_mode: false,
            timeout_secs: None,
            refresh: Refresh::False,
        }
    }
}

impl ClientConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.host.starts_with("http://") || self.host.starts_with("https://")) {
            return Err(VariaError::config(format!(
                "host must be an http(s) url, got '{}'",
                self.host
            )));
        }
        if self.timeout_secs == Some(0) {
            return Err(VariaError::config("timeout_secs must be at least 1"));
        }
        Ok(())
    }
}

/// All settings of a provider instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub client: ClientConfig,
    pub searcher: SearcherConfig,
    pub indexer: IndexerConfig,
}

impl ProviderConfig {
    /// Load and validate a configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: ProviderConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.client.validate()?;
        self.searcher.validate()?;
        self.indexer.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = ProviderConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.indexer.sortable_token_limit, 5);
        assert_eq!(config.client.refresh, Refresh::False);
    }

    #[test]
    fn test_invalid_values() {
        let searcher = SearcherConfig {
            max_facet_values: 0,
            ..Default::default()
        };
        assert!(searcher.validate().is_err());

        let searcher = SearcherConfig {
            boost_text_r2: f32::NAN,
            ..Default::default()
        };
        assert!(searcher.validate().is_err());

        let client = ClientConfig {
            host: "localhost:9200".to_string(),
            ..Default::default()
        };
        assert!(client.validate().is_err());
    }

    #[test]
    fn test_authentication_serde() {
        let auth: Authentication =
            serde_json::from_str(r#"{"type": "basic", "username": "elastic", "password": "secret"}"#)
                .unwrap();
        assert_eq!(
            auth,
            Authentication::Basic {
                username: "elastic".to_string(),
                password: "secret".to_string()
            }
        );
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"client": {{"authentication": {{"type": "api_key", "key": "abc"}}, "refresh": "wait_for"}}}}"#
        )
        .unwrap();

        let config = ProviderConfig::from_file(file.path()).unwrap();
        assert_eq!(
            config.client.authentication,
            Some(Authentication::ApiKey {
                key: "abc".to_string()
            })
        );
        assert_eq!(config.client.refresh, Refresh::WaitFor);
        assert_eq!(config.searcher, SearcherConfig::default());
    }

    #[test]
    fn test_from_file_rejects_invalid() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"searcher": {{"max_facet_values": 0}}}}"#).unwrap();

        assert!(ProviderConfig::from_file(file.path()).is_err());
    }
}
