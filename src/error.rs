//! Error types for the Varia library.
//!
//! All fallible operations return [`VariaError`]. Backend failures are carried as
//! [`StoreError`] inside [`VariaError::Store`]; the indexer and searcher log those
//! and degrade instead of returning them, so an `Err` from either usually means the
//! caller handed in a request the core cannot honour.
//!
//! # Examples
//!
//! ```
//! use varia::error::{VariaError, Result};
//!
//! fn check_take(take: usize) -> Result<()> {
//!     if take == 0 {
//!         return Err(VariaError::invalid_argument("take must be at least 1"));
//!     }
//!     Ok(())
//! }
//!
//! assert!(check_take(0).is_err());
//! ```

use std::io;

use thiserror::Error;

use crate::storage::StoreError;

/// The main error type for Varia operations.
#[derive(Error, Debug)]
pub enum VariaError {
    /// I/O errors (configuration files, CLI input files)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Document store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration errors
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A request or item the core cannot process
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Query construction errors
    #[error("Query error: {0}")]
    Query(String),

    /// Generic error for other cases
    #[error("Error: {0}")]
    Other(String),
}

/// Result type alias for operations that may fail with VariaError.
pub type Result<T> = std::result::Result<T, VariaError>;

impl VariaError {
    /// Create a new configuration error.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        VariaError::Config(msg.into())
    }

    /// Create a new invalid argument error.
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        VariaError::InvalidArgument(msg.into())
    }

    /// Create a new query error.
    pub fn query<S: Into<String>>(msg: S) -> Self {
        VariaError::Query(msg.into())
    }

    /// Create a new generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        VariaError::Other(msg.into())
    }

    /// Returns true when the error originated in the document store.
    pub fn is_store(&self) -> bool {
        matches!(self, VariaError::Store(_))
    }
}
