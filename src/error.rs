//! Error types for the lead scorer
//!
//! Every variant is fatal: the pipeline never retries and never recovers
//! locally, so the enum exists to produce a precise message, not to drive
//! control flow.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Lead scorer error types
#[derive(Error, Debug)]
pub enum Error {
    /// The warehouse rejected or failed a job (bad SQL, permissions, quota)
    #[error("Remote call failed ({status}): {message}")]
    Remote {
        /// HTTP status or warehouse error reason
        status: String,
        /// Message reported by the warehouse
        message: String,
    },

    /// Transport-level failure talking to the warehouse
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A step that needs at least one row got none back
    #[error("{step} returned no rows; expected exactly one")]
    EmptyResult {
        /// Step that issued the statement
        step: &'static str,
    },

    /// A result set lacks a column the step reads
    #[error("Result set has no column `{0}`")]
    MissingColumn(String),

    /// A result column has a type the step cannot read
    #[error("Column `{column}` has type {actual}, expected {expected}")]
    ColumnType {
        /// Column name
        column: String,
        /// Type the reader wanted
        expected: &'static str,
        /// Type found in the result set
        actual: String,
    },

    /// Unknown propensity tier label
    #[error("Invalid propensity tier: {0:?} (expected hot, warm or cold)")]
    InvalidTier(String),

    /// Identifier that cannot be safely spliced into SQL
    #[error("Invalid SQL identifier: {0:?}")]
    InvalidIdentifier(String),

    /// Configuration rejected by validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Local SQL inspection failed
    #[error("SQL parse error: {0}")]
    ParseError(String),

    /// Failure injected into the in-memory warehouse
    #[error("Remote call failed (injected): {0}")]
    Injected(String),

    /// Arrow error while assembling result batches
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML configuration error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
