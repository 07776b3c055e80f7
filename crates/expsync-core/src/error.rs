//! Error types for a sync run
//!
//! Every variant is fatal at the run level. Per-metric remote failures are
//! logged individually before the aggregate `Validation` error is raised, so
//! operators can see which metrics failed even though the process reports a
//! single terminal message.

use thiserror::Error;

/// Sync run error type
#[derive(Debug, Error)]
pub enum SyncError {
    /// Bad run configuration or bad aggregated configuration
    /// (missing files, duplicate identifiers, schema violations)
    #[error("{0}")]
    Argument(String),

    /// A configuration file is not syntactically valid
    #[error("{0}")]
    Parse(String),

    /// An infrastructure-level remote call failed outright
    #[error("{0}")]
    Api(String),

    /// One or more per-metric remote operations failed; raised only after
    /// the entire batch for a phase has been attempted
    #[error("{0}")]
    Validation(String),

    /// Transport-level HTTP failure
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Access token acquisition failed
    #[error("Failed to acquire access token: {0}")]
    Token(String),
}

/// Result type for sync operations
pub type Result<T> = std::result::Result<T, SyncError>;
