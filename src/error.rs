//! Error types for fleetcmp
//!
//! This module defines the error handling strategy for fleetcmp. There are two
//! error types: `FleetError` (main error enum) and `ConfigError` (configuration-specific).
//!
//! ## Error Handling Philosophy
//!
//! Library code uses `crate::error::Result<T>` which returns `FleetError`.
//! CLI code uses `anyhow::Result<T>` for top-level error handling. The conversion
//! happens at the CLI boundary using `anyhow::Error::from` so `main` can still
//! downcast to pick an exit code.
//!
//! ## When to Use Which Error
//!
//! - `Transport`: a pricing document could not be downloaded
//!   - Retryable; the run aborts once the retry budget is spent
//!
//! - `Decode`: a document did not have the nested shape we expect
//!   - Fatal for the whole catalog, never retried
//!
//! - `CacheUnusable`: a snapshot is missing or corrupt and we are not allowed
//!   to download a replacement (offline mode). When downloads are allowed the
//!   freshness controller recovers from this locally and it never surfaces.
//!
//! - `Validation`: a constraint given on the command line makes no sense
//!
//! Product entries dropped by the commercial filters are not errors at all;
//! they are counted by the ingestor and logged at debug level.

use thiserror::Error;

/// Main error type for fleetcmp
#[derive(Error, Debug)]
pub enum FleetError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to download {url}: {message}")]
    Transport {
        url: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Malformed {document} document: {reason}")]
    Decode { document: String, reason: String },

    #[error("Cached {catalog} snapshot unusable: {reason}")]
    CacheUnusable { catalog: String, reason: String },

    #[error("Retryable error (attempt {attempt}/{max_attempts}): {reason}")]
    Retryable {
        attempt: u32,
        max_attempts: u32,
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Validation error: {field} - {reason}")]
    Validation { field: String, reason: String },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Failed to parse config: {0}")]
    ParseError(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, FleetError>;

impl FleetError {
    pub(crate) fn decode(document: impl Into<String>, reason: impl ToString) -> Self {
        FleetError::Decode {
            document: document.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        FleetError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Trait for determining if an error is retryable
///
/// Used by `ExponentialBackoffPolicy` to decide whether a failed download gets another attempt.
pub trait IsRetryable {
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for FleetError {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            FleetError::Retryable { .. } | FleetError::Transport { .. } | FleetError::Io(_)
        )
    }
}
