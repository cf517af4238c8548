//! Custom error types for xlikes.
//!
//! Provides structured error handling with detailed context so failures
//! degrade to a reported status instead of killing the service process.

use std::path::PathBuf;
use thiserror::Error;

/// Primary error type for xlikes operations.
///
/// Each variant provides specific context about what went wrong,
/// enabling better error messages and programmatic error handling.
#[derive(Error, Debug)]
pub enum XlikesError {
    // =========================================================================
    // Validation Errors
    // =========================================================================
    /// Input rejected at the boundary before reaching storage or upstream.
    #[error("Validation error: {reason}")]
    Validation { reason: String },

    /// A fetched item is missing required fields and cannot be ingested.
    #[error("Malformed item: {reason}")]
    MalformedItem { reason: String },

    // =========================================================================
    // Upstream Errors
    // =========================================================================
    /// The platform API rejected or failed a request.
    #[error("Upstream API error{}: {message}", status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Upstream {
        status: Option<u16>,
        message: String,
    },

    /// Transport-level failure talking to the platform API.
    #[error("Upstream transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Missing or incomplete API credentials.
    #[error("Missing upstream credentials: {reason}\nSet them in {config_hint} or via environment variables.")]
    MissingCredentials {
        reason: String,
        config_hint: String,
    },

    // =========================================================================
    // Database Errors
    // =========================================================================
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Database schema version is newer than this binary understands.
    #[error("Database schema version mismatch: expected {expected}, found {found}")]
    SchemaMismatch { expected: i32, found: i32 },

    // =========================================================================
    // Sync Errors
    // =========================================================================
    /// A sync run is already in flight; only one may run at a time.
    #[error("A sync is already running")]
    SyncInProgress,

    // =========================================================================
    // Query Errors
    // =========================================================================
    /// Lookup by id with no match.
    #[error("{item_type} with ID '{id}' not found")]
    NotFound { item_type: &'static str, id: String },

    // =========================================================================
    // Configuration / IO Errors
    // =========================================================================
    /// Configuration file parsing error.
    #[error("Invalid configuration in '{path}': {reason}")]
    Config { path: PathBuf, reason: String },

    /// File read/write error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Catch-all wrapped error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for xlikes operations.
pub type Result<T> = std::result::Result<T, XlikesError>;

impl XlikesError {
    /// Create a validation error.
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }

    /// Create a malformed-item error.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedItem {
            reason: reason.into(),
        }
    }

    /// Create an upstream API error.
    pub fn upstream(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Upstream {
            status,
            message: message.into(),
        }
    }

    /// Create a not-found error.
    pub fn not_found(item_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            item_type,
            id: id.into(),
        }
    }

    /// Create a config error.
    pub fn config(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Config {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error came from the upstream API rather than local state.
    #[must_use]
    pub const fn is_upstream(&self) -> bool {
        matches!(
            self,
            Self::Upstream { .. } | Self::Transport(_) | Self::MissingCredentials { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_error_formats_status() {
        let err = XlikesError::upstream(Some(429), "rate limited");
        assert_eq!(err.to_string(), "Upstream API error (HTTP 429): rate limited");

        let err = XlikesError::upstream(None, "connection reset");
        assert_eq!(err.to_string(), "Upstream API error: connection reset");
    }

    #[test]
    fn not_found_formats_item_and_id() {
        let err = XlikesError::not_found("Tweet", "12345");
        assert_eq!(err.to_string(), "Tweet with ID '12345' not found");
    }

    #[test]
    fn is_upstream_classification() {
        assert!(XlikesError::upstream(None, "x").is_upstream());
        assert!(!XlikesError::SyncInProgress.is_upstream());
        assert!(!XlikesError::validation("x").is_upstream());
    }
}
