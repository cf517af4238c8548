//! xlikes - a local mirror of your liked X posts
//!
//! This library provides the core functionality for incrementally syncing
//! liked posts from the X API into a local `SQLite` store, categorizing
//! them by keyword rules, and querying them with full-text search.
//!
//! # Modules
//!
//! - [`cli`] - Command-line interface definitions
//! - [`error`] - Custom error types with rich context
//! - [`model`] - Data models for liked posts and sync runs
//! - [`categorize`] - Keyword-rule categorization
//! - [`storage`] - `SQLite` storage layer with FTS5 search
//! - [`sync`] - Sync orchestration and single-flight run state
//! - [`service`] - Operation facade used by the CLI

pub mod categorize;
pub mod cli;
pub mod config;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod parser;
pub mod service;
pub mod storage;
pub mod sync;
pub mod upstream;

pub use cli::*;
pub use config::Config;
pub use error::{Result, XlikesError};
pub use model::*;
pub use service::LikesService;
pub use storage::Storage;
pub use upstream::{ApiClient, LikesSource};

/// Default database filename
pub const DEFAULT_DB_NAME: &str = "xlikes.db";

/// Get the default data directory for xlikes
#[must_use]
pub fn default_data_dir() -> std::path::PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("xlikes")
}

/// Get the default database path
#[must_use]
pub fn default_db_path() -> std::path::PathBuf {
    default_data_dir().join(DEFAULT_DB_NAME)
}

/// Format an unsigned integer with thousands separators.
#[must_use]
pub fn format_number(value: u64) -> String {
    let mut out = String::with_capacity(24);

    for (idx, ch) in value.to_string().chars().rev().enumerate() {
        if idx > 0 && idx % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }

    out.chars().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_number_inserts_separators() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1_000), "1,000");
        assert_eq!(format_number(1_234_567), "1,234,567");
    }

    #[test]
    fn default_db_path_ends_with_db_name() {
        assert!(default_db_path().ends_with(format!("xlikes/{DEFAULT_DB_NAME}")));
    }
}
