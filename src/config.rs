//! Configuration system for xlikes.
//!
//! Provides layered configuration from multiple sources:
//!
//! 1. **Compiled defaults** - Sensible defaults built into the binary
//! 2. **User config file** - `~/.config/xlikes/config.toml`
//! 3. **Environment variables** - `XLIKES_*` prefix
//! 4. **CLI arguments** - Highest priority, always wins
//!
//! # Example Configuration File
//!
//! ```toml
//! [paths]
//! db = "~/.local/share/xlikes/xlikes.db"
//!
//! [upstream]
//! bearer_token = "AAAA..."
//! user_id = "12345"
//! timeout_secs = 30
//!
//! [sync]
//! page_size = 100
//! incremental_max_pages = 5
//!
//! [[categories.rules]]
//! name = "AI/ML"
//! keywords = ["llm", "transformer"]
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Main configuration structure for xlikes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path-related configuration.
    pub paths: PathsConfig,
    /// Upstream platform API configuration.
    pub upstream: UpstreamConfig,
    /// Sync behavior configuration.
    pub sync: SyncConfig,
    /// Query behavior configuration.
    pub query: QueryConfig,
    /// Categorization rules. When present, replaces the built-in rule set.
    pub categories: CategoriesConfig,
}

/// Path configuration for the database location.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Path to the `SQLite` database file.
    /// Environment variable: `XLIKES_DB`
    pub db: Option<PathBuf>,
}

/// Upstream platform API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// API base URL. Overridable for testing against a local stub.
    /// Environment variable: `XLIKES_API_BASE`
    pub base_url: String,

    /// OAuth 2.0 bearer token.
    /// Environment variable: `XLIKES_TOKEN`
    pub bearer_token: Option<String>,

    /// Platform user id whose likes are synced.
    /// Environment variable: `XLIKES_USER_ID`
    pub user_id: Option<String>,

    /// Request timeout in seconds. A hung upstream call fails the run
    /// instead of wedging the running flag.
    pub timeout_secs: u64,
}

/// Sync behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Items requested per upstream page.
    pub page_size: u32,

    /// Upper bound on pages fetched in incremental mode (cost control).
    pub incremental_max_pages: u32,
}

/// Query behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Default page size for tweet listings.
    pub default_per_page: u32,
}

/// Categorization rule overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoriesConfig {
    /// User-supplied rules; `None`/empty keeps the built-in set.
    pub rules: Option<Vec<CategoryRuleConfig>>,
}

/// A single user-supplied categorization rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRuleConfig {
    /// Category name to attach on a match.
    pub name: String,
    /// Case-insensitive keywords; any hit attaches the category.
    pub keywords: Vec<String>,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.twitter.com".to_string(),
            bearer_token: None,
            user_id: None,
            timeout_secs: 30,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            page_size: 100,
            incremental_max_pages: 5,
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_per_page: 20,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables
    /// 2. User config file (~/.config/xlikes/config.toml)
    /// 3. Compiled defaults
    pub fn load() -> Self {
        let mut config = Self::default();

        if let Some(user_config) = Self::load_user_config() {
            config.merge(user_config);
        }

        config.apply_env_overrides();

        debug!("Configuration loaded: {:?}", config);
        config
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &PathBuf) -> Option<Self> {
        if !path.exists() {
            debug!("Config file not found: {}", path.display());
            return None;
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => {
                    info!("Loaded config from: {}", path.display());
                    Some(config)
                }
                Err(e) => {
                    warn!("Failed to parse config file {}: {}", path.display(), e);
                    None
                }
            },
            Err(e) => {
                warn!("Failed to read config file {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Load the user configuration file from the standard location.
    fn load_user_config() -> Option<Self> {
        let config_path = Self::user_config_path()?;
        Self::load_from_file(&config_path)
    }

    /// Get the path to the user configuration file.
    #[must_use]
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("xlikes").join("config.toml"))
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(db) = std::env::var("XLIKES_DB") {
            self.paths.db = Some(PathBuf::from(db));
        }

        if let Ok(base) = std::env::var("XLIKES_API_BASE") {
            self.upstream.base_url = base;
        }
        if let Ok(token) = std::env::var("XLIKES_TOKEN") {
            self.upstream.bearer_token = Some(token);
        }
        if let Ok(user_id) = std::env::var("XLIKES_USER_ID") {
            self.upstream.user_id = Some(user_id);
        }

        if let Ok(pages) = std::env::var("XLIKES_MAX_PAGES") {
            if let Ok(n) = pages.parse() {
                self.sync.incremental_max_pages = n;
            }
        }
        if let Ok(size) = std::env::var("XLIKES_PAGE_SIZE") {
            if let Ok(n) = size.parse() {
                self.sync.page_size = n;
            }
        }
    }

    /// Merge another config into this one (other takes precedence).
    fn merge(&mut self, other: Self) {
        if other.paths.db.is_some() {
            self.paths.db = other.paths.db;
        }

        self.upstream.base_url = other.upstream.base_url;
        if other.upstream.bearer_token.is_some() {
            self.upstream.bearer_token = other.upstream.bearer_token;
        }
        if other.upstream.user_id.is_some() {
            self.upstream.user_id = other.upstream.user_id;
        }
        self.upstream.timeout_secs = other.upstream.timeout_secs;

        self.sync.page_size = other.sync.page_size;
        self.sync.incremental_max_pages = other.sync.incremental_max_pages;

        self.query.default_per_page = other.query.default_per_page;

        if other.categories.rules.is_some() {
            self.categories.rules = other.categories.rules;
        }
    }

    /// Get the database path, using defaults if not configured.
    pub fn db_path(&self) -> PathBuf {
        self.paths.db.clone().unwrap_or_else(crate::default_db_path)
    }

    /// Generate a default configuration file content.
    #[must_use]
    pub fn default_config_content() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.sync.page_size, 100);
        assert_eq!(config.sync.incremental_max_pages, 5);
        assert_eq!(config.upstream.timeout_secs, 30);
        assert!(config.categories.rules.is_none());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml).unwrap();
        assert_eq!(config.sync.page_size, parsed.sync.page_size);
        assert_eq!(config.upstream.base_url, parsed.upstream.base_url);
    }

    #[test]
    fn test_config_merge() {
        let mut base = Config::default();
        let mut other = Config::default();
        other.sync.incremental_max_pages = 9;
        other.paths.db = Some(PathBuf::from("/custom/path"));
        other.upstream.bearer_token = Some("tok".to_string());

        base.merge(other);

        assert_eq!(base.sync.incremental_max_pages, 9);
        assert_eq!(base.paths.db, Some(PathBuf::from("/custom/path")));
        assert_eq!(base.upstream.bearer_token.as_deref(), Some("tok"));
    }

    #[test]
    fn test_category_rules_parse() {
        let toml = r#"
            [[categories.rules]]
            name = "Rust"
            keywords = ["rust", "cargo"]
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        let rules = config.categories.rules.unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].name, "Rust");
        assert_eq!(rules[0].keywords, vec!["rust", "cargo"]);
    }
}
