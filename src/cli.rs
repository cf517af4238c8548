//! CLI definitions for xlikes.
//!
//! Uses clap for argument parsing with derive macros.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// xlikes - local mirror of your liked X posts
#[derive(Parser, Debug)]
#[command(name = "xlikes")]
#[command(version)]
#[command(about = "Sync, categorize, and search your liked X/Twitter posts locally")]
#[command(long_about = r#"
xlikes keeps an incremental local mirror of the posts you have liked on
X/Twitter, stored in SQLite with full-text search and automatic keyword
categorization.

Features:
  - Incremental sync that stops once it catches up with known history
  - Full-text search over tweet text and author names
  - Automatic categorization by configurable keyword rules
  - Collection statistics and a per-run sync audit log
  - Publish new posts from the command line

Quick start:
  1. Put your API credentials in ~/.config/xlikes/config.toml
     (or set XLIKES_TOKEN and XLIKES_USER_ID)
  2. Run: xlikes sync
  3. Search: xlikes search "your query"
"#)]
pub struct Cli {
    /// Path to the database file
    #[arg(long, env = "XLIKES_DB", global = true)]
    pub db: Option<PathBuf>,

    /// Path to the configuration file
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'f', default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Be verbose (show debug info)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Be quiet (suppress non-error output)
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sync liked posts from the upstream API
    Sync(SyncArgs),

    /// Import liked posts from an exported JSON file
    Import(ImportArgs),

    /// Search and list stored liked posts
    Search(SearchArgs),

    /// Show a single stored post
    Tweet(TweetArgs),

    /// List known categories with counts
    Categories,

    /// Show collection statistics
    Stats,

    /// Show recent sync runs
    Log(LogArgs),

    /// Publish a new post
    Publish(PublishArgs),

    /// Show or write configuration
    Config(ConfigArgs),
}

#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Fetch the entire likes history instead of stopping at known posts
    #[arg(long, short = 'F')]
    pub full: bool,
}

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Path to the exported likes JSON file
    pub file: PathBuf,
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Search query (matches tweet text and author names)
    pub query: Option<String>,

    /// Filter by category name, repeatable (OR-combined)
    #[arg(long, short = 'C', value_delimiter = ',')]
    pub category: Vec<String>,

    /// Filter by exact author handle (case-sensitive)
    #[arg(long, short = 'a')]
    pub author: Option<String>,

    /// Sort key
    #[arg(long, short = 's', default_value = "created-at")]
    pub sort: SortField,

    /// Sort ascending instead of descending
    #[arg(long)]
    pub asc: bool,

    /// Page number (1-based)
    #[arg(long, short = 'p', default_value = "1")]
    pub page: u32,

    /// Results per page (capped at 100)
    #[arg(long, short = 'n')]
    pub per_page: Option<u32>,
}

#[derive(Args, Debug)]
pub struct TweetArgs {
    /// Post id to show
    pub id: String,
}

#[derive(Args, Debug)]
pub struct LogArgs {
    /// Number of runs to show
    #[arg(long, short = 'n', default_value = "10")]
    pub limit: usize,
}

#[derive(Args, Debug)]
pub struct PublishArgs {
    /// Text of the post (at most 280 characters)
    pub text: String,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Show current configuration
    #[arg(long)]
    pub show: bool,

    /// Write a default configuration file if none exists
    #[arg(long)]
    pub init: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    JsonPretty,
    Compact,
}

#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum SortField {
    #[default]
    CreatedAt,
    Favorites,
    Retweets,
}
