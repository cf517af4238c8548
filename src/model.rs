//! Data models for liked-post data.
//!
//! These structures represent the normalized form of liked posts after
//! validation of the raw items returned by the platform API or a JSON export.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A liked tweet, as stored locally.
///
/// Rows are insert-only: engagement counts are a snapshot taken at like time
/// and are never refreshed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LikedTweet {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub text: String,
    pub author_name: String,
    pub author_handle: String,
    pub author_id: String,
    pub retweet_count: i64,
    pub favorite_count: i64,
    pub url: String,
    /// Category names attached at ingest time. Empty when no rule matched.
    #[serde(default)]
    pub categories: Vec<String>,
}

/// A category row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

/// A raw fetched item, before validation.
///
/// All fields are optional so a malformed upstream item deserializes instead
/// of failing the whole page; validation decides what is ingestible.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawLike {
    #[serde(default)]
    pub tweet_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default)]
    pub author_screen_name: Option<String>,
    #[serde(default)]
    pub author_id: Option<String>,
    #[serde(default)]
    pub retweet_count: Option<i64>,
    #[serde(default)]
    pub favorite_count: Option<i64>,
    #[serde(default)]
    pub tweet_url: Option<String>,
}

/// One page of liked items from the upstream source.
#[derive(Debug, Clone, Default)]
pub struct LikedPage {
    pub items: Vec<RawLike>,
    /// `None` means the upstream has no further pages.
    pub next_cursor: Option<String>,
}

/// Upstream response to a publish call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishedTweet {
    pub id: String,
    pub text: String,
}

/// Per-batch ingest counters.
///
/// Invariant: `inserted + skipped + failed == fetched` for every batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchCounts {
    pub fetched: u64,
    pub inserted: u64,
    pub skipped: u64,
    pub failed: u64,
}

impl BatchCounts {
    /// Merge another batch's counters into this one.
    pub fn absorb(&mut self, other: Self) {
        self.fetched += other.fetched;
        self.inserted += other.inserted;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }
}

/// Fetch window for a sync run. Always an explicit caller choice; full mode
/// makes many more metered upstream calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// Fetch only the most recent page(s), stopping at the first known id.
    Incremental,
    /// Paginate upstream history until exhausted (bootstrap / recovery).
    Full,
}

impl std::fmt::Display for SyncMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Incremental => write!(f, "incremental"),
            Self::Full => write!(f, "full"),
        }
    }
}

/// Terminal status of a sync run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatusKind {
    /// Every fetched item was accounted for without upstream failure.
    Success,
    /// The run completed but some items failed to ingest.
    Partial,
    /// The upstream aborted the run; earlier pages remain committed.
    Error,
}

impl std::fmt::Display for SyncStatusKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Partial => write!(f, "partial"),
            Self::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for SyncStatusKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "success" => Ok(Self::Success),
            "partial" => Ok(Self::Partial),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown sync status '{other}'")),
        }
    }
}

/// Outcome of a completed sync run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncReport {
    pub mode: SyncMode,
    pub counts: BatchCounts,
    pub status: SyncStatusKind,
    pub message: String,
    /// Number of upstream API calls the run made.
    pub api_calls: u64,
}

/// One append-only audit row describing a past sync run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncLogEntry {
    pub id: i64,
    pub synced_at: DateTime<Utc>,
    pub fetched: u64,
    pub inserted: u64,
    pub skipped: u64,
    pub failed: u64,
    pub status: SyncStatusKind,
    pub message: String,
}

/// Snapshot of the process-wide sync state, readable at any time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSnapshot {
    pub running: bool,
    /// Most recent progress messages, newest last.
    pub progress: Vec<String>,
    pub last_result: Option<SyncReport>,
}

/// Sort key for tweet queries. Restricted to indexed columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    CreatedAt,
    FavoriteCount,
    RetweetCount,
}

impl SortKey {
    /// Column name for SQL ORDER BY. Keyed off the enum so user input can
    /// never reach the query string.
    #[must_use]
    pub const fn column(self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::FavoriteCount => "favorite_count",
            Self::RetweetCount => "retweet_count",
        }
    }
}

/// Sort direction for tweet queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    #[must_use]
    pub const fn sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Filter criteria for listing/searching stored tweets.
#[derive(Debug, Clone, Default)]
pub struct TweetQuery {
    /// Free-text search term, routed through the full-text index.
    pub q: Option<String>,
    /// Category ids, OR-combined: a tweet matching any is included.
    pub category_ids: Vec<i64>,
    /// Exact, case-sensitive author handle match.
    pub author: Option<String>,
    pub sort: SortKey,
    pub order: SortOrder,
    /// 1-based page number.
    pub page: u32,
    pub per_page: u32,
}

/// A page of query results plus the total match count for pagination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TweetPage {
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u64,
    pub tweets: Vec<LikedTweet>,
}

/// Per-category tweet count (zero-count categories included).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryCount {
    pub id: i64,
    pub name: String,
    pub count: u64,
}

/// Per-author tweet count for the top-authors list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorCount {
    pub name: String,
    pub handle: String,
    pub count: u64,
}

/// Aggregate statistics over the local store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LikesStats {
    pub total_tweets: u64,
    pub distinct_authors: u64,
    pub categories: Vec<CategoryCount>,
    pub first_liked_at: Option<DateTime<Utc>>,
    pub last_liked_at: Option<DateTime<Utc>>,
    /// Top authors by count descending, ties broken by handle ascending,
    /// truncated to at most 20 entries.
    pub top_authors: Vec<AuthorCount>,
}

/// Health snapshot for the service surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    pub tweet_count: u64,
    pub sync_running: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_counts_absorb_sums_fields() {
        let mut a = BatchCounts {
            fetched: 4,
            inserted: 3,
            skipped: 1,
            failed: 0,
        };
        a.absorb(BatchCounts {
            fetched: 2,
            inserted: 0,
            skipped: 1,
            failed: 1,
        });
        assert_eq!(a.fetched, 6);
        assert_eq!(a.inserted, 3);
        assert_eq!(a.skipped, 2);
        assert_eq!(a.failed, 1);
        assert_eq!(a.inserted + a.skipped + a.failed, a.fetched);
    }

    #[test]
    fn sync_status_round_trips_through_strings() {
        for kind in [
            SyncStatusKind::Success,
            SyncStatusKind::Partial,
            SyncStatusKind::Error,
        ] {
            let parsed: SyncStatusKind = kind.to_string().parse().unwrap();
            assert_eq!(parsed, kind);
        }
        assert!("bogus".parse::<SyncStatusKind>().is_err());
    }

    #[test]
    fn sort_key_columns_are_allowlisted() {
        assert_eq!(SortKey::CreatedAt.column(), "created_at");
        assert_eq!(SortKey::FavoriteCount.column(), "favorite_count");
        assert_eq!(SortKey::RetweetCount.column(), "retweet_count");
    }
}
