//! `SQLite` storage for liked-post data.
//!
//! Two invariants drive the design here:
//!
//! - Every tweet insert is one transaction covering the row, its category
//!   associations, and its full-text index entry. Concurrent readers never
//!   observe a partially-written tweet.
//! - Each insert is its own atomic unit, not batched behind one giant
//!   transaction, so a long sync run makes its progress durable page by page.

use crate::error::{Result, XlikesError};
use crate::model::{
    AuthorCount, Category, CategoryCount, LikedTweet, LikesStats, SyncLogEntry, SyncReport,
    SyncStatusKind, TweetPage, TweetQuery,
};
use chrono::{DateTime, Utc};
use rusqlite::{
    Connection, OptionalExtension, TransactionBehavior, params, params_from_iter, types::Value,
};
use std::path::Path;
use tracing::{debug, info};

const SCHEMA_VERSION: i32 = 1;

/// Hard cap on query page size.
pub const MAX_PER_PAGE: u32 = 100;

const fn epoch_utc() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(0, 0).unwrap()
}

fn parse_rfc3339_or_epoch(value: Option<String>) -> DateTime<Utc> {
    value
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map_or_else(epoch_utc, |dt| dt.with_timezone(&Utc))
}

fn parse_rfc3339_opt(value: Option<String>) -> Option<DateTime<Utc>> {
    value
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// Build an FTS5 query where every whitespace token is a quoted phrase.
///
/// Quoting keeps FTS5 operators (`AND`, `NEAR`, `*`, `-`) from being
/// interpreted in user input; embedded quotes are doubled per FTS5 syntax.
#[must_use]
pub fn fts_phrase_query(q: &str) -> String {
    q.split_whitespace()
        .map(|w| format!("\"{}\"", w.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(" ")
}

/// `SQLite` storage manager
pub struct Storage {
    conn: Connection,
}

impl Storage {
    /// Open or create the database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(db_path.as_ref())?;

        // WAL lets the sync thread write while query paths read.
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA busy_timeout = 5000;
            ",
        )?;

        let storage = Self { conn };
        storage.migrate()?;
        Ok(storage)
    }

    /// Open an in-memory database (for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be initialized.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let storage = Self { conn };
        storage.migrate()?;
        Ok(storage)
    }

    /// Run database migrations
    fn migrate(&self) -> Result<()> {
        let current_version = self.get_schema_version();

        if current_version > SCHEMA_VERSION {
            return Err(XlikesError::SchemaMismatch {
                expected: SCHEMA_VERSION,
                found: current_version,
            });
        }

        if current_version < SCHEMA_VERSION {
            info!(
                "Migrating database from version {} to {}",
                current_version, SCHEMA_VERSION
            );
            self.create_schema()?;
            self.set_schema_version(SCHEMA_VERSION)?;
        }

        Ok(())
    }

    fn get_schema_version(&self) -> i32 {
        let result: std::result::Result<i32, _> = self.conn.query_row(
            "SELECT value FROM meta WHERE key = 'schema_version'",
            [],
            |row| {
                let value: String = row.get(0)?;
                Ok(value.parse().unwrap_or(0))
            },
        );

        // Treat missing schema table as version 0.
        result.unwrap_or_default()
    }

    fn set_schema_version(&self, version: i32) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO meta (key, value) VALUES ('schema_version', ?)",
            params![version.to_string()],
        )?;
        Ok(())
    }

    fn create_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r"
            -- Metadata table
            CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            -- Liked tweets. Insert-only; counts are snapshot-at-like-time.
            CREATE TABLE IF NOT EXISTS tweets (
                id TEXT PRIMARY KEY,
                created_at TEXT NOT NULL,
                text TEXT NOT NULL,
                author_name TEXT NOT NULL DEFAULT '',
                author_handle TEXT NOT NULL DEFAULT '',
                author_id TEXT NOT NULL DEFAULT '',
                retweet_count INTEGER DEFAULT 0,
                favorite_count INTEGER DEFAULT 0,
                url TEXT NOT NULL DEFAULT ''
            );
            CREATE INDEX IF NOT EXISTS idx_tweets_created_at ON tweets(created_at);
            CREATE INDEX IF NOT EXISTS idx_tweets_author_handle ON tweets(author_handle);

            -- Categories, created lazily on first sight of a name
            CREATE TABLE IF NOT EXISTS categories (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT UNIQUE NOT NULL
            );

            -- Tweet <-> category join, unique per pair
            CREATE TABLE IF NOT EXISTS tweet_categories (
                tweet_id TEXT NOT NULL REFERENCES tweets(id),
                category_id INTEGER NOT NULL REFERENCES categories(id),
                PRIMARY KEY (tweet_id, category_id)
            );

            -- Append-only audit trail, one row per sync run
            CREATE TABLE IF NOT EXISTS sync_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                synced_at TEXT NOT NULL,
                fetched INTEGER DEFAULT 0,
                inserted INTEGER DEFAULT 0,
                skipped INTEGER DEFAULT 0,
                failed INTEGER DEFAULT 0,
                status TEXT DEFAULT 'success',
                message TEXT
            );

            -- Full-text index, kept in lockstep with tweets inserts
            CREATE VIRTUAL TABLE IF NOT EXISTS fts_tweets USING fts5(
                tweet_id,
                text,
                author_name
            );
            ",
        )?;

        Ok(())
    }

    /// Insert a liked tweet with its category associations and FTS entry as
    /// one atomic unit.
    ///
    /// Returns `false` without writing anything when the id already exists
    /// (idempotent re-ingest), `true` when a new row was committed.
    ///
    /// # Errors
    ///
    /// Returns an error if any statement in the transaction fails; nothing
    /// is committed in that case.
    pub fn insert_liked(&mut self, tweet: &LikedTweet) -> Result<bool> {
        // Immediate so the write lock is taken before the exists check; a
        // deferred transaction upgrading mid-way can fail with BUSY_SNAPSHOT,
        // which the busy timeout does not cover.
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let exists: Option<i64> = tx
            .query_row(
                "SELECT 1 FROM tweets WHERE id = ?",
                params![tweet.id],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_some() {
            return Ok(false);
        }

        tx.execute(
            r"
            INSERT INTO tweets
            (id, created_at, text, author_name, author_handle, author_id,
             retweet_count, favorite_count, url)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ",
            params![
                tweet.id,
                tweet.created_at.to_rfc3339(),
                tweet.text,
                tweet.author_name,
                tweet.author_handle,
                tweet.author_id,
                tweet.retweet_count,
                tweet.favorite_count,
                tweet.url,
            ],
        )?;

        for name in &tweet.categories {
            // Get-or-create by name: the unique constraint resolves concurrent
            // first-sights of the same category, INSERT OR IGNORE absorbs the
            // conflict and the SELECT picks up whichever row won.
            tx.execute(
                "INSERT OR IGNORE INTO categories (name) VALUES (?)",
                params![name],
            )?;
            let category_id: i64 = tx.query_row(
                "SELECT id FROM categories WHERE name = ?",
                params![name],
                |row| row.get(0),
            )?;
            tx.execute(
                "INSERT OR IGNORE INTO tweet_categories (tweet_id, category_id) VALUES (?, ?)",
                params![tweet.id, category_id],
            )?;
        }

        tx.execute(
            "INSERT INTO fts_tweets (tweet_id, text, author_name) VALUES (?, ?, ?)",
            params![tweet.id, tweet.text, tweet.author_name],
        )?;

        tx.commit()?;
        debug!("Inserted tweet {}", tweet.id);
        Ok(true)
    }

    /// Resolve a category id by name, creating the row if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert or lookup fails.
    pub fn get_or_create_category(&self, name: &str) -> Result<i64> {
        self.conn.execute(
            "INSERT OR IGNORE INTO categories (name) VALUES (?)",
            params![name],
        )?;
        let id = self.conn.query_row(
            "SELECT id FROM categories WHERE name = ?",
            params![name],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    /// All known categories in name order.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_categories(&self) -> Result<Vec<Category>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM categories ORDER BY name")?;
        let categories = stmt
            .query_map([], |row| {
                Ok(Category {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(categories)
    }

    /// Total number of stored tweets.
    ///
    /// # Errors
    ///
    /// Returns an error if the count query fails.
    pub fn tweet_count(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM tweets", [], |row| row.get(0))?;
        Ok(count.unsigned_abs())
    }

    /// Run a filtered, sorted, paginated tweet query.
    ///
    /// Free text goes through the FTS index; category ids are OR-combined;
    /// the author filter is an exact, case-sensitive handle match. `per_page`
    /// is clamped to `1..=MAX_PER_PAGE` and `page` floors at 1.
    ///
    /// # Errors
    ///
    /// Returns an error if query construction or execution fails.
    pub fn query_tweets(&self, query: &TweetQuery) -> Result<TweetPage> {
        let page = query.page.max(1);
        let per_page = query.per_page.clamp(1, MAX_PER_PAGE);

        let mut where_clauses: Vec<String> = Vec::new();
        let mut joins: Vec<String> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(q) = query.q.as_deref() {
            let q = q.trim();
            if !q.is_empty() {
                where_clauses.push(
                    "t.id IN (SELECT tweet_id FROM fts_tweets WHERE fts_tweets MATCH ?)"
                        .to_string(),
                );
                values.push(Value::from(fts_phrase_query(q)));
            }
        }

        if !query.category_ids.is_empty() {
            let placeholders = vec!["?"; query.category_ids.len()].join(",");
            joins.push("JOIN tweet_categories tc ON tc.tweet_id = t.id".to_string());
            where_clauses.push(format!("tc.category_id IN ({placeholders})"));
            values.extend(query.category_ids.iter().map(|id| Value::from(*id)));
        }

        if let Some(author) = query.author.as_deref() {
            if !author.is_empty() {
                where_clauses.push("t.author_handle = ?".to_string());
                values.push(Value::from(author.to_string()));
            }
        }

        let join_sql = joins.join(" ");
        let where_sql = if where_clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", where_clauses.join(" AND "))
        };

        let count_sql = format!("SELECT COUNT(DISTINCT t.id) FROM tweets t {join_sql} {where_sql}");
        let total: i64 =
            self.conn
                .query_row(&count_sql, params_from_iter(values.iter()), |row| {
                    row.get(0)
                })?;
        let total = total.unsigned_abs();

        // Sort column and direction come from enums, never from user strings.
        let data_sql = format!(
            r"
            SELECT t.id, t.created_at, t.text, t.author_name, t.author_handle, t.author_id,
                   t.retweet_count, t.favorite_count, t.url
            FROM tweets t
            {join_sql}
            {where_sql}
            GROUP BY t.id
            ORDER BY t.{sort_col} {sort_dir}
            LIMIT ? OFFSET ?
            ",
            sort_col = query.sort.column(),
            sort_dir = query.order.sql(),
        );

        let offset = i64::from(page - 1) * i64::from(per_page);
        values.push(Value::from(i64::from(per_page)));
        values.push(Value::from(offset));

        let mut stmt = self.conn.prepare(&data_sql)?;
        let mut tweets = stmt
            .query_map(params_from_iter(values.iter()), row_to_tweet)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        for tweet in &mut tweets {
            tweet.categories = self.categories_for(&tweet.id)?;
        }

        let total_pages = total.div_ceil(u64::from(per_page));

        Ok(TweetPage {
            total,
            page,
            per_page,
            total_pages,
            tweets,
        })
    }

    /// Fetch a single tweet by id with its category names.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_tweet(&self, id: &str) -> Result<Option<LikedTweet>> {
        let tweet = self
            .conn
            .query_row(
                r"
                SELECT id, created_at, text, author_name, author_handle, author_id,
                       retweet_count, favorite_count, url
                FROM tweets
                WHERE id = ?
                ",
                params![id],
                row_to_tweet,
            )
            .optional()?;
        match tweet {
            Some(mut tweet) => {
                tweet.categories = self.categories_for(&tweet.id)?;
                Ok(Some(tweet))
            }
            None => Ok(None),
        }
    }

    // Category names are fetched per tweet rather than packed into one
    // delimited column, so names may contain any character.
    fn categories_for(&self, tweet_id: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare_cached(
            r"
            SELECT c.name
            FROM categories c
            JOIN tweet_categories tc ON tc.category_id = c.id
            WHERE tc.tweet_id = ?
            ORDER BY c.name
            ",
        )?;
        let names = stmt
            .query_map(params![tweet_id], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(names)
    }

    /// Compute aggregate statistics over the store.
    ///
    /// Per-category counts include categories no tweet matches; the
    /// top-authors list is capped at 20, sorted by count descending with
    /// ties broken by handle ascending for determinism.
    ///
    /// # Errors
    ///
    /// Returns an error if any statistics query fails.
    pub fn get_stats(&self) -> Result<LikesStats> {
        let (total_tweets, distinct_authors, first_liked_at, last_liked_at) =
            self.conn.query_row(
                r"
                SELECT
                    (SELECT COUNT(*) FROM tweets),
                    (SELECT COUNT(DISTINCT author_handle) FROM tweets),
                    (SELECT MIN(created_at) FROM tweets),
                    (SELECT MAX(created_at) FROM tweets)
                ",
                [],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?.unsigned_abs(),
                        row.get::<_, i64>(1)?.unsigned_abs(),
                        parse_rfc3339_opt(row.get::<_, Option<String>>(2)?),
                        parse_rfc3339_opt(row.get::<_, Option<String>>(3)?),
                    ))
                },
            )?;

        let mut stmt = self.conn.prepare(
            r"
            SELECT c.id, c.name, COUNT(tc.tweet_id) AS cnt
            FROM categories c
            LEFT JOIN tweet_categories tc ON tc.category_id = c.id
            GROUP BY c.id
            ORDER BY cnt DESC, c.name ASC
            ",
        )?;
        let categories = stmt
            .query_map([], |row| {
                Ok(CategoryCount {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    count: row.get::<_, i64>(2)?.unsigned_abs(),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut stmt = self.conn.prepare(
            r"
            SELECT author_name, author_handle, COUNT(*) AS cnt
            FROM tweets
            GROUP BY author_handle
            ORDER BY cnt DESC, author_handle ASC
            LIMIT 20
            ",
        )?;
        let top_authors = stmt
            .query_map([], |row| {
                Ok(AuthorCount {
                    name: row.get(0)?,
                    handle: row.get(1)?,
                    count: row.get::<_, i64>(2)?.unsigned_abs(),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(LikesStats {
            total_tweets,
            distinct_authors,
            categories,
            first_liked_at,
            last_liked_at,
            top_authors,
        })
    }

    /// Append one audit row for a completed sync run.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub fn append_sync_log(&self, report: &SyncReport) -> Result<()> {
        self.conn.execute(
            r"
            INSERT INTO sync_log (synced_at, fetched, inserted, skipped, failed, status, message)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ",
            params![
                Utc::now().to_rfc3339(),
                i64::try_from(report.counts.fetched).unwrap_or(i64::MAX),
                i64::try_from(report.counts.inserted).unwrap_or(i64::MAX),
                i64::try_from(report.counts.skipped).unwrap_or(i64::MAX),
                i64::try_from(report.counts.failed).unwrap_or(i64::MAX),
                report.status.to_string(),
                report.message,
            ],
        )?;
        Ok(())
    }

    /// The most recent sync log entries, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn recent_sync_log(&self, limit: usize) -> Result<Vec<SyncLogEntry>> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT id, synced_at, fetched, inserted, skipped, failed, status, message
            FROM sync_log
            ORDER BY id DESC
            LIMIT ?
            ",
        )?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let entries = stmt
            .query_map(params![limit], |row| {
                Ok(SyncLogEntry {
                    id: row.get(0)?,
                    synced_at: parse_rfc3339_or_epoch(row.get::<_, Option<String>>(1)?),
                    fetched: row.get::<_, i64>(2)?.unsigned_abs(),
                    inserted: row.get::<_, i64>(3)?.unsigned_abs(),
                    skipped: row.get::<_, i64>(4)?.unsigned_abs(),
                    failed: row.get::<_, i64>(5)?.unsigned_abs(),
                    status: row
                        .get::<_, String>(6)?
                        .parse()
                        .unwrap_or(SyncStatusKind::Error),
                    message: row.get::<_, Option<String>>(7)?.unwrap_or_default(),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entries)
    }
}

fn row_to_tweet(row: &rusqlite::Row<'_>) -> rusqlite::Result<LikedTweet> {
    Ok(LikedTweet {
        id: row.get(0)?,
        created_at: parse_rfc3339_or_epoch(row.get::<_, Option<String>>(1)?),
        text: row.get(2)?,
        author_name: row.get(3)?,
        author_handle: row.get(4)?,
        author_id: row.get(5)?,
        retweet_count: row.get(6)?,
        favorite_count: row.get(7)?,
        url: row.get(8)?,
        categories: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BatchCounts, SortKey, SortOrder, SyncMode};
    use chrono::TimeZone;

    fn tweet(id: &str, text: &str, handle: &str, favs: i64, cats: &[&str]) -> LikedTweet {
        LikedTweet {
            id: id.to_string(),
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).single().unwrap()
                + chrono::Duration::hours(id.parse::<i64>().unwrap_or(0)),
            text: text.to_string(),
            author_name: format!("Author {handle}"),
            author_handle: handle.to_string(),
            author_id: format!("uid-{handle}"),
            retweet_count: 0,
            favorite_count: favs,
            url: format!("https://twitter.com/{handle}/status/{id}"),
            categories: cats.iter().map(|c| (*c).to_string()).collect(),
        }
    }

    #[test]
    fn insert_is_idempotent_by_id() {
        let mut storage = Storage::open_memory().unwrap();
        let t = tweet("1", "hello rust", "alice", 1, &["DevTools"]);

        assert!(storage.insert_liked(&t).unwrap());
        assert!(!storage.insert_liked(&t).unwrap());
        assert_eq!(storage.tweet_count().unwrap(), 1);
    }

    #[test]
    fn insert_writes_categories_and_fts_atomically() {
        let mut storage = Storage::open_memory().unwrap();
        let t = tweet("1", "deep dive on sqlite internals", "alice", 0, &["Data/Infra"]);
        storage.insert_liked(&t).unwrap();

        let fetched = storage.get_tweet("1").unwrap().unwrap();
        assert_eq!(fetched.categories, vec!["Data/Infra"]);

        let page = storage
            .query_tweets(&TweetQuery {
                q: Some("sqlite internals".to_string()),
                per_page: 10,
                page: 1,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.tweets[0].id, "1");
    }

    #[test]
    fn category_get_or_create_yields_one_row() {
        let storage = Storage::open_memory().unwrap();
        let a = storage.get_or_create_category("AI/ML").unwrap();
        let b = storage.get_or_create_category("AI/ML").unwrap();
        assert_eq!(a, b);
        assert_eq!(storage.list_categories().unwrap().len(), 1);
    }

    #[test]
    fn concurrent_category_first_sight_yields_one_row() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("concurrent.db");
        Storage::open(&db_path).unwrap();

        let handles: Vec<_> = (0..2)
            .map(|n| {
                let path = db_path.clone();
                std::thread::spawn(move || {
                    let mut storage = Storage::open(&path).unwrap();
                    for i in 0..20 {
                        let t = tweet(&format!("{n}{i:02}"), "t", "x", 0, &["Shared"]);
                        storage.insert_liked(&t).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let storage = Storage::open(&db_path).unwrap();
        let categories = storage.list_categories().unwrap();
        assert_eq!(categories.len(), 1);
        assert_eq!(categories[0].name, "Shared");
        assert_eq!(storage.tweet_count().unwrap(), 40);
    }

    #[test]
    fn category_names_with_commas_survive_retrieval() {
        let mut storage = Storage::open_memory().unwrap();
        let t = tweet("1", "mixed interests", "alice", 0, &["Foo, Bar", "Baz"]);
        storage.insert_liked(&t).unwrap();

        let fetched = storage.get_tweet("1").unwrap().unwrap();
        assert_eq!(fetched.categories, vec!["Baz", "Foo, Bar"]);

        let page = storage
            .query_tweets(&TweetQuery {
                per_page: 10,
                page: 1,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(page.tweets[0].categories, vec!["Baz", "Foo, Bar"]);
    }

    #[test]
    fn fts_misses_return_empty_with_zero_total() {
        let mut storage = Storage::open_memory().unwrap();
        storage
            .insert_liked(&tweet("1", "observability in production", "bob", 0, &[]))
            .unwrap();

        let page = storage
            .query_tweets(&TweetQuery {
                q: Some("kubernetes operators".to_string()),
                per_page: 10,
                page: 1,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(page.total, 0);
        assert!(page.tweets.is_empty());
    }

    #[test]
    fn author_filter_is_exact_and_case_sensitive() {
        let mut storage = Storage::open_memory().unwrap();
        storage.insert_liked(&tweet("1", "a", "Alice", 0, &[])).unwrap();
        storage.insert_liked(&tweet("2", "b", "alice", 0, &[])).unwrap();

        let exact = storage
            .query_tweets(&TweetQuery {
                author: Some("Alice".to_string()),
                per_page: 10,
                page: 1,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(exact.total, 1);
        assert_eq!(exact.tweets[0].id, "1");

        let lower = storage
            .query_tweets(&TweetQuery {
                author: Some("alice".to_string()),
                per_page: 10,
                page: 1,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(lower.total, 1);
        assert_eq!(lower.tweets[0].id, "2");
    }

    #[test]
    fn category_filter_is_or_combined() {
        let mut storage = Storage::open_memory().unwrap();
        storage.insert_liked(&tweet("1", "a", "x", 0, &["AI/ML"])).unwrap();
        storage.insert_liked(&tweet("2", "b", "x", 0, &["DevTools"])).unwrap();
        storage.insert_liked(&tweet("3", "c", "x", 0, &[])).unwrap();

        let ai = storage.get_or_create_category("AI/ML").unwrap();
        let dev = storage.get_or_create_category("DevTools").unwrap();

        let page = storage
            .query_tweets(&TweetQuery {
                category_ids: vec![ai, dev],
                per_page: 10,
                page: 1,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(page.total, 2);
    }

    #[test]
    fn sort_and_pagination() {
        let mut storage = Storage::open_memory().unwrap();
        for (id, favs) in [("1", 5), ("2", 50), ("3", 20)] {
            storage.insert_liked(&tweet(id, "t", "x", favs, &[])).unwrap();
        }

        let page = storage
            .query_tweets(&TweetQuery {
                sort: SortKey::FavoriteCount,
                order: SortOrder::Desc,
                per_page: 2,
                page: 1,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.tweets[0].id, "2");
        assert_eq!(page.tweets[1].id, "3");

        let page2 = storage
            .query_tweets(&TweetQuery {
                sort: SortKey::FavoriteCount,
                order: SortOrder::Desc,
                per_page: 2,
                page: 2,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(page2.tweets.len(), 1);
        assert_eq!(page2.tweets[0].id, "1");
    }

    #[test]
    fn per_page_is_capped() {
        let storage = Storage::open_memory().unwrap();
        let page = storage
            .query_tweets(&TweetQuery {
                per_page: 10_000,
                page: 0,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(page.per_page, MAX_PER_PAGE);
        assert_eq!(page.page, 1);
    }

    #[test]
    fn stats_include_zero_count_categories_and_cap_authors() {
        let mut storage = Storage::open_memory().unwrap();
        storage.get_or_create_category("Lonely").unwrap();
        for i in 0..25 {
            storage
                .insert_liked(&tweet(&i.to_string(), "t", &format!("h{i:02}"), 0, &[]))
                .unwrap();
        }
        // Two tweets for one author so counts differ
        storage.insert_liked(&tweet("99", "t", "h00", 0, &[])).unwrap();

        let stats = storage.get_stats().unwrap();
        assert_eq!(stats.total_tweets, 26);
        assert_eq!(stats.distinct_authors, 25);
        assert!(stats.categories.iter().any(|c| c.name == "Lonely" && c.count == 0));
        assert_eq!(stats.top_authors.len(), 20);
        assert_eq!(stats.top_authors[0].handle, "h00");
        assert_eq!(stats.top_authors[0].count, 2);
        // Ties broken by handle ascending
        assert_eq!(stats.top_authors[1].handle, "h01");
    }

    #[test]
    fn sync_log_round_trip() {
        let storage = Storage::open_memory().unwrap();
        let report = SyncReport {
            mode: SyncMode::Incremental,
            counts: BatchCounts {
                fetched: 4,
                inserted: 3,
                skipped: 1,
                failed: 0,
            },
            status: SyncStatusKind::Success,
            message: "sync complete".to_string(),
            api_calls: 2,
        };
        storage.append_sync_log(&report).unwrap();

        let entries = storage.recent_sync_log(10).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].fetched, 4);
        assert_eq!(entries[0].inserted, 3);
        assert_eq!(entries[0].skipped, 1);
        assert_eq!(entries[0].status, SyncStatusKind::Success);
    }

    #[test]
    fn fts_phrase_query_quotes_tokens() {
        assert_eq!(fts_phrase_query("hello world"), r#""hello" "world""#);
        assert_eq!(fts_phrase_query(r#"say "hi""#), r#""say" """hi""""#);
        assert_eq!(fts_phrase_query("  spaced   out  "), r#""spaced" "out""#);
    }
}
