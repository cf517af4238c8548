//! Service facade: one entry point per user-facing operation.
//!
//! The facade owns the long-lived pieces (db path, compiled categorizer,
//! sync state) and opens a fresh storage handle per operation. WAL mode
//! makes that safe against a background sync writing concurrently.

use crate::categorize::Categorizer;
use crate::config::Config;
use crate::error::{Result, XlikesError};
use crate::model::{
    Category, Health, LikedTweet, LikesStats, RawLike, SyncLogEntry, SyncMode, SyncReport,
    SyncSnapshot, TweetPage, TweetQuery,
};
use crate::storage::Storage;
use crate::sync::{Orchestrator, SyncState};
use crate::upstream::LikesSource;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

/// Published tweets are capped at this many characters (code points).
pub const MAX_TWEET_CHARS: usize = 280;

/// Progress lines returned by [`LikesService::sync_status`].
const STATUS_PROGRESS_LINES: usize = 10;

pub struct LikesService {
    db_path: PathBuf,
    categorizer: Arc<Categorizer>,
    state: SyncState,
    page_size: u32,
    incremental_max_pages: u32,
    default_per_page: u32,
}

impl LikesService {
    /// Build a service from loaded configuration.
    ///
    /// # Errors
    ///
    /// Fails when a configured category rule has an empty name or no
    /// keywords.
    pub fn from_config(config: &Config) -> Result<Self> {
        let categorizer = match &config.categories.rules {
            Some(rules) => Categorizer::from_config(rules)?,
            None => Categorizer::default(),
        };
        Ok(Self {
            db_path: config.db_path(),
            categorizer: Arc::new(categorizer),
            state: SyncState::new(),
            page_size: config.sync.page_size,
            incremental_max_pages: config.sync.incremental_max_pages,
            default_per_page: config.query.default_per_page,
        })
    }

    #[must_use]
    pub fn db_path(&self) -> &PathBuf {
        &self.db_path
    }

    fn open_storage(&self) -> Result<Storage> {
        Storage::open(&self.db_path)
    }

    /// Liveness check: proves the database opens and reports the sync flag.
    ///
    /// # Errors
    ///
    /// Fails when the database cannot be opened or migrated.
    pub fn health(&self) -> Result<Health> {
        let storage = self.open_storage()?;
        Ok(Health {
            status: "ok".to_string(),
            tweet_count: storage.tweet_count()?,
            sync_running: self.state.is_running(),
        })
    }

    /// Run a sync to completion on the calling thread.
    ///
    /// # Errors
    ///
    /// Returns [`XlikesError::SyncInProgress`] when a run is already active,
    /// or a database error. Upstream failures are reported inside the
    /// returned [`SyncReport`], not as an `Err`.
    pub fn run_sync(&self, source: &dyn LikesSource, mode: SyncMode) -> Result<SyncReport> {
        let mut storage = self.open_storage()?;
        let orchestrator = Orchestrator::new(
            &self.state,
            &self.categorizer,
            self.page_size,
            self.incremental_max_pages,
        );
        orchestrator.run(&mut storage, source, mode)
    }

    /// Kick off a sync on a background thread and return immediately.
    ///
    /// The single-flight claim happens on the calling thread, so a second
    /// start is rejected before any thread is spawned.
    ///
    /// # Errors
    ///
    /// Returns [`XlikesError::SyncInProgress`] when a run is already active.
    pub fn start_sync(
        &self,
        source: Box<dyn LikesSource + Send>,
        mode: SyncMode,
    ) -> Result<()> {
        let guard = self.state.try_begin()?;
        let state = self.state.clone();
        let categorizer = Arc::clone(&self.categorizer);
        let db_path = self.db_path.clone();
        let page_size = self.page_size;
        let max_pages = self.incremental_max_pages;

        std::thread::Builder::new()
            .name("xlikes-sync".to_string())
            .spawn(move || {
                let orchestrator = Orchestrator::new(&state, &categorizer, page_size, max_pages);
                match Storage::open(&db_path) {
                    Ok(mut storage) => {
                        if let Err(e) =
                            orchestrator.run_locked(guard, &mut storage, source.as_ref(), mode)
                        {
                            error!("Background sync failed: {}", e);
                        }
                    }
                    Err(e) => {
                        error!("Background sync could not open database: {}", e);
                        drop(guard);
                    }
                }
            })
            .map_err(|e| XlikesError::Other(e.into()))?;

        info!("Background {} sync started", mode);
        Ok(())
    }

    /// Current run state plus the most recent completed result.
    #[must_use]
    pub fn sync_status(&self) -> SyncSnapshot {
        self.state.snapshot(STATUS_PROGRESS_LINES)
    }

    /// Most recent sync audit rows, newest first.
    ///
    /// # Errors
    ///
    /// Fails on database errors.
    pub fn recent_sync_log(&self, limit: usize) -> Result<Vec<SyncLogEntry>> {
        self.open_storage()?.recent_sync_log(limit)
    }

    /// Ingest an exported likes batch (bulk import).
    ///
    /// # Errors
    ///
    /// Returns [`XlikesError::SyncInProgress`] when a run is already active,
    /// or a database error.
    pub fn import_batch(&self, items: &[RawLike]) -> Result<SyncReport> {
        let mut storage = self.open_storage()?;
        let orchestrator = Orchestrator::new(
            &self.state,
            &self.categorizer,
            self.page_size,
            self.incremental_max_pages,
        );
        orchestrator.ingest_prefetched(&mut storage, items)
    }

    /// Query stored tweets with filters, sorting, and pagination.
    ///
    /// A `per_page` of 0 falls back to the configured default.
    ///
    /// # Errors
    ///
    /// Fails on database errors.
    pub fn query_tweets(&self, mut query: TweetQuery) -> Result<TweetPage> {
        if query.per_page == 0 {
            query.per_page = self.default_per_page;
        }
        self.open_storage()?.query_tweets(&query)
    }

    /// Fetch a single tweet by id.
    ///
    /// # Errors
    ///
    /// Returns [`XlikesError::NotFound`] when no tweet with that id is
    /// stored.
    pub fn get_tweet(&self, id: &str) -> Result<LikedTweet> {
        self.open_storage()?
            .get_tweet(id)?
            .ok_or_else(|| XlikesError::not_found("tweet", id))
    }

    /// All known categories, ordered by name.
    ///
    /// # Errors
    ///
    /// Fails on database errors.
    pub fn list_categories(&self) -> Result<Vec<Category>> {
        self.open_storage()?.list_categories()
    }

    /// Aggregate statistics over the stored collection.
    ///
    /// # Errors
    ///
    /// Fails on database errors.
    pub fn stats(&self) -> Result<LikesStats> {
        self.open_storage()?.get_stats()
    }

    /// Publish a new tweet through the upstream source.
    ///
    /// Length is validated locally before any network call: 1 to
    /// [`MAX_TWEET_CHARS`] characters, counted as code points.
    ///
    /// # Errors
    ///
    /// Returns [`XlikesError::Validation`] for empty or over-long text, or
    /// an upstream error from the publish call.
    pub fn publish(
        &self,
        source: &dyn LikesSource,
        text: &str,
    ) -> Result<crate::model::PublishedTweet> {
        if text.trim().is_empty() {
            return Err(XlikesError::validation("tweet text must not be empty"));
        }
        let chars = text.chars().count();
        if chars > MAX_TWEET_CHARS {
            return Err(XlikesError::validation(format!(
                "tweet text is {chars} characters, maximum is {MAX_TWEET_CHARS}"
            )));
        }
        let published = source.publish(text)?;
        info!("Published tweet {}", published.id);
        Ok(published)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LikedPage, PublishedTweet};
    use tempfile::TempDir;

    struct NoopSource;

    impl LikesSource for NoopSource {
        fn fetch_liked(&self, _cursor: Option<&str>, _page_size: u32) -> Result<LikedPage> {
            Ok(LikedPage::default())
        }

        fn publish(&self, text: &str) -> Result<PublishedTweet> {
            Ok(PublishedTweet {
                id: "900".to_string(),
                text: text.to_string(),
            })
        }
    }

    fn service(dir: &TempDir) -> LikesService {
        let mut config = Config::default();
        config.paths.db = Some(dir.path().join("likes.db"));
        LikesService::from_config(&config).unwrap()
    }

    fn raw(id: &str, text: &str) -> RawLike {
        RawLike {
            tweet_id: Some(id.to_string()),
            created_at: Some("2025-03-01T09:00:00+00:00".to_string()),
            text: Some(text.to_string()),
            author_screen_name: Some("alice".to_string()),
            ..RawLike::default()
        }
    }

    #[test]
    fn health_reports_count_and_idle_state() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir);
        let health = svc.health().unwrap();
        assert_eq!(health.status, "ok");
        assert_eq!(health.tweet_count, 0);
        assert!(!health.sync_running);
    }

    #[test]
    fn import_then_query_round_trips() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir);
        let report = svc
            .import_batch(&[raw("1", "rust compiler"), raw("2", "gardening tips")])
            .unwrap();
        assert_eq!(report.counts.inserted, 2);

        let page = svc.query_tweets(TweetQuery::default()).unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.per_page, svc.default_per_page);
    }

    #[test]
    fn get_tweet_miss_is_not_found() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir);
        assert!(matches!(
            svc.get_tweet("12345"),
            Err(XlikesError::NotFound { .. })
        ));
    }

    #[test]
    fn publish_validates_length_before_upstream() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir);
        let source = NoopSource;

        let at_limit = "x".repeat(MAX_TWEET_CHARS);
        assert!(svc.publish(&source, &at_limit).is_ok());

        let over = "x".repeat(MAX_TWEET_CHARS + 1);
        assert!(matches!(
            svc.publish(&source, &over),
            Err(XlikesError::Validation { .. })
        ));
        assert!(matches!(
            svc.publish(&source, "   "),
            Err(XlikesError::Validation { .. })
        ));
    }

    #[test]
    fn publish_counts_code_points_not_bytes() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir);
        // 280 multibyte characters, well over 280 bytes.
        let text = "é".repeat(MAX_TWEET_CHARS);
        assert!(svc.publish(&NoopSource, &text).is_ok());
    }

    #[test]
    fn background_sync_is_single_flight() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir);
        let guard = svc.state.try_begin().unwrap();
        assert!(matches!(
            svc.start_sync(Box::new(NoopSource), SyncMode::Incremental),
            Err(XlikesError::SyncInProgress)
        ));
        drop(guard);
    }
}
