//! Sync orchestration: fetch-window selection, pagination, and the
//! process-wide single-flight run state.
//!
//! The run state is the one piece of shared mutable state in the process.
//! Starting a run is an atomic test-and-set under a single lock, and the
//! guard returned by [`SyncState::try_begin`] resets the flag on drop, so an
//! errored or panicked run can never leave an orphaned "running" flag.

use crate::categorize::Categorizer;
use crate::error::{Result, XlikesError};
use crate::ingest::IngestWriter;
use crate::model::{BatchCounts, RawLike, SyncMode, SyncReport, SyncSnapshot, SyncStatusKind};
use crate::storage::Storage;
use crate::upstream::LikesSource;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{info, warn};

/// Progress messages kept in memory per run.
const PROGRESS_CAP: usize = 50;

#[derive(Debug, Default)]
struct StateInner {
    running: bool,
    progress: Vec<String>,
    last_result: Option<SyncReport>,
}

/// Process-wide sync run state. Cheap to clone; all clones share one cell.
#[derive(Debug, Clone, Default)]
pub struct SyncState {
    inner: Arc<Mutex<StateInner>>,
}

impl SyncState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically claim the running flag.
    ///
    /// The check and the set happen under one lock acquisition, so two
    /// concurrent callers can never both observe idle.
    ///
    /// # Errors
    ///
    /// Returns [`XlikesError::SyncInProgress`] when a run is already active.
    pub fn try_begin(&self) -> Result<RunGuard> {
        let mut inner = self.inner.lock();
        if inner.running {
            return Err(XlikesError::SyncInProgress);
        }
        inner.running = true;
        inner.progress.clear();
        Ok(RunGuard {
            inner: Arc::clone(&self.inner),
        })
    }

    /// Whether a sync is currently in flight.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.inner.lock().running
    }

    /// Record a human-readable progress message for status queries.
    pub fn push_progress(&self, message: impl Into<String>) {
        let mut inner = self.inner.lock();
        if inner.progress.len() == PROGRESS_CAP {
            inner.progress.remove(0);
        }
        inner.progress.push(message.into());
    }

    /// Record the terminal result of a run.
    pub fn finish(&self, report: SyncReport) {
        self.inner.lock().last_result = Some(report);
    }

    /// Snapshot for status queries: running flag, the most recent `recent`
    /// progress messages (newest last), and the last completed result.
    #[must_use]
    pub fn snapshot(&self, recent: usize) -> SyncSnapshot {
        let inner = self.inner.lock();
        let skip = inner.progress.len().saturating_sub(recent);
        SyncSnapshot {
            running: inner.running,
            progress: inner.progress[skip..].to_vec(),
            last_result: inner.last_result.clone(),
        }
    }
}

/// Releases the running flag when dropped, on every exit path.
pub struct RunGuard {
    inner: Arc<Mutex<StateInner>>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.inner.lock().running = false;
    }
}

/// Drives a sync run: pages the upstream source, feeds the ingest writer,
/// and appends one audit row per run.
pub struct Orchestrator<'a> {
    state: &'a SyncState,
    categorizer: &'a Categorizer,
    page_size: u32,
    incremental_max_pages: u32,
}

impl<'a> Orchestrator<'a> {
    #[must_use]
    pub const fn new(
        state: &'a SyncState,
        categorizer: &'a Categorizer,
        page_size: u32,
        incremental_max_pages: u32,
    ) -> Self {
        Self {
            state,
            categorizer,
            page_size,
            incremental_max_pages,
        }
    }

    /// Run a sync in the given mode.
    ///
    /// Upstream failures abort the run but keep already-committed pages;
    /// they are reported through the sync log and the returned report, not
    /// as an `Err`. Exactly one sync log row is appended per run.
    ///
    /// # Errors
    ///
    /// Returns [`XlikesError::SyncInProgress`] when a run is already active,
    /// or a database error if the audit row cannot be written.
    pub fn run(
        &self,
        storage: &mut Storage,
        source: &dyn LikesSource,
        mode: SyncMode,
    ) -> Result<SyncReport> {
        let guard = self.state.try_begin()?;
        self.run_locked(guard, storage, source, mode)
    }

    /// Run with a pre-claimed guard. Callers that spawn the run on a worker
    /// thread claim the guard first so a concurrent start is rejected before
    /// the thread exists.
    pub fn run_locked(
        &self,
        guard: RunGuard,
        storage: &mut Storage,
        source: &dyn LikesSource,
        mode: SyncMode,
    ) -> Result<SyncReport> {
        let _guard = guard;
        info!("Starting {} sync", mode);
        self.state.push_progress(format!("starting {mode} sync"));

        let writer = IngestWriter::new(self.categorizer);
        let max_pages = match mode {
            SyncMode::Incremental => self.incremental_max_pages,
            SyncMode::Full => u32::MAX,
        };

        let mut counts = BatchCounts::default();
        let mut api_calls: u64 = 0;
        let mut upstream_error: Option<XlikesError> = None;
        let mut cursor: Option<String> = None;
        let mut page_no: u32 = 0;

        while page_no < max_pages {
            page_no += 1;

            let page = match source.fetch_liked(cursor.as_deref(), self.page_size) {
                Ok(page) => {
                    api_calls += 1;
                    page
                }
                Err(e) => {
                    warn!("Upstream fetch failed on page {}: {}", page_no, e);
                    api_calls += 1;
                    upstream_error = Some(e);
                    break;
                }
            };

            if page.items.is_empty() {
                break;
            }

            let page_counts = writer.ingest_batch(storage, &page.items);
            counts.absorb(page_counts);
            self.state.push_progress(format!(
                "page {page_no}: {} new so far ({} fetched)",
                counts.inserted, counts.fetched
            ));

            // Incremental mode has caught up with history once it sees an
            // already-known id; fetching further pages would only re-pay for
            // data we already hold.
            if mode == SyncMode::Incremental && page_counts.skipped > 0 {
                info!("Caught up with known history on page {}", page_no);
                break;
            }

            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        let status = if upstream_error.is_some() {
            SyncStatusKind::Error
        } else if counts.failed > 0 {
            SyncStatusKind::Partial
        } else {
            SyncStatusKind::Success
        };

        let message = upstream_error.map_or_else(
            || {
                format!(
                    "sync complete: fetched {}, inserted {} new, skipped {} ({} API calls)",
                    counts.fetched, counts.inserted, counts.skipped, api_calls
                )
            },
            |e| {
                format!(
                    "sync aborted after {} inserted of {} fetched: {}",
                    counts.inserted, counts.fetched, e
                )
            },
        );

        let report = SyncReport {
            mode,
            counts,
            status,
            message,
            api_calls,
        };

        storage.append_sync_log(&report)?;
        self.state.push_progress(report.message.clone());
        self.state.finish(report.clone());
        info!("{}", report.message);
        Ok(report)
    }

    /// Ingest a pre-fetched batch (bulk import), bypassing upstream paging.
    ///
    /// The same single-flight, dedup, and audit-log guarantees apply.
    ///
    /// # Errors
    ///
    /// Returns [`XlikesError::SyncInProgress`] when a run is already active,
    /// or a database error if the audit row cannot be written.
    pub fn ingest_prefetched(
        &self,
        storage: &mut Storage,
        items: &[RawLike],
    ) -> Result<SyncReport> {
        let _guard = self.state.try_begin()?;
        info!("Importing batch of {} items", items.len());

        let writer = IngestWriter::new(self.categorizer);
        let counts = writer.ingest_batch(storage, items);

        let status = if counts.failed > 0 {
            SyncStatusKind::Partial
        } else {
            SyncStatusKind::Success
        };
        let report = SyncReport {
            mode: SyncMode::Full,
            counts,
            status,
            message: format!(
                "import complete: {} new of {} items ({} skipped, {} failed)",
                counts.inserted, counts.fetched, counts.skipped, counts.failed
            ),
            api_calls: 0,
        };

        storage.append_sync_log(&report)?;
        self.state.finish(report.clone());
        info!("{}", report.message);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LikedPage;
    use std::cell::RefCell;

    /// Scripted source: each entry is either a page or an upstream failure.
    struct ScriptedSource {
        pages: RefCell<Vec<Result<LikedPage>>>,
    }

    impl ScriptedSource {
        fn new(pages: Vec<Result<LikedPage>>) -> Self {
            Self {
                pages: RefCell::new(pages),
            }
        }
    }

    impl LikesSource for ScriptedSource {
        fn fetch_liked(&self, _cursor: Option<&str>, _page_size: u32) -> Result<LikedPage> {
            let mut pages = self.pages.borrow_mut();
            if pages.is_empty() {
                Ok(LikedPage::default())
            } else {
                pages.remove(0)
            }
        }

        fn publish(&self, _text: &str) -> Result<crate::model::PublishedTweet> {
            unreachable!("orchestrator never publishes")
        }
    }

    fn raw(id: &str) -> RawLike {
        RawLike {
            tweet_id: Some(id.to_string()),
            created_at: Some("2025-06-01T12:00:00+00:00".to_string()),
            text: Some(format!("tweet number {id}")),
            author_screen_name: Some("alice".to_string()),
            ..RawLike::default()
        }
    }

    fn page(ids: &[&str], next: Option<&str>) -> Result<LikedPage> {
        Ok(LikedPage {
            items: ids.iter().map(|id| raw(id)).collect(),
            next_cursor: next.map(str::to_string),
        })
    }

    #[test]
    fn try_begin_is_single_flight() {
        let state = SyncState::new();
        let guard = state.try_begin().unwrap();
        assert!(state.is_running());
        assert!(matches!(
            state.try_begin(),
            Err(XlikesError::SyncInProgress)
        ));
        drop(guard);
        assert!(!state.is_running());
        assert!(state.try_begin().is_ok());
    }

    #[test]
    fn guard_releases_on_panic() {
        let state = SyncState::new();
        let state2 = state.clone();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _guard = state2.try_begin().unwrap();
            panic!("boom");
        }));
        assert!(result.is_err());
        assert!(!state.is_running());
    }

    #[test]
    fn progress_is_capped() {
        let state = SyncState::new();
        for i in 0..(PROGRESS_CAP + 10) {
            state.push_progress(format!("msg {i}"));
        }
        let snapshot = state.snapshot(PROGRESS_CAP * 2);
        assert_eq!(snapshot.progress.len(), PROGRESS_CAP);
        assert_eq!(snapshot.progress.last().unwrap(), &format!("msg {}", PROGRESS_CAP + 9));
    }

    #[test]
    fn incremental_stops_at_first_known_id() {
        let mut storage = Storage::open_memory().unwrap();
        let categorizer = Categorizer::default();
        let state = SyncState::new();
        let orchestrator = Orchestrator::new(&state, &categorizer, 10, 5);

        // "2" is already known from a prior run context.
        IngestWriter::new(&categorizer)
            .ingest_one(&mut storage, &raw("2"))
            .unwrap();

        // Second page would be fetched only if the catch-up stop failed.
        let source = ScriptedSource::new(vec![
            page(&["5", "4", "3", "2"], Some("t1")),
            page(&["1"], None),
        ]);

        let report = orchestrator
            .run(&mut storage, &source, SyncMode::Incremental)
            .unwrap();

        assert_eq!(report.counts.fetched, 4);
        assert_eq!(report.counts.inserted, 3);
        assert_eq!(report.counts.skipped, 1);
        assert_eq!(report.status, SyncStatusKind::Success);
        assert_eq!(report.api_calls, 1);
        assert!(!state.is_running());

        let log = storage.recent_sync_log(10).unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].status, SyncStatusKind::Success);
    }

    #[test]
    fn full_mode_paginates_until_done() {
        let mut storage = Storage::open_memory().unwrap();
        let categorizer = Categorizer::default();
        let state = SyncState::new();
        let orchestrator = Orchestrator::new(&state, &categorizer, 10, 1);

        let source = ScriptedSource::new(vec![
            page(&["3", "2"], Some("t1")),
            page(&["1"], None),
        ]);

        let report = orchestrator
            .run(&mut storage, &source, SyncMode::Full)
            .unwrap();

        assert_eq!(report.counts.inserted, 3);
        assert_eq!(report.api_calls, 2);
        assert_eq!(storage.tweet_count().unwrap(), 3);
    }

    #[test]
    fn upstream_failure_keeps_committed_pages_and_logs_error() {
        let mut storage = Storage::open_memory().unwrap();
        let categorizer = Categorizer::default();
        let state = SyncState::new();
        let orchestrator = Orchestrator::new(&state, &categorizer, 10, 5);

        let source = ScriptedSource::new(vec![
            page(&["5", "4", "3", "2", "1"], Some("t1")),
            Err(XlikesError::upstream(Some(500), "upstream down")),
        ]);

        let report = orchestrator
            .run(&mut storage, &source, SyncMode::Full)
            .unwrap();

        assert_eq!(report.status, SyncStatusKind::Error);
        assert_eq!(report.counts.inserted, 5);
        assert!(report.message.contains("upstream down"));
        assert_eq!(storage.tweet_count().unwrap(), 5);
        assert!(!state.is_running());

        let log = storage.recent_sync_log(10).unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].status, SyncStatusKind::Error);
        assert_eq!(log[0].inserted, 5);
    }

    #[test]
    fn incremental_respects_page_cap() {
        let mut storage = Storage::open_memory().unwrap();
        let categorizer = Categorizer::default();
        let state = SyncState::new();
        let orchestrator = Orchestrator::new(&state, &categorizer, 10, 2);

        // Endless cursor chain; the cap must stop the run at 2 pages.
        let source = ScriptedSource::new(vec![
            page(&["9"], Some("t1")),
            page(&["8"], Some("t2")),
            page(&["7"], Some("t3")),
        ]);

        let report = orchestrator
            .run(&mut storage, &source, SyncMode::Incremental)
            .unwrap();

        assert_eq!(report.api_calls, 2);
        assert_eq!(report.counts.inserted, 2);
    }

    #[test]
    fn prefetched_batch_gets_same_guarantees() {
        let mut storage = Storage::open_memory().unwrap();
        let categorizer = Categorizer::default();
        let state = SyncState::new();
        let orchestrator = Orchestrator::new(&state, &categorizer, 10, 5);

        let mut malformed = raw("x");
        malformed.text = None;
        let items = vec![raw("1"), raw("1"), malformed];

        let report = orchestrator.ingest_prefetched(&mut storage, &items).unwrap();
        assert_eq!(report.counts.fetched, 3);
        assert_eq!(report.counts.inserted, 1);
        assert_eq!(report.counts.skipped, 1);
        assert_eq!(report.counts.failed, 1);
        assert_eq!(report.status, SyncStatusKind::Partial);
        assert_eq!(storage.recent_sync_log(10).unwrap().len(), 1);
    }
}
