//! Deduplication and ingest writer.
//!
//! Turns raw fetched items into persisted rows, idempotently. A batch is
//! resilient to individual bad items: a malformed item or a failed insert is
//! counted and the rest of the batch continues.

use crate::categorize::Categorizer;
use crate::error::{Result, XlikesError};
use crate::model::{BatchCounts, LikedTweet, RawLike};
use crate::storage::Storage;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

const fn epoch_utc() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(0, 0).unwrap()
}

impl RawLike {
    /// Validate a raw item into a storable tweet (without categories).
    ///
    /// `id` and `text` are required and must be non-empty; author fields
    /// default to empty strings and an unparseable `created_at` degrades to
    /// the epoch rather than rejecting the item.
    ///
    /// # Errors
    ///
    /// Returns a malformed-item error when a required field is missing.
    pub fn validate(&self) -> Result<LikedTweet> {
        let id = self
            .tweet_id
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| XlikesError::malformed("missing tweet_id"))?;
        let text = self
            .text
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| XlikesError::malformed(format!("item {id}: missing text")))?;

        let created_at = self
            .created_at
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map_or_else(epoch_utc, |dt| dt.with_timezone(&Utc));

        let handle = self.author_screen_name.clone().unwrap_or_default();
        let url = self.tweet_url.clone().unwrap_or_else(|| {
            format!("https://twitter.com/{handle}/status/{id}")
        });

        Ok(LikedTweet {
            id: id.to_string(),
            created_at,
            text: text.to_string(),
            author_name: self.author_name.clone().unwrap_or_default(),
            author_handle: handle,
            author_id: self.author_id.clone().unwrap_or_default(),
            retweet_count: self.retweet_count.unwrap_or(0),
            favorite_count: self.favorite_count.unwrap_or(0),
            url,
            categories: Vec::new(),
        })
    }
}

/// Writes raw fetched items to storage with dedup and categorization.
pub struct IngestWriter<'a> {
    categorizer: &'a Categorizer,
}

impl<'a> IngestWriter<'a> {
    #[must_use]
    pub const fn new(categorizer: &'a Categorizer) -> Self {
        Self { categorizer }
    }

    /// Ingest one raw item.
    ///
    /// Returns `true` when a new row was inserted and `false` when the id
    /// was already known (a normal outcome, not an error).
    ///
    /// # Errors
    ///
    /// Returns a malformed-item error for invalid input, or a database error
    /// if the insert transaction fails.
    pub fn ingest_one(&self, storage: &mut Storage, raw: &RawLike) -> Result<bool> {
        let mut tweet = raw.validate()?;
        tweet.categories = self
            .categorizer
            .categorize(&tweet.text)
            .into_iter()
            .map(str::to_string)
            .collect();
        storage.insert_liked(&tweet)
    }

    /// Ingest a batch of raw items, returning the per-batch counters.
    ///
    /// Every item is accounted for: `inserted + skipped + failed == fetched`.
    pub fn ingest_batch(&self, storage: &mut Storage, items: &[RawLike]) -> BatchCounts {
        let mut counts = BatchCounts::default();

        for raw in items {
            counts.fetched += 1;
            match self.ingest_one(storage, raw) {
                Ok(true) => counts.inserted += 1,
                Ok(false) => {
                    counts.skipped += 1;
                    debug!(
                        "Skipping already-known tweet {}",
                        raw.tweet_id.as_deref().unwrap_or("?")
                    );
                }
                Err(e) => {
                    counts.failed += 1;
                    warn!(
                        "Failed to ingest item {}: {}",
                        raw.tweet_id.as_deref().unwrap_or("?"),
                        e
                    );
                }
            }
        }

        counts
    }
}
