use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::app::{Result, TributaryError};
use crate::domain::{CandidateItem, Feed, RawEntry};
use crate::engine::in_flight::InFlight;
use crate::engine::lifecycle::RunSignal;
use crate::engine::queue::{Popped, Pushed, WorkQueue};
use crate::engine::stats::EngineStats;
use crate::fetcher::FeedSource;
use crate::normalizer::Normalizer;
use crate::store::FeedStore;

/// How handling one feed ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedOutcome {
    /// Fetched and recorded; `queued` candidates went to the item queue.
    Fetched { entries: usize, queued: usize },
    /// Fetch or parse failed; `last_update` untouched.
    FetchFailed,
    /// Fetched, but recording the fetch failed; entries discarded.
    StoreFailed,
}

pub struct FetchWorker {
    pub(crate) id: usize,
    pub(crate) feeds: Arc<dyn FeedStore + Send + Sync>,
    pub(crate) source: Arc<dyn FeedSource + Send + Sync>,
    pub(crate) normalizer: Normalizer,
    pub(crate) feed_queue: WorkQueue<Feed>,
    pub(crate) item_queue: WorkQueue<CandidateItem>,
    pub(crate) in_flight: InFlight,
    pub(crate) stats: Arc<EngineStats>,
    pub(crate) signal: RunSignal,
    pub(crate) queue_timeout: Duration,
    pub(crate) fetch_timeout: Duration,
}

impl FetchWorker {
    pub async fn run(self) {
        debug!(worker = self.id, "Fetch worker started");

        while self.signal.is_running() {
            match self.feed_queue.pop(self.queue_timeout, &self.signal).await {
                Popped::Item(feed) => {
                    self.process(feed).await;
                }
                Popped::TimedOut => continue,
                Popped::Stopped => break,
            }
        }

        debug!(worker = self.id, "Fetch worker stopped");
    }

    /// Fetch one feed, record the fetch, then queue its entries in order.
    pub async fn process(&self, feed: Feed) -> FeedOutcome {
        let _released = self.in_flight.release_on_drop(feed.id);

        let entries = match self.fetch(&feed).await {
            Ok(entries) => entries,
            Err(e) => {
                self.stats.fetch_failed();
                if e.is_fetch_failure() {
                    warn!(
                        worker = self.id,
                        feed_id = feed.id,
                        url = %feed.url,
                        error = %e,
                        "Fetch failed, will retry on a later tick"
                    );
                } else {
                    error!(
                        worker = self.id,
                        feed_id = feed.id,
                        url = %feed.url,
                        error = %e,
                        "Feed source failed unexpectedly, will retry on a later tick"
                    );
                }
                return FeedOutcome::FetchFailed;
            }
        };

        // Recorded before the entries are touched: a failure further down
        // must not make the feed due again on every tick.
        if let Err(e) = self.feeds.record_successful_fetch(&feed, Utc::now()) {
            self.stats.store_error();
            error!(
                worker = self.id,
                feed_id = feed.id,
                error = %e,
                "Failed to record fetch, dropping this round of entries"
            );
            return FeedOutcome::StoreFailed;
        }
        self.stats.fetch_succeeded();

        let queued = self.enqueue_entries(&feed, &entries).await;

        info!(
            worker = self.id,
            feed_id = feed.id,
            feed = feed.display_name(),
            entries = entries.len(),
            queued,
            "Fetched feed"
        );

        FeedOutcome::Fetched {
            entries: entries.len(),
            queued,
        }
    }

    async fn fetch(&self, feed: &Feed) -> Result<Vec<RawEntry>> {
        match tokio::time::timeout(self.fetch_timeout, self.source.fetch_and_parse(&feed.url)).await
        {
            Ok(result) => result,
            Err(_) => Err(TributaryError::FetchTimeout {
                url: feed.url.clone(),
                after: self.fetch_timeout,
            }),
        }
    }

    async fn enqueue_entries(&self, feed: &Feed, entries: &[RawEntry]) -> usize {
        let mut queued = 0;

        for entry in entries {
            let candidate = match self.normalizer.normalize(feed.id, entry, Utc::now()) {
                Ok(candidate) => candidate,
                Err(e) => {
                    self.stats.entry_malformed();
                    warn!(feed_id = feed.id, error = %e, "Skipping entry");
                    continue;
                }
            };

            match self.item_queue.push(candidate, &self.signal).await {
                Pushed::Queued => {
                    self.stats.item_queued();
                    queued += 1;
                }
                Pushed::Dropped => {
                    self.stats.item_dropped();
                    warn!(feed_id = feed.id, "Item queue full, entry dropped");
                }
                Pushed::Stopped => {
                    debug!(feed_id = feed.id, "Engine stopping, remaining entries abandoned");
                    break;
                }
            }
        }

        queued
    }
}
