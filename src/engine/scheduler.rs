use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::domain::Feed;
use crate::engine::in_flight::InFlight;
use crate::engine::lifecycle::RunSignal;
use crate::engine::queue::{Pushed, WorkQueue};
use crate::engine::stats::EngineStats;
use crate::store::FeedStore;

/// Polls the feed store on a fixed period and queues every due feed.
pub struct Scheduler {
    pub(crate) feeds: Arc<dyn FeedStore + Send + Sync>,
    pub(crate) queue: WorkQueue<Feed>,
    pub(crate) in_flight: InFlight,
    pub(crate) skip_in_flight: bool,
    pub(crate) poll_interval: Duration,
    pub(crate) stats: Arc<EngineStats>,
    pub(crate) signal: RunSignal,
}

impl Scheduler {
    pub async fn run(self) {
        info!(period = ?self.poll_interval, "Scheduler started");

        // The first tick completes immediately.
        let mut timer = interval(self.poll_interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while self.signal.is_running() {
            tokio::select! {
                biased;
                _ = self.signal.stopped() => break,
                _ = timer.tick() => {}
            }

            self.tick(Utc::now()).await;
        }

        info!("Scheduler stopped");
    }

    /// One poll of the feed store. Returns the number of feeds queued.
    pub async fn tick(&self, now: DateTime<Utc>) -> usize {
        self.stats.tick();

        let due = match self.feeds.get_due_feeds(now) {
            Ok(due) => due,
            Err(e) => {
                self.stats.store_error();
                error!(error = %e, "Failed to query due feeds, skipping this tick");
                return 0;
            }
        };

        if due.is_empty() {
            return 0;
        }

        let total = due.len();
        let mut queued = 0;

        for feed in due {
            if !self.signal.is_running() {
                break;
            }

            let feed_id = feed.id;
            if self.skip_in_flight && !self.in_flight.insert(feed_id) {
                self.stats.feed_skipped_in_flight();
                debug!(feed_id, url = %feed.url, "Feed still in flight, not queued again");
                continue;
            }

            match self.queue.push(feed, &self.signal).await {
                Pushed::Queued => {
                    self.stats.feed_dispatched();
                    queued += 1;
                }
                Pushed::Dropped => {
                    self.in_flight.remove(feed_id);
                    self.stats.feed_dropped();
                    warn!(feed_id, "Feed queue full, feed dropped until the next tick");
                }
                Pushed::Stopped => {
                    self.in_flight.remove(feed_id);
                    break;
                }
            }
        }

        debug!(due = total, queued, "Scheduler tick");
        queued
    }
}
