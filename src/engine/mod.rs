//! The refresh engine: a scheduler feeding a pool of fetch workers, which in
//! turn feed one or more ingest workers.
//!
//! ```text
//! FeedStore -> Scheduler -> feed queue -> FetchWorker x N -> item queue -> IngestWorker -> ItemStore
//! ```
//!
//! Every loop runs as its own tokio task and watches a shared [`RunSignal`].
//! Stopping never aborts a task; each one notices the signal at its next
//! queue wait (bounded by `queue_timeout`) and returns.

pub mod config;
pub mod fetch_worker;
pub mod in_flight;
pub mod ingest;
pub mod lifecycle;
pub mod queue;
pub mod scheduler;
pub mod stats;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::app::{Result, TributaryError};
use crate::domain::{CandidateItem, Feed};
use crate::fetcher::FeedSource;
use crate::normalizer::Normalizer;
use crate::store::{FeedStore, ItemStore};

pub use config::{Backpressure, EngineConfig, DEFAULT_WORKERS};
pub use fetch_worker::{FeedOutcome, FetchWorker};
pub use in_flight::InFlight;
pub use ingest::IngestWorker;
pub use lifecycle::{EngineState, RunSignal};
pub use queue::WorkQueue;
pub use scheduler::Scheduler;
pub use stats::{EngineStats, StatsSnapshot};

use lifecycle::StateCell;

pub struct Engine {
    config: EngineConfig,
    feeds: Arc<dyn FeedStore + Send + Sync>,
    items: Arc<dyn ItemStore + Send + Sync>,
    source: Arc<dyn FeedSource + Send + Sync>,
    normalizer: Normalizer,
    state: Arc<StateCell>,
    stats: Arc<EngineStats>,
    in_flight: InFlight,
    signal: Option<RunSignal>,
    tasks: Vec<JoinHandle<()>>,
}

impl Engine {
    pub fn new(
        config: EngineConfig,
        feeds: Arc<dyn FeedStore + Send + Sync>,
        items: Arc<dyn ItemStore + Send + Sync>,
        source: Arc<dyn FeedSource + Send + Sync>,
    ) -> Result<Self> {
        config.validate()?;
        let normalizer = Normalizer::from_names(config.accepted_timestamp_formats.as_slice());

        Ok(Self {
            config,
            feeds,
            items,
            source,
            normalizer,
            state: Arc::new(StateCell::new()),
            stats: Arc::new(EngineStats::default()),
            in_flight: InFlight::new(),
            signal: None,
            tasks: Vec::new(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> EngineState {
        self.state.get()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Feeds currently queued or being fetched.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Spawn the scheduler, the fetch workers and the ingest workers.
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self) -> Result<()> {
        self.state
            .transition(EngineState::Stopped, EngineState::Running)
            .map_err(|found| TributaryError::InvalidState(found.to_string()))?;

        let signal = RunSignal::new();
        let feed_queue: WorkQueue<Feed> =
            WorkQueue::bounded(self.config.queue_capacity, self.config.backpressure);
        let item_queue: WorkQueue<CandidateItem> =
            WorkQueue::bounded(self.config.queue_capacity, self.config.backpressure);

        // Anything left over from a previous run was abandoned with its queue.
        let in_flight = InFlight::new();
        self.in_flight = in_flight.clone();

        let scheduler = Scheduler {
            feeds: self.feeds.clone(),
            queue: feed_queue.clone(),
            in_flight: in_flight.clone(),
            skip_in_flight: self.config.skip_in_flight,
            poll_interval: self.config.poll_interval(),
            stats: self.stats.clone(),
            signal: signal.clone(),
        };
        self.tasks.push(tokio::spawn(scheduler.run()));

        for id in 0..self.config.worker_count {
            let worker = FetchWorker {
                id,
                feeds: self.feeds.clone(),
                source: self.source.clone(),
                normalizer: self.normalizer.clone(),
                feed_queue: feed_queue.clone(),
                item_queue: item_queue.clone(),
                in_flight: in_flight.clone(),
                stats: self.stats.clone(),
                signal: signal.clone(),
                queue_timeout: self.config.queue_timeout(),
                fetch_timeout: self.config.fetch_timeout(),
            };
            self.tasks.push(tokio::spawn(worker.run()));
        }

        for id in 0..self.config.ingest_workers {
            let worker = IngestWorker {
                id,
                items: self.items.clone(),
                item_queue: item_queue.clone(),
                stats: self.stats.clone(),
                signal: signal.clone(),
                queue_timeout: self.config.queue_timeout(),
            };
            self.tasks.push(tokio::spawn(worker.run()));
        }

        self.signal = Some(signal);

        info!(
            workers = self.config.worker_count,
            ingest_workers = self.config.ingest_workers,
            poll_interval = ?self.config.poll_interval(),
            "Engine started"
        );

        Ok(())
    }

    /// Ask every loop to finish. Returns immediately; use [`join`](Self::join)
    /// to wait for them.
    pub fn stop(&self) {
        if self
            .state
            .transition(EngineState::Running, EngineState::Stopping)
            .is_ok()
        {
            info!("Engine stopping");
        }

        if let Some(signal) = &self.signal {
            signal.stop();
        }
    }

    /// Wait for every spawned task. Only returns once [`stop`](Self::stop)
    /// has been called.
    pub async fn join(&mut self) {
        for result in join_all(self.tasks.drain(..)).await {
            if let Err(e) = result {
                error!("Engine task join error: {}", e);
            }
        }

        self.signal = None;
        if self.state.get() == EngineState::Stopping {
            self.state.set(EngineState::Stopped);
            info!("Engine stopped");
        }
    }

    /// `stop` followed by `join`, giving up after `deadline`.
    pub async fn shutdown(&mut self, deadline: Duration) -> Result<()> {
        self.stop();
        tokio::time::timeout(deadline, self.join())
            .await
            .map_err(|_| TributaryError::ShutdownTimeout(deadline))
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if let Some(signal) = &self.signal {
            signal.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RawEntry;
    use crate::engine::testing::{entry, wait_until, Script, ScriptedSource};
    use crate::store::{FeedCatalog, SqliteStore};
    use chrono::{DateTime, TimeDelta, TimeZone, Utc};

    const FEED_A: &str = "https://example.com/a.xml";

    fn fast_config() -> EngineConfig {
        EngineConfig {
            poll_interval_ms: 50,
            worker_count: 4,
            queue_timeout_ms: 200,
            fetch_timeout_secs: 5,
            queue_capacity: 16,
            ..Default::default()
        }
    }

    fn engine(config: EngineConfig, store: &Arc<SqliteStore>, source: &Arc<ScriptedSource>) -> Engine {
        Engine::new(config, store.clone(), store.clone(), source.clone()).unwrap()
    }

    fn add_feed(store: &SqliteStore, url: &str) -> i64 {
        store
            .add_feed(&Feed::new(url.to_string(), url.to_string()))
            .unwrap()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_due_feed_is_fetched_and_bad_date_falls_back_to_now() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let source = Arc::new(ScriptedSource::default());
        let feed_id = add_feed(&store, FEED_A);

        source.set(
            FEED_A,
            Script::Entries(vec![
                entry("https://example.com/1", "One", Some("Mon, 01 Jan 2024 00:00:00 GMT")),
                entry("https://example.com/2", "Two", Some("not-a-date")),
                entry("https://example.com/3", "Three", Some("Tue, 02 Jan 2024 12:00:00 +0000")),
            ]),
        );

        let mut engine = engine(fast_config(), &store, &source);
        let before = Utc::now();
        engine.start().unwrap();

        assert!(
            wait_until(Duration::from_secs(5), || {
                store.get_items_by_feed(feed_id).unwrap().len() == 3
            })
            .await
        );
        let after = Utc::now();
        engine.shutdown(Duration::from_secs(2)).await.unwrap();

        let item = |url: &str| store.find_by_url(url).unwrap().unwrap();
        assert_eq!(
            item("https://example.com/1").timestamp,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(
            item("https://example.com/3").timestamp,
            Utc.with_ymd_and_hms(2024, 1, 2, 12, 0, 0).unwrap()
        );

        let fallback = item("https://example.com/2").timestamp;
        let tolerance = TimeDelta::seconds(1);
        assert!(fallback >= before - tolerance && fallback <= after + tolerance);

        assert!(store.get_feed(feed_id).unwrap().unwrap().last_update.is_some());
        assert_eq!(source.calls(FEED_A), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_transient_error_keeps_feed_due() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let source = Arc::new(ScriptedSource::default());
        let feed_id = add_feed(&store, FEED_A);
        source.set(FEED_A, Script::TimedOut);

        let mut engine = engine(fast_config(), &store, &source);
        engine.start().unwrap();

        assert!(wait_until(Duration::from_secs(5), || source.calls(FEED_A) >= 2).await);
        assert_eq!(store.get_feed(feed_id).unwrap().unwrap().last_update, None);

        // Once the source recovers the feed is fetched and stops being due.
        source.set(
            FEED_A,
            Script::Entries(vec![entry("https://example.com/1", "One", None)]),
        );
        assert!(
            wait_until(Duration::from_secs(5), || {
                store.exists_by_url("https://example.com/1").unwrap()
            })
            .await
        );
        let recovered: DateTime<Utc> = store
            .get_feed(feed_id)
            .unwrap()
            .unwrap()
            .last_update
            .unwrap();

        engine.shutdown(Duration::from_secs(2)).await.unwrap();
        assert!(engine.stats().fetches_failed >= 2);
        assert_eq!(
            store.get_feed(feed_id).unwrap().unwrap().last_update,
            Some(recovered)
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_double_fetch_stores_each_url_once() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let source = Arc::new(ScriptedSource::with_delay(Duration::from_millis(300)));
        let feed_id = add_feed(&store, FEED_A);
        source.set(
            FEED_A,
            Script::Entries(vec![
                entry("https://example.com/1", "One", None),
                entry("https://example.com/2", "Two", None),
            ]),
        );

        let config = EngineConfig {
            skip_in_flight: false,
            ingest_workers: 2,
            ..fast_config()
        };
        let mut engine = engine(config, &store, &source);
        engine.start().unwrap();

        assert!(wait_until(Duration::from_secs(5), || engine.stats().items_duplicate >= 2).await);
        engine.shutdown(Duration::from_secs(2)).await.unwrap();

        assert!(source.calls(FEED_A) >= 2);
        assert!(source.peak_concurrency() >= 2);
        let urls: Vec<String> = store
            .get_items_by_feed(feed_id)
            .unwrap()
            .into_iter()
            .map(|i| i.url)
            .collect();
        assert_eq!(urls.len(), 2);
        assert!(urls.contains(&"https://example.com/1".to_string()));
        assert!(urls.contains(&"https://example.com/2".to_string()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_in_flight_feed_is_fetched_once() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let source = Arc::new(ScriptedSource::with_delay(Duration::from_millis(300)));
        add_feed(&store, FEED_A);
        source.set(FEED_A, Script::Entries(vec![entry("https://example.com/1", "One", None)]));

        let mut engine = engine(fast_config(), &store, &source);
        engine.start().unwrap();

        assert!(
            wait_until(Duration::from_secs(5), || {
                store.exists_by_url("https://example.com/1").unwrap()
            })
            .await
        );
        tokio::time::sleep(Duration::from_millis(200)).await;
        engine.shutdown(Duration::from_secs(2)).await.unwrap();

        assert_eq!(source.calls(FEED_A), 1);
        assert!(engine.stats().feeds_skipped_in_flight >= 1);
        assert_eq!(engine.in_flight(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_stop_while_idle_joins_within_queue_timeout() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let source = Arc::new(ScriptedSource::default());
        let config = fast_config();
        let queue_timeout = config.queue_timeout();

        let mut engine = engine(config, &store, &source);
        engine.start().unwrap();
        assert_eq!(engine.state(), EngineState::Running);

        tokio::time::sleep(Duration::from_millis(100)).await;

        engine.stop();
        assert_eq!(engine.state(), EngineState::Stopping);

        tokio::time::timeout(queue_timeout + Duration::from_millis(500), engine.join())
            .await
            .expect("all units should exit within the queue timeout");
        assert_eq!(engine.state(), EngineState::Stopped);
    }

    #[tokio::test]
    async fn test_start_twice_is_rejected_and_restart_works() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let source = Arc::new(ScriptedSource::default());
        let mut engine = engine(fast_config(), &store, &source);

        engine.start().unwrap();
        assert!(matches!(engine.start(), Err(TributaryError::InvalidState(_))));

        engine.shutdown(Duration::from_secs(2)).await.unwrap();
        assert_eq!(engine.state(), EngineState::Stopped);

        engine.start().unwrap();
        assert_eq!(engine.state(), EngineState::Running);
        engine.shutdown(Duration::from_secs(2)).await.unwrap();
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let source = Arc::new(ScriptedSource::default());
        let mut engine = engine(fast_config(), &store, &source);

        engine.stop();
        assert_eq!(engine.state(), EngineState::Stopped);

        engine.start().unwrap();
        engine.stop();
        engine.stop();
        engine.join().await;
        assert_eq!(engine.state(), EngineState::Stopped);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let source = Arc::new(ScriptedSource::default());
        let config = EngineConfig {
            worker_count: 0,
            ..Default::default()
        };
        assert!(Engine::new(config, store.clone(), store, source).is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_many_feeds_are_spread_over_workers() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let source = Arc::new(ScriptedSource::with_delay(Duration::from_millis(100)));

        for i in 0..8 {
            let url = format!("https://example.com/{i}.xml");
            add_feed(&store, &url);
            let entries: Vec<RawEntry> = (0..3)
                .map(|j| entry(&format!("https://example.com/{i}/{j}"), "Post", None))
                .collect();
            source.set(&url, Script::Entries(entries));
        }

        let mut engine = engine(fast_config(), &store, &source);
        engine.start().unwrap();

        assert!(wait_until(Duration::from_secs(5), || engine.stats().items_ingested == 24).await);
        engine.shutdown(Duration::from_secs(2)).await.unwrap();

        assert!(source.peak_concurrency() > 1);
        assert!(source.peak_concurrency() <= 4);
        assert_eq!(store.get_recent_items(100).unwrap().len(), 24);
    }
}
