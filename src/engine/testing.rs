//! Test doubles shared by the engine's unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::app::{Result, TributaryError};
use crate::domain::{Feed, RawEntry};
use crate::fetcher::FeedSource;
use crate::store::FeedStore;

#[derive(Debug, Clone)]
pub(crate) enum Script {
    Entries(Vec<RawEntry>),
    TimedOut,
    Garbage,
}

/// Feed source answering from a per-URL script, optionally slowly.
#[derive(Default)]
pub(crate) struct ScriptedSource {
    scripts: Mutex<HashMap<String, Script>>,
    calls: Mutex<HashMap<String, usize>>,
    active: AtomicUsize,
    peak: AtomicUsize,
    delay: Duration,
}

impl ScriptedSource {
    pub(crate) fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Default::default()
        }
    }

    pub(crate) fn set(&self, url: &str, script: Script) {
        self.scripts.lock().unwrap().insert(url.to_string(), script);
    }

    pub(crate) fn calls(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    /// Highest number of fetches observed running at the same time.
    pub(crate) fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeedSource for ScriptedSource {
    async fn fetch_and_parse(&self, url: &str) -> Result<Vec<RawEntry>> {
        *self.calls.lock().unwrap().entry(url.to_string()).or_default() += 1;
        let running = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(running, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        let script = self.scripts.lock().unwrap().get(url).cloned();
        match script {
            Some(Script::Entries(entries)) => Ok(entries),
            Some(Script::Garbage) => Err(TributaryError::FeedParse("not a feed".into())),
            Some(Script::TimedOut) | None => Err(TributaryError::FetchTimeout {
                url: url.to_string(),
                after: Duration::from_secs(30),
            }),
        }
    }
}

/// Feed store whose every call fails, as if the database were gone.
#[derive(Default)]
pub(crate) struct BrokenFeedStore {
    pub(crate) due_calls: AtomicUsize,
}

impl FeedStore for BrokenFeedStore {
    fn get_due_feeds(&self, _now: DateTime<Utc>) -> Result<Vec<Feed>> {
        self.due_calls.fetch_add(1, Ordering::SeqCst);
        Err(TributaryError::StoreUnavailable("database is locked".into()))
    }

    fn record_successful_fetch(&self, _feed: &Feed, _at: DateTime<Utc>) -> Result<()> {
        Err(TributaryError::StoreUnavailable("database is locked".into()))
    }
}

pub(crate) fn entry(link: &str, title: &str, pub_date: Option<&str>) -> RawEntry {
    let mut entry = RawEntry::new(link, title);
    entry.description = Some(format!("Body of {title}"));
    entry.pub_date = pub_date.map(String::from);
    entry
}

/// Poll `check` until it holds or `deadline` passes.
pub(crate) async fn wait_until<F>(deadline: Duration, mut check: F) -> bool
where
    F: FnMut() -> bool,
{
    let started = tokio::time::Instant::now();
    loop {
        if check() {
            return true;
        }
        if started.elapsed() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
