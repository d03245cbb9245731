pub mod sqlite;

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::app::Result;
use crate::domain::{CandidateItem, Feed, Item};

pub use sqlite::SqliteStore;

/// What the engine needs from the feed catalogue.
pub trait FeedStore {
    /// Active feeds that were never fetched or whose interval has elapsed.
    fn get_due_feeds(&self, now: DateTime<Utc>) -> Result<Vec<Feed>>;

    /// Advance `last_update`. Never moves it backwards and does not fail
    /// when the feed no longer exists.
    fn record_successful_fetch(&self, feed: &Feed, at: DateTime<Utc>) -> Result<()>;
}

/// Catalogue maintenance, used by the command line rather than the engine.
pub trait FeedCatalog {
    fn add_feed(&self, feed: &Feed) -> Result<i64>;
    fn get_feed(&self, id: i64) -> Result<Option<Feed>>;
    fn get_feed_by_url(&self, url: &str) -> Result<Option<Feed>>;
    fn get_all_feeds(&self) -> Result<Vec<Feed>>;
    fn set_interval(&self, id: i64, interval: Duration) -> Result<()>;
    fn set_active(&self, id: i64, active: bool) -> Result<()>;
    fn delete_feed(&self, id: i64) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    Inserted(Item),
    /// Another item already holds this URL.
    Duplicate,
}

pub trait ItemStore {
    fn find_by_url(&self, url: &str) -> Result<Option<Item>>;

    fn exists_by_url(&self, url: &str) -> Result<bool> {
        Ok(self.find_by_url(url)?.is_some())
    }

    /// Persist a candidate. Losing a race on the URL yields
    /// [`InsertOutcome::Duplicate`], not an error.
    fn insert(&self, candidate: &CandidateItem) -> Result<InsertOutcome>;

    fn get_items_by_feed(&self, feed_id: i64) -> Result<Vec<Item>>;
    fn get_recent_items(&self, limit: usize) -> Result<Vec<Item>>;
}
