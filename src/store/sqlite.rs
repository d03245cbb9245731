use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use rusqlite_migration::{Migrations, M};

use crate::app::{Result, TributaryError};
use crate::domain::{CandidateItem, Feed, Item};
use crate::store::{FeedCatalog, FeedStore, InsertOutcome, ItemStore};

const FEED_COLUMNS: &str =
    "id, url, name, homepage, description, interval_secs, last_update, active";
const ITEM_COLUMNS: &str = "id, feed_id, url, headline, body, timestamp, ingested_at";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../migrations/001-initial/up.sql"
        ))]);

        let mut conn = self.conn()?;

        conn.execute("PRAGMA foreign_keys = ON", [])?;
        migrations
            .to_latest(&mut conn)
            .map_err(|e| TributaryError::StoreUnavailable(format!("migration failed: {e}")))?;

        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| TributaryError::StoreUnavailable(e.to_string()))
    }

    fn millis_to_datetime(ms: i64) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(ms)
    }

    fn feed_from_row(row: &Row<'_>) -> rusqlite::Result<Feed> {
        Ok(Feed {
            id: row.get(0)?,
            url: row.get(1)?,
            name: row.get(2)?,
            homepage: row.get(3)?,
            description: row.get(4)?,
            interval: Duration::from_secs(row.get::<_, i64>(5)?.max(0) as u64),
            last_update: row
                .get::<_, Option<i64>>(6)?
                .and_then(Self::millis_to_datetime),
            active: row.get::<_, i64>(7)? != 0,
        })
    }

    fn item_from_row(row: &Row<'_>) -> rusqlite::Result<Item> {
        Ok(Item {
            id: row.get(0)?,
            feed_id: row.get(1)?,
            url: row.get(2)?,
            headline: row.get(3)?,
            body: row.get(4)?,
            timestamp: Self::millis_to_datetime(row.get(5)?).unwrap_or_else(Utc::now),
            ingested_at: Self::millis_to_datetime(row.get(6)?).unwrap_or_else(Utc::now),
        })
    }

    fn interval_secs(interval: Duration) -> Result<i64> {
        match i64::try_from(interval.as_secs()) {
            Ok(secs) if secs > 0 => Ok(secs),
            _ => Err(TributaryError::Config(format!(
                "refresh interval must be between 1s and {}s, got {:?}",
                i64::MAX,
                interval
            ))),
        }
    }
}

impl FeedStore for SqliteStore {
    fn get_due_feeds(&self, now: DateTime<Utc>) -> Result<Vec<Feed>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {FEED_COLUMNS} FROM feed
             WHERE active = 1
               AND (last_update IS NULL OR last_update + interval_secs * 1000 <= ?1)
             ORDER BY last_update IS NOT NULL, last_update, id"
        ))?;

        let feeds = stmt
            .query_map(params![now.timestamp_millis()], Self::feed_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(feeds)
    }

    fn record_successful_fetch(&self, feed: &Feed, at: DateTime<Utc>) -> Result<()> {
        let conn = self.conn()?;

        conn.execute(
            "UPDATE feed SET last_update = MAX(COALESCE(last_update, 0), ?1) WHERE id = ?2",
            params![at.timestamp_millis(), feed.id],
        )?;

        Ok(())
    }
}

impl FeedCatalog for SqliteStore {
    fn add_feed(&self, feed: &Feed) -> Result<i64> {
        url::Url::parse(&feed.url)?;
        let interval = Self::interval_secs(feed.interval)?;
        let conn = self.conn()?;

        conn.execute(
            "INSERT INTO feed (url, name, homepage, description, interval_secs, last_update, active)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                feed.url,
                feed.name,
                feed.homepage,
                feed.description,
                interval,
                feed.last_update.map(|dt| dt.timestamp_millis()),
                feed.active
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    fn get_feed(&self, id: i64) -> Result<Option<Feed>> {
        let conn = self.conn()?;

        let result = conn
            .query_row(
                &format!("SELECT {FEED_COLUMNS} FROM feed WHERE id = ?1"),
                params![id],
                Self::feed_from_row,
            )
            .optional()?;

        Ok(result)
    }

    fn get_feed_by_url(&self, url: &str) -> Result<Option<Feed>> {
        let conn = self.conn()?;

        let result = conn
            .query_row(
                &format!("SELECT {FEED_COLUMNS} FROM feed WHERE url = ?1"),
                params![url],
                Self::feed_from_row,
            )
            .optional()?;

        Ok(result)
    }

    fn get_all_feeds(&self) -> Result<Vec<Feed>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {FEED_COLUMNS} FROM feed ORDER BY name, url"
        ))?;

        let feeds = stmt
            .query_map([], Self::feed_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(feeds)
    }

    fn set_interval(&self, id: i64, interval: Duration) -> Result<()> {
        let interval = Self::interval_secs(interval)?;
        let conn = self.conn()?;

        conn.execute(
            "UPDATE feed SET interval_secs = ?1 WHERE id = ?2",
            params![interval, id],
        )?;

        Ok(())
    }

    fn set_active(&self, id: i64, active: bool) -> Result<()> {
        let conn = self.conn()?;

        conn.execute(
            "UPDATE feed SET active = ?1 WHERE id = ?2",
            params![active, id],
        )?;

        Ok(())
    }

    fn delete_feed(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;

        conn.execute("DELETE FROM feed WHERE id = ?1", params![id])?;
        Ok(())
    }
}

impl ItemStore for SqliteStore {
    fn find_by_url(&self, url: &str) -> Result<Option<Item>> {
        let conn = self.conn()?;

        let result = conn
            .query_row(
                &format!("SELECT {ITEM_COLUMNS} FROM item WHERE url = ?1"),
                params![url],
                Self::item_from_row,
            )
            .optional()?;

        Ok(result)
    }

    fn exists_by_url(&self, url: &str) -> Result<bool> {
        let conn = self.conn()?;

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM item WHERE url = ?1",
            params![url],
            |row| row.get(0),
        )?;

        Ok(count > 0)
    }

    fn insert(&self, candidate: &CandidateItem) -> Result<InsertOutcome> {
        let conn = self.conn()?;
        let ingested_at = Utc::now();

        let inserted = conn.execute(
            "INSERT INTO item (feed_id, url, headline, body, timestamp, ingested_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT (url) DO NOTHING",
            params![
                candidate.feed_id,
                candidate.url,
                candidate.headline,
                candidate.body,
                candidate.timestamp.timestamp_millis(),
                ingested_at.timestamp_millis()
            ],
        )?;

        if inserted == 0 {
            return Ok(InsertOutcome::Duplicate);
        }

        // Round-trip through millisecond precision so the returned item
        // matches what a later read yields.
        let ingested_at = Self::millis_to_datetime(ingested_at.timestamp_millis()).unwrap_or(ingested_at);
        let mut item = Item::from_candidate(conn.last_insert_rowid(), candidate, ingested_at);
        item.timestamp =
            Self::millis_to_datetime(candidate.timestamp.timestamp_millis()).unwrap_or(item.timestamp);

        Ok(InsertOutcome::Inserted(item))
    }

    fn get_items_by_feed(&self, feed_id: i64) -> Result<Vec<Item>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {ITEM_COLUMNS} FROM item WHERE feed_id = ?1 ORDER BY timestamp DESC, id DESC"
        ))?;

        let items = stmt
            .query_map(params![feed_id], Self::item_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(items)
    }

    fn get_recent_items(&self, limit: usize) -> Result<Vec<Item>> {
        let conn = self.conn()?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let mut stmt = conn.prepare(&format!(
            "SELECT {ITEM_COLUMNS} FROM item ORDER BY timestamp DESC, id DESC LIMIT ?1"
        ))?;

        let items = stmt
            .query_map(params![limit], Self::item_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(items)
    }
}
