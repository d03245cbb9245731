use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::app::{AppContext, Result, TributaryError};
use crate::config::format_interval;
use crate::domain::{Feed, Item};
use crate::store::{FeedCatalog, ItemStore};

/// Register a feed. Returns the id of the new or already known feed.
pub fn add_feed(
    ctx: &AppContext,
    url: &str,
    name: Option<String>,
    homepage: Option<String>,
    interval: Option<Duration>,
) -> Result<i64> {
    let url = canonical_url(url)?;

    if let Some(existing) = ctx.store.get_feed_by_url(&url)? {
        println!("Feed already exists: {}", url);
        return Ok(existing.id);
    }

    let mut feed = Feed::new(url.clone(), name.unwrap_or_else(|| url.clone()));
    feed.homepage = homepage;
    if let Some(interval) = interval {
        feed.interval = interval;
    }

    let id = ctx.store.add_feed(&feed)?;
    println!(
        "Added feed: {} (every {})",
        url,
        format_interval(feed.interval)
    );
    Ok(id)
}

pub fn remove_feed(ctx: &AppContext, url: &str) -> Result<()> {
    let feed = find_feed(ctx, url)?;
    ctx.store.delete_feed(feed.id)?;
    println!("Removed feed: {}", url);
    Ok(())
}

pub fn set_active(ctx: &AppContext, url: &str, active: bool) -> Result<()> {
    let feed = find_feed(ctx, url)?;
    ctx.store.set_active(feed.id, active)?;
    println!(
        "{} feed: {}",
        if active { "Resumed" } else { "Paused" },
        feed.display_name()
    );
    Ok(())
}

pub fn set_interval(ctx: &AppContext, url: &str, interval: Duration) -> Result<()> {
    let feed = find_feed(ctx, url)?;
    ctx.store.set_interval(feed.id, interval)?;
    println!(
        "{} now refreshes every {}",
        feed.display_name(),
        format_interval(interval)
    );
    Ok(())
}

pub fn list_feeds(ctx: &AppContext, json: bool) -> Result<()> {
    let feeds = ctx.store.get_all_feeds()?;

    if json {
        println!("{}", to_json(&feeds)?);
        return Ok(());
    }

    if feeds.is_empty() {
        println!("No feeds");
        return Ok(());
    }

    let now = Utc::now();
    for feed in &feeds {
        println!("{}", feed_line(feed, now));
    }

    Ok(())
}

pub fn list_items(ctx: &AppContext, limit: usize, json: bool) -> Result<()> {
    let items = ctx.store.get_recent_items(limit)?;

    if json {
        println!("{}", to_json(&items)?);
        return Ok(());
    }

    if items.is_empty() {
        println!("No items");
        return Ok(());
    }

    for item in &items {
        println!("{}", item_line(item));
    }

    Ok(())
}

/// Run the engine until SIGINT or SIGTERM, then shut it down.
pub async fn run(ctx: &AppContext) -> Result<()> {
    let mut engine = ctx.engine()?;
    engine.start()?;

    println!(
        "Refreshing {} feeds with {} workers, press Ctrl-C to stop",
        ctx.store.get_all_feeds()?.len(),
        engine.config().worker_count
    );

    wait_for_shutdown_signal().await?;

    // Workers notice the stop within one queue timeout; one may be mid-fetch.
    let deadline = engine.config().queue_timeout() + engine.config().fetch_timeout();
    engine.shutdown(deadline).await?;

    let stats = engine.stats();
    info!(
        fetched = stats.fetches_succeeded,
        failed = stats.fetches_failed,
        ingested = stats.items_ingested,
        duplicates = stats.items_duplicate,
        "Engine run finished"
    );
    println!(
        "Stopped: {} fetches ({} failed), {} new items",
        stats.fetches_succeeded + stats.fetches_failed,
        stats.fetches_failed,
        stats.items_ingested
    );

    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::select! {
        _ = sigterm.recv() => {},
        _ = sigint.recv() => {},
    }
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}

/// The form feeds are stored under: scheme and host lowercased, empty path as `/`.
fn canonical_url(url: &str) -> Result<String> {
    Ok(url::Url::parse(url.trim())?.to_string())
}

fn find_feed(ctx: &AppContext, url: &str) -> Result<Feed> {
    // Text that is not a URL cannot have been added, so report it as unknown.
    let key = canonical_url(url).unwrap_or_else(|_| url.to_string());
    ctx.store
        .get_feed_by_url(&key)?
        .ok_or_else(|| TributaryError::FeedNotFound(url.to_string()))
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(|e| TributaryError::Other(e.to_string()))
}

fn feed_line(feed: &Feed, now: DateTime<Utc>) -> String {
    let status = if !feed.active {
        " [paused]".to_string()
    } else if feed.is_due(now) {
        " [due]".to_string()
    } else {
        format!(" [next {}]", format_time(feed.next_due()))
    };
    format!(
        "{}{}\n  {}\n  every {}, last update {}",
        feed.display_name(),
        status,
        feed.url,
        format_interval(feed.interval),
        format_time(feed.last_update)
    )
}

fn item_line(item: &Item) -> String {
    format!(
        "{} {}\n  {}",
        item.timestamp.format("%Y-%m-%d %H:%M"),
        item.display_headline(),
        item.url
    )
}

fn format_time(at: Option<DateTime<Utc>>) -> String {
    at.map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "never".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use chrono::TimeZone;
    use tokio_test::{assert_err, assert_ok};

    const URL: &str = "https://example.com/feed.xml";

    fn ctx() -> AppContext {
        AppContext::in_memory(Config::default()).unwrap()
    }

    #[test]
    fn test_add_feed_defaults_name_to_url() {
        let ctx = ctx();
        let id = assert_ok!(add_feed(&ctx, URL, None, None, None));

        let feed = ctx.store.get_feed(id).unwrap().unwrap();
        assert_eq!(feed.name, URL);
        assert!(feed.active);
        assert_eq!(feed.last_update, None);
    }

    #[test]
    fn test_add_feed_twice_returns_existing() {
        let ctx = ctx();
        let first = assert_ok!(add_feed(&ctx, URL, Some("Example".into()), None, None));
        let second = assert_ok!(add_feed(&ctx, URL, Some("Other".into()), None, None));

        assert_eq!(first, second);
        assert_eq!(ctx.store.get_all_feeds().unwrap().len(), 1);
    }

    #[test]
    fn test_add_feed_rejects_bad_url() {
        let ctx = ctx();
        let err = assert_err!(add_feed(&ctx, "not a url", None, None, None));
        assert!(matches!(err, TributaryError::InvalidUrl(_)));
    }

    #[test]
    fn test_pause_resume_and_set_interval() {
        let ctx = ctx();
        let id = assert_ok!(add_feed(&ctx, URL, None, None, Some(Duration::from_secs(60))));

        assert_ok!(set_active(&ctx, URL, false));
        assert!(!ctx.store.get_feed(id).unwrap().unwrap().active);

        assert_ok!(set_active(&ctx, URL, true));
        assert_ok!(set_interval(&ctx, URL, Duration::from_secs(7200)));

        let feed = ctx.store.get_feed(id).unwrap().unwrap();
        assert!(feed.active);
        assert_eq!(feed.interval, Duration::from_secs(7200));
    }

    #[test]
    fn test_unknown_feed_is_reported() {
        let ctx = ctx();
        let err = assert_err!(remove_feed(&ctx, URL));
        assert!(matches!(err, TributaryError::FeedNotFound(_)));
    }

    #[test]
    fn test_remove_feed() {
        let ctx = ctx();
        assert_ok!(add_feed(&ctx, URL, None, None, None));
        assert_ok!(remove_feed(&ctx, URL));
        assert!(ctx.store.get_feed_by_url(URL).unwrap().is_none());
    }

    #[test]
    fn test_lookup_uses_the_stored_url_form() {
        let ctx = ctx();
        let id = assert_ok!(add_feed(&ctx, "https://Example.com", None, None, None));

        let stored = ctx.store.get_feed(id).unwrap().unwrap();
        assert_eq!(stored.url, "https://example.com/");

        assert_ok!(set_active(&ctx, "https://Example.com", false));
        assert_ok!(set_interval(&ctx, "https://example.com", Duration::from_secs(600)));
        assert_ok!(remove_feed(&ctx, "https://example.com"));
        assert!(ctx.store.get_feed(id).unwrap().is_none());
    }

    #[test]
    fn test_lookup_of_non_url_text_is_not_found() {
        let ctx = ctx();
        let err = assert_err!(set_active(&ctx, "not a url", true));
        assert!(matches!(err, TributaryError::FeedNotFound(_)));
    }

    #[test]
    fn test_feed_line() {
        let mut feed = Feed::new(URL.into(), "Example".into());
        feed.interval = Duration::from_secs(5400);
        feed.active = false;

        let now = Utc::now();
        let line = feed_line(&feed, now);
        assert!(line.starts_with("Example [paused]"));
        assert!(line.contains("every 01:30:00"));
        assert!(line.contains("last update never"));

        feed.active = true;
        assert!(feed_line(&feed, now).starts_with("Example [due]"));

        feed.last_update = Some(Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap());
        let line = feed_line(&feed, Utc.with_ymd_and_hms(2024, 1, 1, 12, 30, 0).unwrap());
        assert!(line.starts_with("Example [next 2024-01-01 13:30:00]"));
    }

    #[test]
    fn test_list_json() {
        let ctx = ctx();
        assert_ok!(add_feed(&ctx, URL, Some("Example".into()), None, None));

        let json = to_json(&ctx.store.get_all_feeds().unwrap()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed[0]["name"], "Example");
        assert_eq!(parsed[0]["url"], URL);
    }
}
