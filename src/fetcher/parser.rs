use std::cell::RefCell;
use std::rc::Rc;

use chrono::{DateTime, Utc};
use feed_rs::model::{Entry, FeedType};
use feed_rs::parser::Builder;

use crate::app::{Result, TributaryError};
use crate::domain::RawEntry;

/// Parse a feed document into raw entries, keeping the dialect's field layout:
/// RSS bodies land in `description` and dates in `pub_date`, Atom and JSON
/// Feed bodies in `summary` and dates in `published`/`updated`.
///
/// Dates are passed on exactly as written in the document, so the
/// normalizer's configured formats are what decide whether they parse.
pub fn parse_entries(body: &[u8]) -> Result<Vec<RawEntry>> {
    let dates = WireDates::default();
    let recorder = dates.clone();

    let feed = Builder::new()
        .timestamp_parser(move |text| recorder.record(text))
        .build()
        .parse(body)
        .map_err(|e| TributaryError::FeedParse(e.to_string()))?;
    let rss = matches!(
        feed.feed_type,
        FeedType::RSS0 | FeedType::RSS1 | FeedType::RSS2
    );

    Ok(feed
        .entries
        .into_iter()
        .map(|entry| to_raw_entry(entry, rss, &dates))
        .collect())
}

/// Date strings seen by feed-rs, in order. Each one is handed back to
/// feed-rs as a stand-in instant whose seconds value is its index here.
#[derive(Clone, Default)]
struct WireDates(Rc<RefCell<Vec<String>>>);

impl WireDates {
    fn record(&self, text: &str) -> Option<DateTime<Utc>> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let mut texts = self.0.borrow_mut();
        let index = i64::try_from(texts.len()).ok()?;
        texts.push(text.to_string());
        DateTime::from_timestamp(index, 0)
    }

    fn text(&self, stand_in: Option<DateTime<Utc>>) -> Option<String> {
        let index = usize::try_from(stand_in?.timestamp()).ok()?;
        self.0.borrow().get(index).cloned()
    }
}

fn to_raw_entry(entry: Entry, rss: bool, dates: &WireDates) -> RawEntry {
    let link = entry.links.first().map(|l| l.href.clone());
    let title = entry.title.map(|t| t.content);
    let text = entry.summary.map(|s| s.content);
    let content = entry
        .content
        .and_then(|c| c.body)
        .into_iter()
        .collect();

    if rss {
        // feed-rs copies pubDate into `updated` when the item has no update date.
        let updated = if entry.updated == entry.published {
            None
        } else {
            dates.text(entry.updated)
        };
        RawEntry {
            link,
            title,
            description: text,
            summary: None,
            content,
            pub_date: dates.text(entry.published),
            published: None,
            updated,
        }
    } else {
        RawEntry {
            link,
            title,
            description: None,
            summary: text,
            content,
            pub_date: None,
            published: dates.text(entry.published),
            updated: dates.text(entry.updated),
        }
    }
}
