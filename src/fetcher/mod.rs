pub mod http_fetcher;
pub mod parser;

use async_trait::async_trait;

use crate::app::Result;
use crate::domain::RawEntry;

pub use http_fetcher::HttpFeedSource;

/// Downloads and parses one feed.
///
/// An `Err` means the feed could not be fetched or parsed at all. A document
/// without entries is `Ok(vec![])`.
#[async_trait]
pub trait FeedSource {
    async fn fetch_and_parse(&self, url: &str) -> Result<Vec<RawEntry>>;
}
