use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::app::Result;
use crate::domain::RawEntry;
use crate::fetcher::{parser, FeedSource};

pub struct HttpFeedSource {
    client: Client,
}

impl HttpFeedSource {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .gzip(true)
            .brotli(true)
            .user_agent(user_agent)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch_and_parse(&self, url: &str) -> Result<Vec<RawEntry>> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        let body = response.bytes().await?;

        tracing::trace!(url, bytes = body.len(), "Downloaded feed");

        parser::parse_entries(&body)
    }
}
