use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TributaryError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Fetching {url} timed out after {after:?}")]
    FetchTimeout { url: String, after: Duration },

    #[error("Feed parsing error: {0}")]
    FeedParse(String),

    #[error("Malformed entry: {0}")]
    MalformedEntry(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Feed not found: {0}")]
    FeedNotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Engine is {0}")]
    InvalidState(String),

    #[error("Engine did not shut down within {0:?}")]
    ShutdownTimeout(Duration),

    #[error("{0}")]
    Other(String),
}

impl TributaryError {
    /// Failures that leave a feed untouched so the next poll tick retries it:
    /// network trouble, timeouts and documents that cannot be parsed at all.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::FetchTimeout { .. } | Self::FeedParse(_)
        )
    }

    pub fn is_store_failure(&self) -> bool {
        matches!(self, Self::Database(_) | Self::StoreUnavailable(_))
    }
}

pub type Result<T> = std::result::Result<T, TributaryError>;
