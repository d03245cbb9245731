use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A normalized entry on its way to the item store. Never persisted as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateItem {
    pub feed_id: i64,
    pub url: String,
    pub headline: String,
    pub body: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: i64,
    pub feed_id: i64,
    pub url: String,
    pub headline: String,
    pub body: String,
    pub timestamp: DateTime<Utc>,
    pub ingested_at: DateTime<Utc>,
}

impl Item {
    pub fn from_candidate(id: i64, candidate: &CandidateItem, ingested_at: DateTime<Utc>) -> Self {
        Self {
            id,
            feed_id: candidate.feed_id,
            url: candidate.url.clone(),
            headline: candidate.headline.clone(),
            body: candidate.body.clone(),
            timestamp: candidate.timestamp,
            ingested_at,
        }
    }

    pub fn display_headline(&self) -> &str {
        if self.headline.is_empty() {
            "(Untitled)"
        } else {
            &self.headline
        }
    }
}
