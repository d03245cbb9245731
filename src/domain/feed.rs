use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_FEED_INTERVAL: Duration = Duration::from_secs(1800);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feed {
    pub id: i64,
    pub url: String,
    pub name: String,
    pub homepage: Option<String>,
    pub description: Option<String>,
    pub interval: Duration,
    pub last_update: Option<DateTime<Utc>>,
    pub active: bool,
}

impl Feed {
    pub fn new(url: String, name: String) -> Self {
        Self {
            id: 0,
            url,
            name,
            homepage: None,
            description: None,
            interval: DEFAULT_FEED_INTERVAL,
            last_update: None,
            active: true,
        }
    }

    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.url
        } else {
            &self.name
        }
    }

    /// When the feed becomes due again, or `None` if it was never fetched.
    pub fn next_due(&self) -> Option<DateTime<Utc>> {
        let interval = TimeDelta::from_std(self.interval).unwrap_or(TimeDelta::MAX);
        self.last_update
            .map(|last| last.checked_add_signed(interval).unwrap_or(DateTime::<Utc>::MAX_UTC))
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        if !self.active {
            return false;
        }
        match self.next_due() {
            None => true,
            Some(due) => due <= now,
        }
    }
}
