use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::app::{Result, TributaryError};

pub const DEFAULT_WORKERS: usize = 8;

/// What a producer does when the queue it feeds is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backpressure {
    /// Wait for room (or for shutdown).
    #[default]
    Block,
    /// Discard the value and count it.
    Drop,
}

/// Tuning knobs for the refresh engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Scheduler tick period in milliseconds (default: 60000)
    pub poll_interval_ms: u64,

    /// Number of fetch workers (default: 8)
    pub worker_count: usize,

    /// Number of ingestion workers (default: 1)
    pub ingest_workers: usize,

    /// Upper bound on a single blocking dequeue, and so on shutdown latency,
    /// in milliseconds (default: 3000)
    pub queue_timeout_ms: u64,

    /// Upper bound on fetching and parsing one feed in seconds (default: 30)
    pub fetch_timeout_secs: u64,

    /// Capacity of the feed queue and of the item queue (default: 256)
    pub queue_capacity: usize,

    /// Policy applied when a queue is full (default: block)
    pub backpressure: Backpressure,

    /// Skip due feeds that are still being fetched (default: true)
    pub skip_in_flight: bool,

    /// Timestamp formats tried in order while normalizing entries.
    /// `rfc3339` and `rfc2822` are recognized by name, anything else is a
    /// chrono format string.
    pub accepted_timestamp_formats: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 60_000,
            worker_count: DEFAULT_WORKERS,
            ingest_workers: 1,
            queue_timeout_ms: 3000,
            fetch_timeout_secs: 30,
            queue_capacity: 256,
            backpressure: Backpressure::Block,
            skip_in_flight: true,
            accepted_timestamp_formats: vec![
                "rfc2822".to_string(),
                "rfc3339".to_string(),
                "%Y-%m-%dT%H:%M:%S%z".to_string(),
                "%Y-%m-%d %H:%M:%S".to_string(),
                "%Y-%m-%d".to_string(),
            ],
        }
    }
}

impl EngineConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn queue_timeout(&self) -> Duration {
        Duration::from_millis(self.queue_timeout_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(TributaryError::Config("poll_interval_ms must be > 0".into()));
        }
        if self.worker_count == 0 {
            return Err(TributaryError::Config("worker_count must be > 0".into()));
        }
        if self.ingest_workers == 0 {
            return Err(TributaryError::Config("ingest_workers must be > 0".into()));
        }
        if self.queue_timeout_ms == 0 {
            return Err(TributaryError::Config("queue_timeout_ms must be > 0".into()));
        }
        if self.fetch_timeout_secs == 0 {
            return Err(TributaryError::Config("fetch_timeout_secs must be > 0".into()));
        }
        if self.queue_capacity == 0 {
            return Err(TributaryError::Config("queue_capacity must be > 0".into()));
        }
        Ok(())
    }
}
