use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::app::Result;
use crate::domain::{CandidateItem, Item};
use crate::engine::lifecycle::RunSignal;
use crate::engine::queue::{Popped, WorkQueue};
use crate::engine::stats::EngineStats;
use crate::store::{InsertOutcome, ItemStore};

/// Drains the item queue into the item store, dropping known URLs.
pub struct IngestWorker {
    pub(crate) id: usize,
    pub(crate) items: Arc<dyn ItemStore + Send + Sync>,
    pub(crate) item_queue: WorkQueue<CandidateItem>,
    pub(crate) stats: Arc<EngineStats>,
    pub(crate) signal: RunSignal,
    pub(crate) queue_timeout: Duration,
}

impl IngestWorker {
    pub async fn run(self) {
        debug!(worker = self.id, "Ingest worker started");

        while self.signal.is_running() {
            let candidate = match self.item_queue.pop(self.queue_timeout, &self.signal).await {
                Popped::Item(candidate) => candidate,
                Popped::TimedOut => continue,
                Popped::Stopped => break,
            };

            match self.ingest(&candidate) {
                Ok(Some(item)) => {
                    self.stats.item_ingested();
                    debug!(item_id = item.id, feed_id = item.feed_id, url = %item.url, "Stored new item");
                }
                Ok(None) => {
                    self.stats.item_duplicate();
                }
                Err(e) if e.is_store_failure() => {
                    self.stats.store_error();
                    error!(url = %candidate.url, error = %e, "Failed to store item");
                }
                Err(e) => {
                    warn!(url = %candidate.url, error = %e, "Item rejected");
                }
            }
        }

        debug!(worker = self.id, "Ingest worker stopped");
    }

    /// `Ok(None)` means the URL is already known.
    pub fn ingest(&self, candidate: &CandidateItem) -> Result<Option<Item>> {
        if self.items.exists_by_url(&candidate.url)? {
            return Ok(None);
        }

        match self.items.insert(candidate)? {
            InsertOutcome::Inserted(item) => Ok(Some(item)),
            // Another ingest worker got there between the check and the insert.
            InsertOutcome::Duplicate => Ok(None),
        }
    }
}
