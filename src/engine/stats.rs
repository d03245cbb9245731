use std::sync::atomic::{AtomicU64, Ordering};

/// Running totals since the engine was created.
#[derive(Debug, Default)]
pub struct EngineStats {
    ticks: AtomicU64,
    feeds_dispatched: AtomicU64,
    feeds_skipped_in_flight: AtomicU64,
    feeds_dropped: AtomicU64,
    fetches_succeeded: AtomicU64,
    fetches_failed: AtomicU64,
    entries_malformed: AtomicU64,
    items_queued: AtomicU64,
    items_dropped: AtomicU64,
    items_ingested: AtomicU64,
    items_duplicate: AtomicU64,
    store_errors: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub ticks: u64,
    pub feeds_dispatched: u64,
    pub feeds_skipped_in_flight: u64,
    pub feeds_dropped: u64,
    pub fetches_succeeded: u64,
    pub fetches_failed: u64,
    pub entries_malformed: u64,
    pub items_queued: u64,
    pub items_dropped: u64,
    pub items_ingested: u64,
    pub items_duplicate: u64,
    pub store_errors: u64,
}

macro_rules! counters {
    ($($name:ident => $field:ident),* $(,)?) => {
        impl EngineStats {
            $(
                pub(crate) fn $name(&self) {
                    self.$field.fetch_add(1, Ordering::Relaxed);
                }
            )*

            pub fn snapshot(&self) -> StatsSnapshot {
                StatsSnapshot {
                    $($field: self.$field.load(Ordering::Relaxed),)*
                }
            }
        }
    };
}

counters! {
    tick => ticks,
    feed_dispatched => feeds_dispatched,
    feed_skipped_in_flight => feeds_skipped_in_flight,
    feed_dropped => feeds_dropped,
    fetch_succeeded => fetches_succeeded,
    fetch_failed => fetches_failed,
    entry_malformed => entries_malformed,
    item_queued => items_queued,
    item_dropped => items_dropped,
    item_ingested => items_ingested,
    item_duplicate => items_duplicate,
    store_error => store_errors,
}
