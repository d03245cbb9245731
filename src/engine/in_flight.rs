use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

/// Ids of feeds currently queued or being fetched.
#[derive(Debug, Clone, Default)]
pub struct InFlight {
    ids: Arc<Mutex<HashSet<i64>>>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    fn ids(&self) -> MutexGuard<'_, HashSet<i64>> {
        // The set stays consistent even if a holder panicked mid-insert.
        self.ids.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns false if the id was already present.
    pub fn insert(&self, id: i64) -> bool {
        self.ids().insert(id)
    }

    pub fn remove(&self, id: i64) {
        self.ids().remove(&id);
    }

    pub fn contains(&self, id: i64) -> bool {
        self.ids().contains(&id)
    }

    pub fn len(&self) -> usize {
        self.ids().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids().is_empty()
    }

    /// Releases `id` when dropped, however the fetch ends.
    pub fn release_on_drop(&self, id: i64) -> InFlightGuard {
        InFlightGuard {
            set: self.clone(),
            id,
        }
    }
}

pub struct InFlightGuard {
    set: InFlight,
    id: i64,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.set.remove(self.id);
    }
}
