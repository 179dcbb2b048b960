use std::{
    collections::HashSet,
    sync::{Arc, Mutex, MutexGuard},
};

use crate::models::Payload;

/// Remembers every payload that has already produced a scan event.
///
/// Clones share the same set. Entries are never evicted; the set lives as long
/// as the last clone.
#[derive(Clone, Default)]
pub struct DeduplicationRegistry {
    seen: Arc<Mutex<HashSet<Payload>>>,
}

impl DeduplicationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` exactly once per payload: the first call wins, every later
    /// call (from any thread) gets `false`. Check and insert happen under one lock.
    pub fn observe(&self, payload: &Payload) -> bool {
        let mut seen = self.lock();
        if seen.contains(payload) {
            return false;
        }
        seen.insert(payload.clone())
    }

    pub fn contains(&self, payload: &Payload) -> bool {
        self.lock().contains(payload)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<Payload>> {
        // A panic while holding the lock cannot leave the set half-updated.
        match self.seen.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
