use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

/// Per-table "standards applied" flags with a fixed time to live.
///
/// Entries are only dropped on expiry or explicit invalidation.
pub struct StandardsCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, (bool, Instant)>>,
}

impl StandardsCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached flag for `table`, if present and not expired
    pub fn get(&self, table: &str) -> Option<bool> {
        let entries = self.entries.read();
        entries
            .get(table)
            .filter(|(_, stored)| stored.elapsed() < self.ttl)
            .map(|(value, _)| *value)
    }

    pub fn insert(&self, table: &str, value: bool) {
        if self.ttl.is_zero() {
            return;
        }
        self.entries
            .write()
            .insert(table.to_string(), (value, Instant::now()));
    }

    pub fn invalidate(&self, table: &str) {
        if self.entries.write().remove(table).is_some() {
            tracing::trace!(table = %table, "standards cache entry invalidated");
        }
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
