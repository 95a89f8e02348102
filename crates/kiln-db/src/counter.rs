//! In-memory surrogate key counters.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// The next free value of one (table, column) pair. Unseeded until the
/// first request reads the current maximum.
#[derive(Debug, Default)]
struct KeyCounter {
    next: Option<i64>,
}

impl KeyCounter {
    /// Hand out `current` and remember its successor.
    fn advance(&mut self, current: i64) -> i64 {
        self.next = Some(current + 1);
        current
    }
}

/// `MAX(key)+1` counters for dialects with neither sequences nor
/// autoincrement, shared by every session of a run.
///
/// Each (table, column) pair has its own lock; the map lock is only held to
/// find or create an entry.
#[derive(Debug, Default)]
pub struct KeyCounters {
    counters: Mutex<HashMap<(String, String), Arc<Mutex<KeyCounter>>>>,
}

impl KeyCounters {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(table: &str, column: &str) -> (String, String) {
        (table.to_string(), column.to_string())
    }

    /// Next value for `table.column`. On first use `seed` is called to find
    /// the current maximum, while holding only this pair's lock. A failed
    /// seed leaves the counter unseeded.
    pub fn next_value<E>(
        &self,
        table: &str,
        column: &str,
        seed: impl FnOnce() -> Result<i64, E>,
    ) -> Result<i64, E> {
        let counter = {
            let mut counters = self.counters.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(counters.entry(Self::key(table, column)).or_default())
        };

        let mut counter = counter.lock().unwrap_or_else(PoisonError::into_inner);
        let current = match counter.next {
            Some(next) => next,
            None => seed()? + 1,
        };
        Ok(counter.advance(current))
    }

    /// Forget the counter of `table.column`; the next request re-seeds it.
    pub fn reset(&self, table: &str, column: &str) {
        self.counters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&Self::key(table, column));
    }
}
