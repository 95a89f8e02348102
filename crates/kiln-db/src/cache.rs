//! Result-shape cache shared by sessions.

use kiln_value::Row;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Maps (connection name, SQL text) to the row layout the SQL returns.
///
/// Entries are added lazily and never evicted here. The owner of the cache
/// decides when to clear it.
#[derive(Debug, Default)]
pub struct MetadataCache {
    entries: Mutex<HashMap<(String, String), Row>>,
}

impl MetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(connection: &str, sql: &str) -> (String, String) {
        (connection.to_string(), sql.trim().to_string())
    }

    pub fn lookup(&self, connection: &str, sql: &str) -> Option<Row> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(&Self::key(connection, sql)).cloned()
    }

    pub fn store(&self, connection: &str, sql: &str, row: Row) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(Self::key(connection, sql), row);
    }

    /// Drop every entry of one connection, e.g. after its tables were altered.
    pub fn clear_connection(&self, connection: &str) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.retain(|(name, _), _| name != connection);
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
