//! In-memory session store implementation.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;

use super::traits::{SessionRecord, SessionStore, StoreError};

/// A session store backed by a mutex-protected hash map.
///
/// State does not survive the process; used for tests and ephemeral runs.
pub struct InMemorySessionStore {
    records: Mutex<HashMap<String, SessionRecord>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, key: &str) -> Result<Option<SessionRecord>, StoreError> {
        let records = self.records.lock();
        Ok(records.get(key).cloned())
    }

    async fn put(&self, key: &str, record: &SessionRecord) -> Result<(), StoreError> {
        let mut records = self.records.lock();
        records.insert(key.to_string(), record.clone());
        Ok(())
    }

    async fn health_check(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "memory"
    }
}
