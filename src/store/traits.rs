//! Durable session storage trait and record types.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::session::transcript::Turn;

/// Failure modes of the durable store boundary.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("session serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("corrupt session record for key '{key}': {reason}")]
    Corrupt { key: String, reason: String },
}

/// The at-rest form of one session: identity, creation time, and the full
/// transcript as an ordered list of role/content records.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionRecord {
    pub session_key: String,
    pub created_at: DateTime<Utc>,
    pub turns: Vec<Turn>,
}

/// Per-key durable storage with get/put semantics.
///
/// A `put` replaces the whole record for its key; partial writes are never
/// observable through this interface. Callers address only their own key,
/// and per-key write ordering is guaranteed upstream by the session actor's
/// single-writer discipline, so implementations need no cross-key locking.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Fetch the record stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<SessionRecord>, StoreError>;

    /// Durably replace the record stored under `key`.
    async fn put(&self, key: &str, record: &SessionRecord) -> Result<(), StoreError>;

    /// Whether the backend is currently reachable and writable.
    async fn health_check(&self) -> bool;

    /// The name of this store implementation.
    fn name(&self) -> &str;
}
