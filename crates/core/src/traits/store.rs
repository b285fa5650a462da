//! Shared store traits.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;
use crate::types::{HistoryQuery, HistoryRecord};

/// Key-value cache with per-entry TTL.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetch a value; `None` on miss or expiry.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store a value with a time-to-live.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;
}

/// Persistent enhancement history.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Persist a record and return its id. Stores assign an id when the
    /// record carries none.
    async fn save(&self, record: &HistoryRecord) -> Result<String>;

    /// Load a record by id.
    async fn get_by_id(&self, id: &str) -> Result<Option<HistoryRecord>>;

    /// List records matching a query, newest first.
    async fn list(&self, query: &HistoryQuery) -> Result<Vec<HistoryRecord>>;
}
