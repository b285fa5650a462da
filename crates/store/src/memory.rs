//! In-memory cache and history store implementations using DashMap.

use async_trait::async_trait;
use dashmap::DashMap;
use std::time::{Duration, Instant};
use uuid::Uuid;

use enhancer_core::{
    traits::{CacheStore, HistoryStore},
    types::{HistoryQuery, HistoryRecord},
    Result,
};

/// Cache entry with expiration.
#[derive(Debug, Clone)]
struct CacheEntry {
    /// Cached value.
    value: String,
    /// When the entry was written.
    created_at: Instant,
    /// Time-to-live.
    ttl: Duration,
    /// Hit count for analytics.
    hit_count: u64,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        self.created_at.elapsed() > self.ttl
    }
}

/// In-memory TTL cache.
///
/// Used when no Redis instance is configured. Expired entries are treated as
/// misses on read and removed lazily or by [`InMemoryCache::cleanup`].
#[derive(Default)]
pub struct InMemoryCache {
    entries: DashMap<String, CacheEntry>,
}

impl InMemoryCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            total_entries: self.entries.len(),
            total_hits: self.entries.iter().map(|r| r.hit_count).sum(),
        }
    }

    /// Clear expired entries.
    pub fn cleanup(&self) {
        self.entries.retain(|_, entry| !entry.is_expired());
    }
}

/// Cache statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    /// Total number of entries, including expired ones not yet cleaned up.
    pub total_entries: usize,
    /// Total number of cache hits.
    pub total_hits: u64,
}

#[async_trait]
impl CacheStore for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let expired = match self.entries.get_mut(key) {
            Some(mut entry) if !entry.is_expired() => {
                entry.hit_count += 1;
                tracing::debug!(key = key, "Cache hit");
                return Ok(Some(entry.value.clone()));
            }
            Some(_) => true,
            None => false,
        };
        // The shard guard is released above; removing while holding it deadlocks.
        if expired {
            self.entries.remove(key);
        }
        tracing::debug!(key = key, "Cache miss");
        Ok(None)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                value: value.to_string(),
                created_at: Instant::now(),
                ttl,
                hit_count: 0,
            },
        );
        tracing::debug!(key = key, value_len = value.len(), ttl_secs = ttl.as_secs(), "Cached value");
        Ok(())
    }
}

/// In-memory history store.
#[derive(Default)]
pub struct InMemoryHistoryStore {
    records: DashMap<String, HistoryRecord>,
}

impl InMemoryHistoryStore {
    /// Create a new in-memory history store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of stored records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if store is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn save(&self, record: &HistoryRecord) -> Result<String> {
        let mut stored = record.clone();
        if stored.id.is_empty() {
            stored.id = Uuid::new_v4().to_string();
        }
        let id = stored.id.clone();
        self.records.insert(id.clone(), stored);
        tracing::debug!(history_id = %id, "History record saved");
        Ok(id)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<HistoryRecord>> {
        Ok(self.records.get(id).map(|r| r.clone()))
    }

    async fn list(&self, query: &HistoryQuery) -> Result<Vec<HistoryRecord>> {
        if !query.is_scoped() {
            return Ok(Vec::new());
        }
        let mut matched: Vec<HistoryRecord> = self
            .records
            .iter()
            .filter(|r| query.matches(r.value()))
            .map(|r| r.value().clone())
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matched
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .collect())
    }
}
