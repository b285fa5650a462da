//! Redis implementations of CacheStore and HistoryStore.

use async_trait::async_trait;
use redis::{aio::MultiplexedConnection, AsyncCommands, Client};
use std::time::Duration;
use uuid::Uuid;

use enhancer_core::{
    traits::{CacheStore, HistoryStore},
    types::{HistoryQuery, HistoryRecord},
    Error, Result,
};

async fn connect(client: &Client) -> Result<MultiplexedConnection> {
    client
        .get_multiplexed_async_connection()
        .await
        .map_err(|e| Error::storage(format!("Redis connection error: {}", e)))
}

/// Redis-backed cache.
pub struct RedisCache {
    client: Client,
    prefix: String,
}

impl RedisCache {
    /// Create a new Redis cache.
    pub fn new(url: &str, prefix: &str) -> Result<Self> {
        let client = Client::open(url)
            .map_err(|e| Error::cache(format!("Failed to connect to Redis: {}", e)))?;

        Ok(Self {
            client,
            prefix: prefix.to_string(),
        })
    }

    fn key(&self, key: &str) -> String {
        format!("{}:cache:{}", self.prefix, key)
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = connect(&self.client).await?;
        conn.get(self.key(key))
            .await
            .map_err(|e| Error::cache(format!("Redis get error: {}", e)))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut conn = connect(&self.client).await?;
        // SETEX rejects a zero expiry.
        let seconds = ttl.as_secs().max(1);
        let _: () = conn
            .set_ex(self.key(key), value, seconds)
            .await
            .map_err(|e| Error::cache(format!("Redis set error: {}", e)))?;
        Ok(())
    }
}

/// Redis persistence for history records.
///
/// Records are stored as JSON under `{prefix}:history:{id}`. Each owner
/// (user, or session for anonymous callers) has a sorted-set index scored by
/// creation time, which backs newest-first listing.
pub struct RedisHistoryStore {
    client: Client,
    prefix: String,
}

impl RedisHistoryStore {
    /// Create a new Redis history store.
    pub fn new(url: &str, prefix: &str) -> Result<Self> {
        let client = Client::open(url)
            .map_err(|e| Error::storage(format!("Failed to connect to Redis: {}", e)))?;

        Ok(Self {
            client,
            prefix: prefix.to_string(),
        })
    }

    fn record_key(&self, id: &str) -> String {
        format!("{}:history:{}", self.prefix, id)
    }

    fn user_index(&self, user_id: &str) -> String {
        format!("{}:history:user:{}", self.prefix, user_id)
    }

    fn session_index(&self, session_id: &str) -> String {
        format!("{}:history:session:{}", self.prefix, session_id)
    }

    fn index_for(&self, user_id: Option<&str>, session_id: Option<&str>) -> Option<String> {
        match (user_id, session_id) {
            (Some(user), _) => Some(self.user_index(user)),
            (None, Some(session)) => Some(self.session_index(session)),
            (None, None) => None,
        }
    }
}

#[async_trait]
impl HistoryStore for RedisHistoryStore {
    async fn save(&self, record: &HistoryRecord) -> Result<String> {
        let mut stored = record.clone();
        if stored.id.is_empty() {
            stored.id = Uuid::new_v4().to_string();
        }
        let json = serde_json::to_string(&stored)
            .map_err(|e| Error::storage(format!("Failed to serialize record: {}", e)))?;

        let mut pipe = redis::pipe();
        pipe.atomic().set(self.record_key(&stored.id), json).ignore();
        if let Some(index) =
            self.index_for(stored.user_id.as_deref(), stored.session_id.as_deref())
        {
            pipe.zadd(index, &stored.id, stored.created_at.timestamp_millis())
                .ignore();
        }

        let mut conn = connect(&self.client).await?;
        let _: () = pipe
            .query_async(&mut conn)
            .await
            .map_err(|e| Error::storage(format!("Redis save error: {}", e)))?;

        Ok(stored.id)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<HistoryRecord>> {
        let mut conn = connect(&self.client).await?;
        let data: Option<String> = conn
            .get(self.record_key(id))
            .await
            .map_err(|e| Error::storage(format!("Redis get error: {}", e)))?;

        match data {
            Some(json) => {
                let record = serde_json::from_str(&json)
                    .map_err(|e| Error::storage(format!("Failed to deserialize record: {}", e)))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    async fn list(&self, query: &HistoryQuery) -> Result<Vec<HistoryRecord>> {
        let index = match self.index_for(query.user_id.as_deref(), query.session_id.as_deref()) {
            Some(index) => index,
            None => return Ok(Vec::new()),
        };

        let mut conn = connect(&self.client).await?;
        let start = query.offset as isize;
        let stop = (query.offset + query.limit) as isize - 1;
        let ids: Vec<String> = conn
            .zrevrange(index, start, stop)
            .await
            .map_err(|e| Error::storage(format!("Redis index error: {}", e)))?;

        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(record) = self.get_by_id(&id).await? {
                // Index entries may outlive an edited record.
                if query.matches(&record) {
                    records.push(record);
                }
            }
        }
        Ok(records)
    }
}
