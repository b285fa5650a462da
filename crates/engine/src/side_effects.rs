//! Fire-and-forget work triggered by a finished enhancement.

use enhancer_core::{CacheStore, EnhanceResponse, HistoryRecord, HistoryStore};
use enhancer_telemetry::metrics::{track_enhancement, track_tokens};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

use crate::background::BackgroundPool;

/// Persistence, response caching and metrics, all on the background pool.
///
/// None of these can fail a request. Each task owns its inputs and runs
/// under the pool's own timeout, independent of the request deadline.
#[derive(Clone)]
pub struct SideEffects {
    history: Arc<dyn HistoryStore>,
    cache: Arc<dyn CacheStore>,
    pool: Arc<BackgroundPool>,
    response_ttl: Duration,
}

/// Metrics for one finished enhancement.
#[derive(Debug, Clone)]
pub struct Completion {
    pub outcome: &'static str,
    pub cache_hit: bool,
    pub elapsed: Duration,
    pub model: Option<String>,
    pub tokens: u64,
}

impl SideEffects {
    pub fn new(
        history: Arc<dyn HistoryStore>,
        cache: Arc<dyn CacheStore>,
        pool: Arc<BackgroundPool>,
        response_ttl: Duration,
    ) -> Self {
        Self {
            history,
            cache,
            pool,
            response_ttl,
        }
    }

    pub fn pool(&self) -> &Arc<BackgroundPool> {
        &self.pool
    }

    /// Queue the history save. The receiver yields the record id if the
    /// save succeeds; it errors if the save fails or the task is dropped.
    pub fn persist_history(&self, record: HistoryRecord) -> oneshot::Receiver<String> {
        let (tx, rx) = oneshot::channel();
        let history = self.history.clone();
        self.pool.submit("history_save", async move {
            let id = history.save(&record).await?;
            let _ = tx.send(id);
            Ok(())
        });
        rx
    }

    /// Queue a cache write of the full response.
    pub fn cache_response(&self, key: String, response: &EnhanceResponse) {
        let mut stored = response.clone();
        stored.id.clear();
        let encoded = match serde_json::to_string(&stored) {
            Ok(encoded) => encoded,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to encode response for cache");
                return;
            }
        };
        let cache = self.cache.clone();
        let ttl = self.response_ttl;
        self.pool.submit("response_cache_write", async move {
            cache.set(&key, &encoded, ttl).await
        });
    }

    /// Queue metric emission.
    pub fn emit_metrics(&self, completion: Completion) {
        self.pool.submit("metrics", async move {
            track_enhancement(
                completion.outcome,
                completion.cache_hit,
                completion.elapsed.as_secs_f64(),
            );
            if let Some(model) = completion.model.as_deref() {
                track_tokens(model, completion.tokens);
            }
            Ok(())
        });
    }
}

/// Wait at most `grace` for a history id; empty when none arrived.
pub async fn await_history_id(mut rx: oneshot::Receiver<String>, grace: Duration) -> String {
    if grace.is_zero() {
        return rx.try_recv().unwrap_or_default();
    }
    match tokio::time::timeout(grace, rx).await {
        Ok(Ok(id)) => id,
        _ => String::new(),
    }
}
