use enhancer_core::{CacheStore, Classifier, Error, IntentClassification, Result};
use enhancer_telemetry::metrics::{track_cache_lookup, track_stage_failure};
use std::sync::Arc;
use std::time::Duration;

use crate::background::BackgroundPool;
use crate::context::RequestContext;
use crate::fingerprint::Fingerprint;

/// Classification plus where it came from.
#[derive(Debug, Clone)]
pub struct ClassificationOutcome {
    pub classification: IntentClassification,
    pub cached: bool,
}

/// Cache-aside wrapper around the classifier.
///
/// Cache failures of any kind read as a miss. A classifier failure fails
/// the request: nothing downstream can run without intent and complexity.
pub struct ClassificationStage {
    classifier: Arc<dyn Classifier>,
    cache: Arc<dyn CacheStore>,
    background: Arc<BackgroundPool>,
    ttl: Duration,
}

impl ClassificationStage {
    pub fn new(
        classifier: Arc<dyn Classifier>,
        cache: Arc<dyn CacheStore>,
        background: Arc<BackgroundPool>,
        ttl: Duration,
    ) -> Self {
        Self {
            classifier,
            cache,
            background,
            ttl,
        }
    }

    pub async fn classify(
        &self,
        ctx: &RequestContext,
        text: &str,
        fingerprint: &Fingerprint,
    ) -> Result<ClassificationOutcome> {
        let key = fingerprint.classification_key();
        if let Some(classification) = self.lookup(ctx, &key).await {
            return Ok(ClassificationOutcome {
                classification,
                cached: true,
            });
        }

        let classification = self.classify_uncached(ctx, text).await?;
        self.store(key, &classification);
        Ok(ClassificationOutcome {
            classification,
            cached: false,
        })
    }

    /// Call the classifier directly, bypassing the cache.
    pub async fn classify_uncached(
        &self,
        ctx: &RequestContext,
        text: &str,
    ) -> Result<IntentClassification> {
        ctx.call("classifier", self.classifier.classify(text))
            .await
            .map_err(|e| {
                track_stage_failure("classification");
                tracing::warn!(trace_id = %ctx.trace_id, error = %e, "Classification failed");
                match e {
                    Error::Timeout(_) => e,
                    other => Error::classification(other.to_string()),
                }
            })
    }

    async fn lookup(&self, ctx: &RequestContext, key: &str) -> Option<IntentClassification> {
        match ctx.call("classification cache", self.cache.get(key)).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(classification) => {
                    track_cache_lookup("classification", "hit");
                    tracing::debug!(trace_id = %ctx.trace_id, key, "Classification cache hit");
                    Some(classification)
                }
                Err(e) => {
                    track_cache_lookup("classification", "error");
                    tracing::warn!(key, error = %e, "Discarding undecodable cached classification");
                    None
                }
            },
            Ok(None) => {
                track_cache_lookup("classification", "miss");
                None
            }
            Err(e) => {
                track_cache_lookup("classification", "error");
                tracing::warn!(trace_id = %ctx.trace_id, error = %e, "Classification cache read failed, treating as miss");
                None
            }
        }
    }

    fn store(&self, key: String, classification: &IntentClassification) {
        let encoded = match serde_json::to_string(classification) {
            Ok(encoded) => encoded,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to encode classification for cache");
                return;
            }
        };
        let cache = self.cache.clone();
        let ttl = self.ttl;
        self.background.submit("classification_cache_write", async move {
            cache.set(&key, &encoded, ttl).await
        });
    }
}
