//! Concurrent, order-preserving batch enhancement.

use enhancer_core::{BatchEnhanceResponse, EnhanceRequest, EnhanceResponse, Error, Result};
use enhancer_telemetry::metrics::track_batch_item;
use futures::future::join_all;
use tokio::task::AbortHandle;

use crate::context::RequestContext;
use crate::engine::EnhancementEngine;
use crate::limiter::TaskLimiter;

/// Fans a batch out over the single-request pipeline.
///
/// Items run under a concurrency cap and fail independently. Results stay
/// aligned with the input: slot `i` holds item `i`'s response, or nothing
/// if it failed, in which case `errors` names it by its 1-based position.
pub struct BatchCoordinator {
    engine: EnhancementEngine,
    limiter: TaskLimiter,
    max_items: usize,
}

/// Aborts unfinished item tasks when the batch future is dropped.
struct AbortOnDrop(Vec<AbortHandle>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        for handle in &self.0 {
            handle.abort();
        }
    }
}

impl BatchCoordinator {
    pub fn new(engine: EnhancementEngine, limiter: TaskLimiter, max_items: usize) -> Self {
        Self {
            engine,
            limiter,
            max_items,
        }
    }

    /// Reject empty and oversized batches before any work starts.
    pub fn validate(&self, items: &[EnhanceRequest]) -> Result<()> {
        if items.is_empty() {
            return Err(Error::invalid_request("batch must contain at least one prompt"));
        }
        if items.len() > self.max_items {
            return Err(Error::invalid_request(format!(
                "batch may contain at most {} prompts, got {}",
                self.max_items,
                items.len()
            )));
        }
        Ok(())
    }

    pub async fn process(
        &self,
        ctx: &RequestContext,
        items: Vec<EnhanceRequest>,
    ) -> Result<BatchEnhanceResponse> {
        self.validate(&items)?;
        let total = items.len();
        tracing::info!(trace_id = %ctx.trace_id, total, limit = self.limiter.limit(), "Processing batch");

        let handles: Vec<_> = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                let engine = self.engine.clone();
                let item_ctx = ctx.for_item(index);
                self.limiter
                    .spawn(async move { engine.enhance(&item_ctx, item).await })
            })
            .collect();
        let _abort = AbortOnDrop(handles.iter().map(|h| h.abort_handle()).collect());

        let mut results: Vec<Option<EnhanceResponse>> = Vec::with_capacity(total);
        let mut errors = Vec::new();
        for (index, joined) in join_all(handles).await.into_iter().enumerate() {
            let outcome = match joined {
                Ok(outcome) => outcome,
                Err(e) => Err(Error::internal(format!("batch item task failed: {}", e))),
            };
            match outcome {
                Ok(response) => {
                    track_batch_item(true);
                    results.push(Some(response));
                }
                Err(e) => {
                    track_batch_item(false);
                    tracing::warn!(trace_id = %ctx.trace_id, item = index + 1, error = %e, "Batch item failed");
                    errors.push(format!("Prompt {}: {}", index + 1, e.public_message()));
                    results.push(None);
                }
            }
        }

        Ok(BatchEnhanceResponse { results, errors })
    }
}
