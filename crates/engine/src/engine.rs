//! The single-request enhancement pipeline and the engine's public surface.

use chrono::Utc;
use enhancer_core::config::EngineConfig;
use enhancer_core::traits::{CacheStore, HistoryStore};
use enhancer_core::{
    BatchEnhanceRequest, BatchEnhanceResponse, EnhanceRequest, EnhanceResponse, Error,
    GenerationRequest, HistoryQuery, HistoryRecord, Result, SelectionRequest,
    META_CLASSIFICATION_CACHED, META_FINGERPRINT, META_TECHNIQUES_FALLBACK,
};
use enhancer_telemetry::metrics::track_cache_lookup;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::assembler::{Assembly, ResponseAssembler};
use crate::background::BackgroundPool;
use crate::batch::BatchCoordinator;
use crate::context::RequestContext;
use crate::fingerprint::Fingerprint;
use crate::limiter::TaskLimiter;
use crate::rerun::RerunCoordinator;
use crate::side_effects::{await_history_id, Completion, SideEffects};
use crate::stages::{
    ClassificationOutcome, ClassificationStage, GenerationStage, TechniqueSelectionStage,
};

pub(crate) struct EngineInner {
    pub(crate) config: EngineConfig,
    pub(crate) cache: Arc<dyn CacheStore>,
    pub(crate) history: Arc<dyn HistoryStore>,
    pub(crate) background: Arc<BackgroundPool>,
    pub(crate) classification: ClassificationStage,
    pub(crate) selection: TechniqueSelectionStage,
    pub(crate) generation: GenerationStage,
    pub(crate) assembler: ResponseAssembler,
    pub(crate) side_effects: SideEffects,
    pub(crate) batch_limiter: TaskLimiter,
}

/// Orchestrates classifier, selector and generator for each request.
///
/// Cheap to clone; clones share collaborators and the background pool.
#[derive(Clone)]
pub struct EnhancementEngine {
    inner: Arc<EngineInner>,
}

impl EnhancementEngine {
    pub(crate) fn from_inner(inner: EngineInner) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    pub(crate) fn inner(&self) -> &EngineInner {
        &self.inner
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Pool running history saves, cache writes and metrics.
    pub fn background(&self) -> &Arc<BackgroundPool> {
        &self.inner.background
    }

    /// Enhance a single prompt.
    #[tracing::instrument(name = "enhance", skip_all, fields(trace_id = %ctx.trace_id))]
    pub async fn enhance(
        &self,
        ctx: &RequestContext,
        request: EnhanceRequest,
    ) -> Result<EnhanceResponse> {
        let started = Instant::now();
        let result = self.run_pipeline(ctx, &request, started).await;
        if let Err(e) = &result {
            tracing::warn!(error = %e, "Enhancement failed");
            self.inner.side_effects.emit_metrics(Completion {
                outcome: e.kind().code(),
                cache_hit: false,
                elapsed: started.elapsed(),
                model: None,
                tokens: 0,
            });
        }
        result
    }

    async fn run_pipeline(
        &self,
        ctx: &RequestContext,
        request: &EnhanceRequest,
        started: Instant,
    ) -> Result<EnhanceResponse> {
        let inner = &self.inner;
        request.validate(inner.config.max_text_chars)?;
        let target = request.target_complexity()?;
        let fingerprint = Fingerprint::of(request);

        let ClassificationOutcome {
            classification,
            cached,
        } = inner
            .classification
            .classify(ctx, &request.text, &fingerprint)
            .await?;
        let complexity = target.unwrap_or(classification.complexity);

        let selection_request = SelectionRequest {
            text: request.text.clone(),
            intent: classification.intent.clone(),
            complexity,
            preferred: request.preferred_techniques.iter().cloned().collect(),
            excluded: request.excluded_techniques.iter().cloned().collect(),
            user_id: ctx.caller.user_id().map(str::to_string),
        };
        let (choice, ()) = tokio::join!(
            inner.selection.select(
                ctx,
                &selection_request,
                &classification.suggested_techniques
            ),
            inner.generation.warm_up(ctx),
        );

        let response_key = fingerprint.response_key(complexity, &choice.techniques);
        if let Some(cached_response) = self.cached_response(ctx, &response_key).await {
            let response = inner.assembler.replay(cached_response, started.elapsed());
            tracing::info!(fingerprint = %fingerprint, "Replayed cached response");
            inner.side_effects.emit_metrics(Completion {
                outcome: "ok",
                cache_hit: true,
                elapsed: started.elapsed(),
                model: None,
                tokens: 0,
            });
            return Ok(response);
        }

        let generation_request = GenerationRequest::enhancement(
            request.text.clone(),
            classification.intent.clone(),
            complexity,
            choice.techniques.clone(),
            request.context.clone(),
        );
        let prompt = inner.generation.generate(ctx, &generation_request).await?;

        let mut metadata = HashMap::new();
        metadata.insert(
            META_FINGERPRINT.to_string(),
            Value::String(fingerprint.to_string()),
        );
        metadata.insert(META_CLASSIFICATION_CACHED.to_string(), Value::Bool(cached));
        metadata.insert(
            META_TECHNIQUES_FALLBACK.to_string(),
            Value::Bool(choice.fallback),
        );

        let record = HistoryRecord {
            id: String::new(),
            user_id: ctx.caller.user_id().map(str::to_string),
            session_id: ctx.caller.session_id.clone(),
            original_input: request.text.clone(),
            enhanced_output: prompt.text.clone(),
            intent: classification.intent.clone(),
            complexity,
            techniques_used: choice.techniques.clone(),
            intent_confidence: Some(classification.confidence),
            metadata: metadata.clone(),
            created_at: Utc::now(),
        };
        let history_id = inner.side_effects.persist_history(record);
        let id = await_history_id(history_id, inner.config.history_id_grace()).await;

        let model = prompt.model_version.clone();
        let tokens = prompt.tokens_used;
        let response = inner.assembler.assemble(Assembly {
            id,
            original_text: &request.text,
            classification: &classification,
            complexity,
            techniques: choice.techniques,
            prompt,
            elapsed: started.elapsed(),
            metadata,
        });

        inner.side_effects.cache_response(response_key, &response);
        inner.side_effects.emit_metrics(Completion {
            outcome: "ok",
            cache_hit: false,
            elapsed: started.elapsed(),
            model: Some(model),
            tokens,
        });
        tracing::info!(
            intent = %response.intent,
            complexity = %response.complexity,
            techniques = ?response.techniques_used,
            classification_cached = cached,
            elapsed_ms = response.processing_time_ms,
            "Enhancement complete"
        );
        Ok(response)
    }

    async fn cached_response(&self, ctx: &RequestContext, key: &str) -> Option<EnhanceResponse> {
        match ctx.call("response cache", self.inner.cache.get(key)).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(response) => {
                    track_cache_lookup("response", "hit");
                    Some(response)
                }
                Err(e) => {
                    track_cache_lookup("response", "error");
                    tracing::warn!(key, error = %e, "Discarding undecodable cached response");
                    None
                }
            },
            Ok(None) => {
                track_cache_lookup("response", "miss");
                None
            }
            Err(e) => {
                track_cache_lookup("response", "error");
                tracing::warn!(error = %e, "Response cache read failed, treating as miss");
                None
            }
        }
    }

    /// Enhance up to `batch_max_items` prompts concurrently.
    pub async fn enhance_batch(
        &self,
        ctx: &RequestContext,
        request: BatchEnhanceRequest,
    ) -> Result<BatchEnhanceResponse> {
        BatchCoordinator::new(
            self.clone(),
            self.inner.batch_limiter.clone(),
            self.inner.config.batch_max_items,
        )
        .process(ctx, request.prompts)
        .await
    }

    /// Re-execute a stored enhancement.
    pub async fn rerun(&self, ctx: &RequestContext, history_id: &str) -> Result<EnhanceResponse> {
        RerunCoordinator::new(self.clone()).rerun(ctx, history_id).await
    }

    /// Fetch a history record the caller owns.
    pub async fn get_prompt(&self, ctx: &RequestContext, id: &str) -> Result<HistoryRecord> {
        let record = ctx
            .call("history lookup", self.inner.history.get_by_id(id))
            .await?
            .ok_or_else(|| Error::not_found(format!("prompt {} not found", id)))?;
        if !record.is_owned_by(&ctx.caller) {
            return Err(Error::access_denied(format!(
                "prompt {} belongs to another caller",
                id
            )));
        }
        Ok(record)
    }

    /// The caller's history, newest first.
    pub async fn history(
        &self,
        ctx: &RequestContext,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Result<Vec<HistoryRecord>> {
        let query = HistoryQuery::for_caller(&ctx.caller).page(limit, offset);
        if !query.is_scoped() {
            return Ok(Vec::new());
        }
        ctx.call("history listing", self.inner.history.list(&query))
            .await
    }

    /// Wait up to `timeout` for queued side effects to finish.
    pub async fn drain(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.inner.background.idle())
            .await
            .is_ok()
    }
}
