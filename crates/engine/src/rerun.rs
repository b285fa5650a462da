//! Re-execution of stored enhancements.

use chrono::Utc;
use enhancer_core::{
    EnhanceRequest, EnhanceResponse, GenerationRequest, HistoryRecord, Result, SelectionRequest,
    META_CLASSIFICATION_CACHED, META_RERUN_FROM, META_TECHNIQUES_FALLBACK,
};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

use crate::assembler::Assembly;
use crate::context::RequestContext;
use crate::engine::EnhancementEngine;
use crate::fingerprint::Fingerprint;
use crate::side_effects::Completion;

/// Metadata key: the stored classification was reused.
pub const META_CLASSIFICATION_REUSED: &str = "classification_reused";

/// Regenerates a history record's prompt for its owner.
///
/// A complete stored classification is reused instead of calling the
/// classifier again. The techniques used last time become the preferred
/// set and the fallback. The new record is saved before responding so the
/// response can report its id and where it came from.
pub struct RerunCoordinator {
    engine: EnhancementEngine,
}

impl RerunCoordinator {
    pub fn new(engine: EnhancementEngine) -> Self {
        Self { engine }
    }

    #[tracing::instrument(name = "rerun", skip_all, fields(trace_id = %ctx.trace_id, history_id = %history_id))]
    pub async fn rerun(&self, ctx: &RequestContext, history_id: &str) -> Result<EnhanceResponse> {
        let started = Instant::now();
        let inner = self.engine.inner();

        let original = self.engine.get_prompt(ctx, history_id).await?;

        let (classification, reused) = match original.stored_classification() {
            Some(stored) => (stored, true),
            None => {
                let fingerprint =
                    Fingerprint::of(&EnhanceRequest::text(original.original_input.clone()));
                let outcome = inner
                    .classification
                    .classify(ctx, &original.original_input, &fingerprint)
                    .await?;
                (outcome.classification, false)
            }
        };
        let complexity = classification.complexity;

        let fallback = if original.techniques_used.is_empty() {
            classification.suggested_techniques.clone()
        } else {
            original.techniques_used.clone()
        };
        let selection_request = SelectionRequest {
            text: original.original_input.clone(),
            intent: classification.intent.clone(),
            complexity,
            preferred: original.techniques_used.clone(),
            excluded: Vec::new(),
            user_id: ctx.caller.user_id().map(str::to_string),
        };
        let (choice, ()) = tokio::join!(
            inner.selection.select(ctx, &selection_request, &fallback),
            inner.generation.warm_up(ctx),
        );

        let generation_request = GenerationRequest::enhancement(
            original.original_input.clone(),
            classification.intent.clone(),
            complexity,
            choice.techniques.clone(),
            BTreeMap::new(),
        )
        .as_rerun_of(&original.id);
        let prompt = inner.generation.generate(ctx, &generation_request).await?;

        let mut metadata = HashMap::new();
        metadata.insert(META_RERUN_FROM.to_string(), Value::String(original.id.clone()));
        metadata.insert(META_CLASSIFICATION_REUSED.to_string(), Value::Bool(reused));
        metadata.insert(META_CLASSIFICATION_CACHED.to_string(), Value::Bool(false));
        metadata.insert(
            META_TECHNIQUES_FALLBACK.to_string(),
            Value::Bool(choice.fallback),
        );

        let record = HistoryRecord {
            id: String::new(),
            user_id: ctx.caller.user_id().map(str::to_string),
            session_id: ctx.caller.session_id.clone(),
            original_input: original.original_input.clone(),
            enhanced_output: prompt.text.clone(),
            intent: classification.intent.clone(),
            complexity,
            techniques_used: choice.techniques.clone(),
            intent_confidence: Some(classification.confidence),
            metadata: metadata.clone(),
            created_at: Utc::now(),
        };
        let id = match ctx.call("history save", inner.history.save(&record)).await {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to persist rerun record");
                String::new()
            }
        };

        let model = prompt.model_version.clone();
        let tokens = prompt.tokens_used;
        let response = inner.assembler.assemble(Assembly {
            id,
            original_text: &original.original_input,
            classification: &classification,
            complexity,
            techniques: choice.techniques,
            prompt,
            elapsed: started.elapsed(),
            metadata,
        });
        inner.side_effects.emit_metrics(Completion {
            outcome: "ok",
            cache_hit: false,
            elapsed: started.elapsed(),
            model: Some(model),
            tokens,
        });
        tracing::info!(new_id = %response.id, reused, "Rerun complete");
        Ok(response)
    }
}
