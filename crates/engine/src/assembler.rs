//! Builds the public response from the pipeline's outputs.

use enhancer_core::{
    Complexity, EnhanceResponse, EnhancedPrompt, IntentClassification, META_CACHE_HIT,
    META_MODEL_VERSION, META_TOKENS_USED,
};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

/// Everything the pipeline produced for one request.
pub struct Assembly<'a> {
    pub id: String,
    pub original_text: &'a str,
    pub classification: &'a IntentClassification,
    /// Effective complexity; differs from the classification's when overridden.
    pub complexity: Complexity,
    pub techniques: Vec<String>,
    pub prompt: EnhancedPrompt,
    pub elapsed: Duration,
    pub metadata: HashMap<String, Value>,
}

/// Pure transformation into [`EnhanceResponse`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseAssembler;

impl ResponseAssembler {
    pub fn assemble(&self, assembly: Assembly<'_>) -> EnhanceResponse {
        let Assembly {
            id,
            original_text,
            classification,
            complexity,
            techniques,
            prompt,
            elapsed,
            mut metadata,
        } = assembly;

        metadata.insert(META_TOKENS_USED.to_string(), Value::from(prompt.tokens_used));
        metadata.insert(
            META_MODEL_VERSION.to_string(),
            Value::String(prompt.model_version),
        );
        metadata.entry(META_CACHE_HIT.to_string()).or_insert(Value::Bool(false));
        for (key, value) in prompt.metadata {
            metadata.entry(key).or_insert(value);
        }

        EnhanceResponse {
            id,
            original_text: original_text.to_string(),
            enhanced_text: prompt.text,
            intent: classification.intent.clone(),
            complexity,
            techniques_used: techniques,
            confidence: classification.confidence,
            processing_time_ms: millis(elapsed),
            metadata,
        }
    }

    /// Re-issue a cached response for a new request.
    ///
    /// The replay gets no history record, so it carries no id.
    pub fn replay(&self, mut cached: EnhanceResponse, elapsed: Duration) -> EnhanceResponse {
        cached.id = String::new();
        cached.processing_time_ms = millis(elapsed);
        cached
            .metadata
            .insert(META_CACHE_HIT.to_string(), Value::Bool(true));
        cached
    }
}

fn millis(elapsed: Duration) -> f64 {
    elapsed.as_secs_f64() * 1000.0
}
