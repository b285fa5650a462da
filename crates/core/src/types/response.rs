use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use super::classification::Complexity;

/// Metadata key: response replayed from the response cache.
pub const META_CACHE_HIT: &str = "cache_hit";
/// Metadata key: classification came from cache.
pub const META_CLASSIFICATION_CACHED: &str = "classification_cached";
/// Metadata key: technique list came from the classifier fallback.
pub const META_TECHNIQUES_FALLBACK: &str = "techniques_fallback";
/// Metadata key: generator token usage.
pub const META_TOKENS_USED: &str = "tokens_used";
/// Metadata key: generator model version.
pub const META_MODEL_VERSION: &str = "model_version";
/// Metadata key: request fingerprint.
pub const META_FINGERPRINT: &str = "fingerprint";
/// Metadata key: id of the record a rerun originates from.
pub const META_RERUN_FROM: &str = "rerun_from";

// =============================================================================
// Response Types
// =============================================================================

/// Public result of an enhancement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhanceResponse {
    /// History record id; empty when persistence did not complete in time.
    pub id: String,
    pub original_text: String,
    pub enhanced_text: String,
    pub intent: String,
    pub complexity: Complexity,
    pub techniques_used: Vec<String>,
    pub confidence: f64,
    pub processing_time_ms: f64,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl EnhanceResponse {
    pub fn is_cache_hit(&self) -> bool {
        self.metadata.get(META_CACHE_HIT) == Some(&Value::Bool(true))
    }
}

/// Result of a batch call, index-aligned with the submitted prompts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchEnhanceResponse {
    /// `None` at indices whose item failed.
    pub results: Vec<Option<EnhanceResponse>>,
    /// One entry per failed item, prefixed with its 1-based position.
    pub errors: Vec<String>,
}
