use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

use super::classification::Complexity;

/// Context key that routes the generator onto its enhancement path.
pub const CONTEXT_ENHANCED: &str = "enhanced";
/// Context key marking a rerun.
pub const CONTEXT_RERUN: &str = "rerun";
/// Context key referencing the record a rerun originates from.
pub const CONTEXT_ORIGINAL_ID: &str = "original_id";

// =============================================================================
// Generation Types
// =============================================================================

/// Input to the prompt generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub text: String,
    pub intent: String,
    pub complexity: Complexity,
    pub techniques: Vec<String>,
    pub context: BTreeMap<String, Value>,
}

impl GenerationRequest {
    /// Build a request flagged for the generator's enhancement path.
    ///
    /// The caller's context is carried over, but the enhancement flag always
    /// wins over a caller-supplied value under the same key.
    pub fn enhancement(
        text: impl Into<String>,
        intent: impl Into<String>,
        complexity: Complexity,
        techniques: Vec<String>,
        mut context: BTreeMap<String, Value>,
    ) -> Self {
        context.insert(CONTEXT_ENHANCED.to_string(), Value::Bool(true));
        Self {
            text: text.into(),
            intent: intent.into(),
            complexity,
            techniques,
            context,
        }
    }

    /// Mark this generation as a rerun of a stored record.
    pub fn as_rerun_of(mut self, original_id: &str) -> Self {
        self.context.insert(CONTEXT_RERUN.to_string(), Value::Bool(true));
        self.context.insert(
            CONTEXT_ORIGINAL_ID.to_string(),
            Value::String(original_id.to_string()),
        );
        self
    }

    pub fn is_enhancement(&self) -> bool {
        self.context.get(CONTEXT_ENHANCED) == Some(&Value::Bool(true))
    }
}

/// Output of the prompt generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancedPrompt {
    pub text: String,
    #[serde(default)]
    pub tokens_used: u64,
    #[serde(default)]
    pub model_version: String,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}
