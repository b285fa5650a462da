//! Remote capability traits.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{
    EnhancedPrompt, GenerationRequest, IntentClassification, SelectedTechnique, SelectionRequest,
};

/// Intent classifier.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classify the intent and complexity of a prompt.
    async fn classify(&self, text: &str) -> Result<IntentClassification>;
}

/// Technique selector.
#[async_trait]
pub trait TechniqueSelector: Send + Sync {
    /// Choose techniques for a classified prompt, best first.
    async fn select(&self, request: &SelectionRequest) -> Result<Vec<SelectedTechnique>>;
}

/// Prompt generator.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Produce the enhanced prompt.
    async fn generate(&self, request: &GenerationRequest) -> Result<EnhancedPrompt>;

    /// Prepare the connection ahead of a generate call.
    async fn warm_up(&self) -> Result<()> {
        Ok(())
    }
}
