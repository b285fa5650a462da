use enhancer_core::{EnhancedPrompt, Error, GenerationRequest, Generator, Result};
use enhancer_telemetry::metrics::track_stage_failure;
use std::sync::Arc;

use crate::context::RequestContext;

/// Calls the generator. Failures are fatal to the request.
pub struct GenerationStage {
    generator: Arc<dyn Generator>,
}

impl GenerationStage {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self { generator }
    }

    pub async fn generate(
        &self,
        ctx: &RequestContext,
        request: &GenerationRequest,
    ) -> Result<EnhancedPrompt> {
        debug_assert!(request.is_enhancement());
        ctx.call("generator", self.generator.generate(request))
            .await
            .map_err(|e| {
                track_stage_failure("generation");
                tracing::warn!(trace_id = %ctx.trace_id, error = %e, "Generation failed");
                match e {
                    Error::Timeout(_) => e,
                    other => Error::generation(other.to_string()),
                }
            })
    }

    /// Prepare the generator connection. Failures are only logged.
    pub async fn warm_up(&self, ctx: &RequestContext) {
        if let Err(e) = ctx.call("generator warm-up", self.generator.warm_up()).await {
            tracing::debug!(trace_id = %ctx.trace_id, error = %e, "Generator warm-up failed");
        }
    }
}
