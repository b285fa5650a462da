use enhancer_core::{Error, Result, SelectionRequest, TechniqueSelector};
use enhancer_telemetry::metrics::track_stage_failure;
use std::sync::Arc;

use crate::context::RequestContext;

/// Techniques to apply and whether they came from the fallback list.
#[derive(Debug, Clone, PartialEq)]
pub struct TechniqueChoice {
    pub techniques: Vec<String>,
    pub fallback: bool,
}

/// Technique selection with graceful degradation.
///
/// The selector refines the classifier's own suggestions; when it fails,
/// times out or returns nothing, the suggestions are used as-is.
pub struct TechniqueSelectionStage {
    selector: Arc<dyn TechniqueSelector>,
}

impl TechniqueSelectionStage {
    pub fn new(selector: Arc<dyn TechniqueSelector>) -> Self {
        Self { selector }
    }

    pub async fn select(
        &self,
        ctx: &RequestContext,
        request: &SelectionRequest,
        fallback: &[String],
    ) -> TechniqueChoice {
        match self.try_select(ctx, request).await {
            Ok(techniques) if !techniques.is_empty() => TechniqueChoice {
                techniques,
                fallback: false,
            },
            Ok(_) => {
                tracing::debug!(trace_id = %ctx.trace_id, "Selector returned no techniques, using suggestions");
                self.fall_back(fallback)
            }
            Err(e) => {
                tracing::warn!(trace_id = %ctx.trace_id, error = %e, "Technique selection failed, using suggestions");
                self.fall_back(fallback)
            }
        }
    }

    async fn try_select(
        &self,
        ctx: &RequestContext,
        request: &SelectionRequest,
    ) -> Result<Vec<String>> {
        let selected = ctx
            .call("selector", self.selector.select(request))
            .await
            .map_err(|e| match e {
                Error::Timeout(_) => e,
                other => Error::selection(other.to_string()),
            })?;
        Ok(selected.into_iter().map(|t| t.id).collect())
    }

    fn fall_back(&self, fallback: &[String]) -> TechniqueChoice {
        track_stage_failure("selection");
        TechniqueChoice {
            techniques: fallback.to_vec(),
            fallback: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use enhancer_core::mocks::MockSelector;
    use enhancer_core::{Caller, Complexity};
    use std::time::Duration;

    fn request() -> SelectionRequest {
        SelectionRequest {
            text: "Explain recursion".to_string(),
            intent: "explanation".to_string(),
            complexity: Complexity::Simple,
            preferred: vec![],
            excluded: vec!["few_shot".to_string()],
            user_id: None,
        }
    }

    fn ctx() -> RequestContext {
        RequestContext::new(Caller::anonymous(), Duration::from_secs(5))
    }

    fn suggestions() -> Vec<String> {
        vec!["chain_of_thought".to_string(), "analogies".to_string()]
    }

    #[tokio::test]
    async fn test_selector_result_wins() {
        let stage = TechniqueSelectionStage::new(Arc::new(MockSelector::returning([
            "few_shot",
            "step_by_step",
        ])));
        let choice = stage.select(&ctx(), &request(), &suggestions()).await;
        assert_eq!(choice.techniques, vec!["step_by_step".to_string()]);
        assert!(!choice.fallback);
    }

    #[tokio::test]
    async fn test_failure_falls_back_to_suggestions() {
        let stage = TechniqueSelectionStage::new(Arc::new(MockSelector::failing()));
        let choice = stage.select(&ctx(), &request(), &suggestions()).await;
        assert_eq!(choice.techniques, suggestions());
        assert!(choice.fallback);
    }

    #[tokio::test]
    async fn test_selector_errors_are_tagged_as_selection() {
        let stage = TechniqueSelectionStage::new(Arc::new(MockSelector::failing()));
        let err = stage.try_select(&ctx(), &request()).await.unwrap_err();
        assert!(matches!(err, Error::TechniqueSelection(_)));
        assert_eq!(err.public_message(), "internal server error");
    }

    #[tokio::test]
    async fn test_empty_selection_falls_back() {
        let stage = TechniqueSelectionStage::new(Arc::new(MockSelector::returning(["few_shot"])));
        let choice = stage.select(&ctx(), &request(), &suggestions()).await;
        assert_eq!(choice.techniques, suggestions());
        assert!(choice.fallback);
    }
}
