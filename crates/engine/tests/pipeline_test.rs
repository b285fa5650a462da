//! End-to-end behaviour of the enhancement pipeline against test doubles.

use async_trait::async_trait;
use enhancer_core::config::EngineConfig;
use enhancer_core::mocks::{
    MockCache, MockClassifier, MockGenerator, MockHistoryStore, MockSelector,
};
use enhancer_core::{
    BatchEnhanceRequest, Caller, Classifier, Complexity, EnhanceRequest, EnhancedPrompt, Error,
    GenerationRequest, Generator, IntentClassification, Result, META_TECHNIQUES_FALLBACK,
};
use enhancer_engine::{EngineBuilder, EnhancementEngine, RequestContext};
use enhancer_store::{InMemoryCache, InMemoryHistoryStore};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

fn explanation() -> IntentClassification {
    IntentClassification::new("explanation", Complexity::Simple, 0.9)
        .with_suggestions(["chain_of_thought", "analogies"])
}

fn ctx() -> RequestContext {
    RequestContext::new(Caller::user("u-1"), Duration::from_secs(10))
}

fn config() -> EngineConfig {
    EngineConfig {
        history_id_grace_ms: 1_000,
        ..EngineConfig::default()
    }
}

struct Harness {
    engine: EnhancementEngine,
    classifier: Arc<MockClassifier>,
    generator: Arc<MockGenerator>,
    cache: Arc<MockCache>,
    history: Arc<MockHistoryStore>,
}

fn harness(
    classifier: MockClassifier,
    selector: MockSelector,
    generator: MockGenerator,
    history: MockHistoryStore,
) -> Harness {
    let classifier = Arc::new(classifier);
    let generator = Arc::new(generator);
    let cache = Arc::new(MockCache::new());
    let history = Arc::new(history);
    let engine = EngineBuilder::new()
        .with_config(config())
        .with_classifier(classifier.clone())
        .with_selector(Arc::new(selector))
        .with_generator(generator.clone())
        .with_cache(cache.clone())
        .with_history(history.clone())
        .build()
        .unwrap();
    Harness {
        engine,
        classifier,
        generator,
        cache,
        history,
    }
}

fn default_harness() -> Harness {
    harness(
        MockClassifier::returning(explanation()),
        MockSelector::failing(),
        MockGenerator::new(),
        MockHistoryStore::new(),
    )
}

/// Classifier that takes a while to answer.
struct SlowClassifier {
    delay: Duration,
}

#[async_trait]
impl Classifier for SlowClassifier {
    async fn classify(&self, _text: &str) -> Result<IntentClassification> {
        tokio::time::sleep(self.delay).await;
        Ok(explanation())
    }
}

/// Generator that tracks how many calls overlap.
#[derive(Default)]
struct CountingGenerator {
    active: AtomicUsize,
    peak: AtomicUsize,
    delay: Duration,
    started: Notify,
    finished: AtomicBool,
}

#[async_trait]
impl Generator for CountingGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<EnhancedPrompt> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.started.notify_one();
        tokio::time::sleep(self.delay).await;
        self.active.fetch_sub(1, Ordering::SeqCst);
        self.finished.store(true, Ordering::SeqCst);
        Ok(EnhancedPrompt {
            text: MockGenerator::render(&request.text, &request.techniques),
            tokens_used: 1,
            model_version: "counting".to_string(),
            metadata: HashMap::new(),
        })
    }
}

fn engine_with_generator(generator: Arc<CountingGenerator>) -> EnhancementEngine {
    EngineBuilder::new()
        .with_config(config())
        .with_classifier(Arc::new(MockClassifier::returning(explanation())))
        .with_selector(Arc::new(MockSelector::failing()))
        .with_generator(generator)
        .with_cache(Arc::new(MockCache::new()))
        .with_history(Arc::new(MockHistoryStore::new()))
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_selector_failure_falls_back_to_suggestions() {
    let h = default_harness();

    let response = h
        .engine
        .enhance(&ctx(), EnhanceRequest::text("Explain recursion"))
        .await
        .unwrap();

    assert_eq!(
        response.techniques_used,
        vec!["chain_of_thought".to_string(), "analogies".to_string()]
    );
    assert_eq!(response.intent, "explanation");
    assert_eq!(response.complexity, Complexity::Simple);
    assert_eq!(response.confidence, 0.9);
    assert_eq!(
        response.enhanced_text,
        "[chain_of_thought,analogies] Explain recursion"
    );
    assert_eq!(response.metadata[META_TECHNIQUES_FALLBACK], Value::Bool(true));
    assert!(!response.id.is_empty());

    h.engine.background().idle().await;
    assert_eq!(h.history.len(), 1);
    assert_eq!(h.history.records()[0].id, response.id);
    assert_eq!(h.history.records()[0].user_id.as_deref(), Some("u-1"));
}

#[tokio::test]
async fn test_generation_always_flagged_as_enhancement() {
    let h = harness(
        MockClassifier::returning(explanation()),
        MockSelector::returning(["few_shot"]),
        MockGenerator::new(),
        MockHistoryStore::new(),
    );
    let request = EnhanceRequest::text("Write a parser")
        .with_context("enhanced", Value::Bool(false))
        .with_context("language", Value::from("rust"));

    h.engine.enhance(&ctx(), request).await.unwrap();

    let sent = &h.generator.requests()[0];
    assert!(sent.is_enhancement());
    assert_eq!(sent.context["language"], Value::from("rust"));
    assert_eq!(sent.techniques, vec!["few_shot".to_string()]);
}

#[tokio::test]
async fn test_classifier_failure_writes_nothing() {
    let h = harness(
        MockClassifier::failing(),
        MockSelector::returning(["few_shot"]),
        MockGenerator::new(),
        MockHistoryStore::new(),
    );

    let err = h
        .engine
        .enhance(&ctx(), EnhanceRequest::text("Explain recursion"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Classification(_)));
    h.engine.background().idle().await;
    assert_eq!(h.cache.write_count(), 0);
    assert_eq!(h.history.save_attempts(), 0);
    assert_eq!(h.generator.call_count(), 0);
}

#[tokio::test]
async fn test_generator_failure_writes_nothing() {
    let h = harness(
        MockClassifier::returning(explanation()),
        MockSelector::failing(),
        MockGenerator::failing(),
        MockHistoryStore::new(),
    );

    let err = h
        .engine
        .enhance(&ctx(), EnhanceRequest::text("Explain recursion"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Generation(_)));
    h.engine.background().idle().await;
    assert_eq!(h.history.save_attempts(), 0);
    // Only the classification is cached.
    assert_eq!(h.cache.write_count(), 1);
}

#[tokio::test]
async fn test_history_failure_is_silent() {
    let h = harness(
        MockClassifier::returning(explanation()),
        MockSelector::failing(),
        MockGenerator::new(),
        MockHistoryStore::failing(),
    );

    let response = h
        .engine
        .enhance(&ctx(), EnhanceRequest::text("Explain recursion"))
        .await
        .unwrap();

    assert!(response.id.is_empty());
    assert!(!response.enhanced_text.is_empty());
    h.engine.background().idle().await;
    assert_eq!(h.history.save_attempts(), 1);
}

#[tokio::test]
async fn test_validation_rejects_before_any_call() {
    let h = default_harness();

    let err = h
        .engine
        .enhance(&ctx(), EnhanceRequest::text("   "))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidRequest(_)));

    let err = h
        .engine
        .enhance(&ctx(), EnhanceRequest::text("x".repeat(5001)))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidRequest(_)));

    let err = h
        .engine
        .enhance(
            &ctx(),
            EnhanceRequest::text("ok").with_target_complexity("enormous"),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidRequest(_)));
    assert_eq!(h.classifier.call_count(), 0);
}

#[tokio::test]
async fn test_target_complexity_overrides_classification() {
    let h = default_harness();
    let response = h
        .engine
        .enhance(
            &ctx(),
            EnhanceRequest::text("Explain recursion").with_target_complexity("complex"),
        )
        .await
        .unwrap();
    assert_eq!(response.complexity, Complexity::Complex);
    assert_eq!(h.generator.requests()[0].complexity, Complexity::Complex);
}

#[tokio::test]
async fn test_identical_request_replays_cached_response() {
    let h = default_harness();
    let request = EnhanceRequest::text("Explain recursion");

    let first = h.engine.enhance(&ctx(), request.clone()).await.unwrap();
    h.engine.background().idle().await;
    let second = h.engine.enhance(&ctx(), request).await.unwrap();

    assert!(!first.is_cache_hit());
    assert!(second.is_cache_hit());
    assert!(second.id.is_empty());
    assert_eq!(second.enhanced_text, first.enhanced_text);
    assert_eq!(h.classifier.call_count(), 1);
    assert_eq!(h.generator.call_count(), 1);

    h.engine.background().idle().await;
    assert_eq!(h.history.len(), 1);
}

#[tokio::test]
async fn test_target_complexity_does_not_share_cached_response() {
    let h = default_harness();

    let simple = h
        .engine
        .enhance(
            &ctx(),
            EnhanceRequest::text("Explain recursion").with_target_complexity("simple"),
        )
        .await
        .unwrap();
    h.engine.background().idle().await;
    let complex = h
        .engine
        .enhance(
            &ctx(),
            EnhanceRequest::text("Explain recursion").with_target_complexity("complex"),
        )
        .await
        .unwrap();

    assert_eq!(simple.complexity, Complexity::Simple);
    assert_eq!(complex.complexity, Complexity::Complex);
    assert!(!complex.is_cache_hit());
    assert_eq!(h.generator.call_count(), 2);
    assert_eq!(h.generator.requests()[1].complexity, Complexity::Complex);
    assert_eq!(h.classifier.call_count(), 1);
}

#[tokio::test]
async fn test_cache_hit_is_faster_than_miss() {
    let history = Arc::new(InMemoryHistoryStore::new());
    let engine = EngineBuilder::new()
        .with_config(config())
        .with_classifier(Arc::new(SlowClassifier {
            delay: Duration::from_millis(80),
        }))
        .with_selector(Arc::new(MockSelector::failing()))
        .with_generator(Arc::new(MockGenerator::new()))
        .with_cache(Arc::new(InMemoryCache::new()))
        .with_history(history.clone())
        .build()
        .unwrap();
    let request = EnhanceRequest::text("Explain recursion");

    let first = engine.enhance(&ctx(), request.clone()).await.unwrap();
    engine.background().idle().await;
    let second = engine.enhance(&ctx(), request).await.unwrap();

    assert!(first.processing_time_ms >= 80.0);
    assert!(second.processing_time_ms < first.processing_time_ms);
    assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn test_broken_cache_does_not_fail_requests() {
    let history = Arc::new(MockHistoryStore::new());
    let engine = EngineBuilder::new()
        .with_config(config())
        .with_classifier(Arc::new(MockClassifier::returning(explanation())))
        .with_selector(Arc::new(MockSelector::failing()))
        .with_generator(Arc::new(MockGenerator::new()))
        .with_cache(Arc::new(MockCache::broken()))
        .with_history(history.clone())
        .build()
        .unwrap();

    let response = engine
        .enhance(&ctx(), EnhanceRequest::text("Explain recursion"))
        .await
        .unwrap();
    assert!(!response.is_cache_hit());
    engine.background().idle().await;
    assert_eq!(history.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_deadline_aborts_generation() {
    let generator = Arc::new(CountingGenerator {
        delay: Duration::from_secs(30),
        ..Default::default()
    });
    let engine = engine_with_generator(generator.clone());
    let short = RequestContext::new(Caller::anonymous(), Duration::from_millis(200));

    let err = engine
        .enhance(&short, EnhanceRequest::text("Explain recursion"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Timeout(_)));
    assert_eq!(err.public_message(), "request deadline exceeded");
    assert!(!generator.finished.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_request_drops_inflight_generation() {
    let generator = Arc::new(CountingGenerator {
        delay: Duration::from_secs(5),
        ..Default::default()
    });
    let engine = engine_with_generator(generator.clone());

    let task = {
        let engine = engine.clone();
        tokio::spawn(async move {
            engine
                .enhance(&ctx(), EnhanceRequest::text("Explain recursion"))
                .await
        })
    };
    generator.started.notified().await;
    task.abort();
    assert!(task.await.unwrap_err().is_cancelled());

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(!generator.finished.load(Ordering::SeqCst));
    assert_eq!(generator.active.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_batch_preserves_order_and_isolates_failures() {
    let h = harness(
        MockClassifier::returning(explanation()),
        MockSelector::failing(),
        MockGenerator::failing_on("BAD"),
        MockHistoryStore::new(),
    );
    let prompts = vec![
        EnhanceRequest::text("Explain recursion"),
        EnhanceRequest::text("BAD prompt"),
        EnhanceRequest::text("Summarize this"),
    ];

    let batch = h
        .engine
        .enhance_batch(&ctx(), BatchEnhanceRequest { prompts })
        .await
        .unwrap();

    assert_eq!(batch.results.len(), 3);
    assert_eq!(
        batch.results[0].as_ref().unwrap().original_text,
        "Explain recursion"
    );
    assert!(batch.results[1].is_none());
    assert_eq!(
        batch.results[2].as_ref().unwrap().original_text,
        "Summarize this"
    );
    assert_eq!(batch.errors, vec!["Prompt 2: prompt generation failed".to_string()]);
}

#[tokio::test]
async fn test_batch_results_follow_input_order_not_completion_order() {
    let h = default_harness();
    let prompts: Vec<_> = (0..10)
        .map(|i| EnhanceRequest::text(format!("prompt number {}", i)))
        .collect();

    let batch = h
        .engine
        .enhance_batch(&ctx(), BatchEnhanceRequest { prompts })
        .await
        .unwrap();

    assert!(batch.errors.is_empty());
    for (i, result) in batch.results.iter().enumerate() {
        assert_eq!(
            result.as_ref().unwrap().original_text,
            format!("prompt number {}", i)
        );
    }
}

#[tokio::test]
async fn test_batch_concurrency_is_capped() {
    let generator = Arc::new(CountingGenerator {
        delay: Duration::from_millis(30),
        ..Default::default()
    });
    let engine = engine_with_generator(generator.clone());
    let prompts: Vec<_> = (0..10)
        .map(|i| EnhanceRequest::text(format!("item {}", i)))
        .collect();

    let batch = engine
        .enhance_batch(&ctx(), BatchEnhanceRequest { prompts })
        .await
        .unwrap();

    assert_eq!(batch.results.iter().filter(|r| r.is_some()).count(), 10);
    let peak = generator.peak.load(Ordering::SeqCst);
    assert!(peak <= 5, "peak concurrency {} exceeds cap", peak);
    assert!(peak > 1, "batch items never overlapped");
}

#[tokio::test]
async fn test_batch_size_bounds_checked_before_work() {
    let h = default_harness();

    let empty = h
        .engine
        .enhance_batch(&ctx(), BatchEnhanceRequest { prompts: vec![] })
        .await
        .unwrap_err();
    assert!(matches!(empty, Error::InvalidRequest(_)));

    let prompts = vec![EnhanceRequest::text("x"); 11];
    let oversized = h
        .engine
        .enhance_batch(&ctx(), BatchEnhanceRequest { prompts })
        .await
        .unwrap_err();
    assert!(matches!(oversized, Error::InvalidRequest(_)));
    assert_eq!(h.classifier.call_count(), 0);
}

#[tokio::test]
async fn test_history_accessors_scope_to_caller() {
    let h = default_harness();
    let mine = RequestContext::new(Caller::user("u-1"), Duration::from_secs(5));
    let theirs = RequestContext::new(Caller::user("u-2"), Duration::from_secs(5));

    let response = h
        .engine
        .enhance(&mine, EnhanceRequest::text("Explain recursion"))
        .await
        .unwrap();
    h.engine.background().idle().await;

    let record = h.engine.get_prompt(&mine, &response.id).await.unwrap();
    assert_eq!(record.original_input, "Explain recursion");
    assert!(matches!(
        h.engine.get_prompt(&theirs, &response.id).await,
        Err(Error::AccessDenied(_))
    ));
    assert!(matches!(
        h.engine.get_prompt(&mine, "missing").await,
        Err(Error::NotFound(_))
    ));

    assert_eq!(h.engine.history(&mine, None, None).await.unwrap().len(), 1);
    assert!(h.engine.history(&theirs, None, None).await.unwrap().is_empty());

    let nobody = RequestContext::new(Caller::anonymous(), Duration::from_secs(5));
    assert!(h.engine.history(&nobody, None, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_drain_waits_for_side_effects() {
    let h = default_harness();
    h.engine
        .enhance(&ctx(), EnhanceRequest::text("Explain recursion"))
        .await
        .unwrap();
    assert!(h.engine.drain(Duration::from_secs(5)).await);
    assert_eq!(h.engine.background().pending(), 0);
    assert!(h.cache.len() >= 2);
}
