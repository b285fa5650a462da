//! Full-stack test: gateway, engine, in-memory stores, keyword classifier
//! and stub selector/generator services over real HTTP.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    routing::{get, post},
    Json, Router,
};
use enhancer_backends::{HttpGenerator, HttpSelector, KeywordClassifier};
use enhancer_core::config::EngineConfig;
use enhancer_core::GenerationRequest;
use enhancer_engine::{EngineBuilder, EnhancementEngine};
use enhancer_gateway::{GatewayConfig, GatewayServer};
use enhancer_store::{InMemoryCache, InMemoryHistoryStore};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

async fn spawn_stub(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Selector that is always down, generator that echoes its techniques.
async fn stack() -> (Router, EnhancementEngine) {
    let selector = spawn_stub(Router::new().route(
        "/select",
        post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "maintenance") }),
    ))
    .await;
    let generator = spawn_stub(
        Router::new()
            .route("/health", get(|| async { "ok" }))
            .route(
                "/generate",
                post(|Json(request): Json<GenerationRequest>| async move {
                    assert!(request.is_enhancement());
                    Json(json!({
                        "text": format!("[{}] {}", request.techniques.join(","), request.text),
                        "tokens_used": 17,
                        "model_version": "stub-1"
                    }))
                }),
            ),
    )
    .await;

    let timeout = Duration::from_secs(2);
    let engine = EngineBuilder::new()
        .with_config(EngineConfig {
            history_id_grace_ms: 1_000,
            ..EngineConfig::default()
        })
        .with_classifier(Arc::new(KeywordClassifier::new()))
        .with_selector(Arc::new(HttpSelector::new(&selector, timeout).unwrap()))
        .with_generator(Arc::new(HttpGenerator::new(&generator, timeout).unwrap()))
        .with_cache(Arc::new(InMemoryCache::new()))
        .with_history(Arc::new(InMemoryHistoryStore::new()))
        .build()
        .unwrap();
    let router = GatewayServer::new(GatewayConfig::default(), engine.clone()).build_router();
    (router, engine)
}

fn request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("X-User-ID", "alice");
    match body {
        Some(body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn call(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_enhance_lookup_rerun_and_history() {
    let (router, engine) = stack().await;

    let (status, enhanced) = call(
        &router,
        request("POST", "/enhance", Some(json!({"text": "Explain recursion"}))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(enhanced["intent"], "explanation");
    assert_eq!(enhanced["techniques_used"], json!(["eli5", "analogical_reasoning"]));
    assert_eq!(
        enhanced["enhanced_text"],
        "[eli5,analogical_reasoning] Explain recursion"
    );
    assert_eq!(enhanced["metadata"]["techniques_fallback"], true);
    let id = enhanced["id"].as_str().unwrap().to_string();
    assert!(!id.is_empty());

    let (status, record) = call(&router, request("GET", &format!("/prompts/{}", id), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(record["user_id"], "alice");
    assert_eq!(record["original_input"], "Explain recursion");

    let (status, rerun) = call(
        &router,
        request("POST", &format!("/prompts/{}/rerun", id), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rerun["metadata"]["rerun_from"], id.as_str());
    assert_eq!(rerun["metadata"]["classification_reused"], true);
    assert_ne!(rerun["id"], enhanced["id"]);

    engine.background().idle().await;
    let (status, history) = call(&router, request("GET", "/prompts/history", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history["count"], 2);
}

#[tokio::test]
async fn test_batch_through_full_stack() {
    let (router, _engine) = stack().await;

    let (status, batch) = call(
        &router,
        request(
            "POST",
            "/enhance/batch",
            Some(json!({"prompts": [
                {"text": "Fix the crash in my parser"},
                {"text": "   "},
                {"text": "Write a story about a lighthouse"}
            ]})),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(batch["results"][0]["intent"], "debugging");
    assert!(batch["results"][1].is_null());
    assert_eq!(batch["results"][2]["intent"], "creative_writing");
    let errors = batch["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].as_str().unwrap().starts_with("Prompt 2: "));
}
