#![deny(unused)]
//! Prompt Enhancer - orchestration service for prompt enhancement.
//!
//! Classifies raw prompts, selects prompting techniques and generates an
//! enhanced prompt through remote backends, with caching, batch fan-out
//! and replayable history.

use secrecy::ExposeSecret;
use std::sync::Arc;

use enhancer_backends::{HttpClassifier, HttpGenerator, HttpSelector, KeywordClassifier};
use enhancer_core::config::AppConfig;
use enhancer_core::traits::{CacheStore, Classifier, HistoryStore};
use enhancer_engine::EngineBuilder;
use enhancer_gateway::{GatewayConfig, GatewayServer};
use enhancer_store::{InMemoryCache, InMemoryHistoryStore, RedisCache, RedisHistoryStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load()?;

    // Initialize tracing
    enhancer_telemetry::configure_tracing(&config.telemetry)?;

    tracing::info!("Starting Prompt Enhancer v{}", env!("CARGO_PKG_VERSION"));

    // =========================================================================
    // Initialize Cache & History
    // =========================================================================
    let (cache, history): (Arc<dyn CacheStore>, Arc<dyn HistoryStore>) =
        match &config.store.redis_url {
            Some(url) => {
                tracing::info!(prefix = %config.store.key_prefix, "Initializing Redis cache and history");
                let url = url.expose_secret();
                (
                    Arc::new(RedisCache::new(url, &config.store.key_prefix)?),
                    Arc::new(RedisHistoryStore::new(url, &config.store.key_prefix)?),
                )
            }
            None => {
                tracing::info!("Redis URL not set - using in-memory cache and history");
                (
                    Arc::new(InMemoryCache::new()),
                    Arc::new(InMemoryHistoryStore::new()),
                )
            }
        };

    // =========================================================================
    // Initialize Backends
    // =========================================================================
    let backends = &config.backends;
    let timeout = backends.request_timeout();
    let classifier: Arc<dyn Classifier> = match backends.classifier_url.as_deref() {
        Some(url) => {
            tracing::info!(url = %url, "Using remote intent classifier");
            Arc::new(HttpClassifier::new(url, timeout)?)
        }
        None => {
            tracing::info!("Classifier URL not set - using keyword classifier");
            Arc::new(KeywordClassifier::new())
        }
    };
    let selector = Arc::new(HttpSelector::new(&backends.selector_url, timeout)?);
    let generator = Arc::new(HttpGenerator::new(&backends.generator_url, timeout)?);
    tracing::info!(
        selector = %backends.selector_url,
        generator = %backends.generator_url,
        "Backends configured"
    );

    // =========================================================================
    // Initialize Engine & Observability
    // =========================================================================
    let engine = EngineBuilder::new()
        .with_config(config.engine.clone())
        .with_classifier(classifier)
        .with_selector(selector)
        .with_generator(generator)
        .with_cache(cache)
        .with_history(history)
        .build()?;

    let metrics_handle = enhancer_telemetry::setup_metrics_recorder()?;

    // =========================================================================
    // Start the server
    // =========================================================================
    let server = GatewayServer::new(GatewayConfig::from(&config.server), engine.clone())
        .with_metrics(metrics_handle);
    server.run(shutdown_signal()).await?;

    // Queued history saves and cache writes get one task timeout to finish.
    if engine.drain(config.engine.background_task_timeout()).await {
        tracing::info!("Background tasks drained");
    } else {
        tracing::warn!(
            pending = engine.background().pending(),
            "Shutdown timed out with background tasks still pending"
        );
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
