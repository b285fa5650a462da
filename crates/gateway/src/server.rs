//! Axum-based HTTP server for the enhancement API.

use axum::{
    extract::{MatchedPath, Path, Request, State},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use enhancer_core::config::ServerConfig;
use enhancer_core::{
    BatchEnhanceRequest, BatchEnhanceResponse, EnhanceRequest, EnhanceResponse, Error,
    HistoryRecord, Result,
};
use enhancer_engine::{EnhancementEngine, RequestContext};
use enhancer_telemetry::metrics::track_request;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
use crate::extract::{ApiJson, ApiQuery, RequestMeta};

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Host to bind to.
    pub host: String,
    /// Port to bind to.
    pub port: u16,
    /// Enable CORS.
    pub enable_cors: bool,
    /// Enable request tracing.
    pub enable_tracing: bool,
    /// Deadline applied to every request.
    pub request_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self::from(&ServerConfig::default())
    }
}

impl From<&ServerConfig> for GatewayConfig {
    fn from(config: &ServerConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            enable_cors: config.enable_cors,
            enable_tracing: true,
            request_timeout: config.request_timeout(),
        }
    }
}

/// Shared application state.
pub struct AppState {
    pub engine: EnhancementEngine,
    pub request_timeout: Duration,
}

impl AppState {
    fn context(&self, meta: RequestMeta) -> RequestContext {
        RequestContext::new(meta.caller, self.request_timeout).with_trace_id(meta.trace_id)
    }
}

/// Gateway server.
pub struct GatewayServer {
    config: GatewayConfig,
    state: Arc<AppState>,
    metrics_handle: Option<PrometheusHandle>,
}

impl GatewayServer {
    /// Create a new gateway server.
    pub fn new(config: GatewayConfig, engine: EnhancementEngine) -> Self {
        let state = Arc::new(AppState {
            engine,
            request_timeout: config.request_timeout,
        });
        Self {
            config,
            state,
            metrics_handle: None,
        }
    }

    /// Set metrics handle.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }

    /// Build the Axum router.
    pub fn build_router(&self) -> Router {
        let mut router = Router::new()
            .route("/enhance", post(enhance_handler))
            .route("/enhance/batch", post(batch_handler))
            .route("/prompts/history", get(history_handler))
            .route("/prompts/:id", get(get_prompt_handler))
            .route("/prompts/:id/rerun", post(rerun_handler))
            .route_layer(middleware::from_fn(track_http))
            .route("/health", get(health_handler))
            .with_state(self.state.clone());

        if let Some(handle) = &self.metrics_handle {
            let handle = handle.clone();
            router = router.route("/metrics", get(move || async move { handle.render() }));
        }

        if self.config.enable_cors {
            router = router.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            );
        }

        if self.config.enable_tracing {
            router = router.layer(TraceLayer::new_for_http());
        }

        router
    }

    /// Run the server until `shutdown` resolves.
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| Error::Config(format!("Failed to bind {}: {}", addr, e)))?;

        tracing::info!(addr = %addr, "Gateway server starting");

        axum::serve(listener, self.build_router())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| Error::internal(format!("Server error: {}", e)))?;

        tracing::info!("Gateway server stopped");
        Ok(())
    }
}

// =============================================================================
// Request/Response Types
// =============================================================================

/// Health response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Status.
    pub status: String,
    /// Version.
    pub version: String,
}

/// Paging parameters for the history listing.
#[derive(Debug, Default, Deserialize)]
pub struct HistoryParams {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// One page of the caller's history.
#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub items: Vec<HistoryRecord>,
    pub count: usize,
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check handler.
async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn enhance_handler(
    State(state): State<Arc<AppState>>,
    meta: RequestMeta,
    ApiJson(payload): ApiJson<EnhanceRequest>,
) -> std::result::Result<Json<EnhanceResponse>, ApiError> {
    let ctx = state.context(meta);
    tracing::info!(
        trace_id = %ctx.trace_id,
        text_len = payload.text.chars().count(),
        "Processing enhance request"
    );
    state
        .engine
        .enhance(&ctx, payload)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_error(e, &ctx.trace_id))
}

async fn batch_handler(
    State(state): State<Arc<AppState>>,
    meta: RequestMeta,
    ApiJson(payload): ApiJson<BatchEnhanceRequest>,
) -> std::result::Result<Json<BatchEnhanceResponse>, ApiError> {
    let ctx = state.context(meta);
    state
        .engine
        .enhance_batch(&ctx, payload)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_error(e, &ctx.trace_id))
}

async fn rerun_handler(
    State(state): State<Arc<AppState>>,
    meta: RequestMeta,
    Path(id): Path<String>,
) -> std::result::Result<Json<EnhanceResponse>, ApiError> {
    let ctx = state.context(meta);
    tracing::info!(trace_id = %ctx.trace_id, history_id = %id, "Processing rerun request");
    state
        .engine
        .rerun(&ctx, &id)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_error(e, &ctx.trace_id))
}

async fn get_prompt_handler(
    State(state): State<Arc<AppState>>,
    meta: RequestMeta,
    Path(id): Path<String>,
) -> std::result::Result<Json<HistoryRecord>, ApiError> {
    let ctx = state.context(meta);
    state
        .engine
        .get_prompt(&ctx, &id)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_error(e, &ctx.trace_id))
}

async fn history_handler(
    State(state): State<Arc<AppState>>,
    meta: RequestMeta,
    ApiQuery(params): ApiQuery<HistoryParams>,
) -> std::result::Result<Json<HistoryResponse>, ApiError> {
    let ctx = state.context(meta);
    let items = state
        .engine
        .history(&ctx, params.limit, params.offset)
        .await
        .map_err(|e| ApiError::from_error(e, &ctx.trace_id))?;
    Ok(Json(HistoryResponse {
        count: items.len(),
        items,
    }))
}

/// Records count and latency per route.
async fn track_http(request: Request, next: Next) -> Response {
    let started = Instant::now();
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    let response = next.run(request).await;
    track_request(
        &method,
        &path,
        response.status().as_u16(),
        started.elapsed().as_secs_f64(),
    );
    response
}
