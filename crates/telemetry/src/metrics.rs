//! Prometheus metrics and the recording helpers used across the service.

use enhancer_core::{Error, Result};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Initialize Prometheus recorder and return the handle.
pub fn setup_metrics_recorder() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| Error::Config(format!("Failed to install Prometheus recorder: {}", e)))?;

    tracing::info!("Prometheus metrics recorder initialized");
    Ok(handle)
}

/// Helper to track HTTP request metrics (latency, count).
pub fn track_request(method: &str, path: &str, status: u16, latency_sec: f64) {
    metrics::counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    metrics::histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(latency_sec);
}

/// One finished enhancement. `outcome` is "ok" or the error kind code.
pub fn track_enhancement(outcome: &str, cache_hit: bool, latency_sec: f64) {
    let cache = if cache_hit { "hit" } else { "miss" };
    metrics::counter!(
        "enhance_requests_total",
        "outcome" => outcome.to_string(),
        "cache" => cache
    )
    .increment(1);
    metrics::histogram!("enhance_duration_seconds", "cache" => cache).record(latency_sec);
}

/// A pipeline stage that failed or fell back.
pub fn track_stage_failure(stage: &'static str) {
    metrics::counter!("enhance_stage_failures_total", "stage" => stage).increment(1);
}

/// Cache lookup result: "hit", "miss" or "error".
pub fn track_cache_lookup(kind: &'static str, result: &'static str) {
    metrics::counter!(
        "enhance_cache_lookups_total",
        "kind" => kind,
        "result" => result
    )
    .increment(1);
}

/// Background task completion: "ok", "error", "timeout", "panic" or "dropped".
pub fn track_background_task(task: &'static str, outcome: &'static str) {
    metrics::counter!(
        "background_tasks_total",
        "task" => task,
        "outcome" => outcome
    )
    .increment(1);
}

/// Helper to track generator token usage.
pub fn track_tokens(model: &str, tokens: u64) {
    metrics::counter!("enhance_tokens_total", "model" => model.to_string()).increment(tokens);
}

/// Per-item batch outcome.
pub fn track_batch_item(succeeded: bool) {
    let outcome = if succeeded { "ok" } else { "error" };
    metrics::counter!("enhance_batch_items_total", "outcome" => outcome).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_helpers_without_recorder_are_noops() {
        track_request("POST", "/enhance", 200, 0.01);
        track_enhancement("ok", false, 0.2);
        track_stage_failure("selection");
        track_cache_lookup("classification", "miss");
        track_background_task("history_save", "dropped");
        track_tokens("mock-1", 42);
        track_batch_item(true);
    }
}
