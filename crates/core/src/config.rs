//! Layered service configuration.

use config::{Config, ConfigError, Environment, File};
use secrecy::Secret;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub engine: EngineConfig,
    pub store: StoreConfig,
    pub backends: BackendsConfig,
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub enable_cors: bool,
    /// Deadline applied to every primary pipeline.
    pub request_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
            enable_cors: true,
            request_timeout_ms: 30_000,
        }
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EngineConfig {
    pub batch_max_items: usize,
    pub batch_concurrency: usize,
    pub background_workers: usize,
    pub background_queue_capacity: usize,
    pub background_task_timeout_ms: u64,
    /// How long assembly may wait for the history id; 0 never waits.
    ///
    /// A slow history store adds up to this much latency per request.
    pub history_id_grace_ms: u64,
    pub classification_ttl_secs: u64,
    pub response_ttl_secs: u64,
    pub max_text_chars: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            batch_max_items: 10,
            batch_concurrency: 5,
            background_workers: 8,
            background_queue_capacity: 1024,
            background_task_timeout_ms: 5_000,
            history_id_grace_ms: 50,
            classification_ttl_secs: 3600,
            response_ttl_secs: 3600,
            max_text_chars: crate::types::MAX_TEXT_CHARS,
        }
    }
}

impl EngineConfig {
    pub fn background_task_timeout(&self) -> Duration {
        Duration::from_millis(self.background_task_timeout_ms)
    }

    pub fn history_id_grace(&self) -> Duration {
        Duration::from_millis(self.history_id_grace_ms)
    }

    pub fn classification_ttl(&self) -> Duration {
        Duration::from_secs(self.classification_ttl_secs)
    }

    pub fn response_ttl(&self) -> Duration {
        Duration::from_secs(self.response_ttl_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StoreConfig {
    /// Redis connection string; in-memory stores when absent.
    pub redis_url: Option<Secret<String>>,
    pub key_prefix: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            key_prefix: "enhancer".into(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BackendsConfig {
    /// Remote classifier; the keyword classifier is used when absent.
    pub classifier_url: Option<String>,
    pub selector_url: String,
    pub generator_url: String,
    pub request_timeout_ms: u64,
}

impl Default for BackendsConfig {
    fn default() -> Self {
        Self {
            classifier_url: None,
            selector_url: "http://127.0.0.1:9102".into(),
            generator_url: "http://127.0.0.1:9103".into(),
            request_timeout_ms: 10_000,
        }
    }
}

impl BackendsConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TelemetryConfig {
    pub log_filter: String,
    pub json_logs: bool,
    pub otlp_endpoint: Option<String>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_filter: "info,enhancer=debug".into(),
            json_logs: false,
            otlp_endpoint: None,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("ENHANCER_ENV").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(File::with_name("config/local").required(false))
            // Map APP__SERVER__PORT=8080 to server.port
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
