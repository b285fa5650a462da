//! Log and trace subscriber configuration.

use enhancer_core::config::TelemetryConfig;
use enhancer_core::{Error, Result};
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{runtime, trace as sdktrace, Resource};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const SERVICE_NAME: &str = "prompt-enhancer";

/// Build the filter, preferring `RUST_LOG` over the configured directive.
fn env_filter(config: &TelemetryConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter))
}

/// Install the global subscriber: stdout logs (text or JSON) plus an
/// optional OTLP span exporter.
pub fn configure_tracing(config: &TelemetryConfig) -> Result<()> {
    let fmt_layer = if config.json_logs {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };

    let registry = tracing_subscriber::registry()
        .with(env_filter(config))
        .with(fmt_layer);

    match config.otlp_endpoint.as_deref().filter(|e| !e.trim().is_empty()) {
        Some(endpoint) => {
            let provider = opentelemetry_otlp::new_pipeline()
                .tracing()
                .with_exporter(
                    opentelemetry_otlp::new_exporter()
                        .tonic()
                        .with_endpoint(endpoint),
                )
                .with_trace_config(sdktrace::Config::default().with_resource(Resource::new(
                    vec![KeyValue::new("service.name", SERVICE_NAME)],
                )))
                .install_batch(runtime::Tokio)
                .map_err(|e| Error::Config(format!("Failed to install OTLP pipeline: {}", e)))?;

            let tracer = provider.tracer(SERVICE_NAME);
            opentelemetry::global::set_tracer_provider(provider);
            registry
                .with(tracing_opentelemetry::layer().with_tracer(tracer))
                .try_init()
                .map_err(|e| Error::Config(format!("Failed to install subscriber: {}", e)))?;
            tracing::info!(endpoint = %endpoint, "OpenTelemetry tracing enabled");
        }
        None => {
            registry
                .try_init()
                .map_err(|e| Error::Config(format!("Failed to install subscriber: {}", e)))?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_falls_back_to_config() {
        std::env::remove_var("RUST_LOG");
        let config = TelemetryConfig {
            log_filter: "warn,enhancer=trace".to_string(),
            ..TelemetryConfig::default()
        };
        assert!(env_filter(&config).to_string().contains("enhancer=trace"));
    }
}
