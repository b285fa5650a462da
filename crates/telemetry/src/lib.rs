#![deny(unused)]
//! Logging, tracing and metrics setup for the enhancement service.

pub mod metrics;
pub mod tracing_layer;

pub use self::metrics::setup_metrics_recorder;
pub use tracing_layer::configure_tracing;
