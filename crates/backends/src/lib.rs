#![deny(unused)]
//! Collaborator adapters for the enhancement service.
//!
//! This crate provides:
//! - JSON/HTTP clients for the classifier, selector and generator services
//! - A local keyword classifier for deployments without a remote classifier

pub mod classifier;
pub mod generator;
pub mod http;
pub mod selector;

pub use classifier::{HttpClassifier, KeywordClassifier};
pub use generator::HttpGenerator;
pub use http::HttpBackend;
pub use selector::HttpSelector;
