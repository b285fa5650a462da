//! Prompt generator adapter.

use async_trait::async_trait;
use std::time::Duration;

use enhancer_core::{
    traits::Generator,
    types::{EnhancedPrompt, GenerationRequest},
    Result,
};

use crate::http::HttpBackend;

/// Remote generator reached over JSON/HTTP.
///
/// `POST {base}/generate` produces the prompt; `GET {base}/health` is used
/// to warm the connection pool before the generate call.
pub struct HttpGenerator {
    backend: HttpBackend,
}

impl HttpGenerator {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            backend: HttpBackend::new("generator", base_url, timeout)?,
        })
    }
}

#[async_trait]
impl Generator for HttpGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<EnhancedPrompt> {
        self.backend.post_json("generate", request).await
    }

    async fn warm_up(&self) -> Result<()> {
        self.backend.ping("health").await
    }
}
