//! Technique selector adapter.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use enhancer_core::{
    traits::TechniqueSelector,
    types::{SelectedTechnique, SelectionRequest},
    Result,
};

use crate::http::HttpBackend;

/// Remote selector reached over JSON/HTTP (`POST {base}/select`).
pub struct HttpSelector {
    backend: HttpBackend,
}

#[derive(Deserialize)]
struct SelectResponse {
    #[serde(default)]
    techniques: Vec<SelectedTechnique>,
}

impl HttpSelector {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            backend: HttpBackend::new("selector", base_url, timeout)?,
        })
    }
}

#[async_trait]
impl TechniqueSelector for HttpSelector {
    async fn select(&self, request: &SelectionRequest) -> Result<Vec<SelectedTechnique>> {
        let response: SelectResponse = self.backend.post_json("select", request).await?;
        Ok(response.techniques)
    }
}
