//! Shared JSON-over-HTTP transport for remote collaborators.

use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use url::Url;

use enhancer_core::{Error, Result};

/// Thin JSON client bound to one service base URL.
#[derive(Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base: Url,
    service: &'static str,
}

impl HttpBackend {
    /// Create a client for `base_url` with a per-request timeout.
    pub fn new(service: &'static str, base_url: &str, timeout: Duration) -> Result<Self> {
        let mut base = Url::parse(base_url)
            .map_err(|e| Error::Config(format!("invalid {} url '{}': {}", service, base_url, e)))?;
        // Url::join drops the last segment unless the path ends with '/'.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build {} client: {}", service, e)))?;

        Ok(Self {
            client,
            base,
            service,
        })
    }

    /// Resolve an endpoint path against the base URL.
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .map_err(|e| Error::Config(format!("invalid {} endpoint '{}': {}", self.service, path, e)))
    }

    /// POST a JSON body and decode a JSON response.
    pub async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::backend(format!(
                "{} returned {}: {}",
                self.service,
                status,
                detail.chars().take(200).collect::<String>()
            )));
        }

        response
            .json::<R>()
            .await
            .map_err(|e| Error::backend(format!("{} sent an invalid body: {}", self.service, e)))
    }

    /// GET an endpoint and only check for success.
    pub async fn ping(&self, path: &str) -> Result<()> {
        let url = self.endpoint(path)?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(Error::backend(format!("{} health returned {}", self.service, response.status())))
        }
    }

    fn transport_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::timeout(format!("{} request timed out", self.service))
        } else {
            Error::backend(format!("{} request failed: {}", self.service, e))
        }
    }
}
