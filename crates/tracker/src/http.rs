//! [`GenerationBackend`] over the `imagine-api` proxy endpoints.

use async_trait::async_trait;
use imagine_core::job::{Choice, DerivativeKind};
use imagine_core::status::StatusReport;
use serde_json::Value;

use crate::backend::{BackendError, GenerationBackend};

/// HTTP client for `POST /generate`, `GET /status`, `POST /upscale` and
/// `POST /variation` under a common base URL (e.g.
/// `http://localhost:3000/api`).
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    // ---- private helpers ----

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    /// Decode a JSON body, preferring its `error` message over the HTTP
    /// status when both indicate failure.
    async fn read_json(response: reqwest::Response) -> Result<Value, BackendError> {
        let status = response.status();
        let body: Value = response.json().await?;

        if let Some(message) = body.get("error").and_then(Value::as_str) {
            return Err(BackendError::Api(message.to_string()));
        }
        if !status.is_success() {
            return Err(BackendError::Http(status.as_u16()));
        }
        Ok(body)
    }

    fn hash_of(body: &Value) -> Result<String, BackendError> {
        body.get("hash")
            .and_then(Value::as_str)
            .filter(|h| !h.is_empty())
            .map(str::to_string)
            .ok_or(BackendError::MissingHash)
    }
}

#[async_trait]
impl GenerationBackend for HttpBackend {
    async fn imagine(&self, prompt: &str) -> Result<String, BackendError> {
        let response = self
            .client
            .post(self.endpoint("generate"))
            .json(&serde_json::json!({ "prompt": prompt }))
            .send()
            .await?;

        let body = Self::read_json(response).await?;
        let hash = Self::hash_of(&body)?;
        tracing::debug!(hash = %hash, "Generation accepted");
        Ok(hash)
    }

    async fn status(&self, hash: &str) -> Result<StatusReport, BackendError> {
        let response = self
            .client
            .get(self.endpoint("status"))
            .query(&[("hash", hash)])
            .send()
            .await?;

        let body = Self::read_json(response).await?;
        serde_json::from_value(body).map_err(|e| BackendError::InvalidResponse(e.to_string()))
    }

    async fn derive(
        &self,
        kind: DerivativeKind,
        hash: &str,
        choice: Choice,
    ) -> Result<String, BackendError> {
        let response = self
            .client
            .post(self.endpoint(kind.as_str()))
            .json(&serde_json::json!({ "hash": hash, "choice": choice.get() }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(BackendError::Http(response.status().as_u16()));
        }

        let body: Value = response.json().await?;
        Self::hash_of(&body)
    }
}
