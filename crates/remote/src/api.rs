//! REST client for the remote generation endpoints.
//!
//! Wraps `imagine`, `status`, `upscale` and `variation` using
//! [`reqwest`]. Every request carries the `api-key` header; all but
//! `status` are JSON POSTs.

use imagine_core::job::{Choice, DerivativeKind};
use imagine_core::status::StatusReport;
use serde::Deserialize;

use crate::config::RemoteConfig;

/// Path prefix shared by every endpoint of the service.
const API_PREFIX: &str = "/midjourney/v2";

/// Header carrying the API key.
const API_KEY_HEADER: &str = "api-key";

/// HTTP client for the remote generation service.
pub struct RemoteApi {
    client: reqwest::Client,
    config: RemoteConfig,
}

/// Handle issued by the service for an accepted imagine request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagineResponse {
    pub hash: String,
}

/// Upstream status code and JSON body, relayed as-is to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct RelayedResponse {
    pub status: u16,
    pub body: serde_json::Value,
}

impl RelayedResponse {
    /// The handle of the derived job, when the service accepted it.
    pub fn hash(&self) -> Option<&str> {
        self.body.get("hash").and_then(|v| v.as_str())
    }
}

/// Errors from the remote API layer.
///
/// The `Display` text is what the proxy endpoints relay to browsers.
#[derive(Debug, thiserror::Error)]
pub enum RemoteApiError {
    /// The HTTP request itself failed (network, DNS, TLS, decoding).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service answered with a non-2xx status.
    #[error("API request failed: {message}")]
    ApiError {
        status: u16,
        /// Upstream `error` field, or the status text when absent.
        message: String,
    },

    /// The body was not the JSON we expected.
    #[error("Invalid JSON response from API")]
    InvalidJson,

    /// An imagine request succeeded without issuing a handle.
    #[error("Invalid API response: missing hash")]
    MissingHash,
}

#[derive(Debug, Deserialize)]
struct ImagineBody {
    #[serde(default)]
    hash: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl RemoteApi {
    pub fn new(config: RemoteConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    /// Create an API client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, config: RemoteConfig) -> Self {
        tracing::info!(
            base_url = %config.base_url,
            api_key = %config.masked_api_key(),
            "Remote generation client configured",
        );
        Self { client, config }
    }

    /// Submit a prompt for generation.
    ///
    /// Sends `POST /imagine` and returns the handle of the new job.
    pub async fn imagine(&self, prompt: &str) -> Result<ImagineResponse, RemoteApiError> {
        let body = serde_json::json!({
            "prompt": prompt,
            "process_mode": self.config.process_mode,
            "aspect_ratio": self.config.default_aspect_ratio,
            "webhook_endpoint": "",
            "webhook_secret": "",
        });

        let response = self
            .client
            .post(self.endpoint("imagine"))
            .header(API_KEY_HEADER, &self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let raw = response.text().await?;
        tracing::debug!(status = status.as_u16(), body = %raw, "Imagine response");

        let parsed: ImagineBody = serde_json::from_str(&raw).map_err(|e| {
            tracing::error!(error = %e, "Imagine response is not JSON");
            RemoteApiError::InvalidJson
        })?;

        if !status.is_success() {
            return Err(RemoteApiError::ApiError {
                status: status.as_u16(),
                message: parsed.error.unwrap_or_else(|| status_text(status)),
            });
        }

        let hash = parsed
            .hash
            .filter(|h| !h.is_empty())
            .ok_or(RemoteApiError::MissingHash)?;

        Ok(ImagineResponse { hash })
    }

    /// Fetch the current status of a job.
    ///
    /// Sends `GET /status?hash=...`.
    pub async fn status(&self, hash: &str) -> Result<StatusReport, RemoteApiError> {
        let response = self
            .client
            .get(self.endpoint("status"))
            .header(API_KEY_HEADER, &self.config.api_key)
            .query(&[("hash", hash)])
            .send()
            .await?;

        let status = response.status();
        let raw = response.text().await?;

        if !status.is_success() {
            tracing::warn!(hash, status = status.as_u16(), body = %raw, "Status request rejected");
            return Err(RemoteApiError::ApiError {
                status: status.as_u16(),
                message: status_text(status),
            });
        }

        let report: StatusReport = serde_json::from_str(&raw).map_err(|e| {
            tracing::error!(hash, error = %e, "Status response is not a status report");
            RemoteApiError::InvalidJson
        })?;

        tracing::debug!(
            hash,
            status = report.status.as_str(),
            progress = ?report.progress,
            "Status response",
        );

        Ok(report)
    }

    /// Request an upscale or variation of one grid image.
    ///
    /// Sends `POST /upscale` or `POST /variation`. The upstream status and
    /// body are returned untouched, including non-2xx answers.
    pub async fn derive(
        &self,
        kind: DerivativeKind,
        hash: &str,
        choice: Choice,
    ) -> Result<RelayedResponse, RemoteApiError> {
        let body = serde_json::json!({
            "hash": hash,
            "choice": choice.get(),
        });

        let response = self
            .client
            .post(self.endpoint(kind.as_str()))
            .header(API_KEY_HEADER, &self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.json::<serde_json::Value>().await?;
        tracing::debug!(kind = kind.as_str(), hash, %choice, status, "Derivative response");

        Ok(RelayedResponse { status, body })
    }

    // ---- private helpers ----

    fn endpoint(&self, operation: &str) -> String {
        format!("{}{API_PREFIX}/{operation}", self.config.base_url)
    }
}

/// Reason phrase for a status code, e.g. `Bad Gateway`.
fn status_text(status: reqwest::StatusCode) -> String {
    status
        .canonical_reason()
        .unwrap_or("Unknown status")
        .to_string()
}
