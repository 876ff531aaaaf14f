//! The seam between the tracker and whatever serves generations.

use async_trait::async_trait;
use imagine_core::job::{Choice, DerivativeKind};
use imagine_core::status::StatusReport;

/// Operations the tracker needs from the generation service.
///
/// Every method is a single request; implementations must not retry.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Submit a prompt. Returns the remote handle.
    async fn imagine(&self, prompt: &str) -> Result<String, BackendError>;

    /// Fetch the current status of a handle.
    async fn status(&self, hash: &str) -> Result<StatusReport, BackendError>;

    /// Request an upscale or variation of one grid image. Returns the
    /// handle of the new job.
    async fn derive(
        &self,
        kind: DerivativeKind,
        hash: &str,
        choice: Choice,
    ) -> Result<String, BackendError>;
}

/// Errors surfaced by a [`GenerationBackend`].
///
/// The display text is what ends up as a failed job's reason.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The transport failed before a response arrived.
    #[error("{0}")]
    Request(#[from] reqwest::Error),

    /// A non-2xx response without an error message.
    #[error("HTTP error! status: {0}")]
    Http(u16),

    /// The service answered with an `error` message.
    #[error("{0}")]
    Api(String),

    /// The response body could not be understood.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// A successful response that did not carry a handle.
    #[error("Missing hash from API")]
    MissingHash,
}
