//! Wire shape of a remote job's status, as reported by the generation
//! service and relayed unchanged (apart from progress defaulting) by the
//! `/api/status` proxy endpoint.

use serde::{Deserialize, Serialize};

/// Lifecycle status reported by the remote generation service.
///
/// Serialized as the bare lowercase string. A status this client does not
/// know keeps its original spelling so it can be relayed as received.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RemoteStatus {
    Sent,
    Waiting,
    Queued,
    Progress,
    Done,
    Error,
    Other(String),
}

impl RemoteStatus {
    /// `done` and `error` end a remote job; everything else keeps polling.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RemoteStatus::Done | RemoteStatus::Error)
    }

    pub fn as_str(&self) -> &str {
        match self {
            RemoteStatus::Sent => "sent",
            RemoteStatus::Waiting => "waiting",
            RemoteStatus::Queued => "queued",
            RemoteStatus::Progress => "progress",
            RemoteStatus::Done => "done",
            RemoteStatus::Error => "error",
            RemoteStatus::Other(raw) => raw,
        }
    }
}

impl From<String> for RemoteStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "sent" => RemoteStatus::Sent,
            "waiting" => RemoteStatus::Waiting,
            "queued" => RemoteStatus::Queued,
            "progress" => RemoteStatus::Progress,
            "done" => RemoteStatus::Done,
            "error" => RemoteStatus::Error,
            _ => RemoteStatus::Other(raw),
        }
    }
}

impl From<RemoteStatus> for String {
    fn from(status: RemoteStatus) -> Self {
        match status {
            RemoteStatus::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

/// Result payload of a finished remote job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageResult {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

/// A follow-on operation offered by the service for a finished job,
/// e.g. `{"type": "upscale", "choices": [1, 2, 3, 4]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextAction {
    #[serde(rename = "type")]
    pub action_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<u32>>,
}

/// One status observation for a remote handle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub status: RemoteStatus,
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub result: Option<ImageResult>,
    #[serde(default)]
    pub status_reason: Option<String>,
    #[serde(default)]
    pub next_actions: Option<Vec<NextAction>>,
    #[serde(default)]
    pub hash: Option<String>,
}

impl StatusReport {
    /// URL of the finished image, present only once the job is `done`.
    pub fn result_url(&self) -> Option<&str> {
        self.result.as_ref().map(|r| r.url.as_str())
    }
}

/// Clamp a reported progress value to `0..=100` and round it.
///
/// Non-finite values map to 0.
pub fn clamp_progress(raw: f64) -> u8 {
    if !raw.is_finite() {
        return 0;
    }
    raw.round().clamp(0.0, 100.0) as u8
}
