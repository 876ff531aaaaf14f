use imagine_core::error::CoreError;
use imagine_core::job::DerivativeKind;
use imagine_core::types::JobId;

use crate::backend::BackendError;
use crate::tracker::ActionKey;

/// Errors returned by [`JobTracker`](crate::JobTracker) operations.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("Prompt is required")]
    EmptyPrompt,

    /// Choice out of range, rejected before any request is made.
    #[error(transparent)]
    InvalidChoice(CoreError),

    #[error("Job {0} not found")]
    UnknownJob(JobId),

    /// The parent is not a completed original job.
    #[error(transparent)]
    NotDerivable(CoreError),

    /// The job has no remote handle yet.
    #[error("Job {0} has no remote handle")]
    MissingHandle(JobId),

    /// An action with the same key is already in flight.
    #[error("{0} is already in flight")]
    ActionInFlight(ActionKey),

    /// The derivative request failed; the reason is also recorded on the
    /// parent job.
    #[error("Failed to request {kind}: {source}")]
    Backend {
        kind: DerivativeKind,
        #[source]
        source: BackendError,
    },

    /// The task carrying the derivative request ended without an answer.
    #[error("{key} was interrupted: {source}")]
    Interrupted {
        key: ActionKey,
        #[source]
        source: tokio::task::JoinError,
    },
}
