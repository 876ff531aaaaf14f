//! Events published by the job tracker.
//!
//! Subscribers receive them through [`JobTracker::subscribe`]. Slow
//! subscribers lag and miss events; the tracker never blocks on them.
//!
//! [`JobTracker::subscribe`]: crate::JobTracker::subscribe

use imagine_core::job::{Choice, DerivativeKind, Job};
use imagine_core::status::NextAction;
use imagine_core::types::JobId;
use serde::Serialize;

/// A state change of a tracked job.
#[derive(Debug, Clone, Serialize)]
pub enum TrackerEvent {
    /// A job was added to the list (submission or accepted derivative).
    Added { job: Job },

    /// A pending job reported higher progress.
    Progress { job_id: JobId, progress: u8 },

    /// A job finished with an image.
    Completed {
        job_id: JobId,
        image_url: String,
        actions: Vec<NextAction>,
    },

    /// A job failed. `progress` is the value it froze at.
    Failed {
        job_id: JobId,
        reason: String,
        progress: u8,
    },

    /// A follow-on request against `parent_id` failed; no job was created.
    DerivativeRejected {
        parent_id: JobId,
        kind: DerivativeKind,
        choice: Choice,
        reason: String,
    },
}

impl TrackerEvent {
    /// The job this event concerns (the parent for rejections).
    pub fn job_id(&self) -> JobId {
        match self {
            TrackerEvent::Added { job } => job.id,
            TrackerEvent::Progress { job_id, .. }
            | TrackerEvent::Completed { job_id, .. }
            | TrackerEvent::Failed { job_id, .. } => *job_id,
            TrackerEvent::DerivativeRejected { parent_id, .. } => *parent_id,
        }
    }
}
