//! Client-side job model.
//!
//! A [`Job`] is one generation (or upscale/variation of a generation)
//! tracked by a client session. Its lifecycle is captured by [`JobState`],
//! a sum type that makes impossible combinations (completed without an
//! image, failed without a reason) unrepresentable.
//!
//! Terminal states (`Completed`, `Failed`) are absorbing: every transition
//! method returns `false` and leaves the job untouched once one is reached.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::status::{clamp_progress, NextAction};
use crate::types::{new_job_id, JobId};

// ---------------------------------------------------------------------------
// Kinds and choices
// ---------------------------------------------------------------------------

/// What produced a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Original,
    Upscale,
    Variation,
}

/// The follow-on operations that can be requested on a finished job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DerivativeKind {
    Upscale,
    Variation,
}

impl DerivativeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DerivativeKind::Upscale => "upscale",
            DerivativeKind::Variation => "variation",
        }
    }

    pub fn job_kind(self) -> JobKind {
        match self {
            DerivativeKind::Upscale => JobKind::Upscale,
            DerivativeKind::Variation => JobKind::Variation,
        }
    }
}

impl std::fmt::Display for DerivativeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Smallest valid grid position.
pub const MIN_CHOICE: u8 = 1;

/// Largest valid grid position (the service renders a 2x2 grid).
pub const MAX_CHOICE: u8 = 4;

/// Index of one image in a generated 2x2 grid, always within `1..=4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Choice(u8);

impl Choice {
    pub fn new(value: u8) -> Result<Self, CoreError> {
        if (MIN_CHOICE..=MAX_CHOICE).contains(&value) {
            Ok(Self(value))
        } else {
            Err(CoreError::Validation(format!(
                "Choice must be between {MIN_CHOICE} and {MAX_CHOICE} (got {value})"
            )))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Choice {
    type Error = CoreError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Choice> for u8 {
    fn from(choice: Choice) -> Self {
        choice.0
    }
}

impl std::fmt::Display for Choice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Prompt text shown for a derivative of `parent_prompt`.
pub fn derivative_prompt(kind: DerivativeKind, choice: Choice, parent_prompt: &str) -> String {
    match kind {
        DerivativeKind::Upscale => format!("Upscaled version {choice} of \"{parent_prompt}\""),
        DerivativeKind::Variation => format!("Variation {choice} of \"{parent_prompt}\""),
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Lifecycle of a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum JobState {
    Pending {
        progress: u8,
    },
    Completed {
        image_url: String,
        actions: Vec<NextAction>,
    },
    /// `progress` is the last value seen before the failure.
    Failed {
        reason: String,
        progress: u8,
    },
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobState::Pending { .. })
    }

    pub fn progress(&self) -> u8 {
        match self {
            JobState::Pending { progress } | JobState::Failed { progress, .. } => *progress,
            JobState::Completed { .. } => 100,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            JobState::Pending { .. } => "pending",
            JobState::Completed { .. } => "completed",
            JobState::Failed { .. } => "failed",
        }
    }
}

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

/// A job tracked by a client session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    /// Remote handle; absent until the service accepts the request.
    pub hash: Option<String>,
    pub prompt: String,
    pub kind: JobKind,
    pub state: JobState,
    /// The original job this one was derived from.
    pub parent_id: Option<JobId>,
    pub choice: Option<Choice>,
    /// Most recent failed follow-on request against this job. Does not
    /// affect `state`.
    pub last_error: Option<String>,
}

impl Job {
    /// A fresh, pending original generation.
    pub fn original(prompt: impl Into<String>) -> Self {
        Self {
            id: new_job_id(),
            hash: None,
            prompt: prompt.into(),
            kind: JobKind::Original,
            state: JobState::Pending { progress: 0 },
            parent_id: None,
            choice: None,
            last_error: None,
        }
    }

    /// A pending derivative of `parent`, already holding its remote handle.
    ///
    /// The parent must be an original job that has completed.
    pub fn derivative(
        parent: &Job,
        kind: DerivativeKind,
        choice: Choice,
        hash: String,
    ) -> Result<Self, CoreError> {
        parent.ensure_derivable()?;

        Ok(Self {
            id: new_job_id(),
            hash: Some(hash),
            prompt: derivative_prompt(kind, choice, &parent.prompt),
            kind: kind.job_kind(),
            state: JobState::Pending { progress: 0 },
            parent_id: Some(parent.id),
            choice: Some(choice),
            last_error: None,
        })
    }

    /// Check that upscales/variations may be requested on this job.
    pub fn ensure_derivable(&self) -> Result<(), CoreError> {
        if self.kind != JobKind::Original {
            return Err(CoreError::InvalidTransition(format!(
                "Only original jobs can be upscaled or varied (job {} is a {:?})",
                self.id, self.kind
            )));
        }
        if !matches!(self.state, JobState::Completed { .. }) {
            return Err(CoreError::InvalidTransition(format!(
                "Job {} is {}, not completed",
                self.id,
                self.state.label()
            )));
        }
        Ok(())
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn progress(&self) -> u8 {
        self.state.progress()
    }

    /// Record a reported progress value.
    ///
    /// The value is rounded and clamped to `0..=100`; progress never moves
    /// backwards. Returns the new value when it changed.
    pub fn advance_progress(&mut self, raw: f64) -> Option<u8> {
        let JobState::Pending { progress } = &mut self.state else {
            return None;
        };
        let next = clamp_progress(raw);
        if next > *progress {
            *progress = next;
            Some(next)
        } else {
            None
        }
    }

    /// Move to `Completed`. Returns `false` if already terminal.
    pub fn complete(&mut self, image_url: String, actions: Vec<NextAction>) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.state = JobState::Completed { image_url, actions };
        true
    }

    /// Move to `Failed`, freezing the current progress. Returns `false` if
    /// already terminal.
    pub fn fail(&mut self, reason: impl Into<String>) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.state = JobState::Failed {
            reason: reason.into(),
            progress: self.progress(),
        };
        true
    }
}
