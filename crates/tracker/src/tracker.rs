//! Client job tracker.
//!
//! [`JobTracker`] owns an ordered list of [`Job`]s for one client session.
//! Each job with a remote handle is driven to a terminal state by a chain
//! of poll tasks: one status request at a time, the next one scheduled
//! only after the previous response has been applied. At most one poll
//! timer exists per job; scheduling a new one aborts the old.
//!
//! All mutation happens under a single [`tokio::sync::Mutex`] that is
//! never held across a backend call. Responses that arrive for a job that
//! is gone, already terminal, or after [`JobTracker::shutdown`] are
//! discarded.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use imagine_core::job::{Choice, DerivativeKind, Job};
use imagine_core::status::{RemoteStatus, StatusReport};
use imagine_core::types::JobId;
use tokio::sync::{broadcast, Mutex};
use tokio::task::AbortHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::backend::{BackendError, GenerationBackend};
use crate::config::TrackerConfig;
use crate::error::TrackerError;
use crate::events::TrackerEvent;

/// Reason recorded when a job outlives [`TrackerConfig::poll_timeout`],
/// including while a status request is still outstanding.
pub const TIMEOUT_REASON: &str = "Generation timeout";

/// Reason recorded when the service reports `error` without a reason.
pub const UNKNOWN_ERROR_REASON: &str = "Unknown error";

/// Identifies one follow-on request: which job, which operation, which
/// grid image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActionKey {
    pub job_id: JobId,
    pub kind: DerivativeKind,
    pub choice: Choice,
}

impl fmt::Display for ActionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} of job {}", self.kind, self.choice, self.job_id)
    }
}

/// Tracks generation jobs for one client session.
///
/// Cheap to clone; clones share the same job list.
#[derive(Clone)]
pub struct JobTracker {
    shared: Arc<Shared>,
}

struct Shared {
    backend: Arc<dyn GenerationBackend>,
    config: TrackerConfig,
    state: Mutex<TrackerState>,
    event_tx: broadcast::Sender<TrackerEvent>,
    /// Cancelled by [`JobTracker::shutdown`].
    cancel: CancellationToken,
}

#[derive(Default)]
struct TrackerState {
    /// Display order: newest submission first, derivatives right after
    /// their parent.
    jobs: Vec<Job>,
    timers: HashMap<JobId, PollTimer>,
    /// When the first poll of each job ran.
    poll_started: HashMap<JobId, Instant>,
    in_flight: HashSet<ActionKey>,
    next_seq: u64,
}

/// A scheduled poll. `seq` lets a woken task tell whether it is still the
/// current timer for its job.
struct PollTimer {
    seq: u64,
    handle: AbortHandle,
}

impl TrackerState {
    fn position(&self, job_id: JobId) -> Option<usize> {
        self.jobs.iter().position(|j| j.id == job_id)
    }

    fn job(&self, job_id: JobId) -> Option<&Job> {
        self.jobs.iter().find(|j| j.id == job_id)
    }

    fn job_mut(&mut self, job_id: JobId) -> Option<&mut Job> {
        self.jobs.iter_mut().find(|j| j.id == job_id)
    }

    fn is_pending(&self, job_id: JobId) -> bool {
        self.job(job_id).is_some_and(|j| !j.is_terminal())
    }

    fn clear_timer(&mut self, job_id: JobId) {
        if let Some(timer) = self.timers.remove(&job_id) {
            timer.handle.abort();
        }
        self.poll_started.remove(&job_id);
    }
}

impl JobTracker {
    pub fn new(backend: Arc<dyn GenerationBackend>) -> Self {
        Self::with_config(backend, TrackerConfig::default())
    }

    pub fn with_config(backend: Arc<dyn GenerationBackend>, config: TrackerConfig) -> Self {
        let (event_tx, _) = broadcast::channel(config.event_capacity);
        Self {
            shared: Arc::new(Shared {
                backend,
                config,
                state: Mutex::new(TrackerState::default()),
                event_tx,
                cancel: CancellationToken::new(),
            }),
        }
    }

    /// Subscribe to job state changes.
    pub fn subscribe(&self) -> broadcast::Receiver<TrackerEvent> {
        self.shared.event_tx.subscribe()
    }

    /// Snapshot of every job in display order.
    pub async fn jobs(&self) -> Vec<Job> {
        self.shared.state.lock().await.jobs.clone()
    }

    pub async fn job(&self, job_id: JobId) -> Option<Job> {
        self.shared.state.lock().await.job(job_id).cloned()
    }

    /// Whether a follow-on request for `key` is waiting on the backend.
    pub async fn is_action_loading(&self, key: ActionKey) -> bool {
        self.shared.state.lock().await.in_flight.contains(&key)
    }

    /// Whether a poll is currently scheduled for the job.
    pub async fn has_scheduled_poll(&self, job_id: JobId) -> bool {
        self.shared.state.lock().await.timers.contains_key(&job_id)
    }

    pub fn is_shut_down(&self) -> bool {
        self.shared.cancel.is_cancelled()
    }

    /// Submit a new generation.
    ///
    /// The job is added at the head of the list in `Pending` state before
    /// the backend is called. If the backend accepts it, polling starts
    /// immediately; otherwise the job is failed with the backend's
    /// message. Either way the returned snapshot reflects that outcome.
    pub async fn submit(&self, prompt: &str) -> Result<Job, TrackerError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(TrackerError::EmptyPrompt);
        }

        let job = Job::original(prompt);
        let job_id = job.id;
        self.shared.state.lock().await.jobs.insert(0, job.clone());
        self.emit(TrackerEvent::Added { job });
        tracing::info!(%job_id, prompt, "Submitting generation");

        let result = self.shared.backend.imagine(prompt).await;

        let mut state = self.shared.state.lock().await;
        match result {
            Ok(hash) => {
                if let Some(job) = state.job_mut(job_id) {
                    job.hash = Some(hash.clone());
                }
                tracing::info!(%job_id, hash = %hash, "Generation accepted");
                if !self.is_shut_down() {
                    self.schedule_poll(&mut state, job_id, hash, Duration::ZERO);
                }
            }
            Err(e) => {
                tracing::warn!(%job_id, error = %e, "Generation request failed");
                self.fail_locked(&mut state, job_id, e.to_string());
            }
        }

        state
            .job(job_id)
            .cloned()
            .ok_or(TrackerError::UnknownJob(job_id))
    }

    /// Request an upscale or variation of grid image `choice` of a
    /// completed original job.
    ///
    /// `choice` outside `1..=4`, an unknown parent, a parent without a
    /// handle and a parent that is not a completed original are all
    /// rejected before any request is made. On success the new job is
    /// inserted right after its parent and polled. On backend failure the
    /// reason is recorded as the parent's `last_error` and no job is
    /// created.
    pub async fn request_derivative(
        &self,
        parent_id: JobId,
        kind: DerivativeKind,
        choice: u8,
    ) -> Result<JobId, TrackerError> {
        let choice = Choice::new(choice).map_err(TrackerError::InvalidChoice)?;
        let key = ActionKey {
            job_id: parent_id,
            kind,
            choice,
        };

        let parent_hash = {
            let mut state = self.shared.state.lock().await;
            let parent = state
                .job(parent_id)
                .ok_or(TrackerError::UnknownJob(parent_id))?;
            let hash = parent
                .hash
                .clone()
                .ok_or(TrackerError::MissingHandle(parent_id))?;
            parent
                .ensure_derivable()
                .map_err(TrackerError::NotDerivable)?;
            if !state.in_flight.insert(key) {
                return Err(TrackerError::ActionInFlight(key));
            }
            hash
        };

        tracing::info!(%parent_id, hash = %parent_hash, %kind, %choice, "Requesting derivative");

        // The request runs on its own task so the action is released even
        // if the caller stops waiting for it.
        let tracker = self.clone();
        let request = tokio::spawn(async move {
            let result = tracker
                .shared
                .backend
                .derive(kind, &parent_hash, choice)
                .await;
            tracker.finish_derivative(key, result).await
        });

        match request.await {
            Ok(outcome) => outcome,
            Err(source) => {
                self.shared.state.lock().await.in_flight.remove(&key);
                Err(TrackerError::Interrupted { key, source })
            }
        }
    }

    /// Apply the backend's answer to a derivative request and release
    /// its action key.
    async fn finish_derivative(
        &self,
        key: ActionKey,
        result: Result<String, BackendError>,
    ) -> Result<JobId, TrackerError> {
        let ActionKey {
            job_id: parent_id,
            kind,
            choice,
        } = key;

        let mut state = self.shared.state.lock().await;
        state.in_flight.remove(&key);

        let hash = match result {
            Ok(hash) => hash,
            Err(e) => {
                let reason = e.to_string();
                tracing::warn!(%parent_id, %kind, %choice, error = %reason, "Derivative request failed");
                if let Some(parent) = state.job_mut(parent_id) {
                    parent.last_error = Some(reason.clone());
                }
                self.emit(TrackerEvent::DerivativeRejected {
                    parent_id,
                    kind,
                    choice,
                    reason,
                });
                return Err(TrackerError::Backend { kind, source: e });
            }
        };

        let parent_pos = state
            .position(parent_id)
            .ok_or(TrackerError::UnknownJob(parent_id))?;
        let child = Job::derivative(&state.jobs[parent_pos], kind, choice, hash.clone())
            .map_err(TrackerError::NotDerivable)?;
        let child_id = child.id;
        state.jobs.insert(parent_pos + 1, child.clone());
        self.emit(TrackerEvent::Added { job: child });
        tracing::info!(%parent_id, %child_id, hash = %hash, "Derivative accepted");

        if !self.is_shut_down() {
            self.schedule_poll(&mut state, child_id, hash, Duration::ZERO);
        }
        Ok(child_id)
    }

    /// Cancel every scheduled poll. Responses still in flight are
    /// discarded when they arrive.
    pub async fn shutdown(&self) {
        tracing::info!("Shutting down job tracker");
        self.shared.cancel.cancel();

        let mut state = self.shared.state.lock().await;
        for (job_id, timer) in state.timers.drain() {
            tracing::debug!(%job_id, "Cancelling scheduled poll");
            timer.handle.abort();
        }
        state.poll_started.clear();
    }

    // ---- private helpers ----

    fn emit(&self, event: TrackerEvent) {
        // No subscribers is fine.
        let _ = self.shared.event_tx.send(event);
    }

    /// Schedule the next poll of `job_id` after `delay`, replacing any
    /// poll already scheduled for it.
    fn schedule_poll(
        &self,
        state: &mut TrackerState,
        job_id: JobId,
        hash: String,
        delay: Duration,
    ) {
        if let Some(previous) = state.timers.remove(&job_id) {
            previous.handle.abort();
        }
        state.next_seq += 1;
        let seq = state.next_seq;

        let tracker = self.clone();
        let cancel = self.shared.cancel.clone();
        let task = tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = tokio::time::sleep(delay) => {}
                }
            }

            {
                let mut state = tracker.shared.state.lock().await;
                let current = state.timers.get(&job_id).is_some_and(|t| t.seq == seq);
                if !current {
                    // Superseded or cleared while waiting.
                    return;
                }
                state.timers.remove(&job_id);
            }

            tracker.poll_once(job_id, &hash).await;
        });

        // The task cannot observe its own entry before this insert: it
        // needs the state lock, which the caller holds.
        state.timers.insert(
            job_id,
            PollTimer {
                seq,
                handle: task.abort_handle(),
            },
        );
    }

    /// Issue one status request for `job_id` and apply the answer.
    async fn poll_once(&self, job_id: JobId, hash: &str) {
        let started = {
            let mut state = self.shared.state.lock().await;
            if !state.is_pending(job_id) {
                return;
            }
            *state.poll_started.entry(job_id).or_insert_with(Instant::now)
        };

        let budget = self.shared.config.poll_timeout;
        if started.elapsed() > budget {
            tracing::warn!(%job_id, hash, "Generation timed out");
            let mut state = self.shared.state.lock().await;
            self.fail_locked(&mut state, job_id, TIMEOUT_REASON);
            return;
        }

        // A request that outlives the job's remaining budget counts
        // against the same deadline.
        let remaining = budget.saturating_sub(started.elapsed());
        let result = tokio::time::timeout(remaining, self.shared.backend.status(hash)).await;

        let mut state = self.shared.state.lock().await;
        if self.is_shut_down() || !state.is_pending(job_id) {
            tracing::debug!(%job_id, hash, "Discarding late status response");
            return;
        }

        match result {
            Ok(Ok(report)) => self.apply_report(&mut state, job_id, hash, report),
            Ok(Err(e)) => {
                tracing::warn!(%job_id, hash, error = %e, "Status poll failed");
                self.fail_locked(&mut state, job_id, e.to_string());
            }
            Err(_) => {
                tracing::warn!(%job_id, hash, "Generation timed out waiting for status");
                self.fail_locked(&mut state, job_id, TIMEOUT_REASON);
            }
        }
    }

    fn apply_report(
        &self,
        state: &mut TrackerState,
        job_id: JobId,
        hash: &str,
        report: StatusReport,
    ) {
        if report.status != RemoteStatus::Error {
            if let Some(raw) = report.progress {
                let advanced = state
                    .job_mut(job_id)
                    .and_then(|job| job.advance_progress(raw));
                if let Some(progress) = advanced {
                    tracing::debug!(%job_id, progress, "Job progress");
                    self.emit(TrackerEvent::Progress { job_id, progress });
                }
            }
        }

        match (report.status, report.result) {
            (RemoteStatus::Done, Some(result)) => {
                let actions = report.next_actions.unwrap_or_default();
                let completed = state
                    .job_mut(job_id)
                    .is_some_and(|job| job.complete(result.url.clone(), actions.clone()));
                if completed {
                    state.clear_timer(job_id);
                    tracing::info!(%job_id, hash, image_url = %result.url, "Job completed");
                    self.emit(TrackerEvent::Completed {
                        job_id,
                        image_url: result.url,
                        actions,
                    });
                }
            }
            (RemoteStatus::Error, _) => {
                let reason = report
                    .status_reason
                    .filter(|r| !r.is_empty())
                    .unwrap_or_else(|| UNKNOWN_ERROR_REASON.to_string());
                tracing::warn!(%job_id, hash, reason = %reason, "Job failed remotely");
                self.fail_locked(state, job_id, reason);
            }
            (status, _) => {
                tracing::trace!(%job_id, hash, status = status.as_str(), "Job still pending");
                self.schedule_poll(
                    state,
                    job_id,
                    hash.to_string(),
                    self.shared.config.poll_interval,
                );
            }
        }
    }

    fn fail_locked(&self, state: &mut TrackerState, job_id: JobId, reason: impl Into<String>) {
        state.clear_timer(job_id);
        let Some(job) = state.job_mut(job_id) else {
            return;
        };
        let reason = reason.into();
        if job.fail(reason.clone()) {
            let progress = job.progress();
            self.emit(TrackerEvent::Failed {
                job_id,
                reason,
                progress,
            });
        }
    }
}
