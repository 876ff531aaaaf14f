//! In-memory record of jobs that passed through the proxy.
//!
//! One [`JobStore`] is created per process in `main` and injected through
//! [`AppState`](crate::state::AppState). Records are keyed by remote
//! handle and evicted by the sweeper in
//! [`background::job_sweep`](crate::background::job_sweep) once they go
//! untouched for longer than the configured retention.

use std::collections::HashMap;

use chrono::Utc;
use imagine_core::job::JobKind;
use imagine_core::status::{clamp_progress, RemoteStatus, StatusReport};
use imagine_core::types::Timestamp;
use serde::Serialize;
use tokio::sync::RwLock;

/// A job as last observed by the proxy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobRecord {
    pub hash: String,
    pub prompt: String,
    pub kind: JobKind,
    pub status: RemoteStatus,
    pub progress: u8,
    pub result_url: Option<String>,
    pub parent_hash: Option<String>,
    pub error_reason: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Thread-safe map of job records keyed by remote handle.
pub struct JobStore {
    jobs: RwLock<HashMap<String, JobRecord>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
        }
    }

    /// Record a job the service just accepted.
    pub async fn add(
        &self,
        hash: &str,
        prompt: &str,
        kind: JobKind,
        parent_hash: Option<&str>,
    ) -> JobRecord {
        tracing::info!(hash, kind = ?kind, "Adding job to store");
        let now = Utc::now();
        let record = JobRecord {
            hash: hash.to_string(),
            prompt: prompt.to_string(),
            kind,
            status: RemoteStatus::Sent,
            progress: 0,
            result_url: None,
            parent_hash: parent_hash.map(str::to_string),
            error_reason: None,
            created_at: now,
            updated_at: now,
        };
        self.jobs
            .write()
            .await
            .insert(record.hash.clone(), record.clone());
        record
    }

    pub async fn get(&self, hash: &str) -> Option<JobRecord> {
        self.jobs.read().await.get(hash).cloned()
    }

    /// Apply a status observation.
    ///
    /// Handles the proxy has never seen (e.g. issued before a restart) are
    /// recorded as original jobs with an empty prompt.
    pub async fn record_status(&self, hash: &str, report: &StatusReport) -> JobRecord {
        let now = Utc::now();
        let mut jobs = self.jobs.write().await;

        let record = jobs.entry(hash.to_string()).or_insert_with(|| {
            tracing::warn!(hash, "Creating job record during status update");
            JobRecord {
                hash: hash.to_string(),
                prompt: String::new(),
                kind: JobKind::Original,
                status: RemoteStatus::Sent,
                progress: 0,
                result_url: None,
                parent_hash: None,
                error_reason: None,
                created_at: now,
                updated_at: now,
            }
        });

        record.status = report.status.clone();
        if let Some(progress) = report.progress {
            record.progress = clamp_progress(progress);
        }
        if let Some(url) = report.result_url() {
            record.result_url = Some(url.to_string());
        }
        if report.status == RemoteStatus::Error {
            record.error_reason = report.status_reason.clone();
        }
        record.updated_at = now;

        tracing::debug!(
            hash,
            status = record.status.as_str(),
            progress = record.progress,
            "Updated job in store",
        );
        record.clone()
    }

    /// All records, newest first.
    pub async fn list(&self) -> Vec<JobRecord> {
        let mut records: Vec<JobRecord> = self.jobs.read().await.values().cloned().collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }

    /// Remove records last updated before `cutoff`. Returns how many were
    /// removed.
    pub async fn sweep_older_than(&self, cutoff: Timestamp) -> usize {
        let mut jobs = self.jobs.write().await;
        let before = jobs.len();
        jobs.retain(|hash, record| {
            let keep = record.updated_at >= cutoff;
            if !keep {
                tracing::debug!(hash = %hash, "Evicting stale job record");
            }
            keep
        });
        before - jobs.len()
    }
}

impl Default for JobStore {
    fn default() -> Self {
        Self::new()
    }
}
