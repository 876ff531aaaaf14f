//! Periodic eviction of stale job store records.
//!
//! Runs on a fixed interval using `tokio::time::interval` and removes
//! records whose last update is older than the configured retention.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::job_store::JobStore;

/// Run the job sweep loop until `cancel` is triggered.
pub async fn run(
    store: Arc<JobStore>,
    interval: Duration,
    retention: chrono::Duration,
    cancel: CancellationToken,
) {
    tracing::info!(
        retention_hours = retention.num_hours(),
        interval_secs = interval.as_secs(),
        "Job sweep started"
    );

    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Job sweep stopping");
                break;
            }
            _ = ticker.tick() => {
                let cutoff = Utc::now() - retention;
                let removed = store.sweep_older_than(cutoff).await;
                if removed > 0 {
                    tracing::info!(removed, "Job sweep: evicted stale records");
                } else {
                    tracing::debug!("Job sweep: nothing to evict");
                }
            }
        }
    }
}
