//! Tests for the in-memory `JobStore` and its sweeper.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use imagine_api::background::job_sweep;
use imagine_api::job_store::JobStore;
use imagine_core::job::JobKind;
use imagine_core::status::{ImageResult, RemoteStatus, StatusReport};
use tokio_util::sync::CancellationToken;

fn report(status: RemoteStatus, progress: Option<f64>) -> StatusReport {
    StatusReport {
        status,
        progress,
        result: None,
        status_reason: None,
        next_actions: None,
        hash: None,
    }
}

#[tokio::test]
async fn add_and_get_round_trip() {
    let store = JobStore::new();
    store.add("h1", "a cat", JobKind::Original, None).await;

    let record = store.get("h1").await.unwrap();

    assert_eq!(record.prompt, "a cat");
    assert_eq!(record.status, RemoteStatus::Sent);
    assert_eq!(record.progress, 0);
    assert!(store.get("missing").await.is_none());
}

#[tokio::test]
async fn record_status_applies_progress_and_result() {
    let store = JobStore::new();
    store.add("h1", "a cat", JobKind::Original, None).await;

    store
        .record_status("h1", &report(RemoteStatus::Progress, Some(41.6)))
        .await;
    assert_eq!(store.get("h1").await.unwrap().progress, 42);

    let mut done = report(RemoteStatus::Done, Some(100.0));
    done.result = Some(ImageResult {
        url: "https://cdn/a.png".into(),
        filename: None,
    });
    let record = store.record_status("h1", &done).await;

    assert_eq!(record.status, RemoteStatus::Done);
    assert_eq!(record.result_url.as_deref(), Some("https://cdn/a.png"));
    assert_eq!(record.prompt, "a cat");
}

#[tokio::test]
async fn record_status_clamps_out_of_range_progress() {
    let store = JobStore::new();

    let record = store
        .record_status("h1", &report(RemoteStatus::Progress, Some(250.0)))
        .await;

    assert_eq!(record.progress, 100);
}

#[tokio::test]
async fn record_status_for_unknown_hash_creates_record() {
    let store = JobStore::new();

    let mut failed = report(RemoteStatus::Error, None);
    failed.status_reason = Some("Moderation".into());
    let record = store.record_status("ghost", &failed).await;

    assert_eq!(record.kind, JobKind::Original);
    assert_eq!(record.error_reason.as_deref(), Some("Moderation"));
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn sweep_removes_only_stale_records() {
    let store = JobStore::new();
    store.add("old", "a", JobKind::Original, None).await;
    let cutoff = Utc::now() + chrono::Duration::seconds(1);

    assert_eq!(store.sweep_older_than(cutoff).await, 1);
    assert!(store.is_empty().await);

    store.add("fresh", "b", JobKind::Original, None).await;
    let past = Utc::now() - chrono::Duration::hours(1);
    assert_eq!(store.sweep_older_than(past).await, 0);
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn sweeper_evicts_and_stops_on_cancel() {
    let store = Arc::new(JobStore::new());
    store.add("h1", "a", JobKind::Original, None).await;

    let cancel = CancellationToken::new();
    let handle = tokio::spawn(job_sweep::run(
        Arc::clone(&store),
        Duration::from_millis(10),
        chrono::Duration::seconds(-1),
        cancel.clone(),
    ));

    for _ in 0..50 {
        if store.is_empty().await {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(store.is_empty().await);

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("sweeper should stop after cancel")
        .unwrap();
}
