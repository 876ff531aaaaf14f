use std::process::ExitCode;
use std::sync::Arc;

use imagine_core::job::{DerivativeKind, Job, JobState};
use imagine_core::types::JobId;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use imagine_tracker::{HttpBackend, JobTracker, TrackerError, TrackerEvent};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "imagine_tracker=info,imagine_watch=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let prompt = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if prompt.trim().is_empty() {
        eprintln!("usage: imagine-watch <prompt>");
        return ExitCode::from(2);
    }

    // --- Configuration ---
    let api_url =
        std::env::var("IMAGINE_API_URL").unwrap_or_else(|_| "http://localhost:3000/api".into());
    let follow_ups = [
        (DerivativeKind::Upscale, choice_from_env("UPSCALE_CHOICE")),
        (DerivativeKind::Variation, choice_from_env("VARIATION_CHOICE")),
    ];
    tracing::info!(api_url = %api_url, "Using imagine proxy");

    let tracker = JobTracker::new(Arc::new(HttpBackend::new(api_url)));

    let result = tokio::select! {
        result = run(&tracker, &prompt, &follow_ups) => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received SIGINT (Ctrl-C), stopping");
            Ok(false)
        }
    };

    tracker.shutdown().await;

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!(error = %e, "imagine-watch failed");
            ExitCode::FAILURE
        }
    }
}

/// Submit `prompt`, follow it to a terminal state, then run any requested
/// follow-ups against the finished grid. Returns whether every job
/// completed.
async fn run(
    tracker: &JobTracker,
    prompt: &str,
    follow_ups: &[(DerivativeKind, Option<u8>)],
) -> Result<bool, TrackerError> {
    let mut events = tracker.subscribe();

    let job = tracker.submit(prompt).await?;
    let original = follow(tracker, &mut events, job.id).await?;
    report(&original);
    if !matches!(original.state, JobState::Completed { .. }) {
        return Ok(false);
    }

    let mut all_completed = true;
    for (kind, choice) in follow_ups {
        let Some(choice) = choice else { continue };
        let child_id = tracker
            .request_derivative(original.id, *kind, *choice)
            .await?;
        let child = follow(tracker, &mut events, child_id).await?;
        report(&child);
        all_completed &= matches!(child.state, JobState::Completed { .. });
    }

    Ok(all_completed)
}

/// Wait until `job_id` reaches a terminal state, logging progress.
async fn follow(
    tracker: &JobTracker,
    events: &mut broadcast::Receiver<TrackerEvent>,
    job_id: JobId,
) -> Result<Job, TrackerError> {
    loop {
        let job = tracker
            .job(job_id)
            .await
            .ok_or(TrackerError::UnknownJob(job_id))?;
        if job.is_terminal() {
            return Ok(job);
        }

        match events.recv().await {
            Ok(TrackerEvent::Progress { job_id: id, progress }) if id == job_id => {
                tracing::info!(%job_id, progress, "Progress");
            }
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "Event receiver lagged");
            }
            Err(RecvError::Closed) => {
                return tracker
                    .job(job_id)
                    .await
                    .ok_or(TrackerError::UnknownJob(job_id));
            }
        }
    }
}

fn report(job: &Job) {
    match &job.state {
        JobState::Completed { image_url, actions } => {
            println!("{}: {image_url}", job.prompt);
            for action in actions {
                if let Some(choices) = &action.choices {
                    println!("  available: {} {choices:?}", action.action_type);
                }
            }
        }
        JobState::Failed { reason, progress } => {
            println!("{}: failed at {progress}%: {reason}", job.prompt);
        }
        JobState::Pending { progress } => {
            println!("{}: still pending at {progress}%", job.prompt);
        }
    }
}

fn choice_from_env(key: &str) -> Option<u8> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(choice) => Some(choice),
        Err(e) => {
            tracing::warn!(key, value = %raw, error = %e, "Ignoring unparseable choice");
            None
        }
    }
}
