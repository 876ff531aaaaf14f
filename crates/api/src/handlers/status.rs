//! Handler for polling a job's status.
//!
//! Route:
//! - `GET /api/status?hash=...` -- fetch and relay the remote status

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use imagine_core::status::StatusReport;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    #[serde(default)]
    pub hash: Option<String>,
}

/// GET /api/status
///
/// `progress` is always a number in the response (0 when the service
/// omitted it).
pub async fn get_status(
    State(state): State<AppState>,
    query: Result<Query<StatusQuery>, QueryRejection>,
) -> AppResult<Json<StatusReport>> {
    let Query(query) = query?;

    let hash = query
        .hash
        .filter(|h| !h.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("Hash parameter is required".to_string()))?;

    let mut report = state.remote.status(&hash).await?;
    report.progress.get_or_insert(0.0);

    state.jobs.record_status(&hash, &report).await;

    Ok(Json(report))
}
