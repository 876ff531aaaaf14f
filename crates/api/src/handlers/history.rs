use axum::extract::State;
use axum::Json;

use crate::job_store::JobRecord;
use crate::state::AppState;

/// GET /api/history
///
/// Every job the proxy has recorded, newest first.
pub async fn list_history(State(state): State<AppState>) -> Json<Vec<JobRecord>> {
    Json(state.jobs.list().await)
}
