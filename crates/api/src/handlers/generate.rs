//! Handler for submitting a new generation.
//!
//! Route:
//! - `POST /api/generate` -- forward a prompt to the imagine endpoint

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use imagine_core::job::JobKind;
use imagine_core::prompt;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub prompt: Option<String>,
}

/// `taskId` mirrors `hash`; the service issues a single handle.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub task_id: String,
    pub hash: String,
}

/// POST /api/generate
pub async fn generate(
    State(state): State<AppState>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> AppResult<Json<GenerateResponse>> {
    let Json(input) = payload?;

    let prompt = input
        .prompt
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::BadRequest("Prompt is required".to_string()))?;

    let parsed = prompt::parse(prompt);
    tracing::info!(
        base_prompt = %parsed.base_prompt,
        commands = ?parsed.commands,
        "Submitting generation",
    );

    let response = state.remote.imagine(prompt).await?;
    state
        .jobs
        .add(&response.hash, prompt, JobKind::Original, None)
        .await;

    Ok(Json(GenerateResponse {
        task_id: response.hash.clone(),
        hash: response.hash,
    }))
}
