//! Handlers for follow-on operations on a finished grid.
//!
//! Routes:
//! - `POST /api/upscale`   -- upscale one image of a grid
//! - `POST /api/variation` -- generate variations of one image of a grid
//!
//! Both relay the remote status code and body verbatim.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use imagine_core::job::{derivative_prompt, Choice, DerivativeKind};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DerivativeRequest {
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default)]
    pub choice: Option<u8>,
}

/// POST /api/upscale
pub async fn upscale(
    State(state): State<AppState>,
    payload: Result<Json<DerivativeRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    relay_derivative(&state, DerivativeKind::Upscale, payload).await
}

/// POST /api/variation
pub async fn variation(
    State(state): State<AppState>,
    payload: Result<Json<DerivativeRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    relay_derivative(&state, DerivativeKind::Variation, payload).await
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

async fn relay_derivative(
    state: &AppState,
    kind: DerivativeKind,
    payload: Result<Json<DerivativeRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let Json(input) = payload?;

    let hash = input.hash.filter(|h| !h.trim().is_empty());
    let choice = input.choice.filter(|c| *c != 0);
    let (Some(parent_hash), Some(choice)) = (hash, choice) else {
        return Err(AppError::BadRequest(
            "Hash and choice are required".to_string(),
        ));
    };
    let choice = Choice::new(choice)?;

    let relayed = state
        .remote
        .derive(kind, &parent_hash, choice)
        .await
        .map_err(|e| {
            tracing::error!(
                kind = kind.as_str(),
                hash = %parent_hash,
                error = %e,
                "Derivative request failed",
            );
            AppError::Upstream(format!("Failed to process {} request", kind.as_str()))
        })?;

    let status = StatusCode::from_u16(relayed.status).unwrap_or(StatusCode::BAD_GATEWAY);

    if status.is_success() {
        if let Some(child_hash) = relayed.hash() {
            let parent_prompt = state
                .jobs
                .get(&parent_hash)
                .await
                .map(|record| record.prompt)
                .unwrap_or_else(|| parent_hash.clone());
            state
                .jobs
                .add(
                    child_hash,
                    &derivative_prompt(kind, choice, &parent_prompt),
                    kind.job_kind(),
                    Some(&parent_hash),
                )
                .await;
        }
    }

    tracing::info!(
        kind = kind.as_str(),
        hash = %parent_hash,
        %choice,
        status = status.as_u16(),
        "Relayed derivative response",
    );

    Ok((status, Json(relayed.body)))
}
