//! Route tables.
//!
//! ```text
//! GET  /health              health::router
//!
//! POST /api/generate        generate
//! GET  /api/status          get_status
//! POST /api/upscale         upscale
//! POST /api/variation       variation
//! GET  /api/history         list_history
//! ```

pub mod health;

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{derivative, generate, history, status};
use crate::state::AppState;

/// Routes nested under `/api`.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/generate", post(generate::generate))
        .route("/status", get(status::get_status))
        .route("/upscale", post(derivative::upscale))
        .route("/variation", post(derivative::variation))
        .route("/history", get(history::list_history))
}
