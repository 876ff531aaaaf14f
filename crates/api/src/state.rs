use std::sync::Arc;

use imagine_remote::RemoteApi;

use crate::config::ServerConfig;
use crate::job_store::JobStore;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    /// Client for the remote generation service.
    pub remote: Arc<RemoteApi>,
    /// Server-side record of every job that passed through the proxy.
    pub jobs: Arc<JobStore>,
}
