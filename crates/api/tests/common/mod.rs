#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use imagine_api::config::ServerConfig;
use imagine_api::job_store::JobStore;
use imagine_api::router::build_app_router;
use imagine_api::state::AppState;
use imagine_remote::{RemoteApi, RemoteConfig};

/// A base URL nothing listens on. Handlers that validate input before
/// calling out never reach it.
pub const UNREACHABLE_REMOTE: &str = "http://127.0.0.1:9";

/// Build a test `ServerConfig` pointing the remote client at `remote_url`.
///
/// Uses `http://localhost:5173` as CORS origin (matching the dev default)
/// and a 30-second request timeout.
pub fn test_config(remote_url: &str) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        job_retention_hours: 24,
        job_sweep_interval_secs: 3600,
        remote: RemoteConfig {
            base_url: remote_url.to_string(),
            api_key: "test-key-1234".to_string(),
            process_mode: "relax".to_string(),
            default_aspect_ratio: "1:1".to_string(),
        },
    }
}

/// Build the full application router with all middleware layers.
///
/// Uses the same `build_app_router` as `main.rs`, so tests exercise the
/// production middleware stack. The job store is returned so tests can
/// seed and inspect it.
pub fn build_test_app(remote_url: &str) -> (Router, Arc<JobStore>) {
    let config = test_config(remote_url);
    let jobs = Arc::new(JobStore::new());

    let state = AppState {
        config: Arc::new(config.clone()),
        remote: Arc::new(RemoteApi::new(config.remote.clone())),
        jobs: Arc::clone(&jobs),
    };

    (build_app_router(state, &config), jobs)
}

/// Serve `router` on an ephemeral local port and return its base URL.
///
/// Used to stand in for the remote generation service.
pub async fn spawn_fake_remote(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

pub async fn get(app: Router, uri: &str) -> Response {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_raw(app: Router, uri: &str, body: &'static str) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
