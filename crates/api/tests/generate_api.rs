//! Integration tests for `POST /api/generate`.

mod common;

use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use common::{body_json, post_json, post_raw, spawn_fake_remote, UNREACHABLE_REMOTE};
use imagine_core::job::JobKind;
use imagine_core::status::RemoteStatus;
use serde_json::{json, Value};

type Seen = Arc<Mutex<Vec<(HeaderMap, Value)>>>;

/// Fake imagine endpoint that records each request and answers with
/// `reply`.
async fn imagine_fake(status: StatusCode, reply: Value) -> (String, Seen) {
    let seen: Seen = Arc::new(Mutex::new(Vec::new()));
    let router = Router::new()
        .route(
            "/midjourney/v2/imagine",
            post(
                move |State(seen): State<Seen>, headers: HeaderMap, Json(body): Json<Value>| {
                    let reply = reply.clone();
                    async move {
                        seen.lock().unwrap().push((headers, body));
                        (status, Json(reply))
                    }
                },
            ),
        )
        .with_state(Arc::clone(&seen));
    (spawn_fake_remote(router).await, seen)
}

// ---------------------------------------------------------------------------
// Success
// ---------------------------------------------------------------------------

#[tokio::test]
async fn generate_returns_task_id_and_hash() {
    let (remote, seen) = imagine_fake(StatusCode::OK, json!({ "hash": "abc123" })).await;
    let (app, jobs) = common::build_test_app(&remote);

    let response = post_json(app, "/api/generate", json!({ "prompt": "a red fox --ar 16:9" })).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json, json!({ "taskId": "abc123", "hash": "abc123" }));

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    let (headers, body) = &seen[0];
    assert_eq!(headers.get("api-key").unwrap(), "test-key-1234");
    assert_eq!(body["prompt"], "a red fox --ar 16:9");
    assert_eq!(body["process_mode"], "relax");

    let record = jobs.get("abc123").await.unwrap();
    assert_eq!(record.prompt, "a red fox --ar 16:9");
    assert_eq!(record.kind, JobKind::Original);
    assert_eq!(record.status, RemoteStatus::Sent);
}

#[tokio::test]
async fn generate_trims_prompt_before_forwarding() {
    let (remote, seen) = imagine_fake(StatusCode::OK, json!({ "hash": "h" })).await;
    let (app, _) = common::build_test_app(&remote);

    let response = post_json(app, "/api/generate", json!({ "prompt": "  a castle \n" })).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(seen.lock().unwrap()[0].1["prompt"], "a castle");
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_prompt_returns_400() {
    let (app, jobs) = common::build_test_app(UNREACHABLE_REMOTE);

    let response = post_json(app, "/api/generate", json!({})).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Prompt is required");
    assert!(jobs.is_empty().await);
}

#[tokio::test]
async fn whitespace_prompt_returns_400() {
    let (app, _) = common::build_test_app(UNREACHABLE_REMOTE);

    let response = post_json(app, "/api/generate", json!({ "prompt": "   " })).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Prompt is required");
}

#[tokio::test]
async fn malformed_json_returns_400() {
    let (app, _) = common::build_test_app(UNREACHABLE_REMOTE);

    let response = post_raw(app, "/api/generate", "{not json").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "BAD_REQUEST");
}

// ---------------------------------------------------------------------------
// Upstream failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn upstream_error_message_is_relayed_as_500() {
    let (remote, _) = imagine_fake(
        StatusCode::PAYMENT_REQUIRED,
        json!({ "error": "Insufficient credits" }),
    )
    .await;
    let (app, jobs) = common::build_test_app(&remote);

    let response = post_json(app, "/api/generate", json!({ "prompt": "a cat" })).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["error"], "API request failed: Insufficient credits");
    assert_eq!(json["code"], "UPSTREAM_ERROR");
    assert!(jobs.is_empty().await);
}

#[tokio::test]
async fn upstream_response_without_hash_returns_500() {
    let (remote, _) = imagine_fake(StatusCode::OK, json!({ "queued": true })).await;
    let (app, _) = common::build_test_app(&remote);

    let response = post_json(app, "/api/generate", json!({ "prompt": "a cat" })).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(response).await["error"],
        "Invalid API response: missing hash"
    );
}

#[tokio::test]
async fn upstream_non_json_body_returns_500() {
    let router = Router::new().route(
        "/midjourney/v2/imagine",
        post(|| async { "<html>maintenance</html>" }),
    );
    let remote = spawn_fake_remote(router).await;
    let (app, _) = common::build_test_app(&remote);

    let response = post_json(app, "/api/generate", json!({ "prompt": "a cat" })).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(response).await["error"],
        "Invalid JSON response from API"
    );
}
