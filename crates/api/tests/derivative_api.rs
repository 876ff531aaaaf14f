//! Integration tests for `POST /api/upscale` and `POST /api/variation`.

mod common;

use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use common::{body_json, post_json, spawn_fake_remote, UNREACHABLE_REMOTE};
use imagine_core::job::JobKind;
use serde_json::{json, Value};

type Seen = Arc<Mutex<Vec<(String, Value)>>>;

/// Fake upscale/variation endpoints answering `status` + `reply` and
/// recording `(operation, body)`.
async fn derivative_fake(status: StatusCode, reply: Value) -> (String, Seen) {
    let seen: Seen = Arc::new(Mutex::new(Vec::new()));

    let handler = |operation: &'static str| {
        let reply = reply.clone();
        move |State(seen): State<Seen>, Json(body): Json<Value>| {
            let reply = reply.clone();
            async move {
                seen.lock().unwrap().push((operation.to_string(), body));
                (status, Json(reply))
            }
        }
    };

    let router = Router::new()
        .route("/midjourney/v2/upscale", post(handler("upscale")))
        .route("/midjourney/v2/variation", post(handler("variation")))
        .with_state(Arc::clone(&seen));
    (spawn_fake_remote(router).await, seen)
}

// ---------------------------------------------------------------------------
// Relaying
// ---------------------------------------------------------------------------

#[tokio::test]
async fn upscale_forwards_hash_and_choice() {
    let (remote, seen) = derivative_fake(StatusCode::OK, json!({ "hash": "child-1" })).await;
    let (app, jobs) = common::build_test_app(&remote);
    jobs.add("parent", "a lighthouse", JobKind::Original, None).await;

    let response = post_json(app, "/api/upscale", json!({ "hash": "parent", "choice": 2 })).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "hash": "child-1" }));

    let seen = seen.lock().unwrap();
    assert_eq!(seen[0].0, "upscale");
    assert_eq!(seen[0].1, json!({ "hash": "parent", "choice": 2 }));
}

#[tokio::test]
async fn successful_derivative_is_recorded_with_parent() {
    let (remote, _) = derivative_fake(StatusCode::OK, json!({ "hash": "child-2" })).await;
    let (app, jobs) = common::build_test_app(&remote);
    jobs.add("parent", "a lighthouse", JobKind::Original, None).await;

    post_json(app, "/api/variation", json!({ "hash": "parent", "choice": 3 })).await;

    let child = jobs.get("child-2").await.unwrap();
    assert_eq!(child.kind, JobKind::Variation);
    assert_eq!(child.parent_hash.as_deref(), Some("parent"));
    assert_eq!(child.prompt, "Variation 3 of \"a lighthouse\"");
}

#[tokio::test]
async fn upstream_status_and_body_are_relayed_verbatim() {
    let (remote, _) = derivative_fake(
        StatusCode::UNPROCESSABLE_ENTITY,
        json!({ "error": "Choice already upscaled" }),
    )
    .await;
    let (app, jobs) = common::build_test_app(&remote);

    let response = post_json(app, "/api/upscale", json!({ "hash": "parent", "choice": 1 })).await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body_json(response).await,
        json!({ "error": "Choice already upscaled" })
    );
    assert!(jobs.is_empty().await);
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_choice_returns_400() {
    let (app, _) = common::build_test_app(UNREACHABLE_REMOTE);

    let response = post_json(app, "/api/upscale", json!({ "hash": "parent" })).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "Hash and choice are required"
    );
}

#[tokio::test]
async fn zero_choice_returns_400() {
    let (app, _) = common::build_test_app(UNREACHABLE_REMOTE);

    let response = post_json(app, "/api/variation", json!({ "hash": "parent", "choice": 0 })).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "Hash and choice are required"
    );
}

#[tokio::test]
async fn missing_hash_returns_400() {
    let (app, _) = common::build_test_app(UNREACHABLE_REMOTE);

    let response = post_json(app, "/api/variation", json!({ "choice": 1 })).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn out_of_range_choice_is_rejected_without_calling_remote() {
    let (remote, seen) = derivative_fake(StatusCode::OK, json!({ "hash": "x" })).await;
    let (app, _) = common::build_test_app(&remote);

    let response = post_json(app, "/api/upscale", json!({ "hash": "parent", "choice": 5 })).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
    assert!(seen.lock().unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Transport failure
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unreachable_remote_returns_generic_message() {
    let (app, _) = common::build_test_app(UNREACHABLE_REMOTE);

    let response = post_json(app, "/api/variation", json!({ "hash": "parent", "choice": 4 })).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(response).await["error"],
        "Failed to process variation request"
    );
}
