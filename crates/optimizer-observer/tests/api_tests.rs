//! Integration tests for the operator API endpoints.
//!
//! Tests use Axum's `Router` directly via `tower::ServiceExt` without
//! starting a TCP server. This validates handler logic, routing, and the
//! error-to-status mapping without needing a live network connection.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use optimizer_core::config::{OptimizerConfig, SyntheticConfig};
use optimizer_core::session::SessionController;
use optimizer_observer::router::build_router;
use optimizer_observer::state::AppState;
use serde_json::{Value, json};
use tower::ServiceExt;

fn make_controller() -> Arc<SessionController> {
    let config = OptimizerConfig {
        synthetic: SyntheticConfig {
            seed: Some(3),
            ..SyntheticConfig::default()
        },
        ..OptimizerConfig::default()
    };
    Arc::new(SessionController::from_config(&config).unwrap())
}

fn make_router() -> Router {
    build_router(Arc::new(AppState::new(make_controller())))
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    (status, body_to_json(response.into_body()).await)
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str) -> Request<Body> {
    Request::post(uri).body(Body::empty()).unwrap()
}

fn put_json(uri: &str, body: &Value) -> Request<Body> {
    Request::put(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_initial_session_is_unconfigured() {
    let router = make_router();

    let (status, json) = send(&router, get("/api/session")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["configured"], false);
    assert_eq!(json["can_load"], false);
    assert_eq!(json["can_run"], false);
    assert_eq!(json["run"]["status"], "Idle");
    assert_eq!(json["design_variables"], json!([]));
}

#[tokio::test]
async fn test_bypass_load_populates_variables() {
    let router = make_router();

    let (status, json) = send(&router, post("/api/configuration/bypass")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["configured"], true);
    assert_eq!(json["can_run"], true);
    assert_eq!(json["design_variables"].as_array().unwrap().len(), 6);
    assert_eq!(json["test_variables"][0]["name"], "temp_corner");
    assert_eq!(json["test_variables"][0]["min"], -40.0);
}

#[tokio::test]
async fn test_gated_load_without_inputs_is_conflict() {
    let router = make_router();

    let (status, json) = send(&router, post("/api/configuration/load")).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["status"], 409);
    assert_eq!(
        json["reasons"],
        json!(["select a simulator", "upload a circuit file"])
    );
}

#[tokio::test]
async fn test_gated_load_after_selection() {
    let router = make_router();

    let (status, json) = send(
        &router,
        put_json("/api/session/circuit-file", &json!({ "name": "amp.ocn" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["circuit_file"]["name"], "amp.ocn");
    assert_eq!(json["can_load"], false);

    let (status, json) = send(
        &router,
        put_json("/api/session/simulator", &json!({ "simulator": "PLECS" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["simulator"], "PLECS");
    assert_eq!(json["can_load"], true);

    let (status, json) = send(&router, post("/api/configuration/load")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["configured"], true);
    assert_eq!(json["can_run"], true);
}

#[tokio::test]
async fn test_clearing_selection() {
    let router = make_router();
    send(
        &router,
        put_json("/api/session/preconfig-file", &json!({ "name": "amp.yaml" })),
    )
    .await;

    let (status, json) = send(
        &router,
        put_json("/api/session/preconfig-file", &json!({ "name": null })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["preconfig_file"], Value::Null);
}

#[tokio::test]
async fn test_empty_file_name_is_bad_request() {
    let router = make_router();

    let (status, json) = send(
        &router,
        put_json("/api/session/circuit-file", &json!({ "name": "  " })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["status"], 400);
}

#[tokio::test]
async fn test_unknown_simulator_is_bad_request() {
    let router = make_router();

    let (status, _) = send(
        &router,
        put_json("/api/session/simulator", &json!({ "simulator": "Spice" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let router = make_router();
    let request = Request::put("/api/session/simulator")
        .header("content-type", "application/json")
        .body(Body::from("{ not json"))
        .unwrap();

    let (status, json) = send(&router, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().starts_with("invalid request"));
}

#[tokio::test]
async fn test_invalid_bound_blocks_run() {
    let router = make_router();
    send(&router, post("/api/configuration/bypass")).await;

    let (status, json) = send(
        &router,
        put_json(
            "/api/variables/design/0",
            &json!({ "field": "min", "value": 5.0 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["design_variables"][0]["min"], 5.0);
    assert_eq!(json["can_run"], false);

    let (status, json) = send(&router, post("/api/run")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(
        json["reasons"],
        json!(["fix invalid min/max ranges in design variables: v_bias_1"])
    );
}

#[tokio::test]
async fn test_cleared_bound_is_accepted() {
    let router = make_router();
    send(&router, post("/api/configuration/bypass")).await;

    let (status, json) = send(
        &router,
        put_json(
            "/api/variables/test/1",
            &json!({ "field": "max", "value": null }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["test_variables"][1]["max"], Value::Null);
    assert_eq!(json["can_run"], false);
}

#[tokio::test]
async fn test_variable_index_out_of_range_is_not_found() {
    let router = make_router();
    send(&router, post("/api/configuration/bypass")).await;

    let (status, json) = send(
        &router,
        put_json(
            "/api/variables/test/7",
            &json!({ "field": "min", "value": 1.0 }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["status"], 404);
}

#[tokio::test]
async fn test_unknown_variable_set_is_bad_request() {
    let router = make_router();
    send(&router, post("/api/configuration/bypass")).await;

    let (status, _) = send(
        &router,
        put_json(
            "/api/variables/corner/0",
            &json!({ "field": "min", "value": 1.0 }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_run_before_load_is_conflict() {
    let router = make_router();

    let (status, json) = send(&router, post("/api/run")).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["reasons"], json!(["load a configuration first"]));
}

#[tokio::test]
async fn test_run_lifecycle() {
    let router = make_router();
    send(&router, post("/api/configuration/bypass")).await;

    let (status, json) = send(&router, post("/api/run")).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let run_id = json["run_id"].as_str().unwrap().to_owned();

    let (status, json) = send(&router, post("/api/run")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "a simulation run is already in progress");

    let (_, json) = send(&router, get("/api/session")).await;
    assert_eq!(json["run"]["id"], run_id.as_str());
    assert_eq!(json["run"]["status"], "Running");
    assert_eq!(json["can_run"], false);

    let (status, json) = send(&router, post("/api/run/cancel")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["cancelled"], true);

    let (_, json) = send(&router, get("/api/session")).await;
    assert_eq!(json["run"]["status"], "Cancelled");
    assert_eq!(json["can_run"], true);
}

#[tokio::test]
async fn test_run_during_shutdown_is_unavailable() {
    let controller = make_controller();
    let router = build_router(Arc::new(AppState::new(Arc::clone(&controller))));
    send(&router, post("/api/configuration/bypass")).await;
    controller.shutdown().await;

    let (status, json) = send(&router, post("/api/run")).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["status"], 503);

    let (_, json) = send(&router, get("/api/session")).await;
    assert_eq!(json["run"]["status"], "Idle");
}

#[tokio::test]
async fn test_cancel_without_run() {
    let router = make_router();

    let (status, json) = send(&router, post("/api/run/cancel")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["cancelled"], false);
}

#[tokio::test]
async fn test_websocket_requires_upgrade() {
    let router = make_router();

    let response = router.oneshot(get("/ws/session")).await.unwrap();

    assert!(response.status().is_client_error());
}
