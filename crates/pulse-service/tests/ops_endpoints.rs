//! `/healthz`, `/version`, and `/metrics` through the full middleware stack.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod common;

use std::sync::Arc;

use axum::http::{header, StatusCode};
use chrono::DateTime;

use pulse_core::env::MapEnv;
use pulse_core::identity::{ENV_BUILD_TIME, ENV_GIT_SHA};
use pulse_core::BuildIdentity;
use pulse_service::app_state::AppState;
use pulse_service::obs::PROMETHEUS_CONTENT_TYPE;

use common::*;

#[tokio::test]
async fn healthz_reports_identity_frozen_at_startup() {
    let mut env = MapEnv::new().with(ENV_GIT_SHA, "abc123");
    let state = AppState::new(BuildIdentity::resolve(&env));
    let app = app(&state);

    let resp = send(&app, get_req("/healthz")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/json"
    );
    let first = body_json(resp).await;
    assert_eq!(first["status"], "ok");
    assert_eq!(first["commit"], "abc123");
    let build_time = first["buildTime"].as_str().unwrap().to_string();
    assert!(DateTime::parse_from_rfc3339(&build_time).is_ok());

    env.set(ENV_GIT_SHA, "def456");
    env.set(ENV_BUILD_TIME, "2030-01-01T00:00:00Z");
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;

    for _ in 0..5 {
        let again = body_json(send(&app, get_req("/healthz")).await).await;
        assert_eq!(again, first);
    }
}

#[tokio::test]
async fn healthz_defaults_without_env() {
    let state = AppState::new(BuildIdentity::resolve(&MapEnv::new()));
    let body = body_json(send(&app(&state), get_req("/healthz")).await).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["commit"], "unknown");
    assert_eq!(body["buildTime"], state.identity().build_time());
}

#[tokio::test]
async fn version_has_machine_shape() {
    let state = AppState::new(identity());
    let resp = send(&app(&state), get_req("/version")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(
        body,
        serde_json::json!({
            "git_sha": "abc123",
            "build_time": "2024-05-01T12:30:00.000Z",
            "service": "pulse"
        })
    );
}

#[tokio::test]
async fn metrics_counts_healthz_and_unmatched() {
    let state = AppState::new(identity());
    let app = app(&state);

    for _ in 0..3 {
        assert_eq!(send(&app, get_req("/healthz")).await.status(), StatusCode::OK);
    }
    assert_eq!(
        send(&app, get_req("/does/not/exist")).await.status(),
        StatusCode::NOT_FOUND
    );

    let resp = send(&app, get_req("/metrics")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get(header::CONTENT_TYPE).unwrap(),
        PROMETHEUS_CONTENT_TYPE
    );
    let text = body_text(resp).await;
    assert!(text.contains(r#"http_requests_total{method="GET",route="/healthz",status="200"} 3"#));
    assert!(text.contains(r#"http_requests_total{method="GET",route="unmatched",status="404"} 1"#));
    assert!(text.contains(
        r#"pulse_build_info{build_time="2024-05-01T12:30:00.000Z",git_sha="abc123",service="pulse"} 1"#
    ));
    assert!(!text.contains("/does/not/exist"));
}

#[tokio::test]
async fn failing_renderer_yields_empty_500_and_service_survives() {
    let state = state_with(Arc::new(FailingExposition));
    let app = app(&state);

    let resp = send(&app, get_req("/metrics")).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body_bytes(resp).await.is_empty());

    let resp = send(&app, get_req("/healthz")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["commit"], "abc123");

    assert_eq!(state.metrics().request_count("GET", "/metrics", 500), 1);
    assert_eq!(state.metrics().request_count("GET", "/healthz", 200), 1);
}

#[tokio::test]
async fn panicking_renderer_is_contained() {
    let state = state_with(Arc::new(PanickingExposition));
    let app = app(&state);

    let resp = send(&app, get_req("/metrics")).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body_bytes(resp).await.is_empty());

    assert_eq!(send(&app, get_req("/healthz")).await.status(), StatusCode::OK);
    assert_eq!(state.metrics().request_count("GET", "/metrics", 500), 1);
    assert_eq!(
        state.metrics().in_flight.get(&[("method", "GET")]),
        Some(0)
    );
}
