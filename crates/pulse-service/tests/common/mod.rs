//! Shared helpers for driving the assembled router in-memory.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use tower::ServiceExt; // .oneshot()

use pulse_core::error::{PulseError, Result};
use pulse_core::BuildIdentity;
use pulse_service::app_state::AppState;
use pulse_service::obs::{Exposition, MetricsRegistry, PROMETHEUS_CONTENT_TYPE};
use pulse_service::router::build_router;

pub fn identity() -> BuildIdentity {
    BuildIdentity::new("abc123", "2024-05-01T12:30:00.000Z")
}

pub fn app(state: &AppState) -> Router {
    build_router(state.clone())
}

pub fn get_req(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn json_post(uri: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap()
}

pub async fn send(app: &Router, req: Request<Body>) -> Response {
    app.clone().oneshot(req).await.unwrap()
}

pub async fn body_bytes(resp: Response) -> Vec<u8> {
    to_bytes(resp.into_body(), 1024 * 1024).await.unwrap().to_vec()
}

pub async fn body_json(resp: Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(resp).await).unwrap()
}

pub async fn body_text(resp: Response) -> String {
    String::from_utf8(body_bytes(resp).await).unwrap()
}

/// Renderer that always reports a formatting failure.
pub struct FailingExposition;

impl Exposition for FailingExposition {
    fn content_type(&self) -> &'static str {
        PROMETHEUS_CONTENT_TYPE
    }

    fn render(&self) -> Result<String> {
        Err(PulseError::Exposition("renderer failed".into()))
    }
}

/// Renderer that panics mid-scrape.
pub struct PanickingExposition;

impl Exposition for PanickingExposition {
    fn content_type(&self) -> &'static str {
        PROMETHEUS_CONTENT_TYPE
    }

    fn render(&self) -> Result<String> {
        panic!("renderer exploded")
    }
}

pub fn state_with(exposition: Arc<dyn Exposition>) -> AppState {
    AppState::with_exposition(identity(), Arc::new(MetricsRegistry::new()), exposition)
}
