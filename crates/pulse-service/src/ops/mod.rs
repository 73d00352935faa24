//! Operational HTTP endpoints.
//!
//! - `/healthz` : liveness + frozen build identity
//! - `/version` : build identity for machines
//! - `/metrics` : Prometheus text format

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;

use crate::app_state::{AppState, SERVICE_NAME};

#[derive(Debug, Serialize)]
struct HealthBody<'a> {
    status: &'static str,
    commit: &'a str,
    #[serde(rename = "buildTime")]
    build_time: &'a str,
}

#[derive(Debug, Serialize)]
struct VersionBody<'a> {
    git_sha: &'a str,
    build_time: &'a str,
    service: &'static str,
}

pub async fn healthz(State(state): State<AppState>) -> Response {
    let id = state.identity();
    Json(HealthBody {
        status: "ok",
        commit: id.commit_sha(),
        build_time: id.build_time(),
    })
    .into_response()
}

pub async fn version(State(state): State<AppState>) -> Response {
    let id = state.identity();
    Json(VersionBody {
        git_sha: id.commit_sha(),
        build_time: id.build_time(),
        service: SERVICE_NAME,
    })
    .into_response()
}

/// Scrape failures get a bare 500; details stay in the server log.
pub async fn metrics(State(state): State<AppState>) -> Response {
    let exposition = state.exposition();
    match exposition.render() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, exposition.content_type())],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, kind = e.kind().as_str(), "failed to render metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "not found" }))).into_response()
}
