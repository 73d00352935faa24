//! Axum router wiring.
//!
//! Ops endpoints at the root, the API under `/api/v1`, a JSON 404 fallback,
//! and the middleware stack described in [`crate::middleware`].

use std::any::Any;

use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tower_http::catch_panic::CatchPanicLayer;

use crate::{api, app_state::AppState, middleware::instrument, middleware::security, ops};

/// Largest accepted request body (JSON API bodies).
pub const BODY_LIMIT_BYTES: usize = 100 * 1024;

pub fn build_router(state: AppState) -> Router {
    let router = Router::new()
        .route("/healthz", get(ops::healthz))
        .route("/version", get(ops::version))
        .route("/metrics", get(ops::metrics))
        .nest("/api/v1", api::router())
        .fallback(ops::not_found)
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(CatchPanicLayer::custom(panic_response));

    security::apply(router)
        .layer(middleware::from_fn_with_state(state.clone(), instrument))
        .with_state(state)
}

/// Turn a handler panic into a bare 500 so it is measured like any other response.
fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let msg = if let Some(s) = err.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    };
    tracing::error!(panic = %msg, "handler panicked");
    StatusCode::INTERNAL_SERVER_ERROR.into_response()
}
