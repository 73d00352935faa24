//! Request instrumentation.
//!
//! Responsibilities:
//! - Start a timer and a request-scoped span (method, path, request id)
//! - Resolve the matched route *pattern* for metric labels
//! - On completion: record into `MetricsRegistry` and emit one access log line
//!
//! Completion is owned by a [`Completion`] guard. `finish` consumes it, and
//! `Drop` covers the case where the request future is dropped before a
//! response exists (client went away). Either way the outcome is recorded
//! exactly once.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{MatchedPath, Request, State},
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use tracing::{Instrument, Level};
use uuid::Uuid;

use pulse_core::identity::iso8601;

use crate::app_state::AppState;
use crate::obs::MetricsRegistry;

/// Route label used when the router matched nothing (404 fallback).
pub const UNMATCHED_ROUTE: &str = "unmatched";
/// Log target of the per-request line.
pub const ACCESS_TARGET: &str = "pulse_service::access";
/// Correlation header read from requests and echoed on responses.
pub const X_REQUEST_ID: &str = "x-request-id";
/// Method label for anything outside [`STANDARD_METHODS`].
pub const OTHER_METHOD: &str = "other";
/// Methods that keep their own metric label.
pub const STANDARD_METHODS: [&str; 9] = [
    "GET", "HEAD", "POST", "PUT", "DELETE", "CONNECT", "OPTIONS", "TRACE", "PATCH",
];

/// Status recorded when the client disconnects before a response is produced.
const CLIENT_CLOSED_REQUEST: u16 = 499;
const MAX_REQUEST_ID_LEN: usize = 128;

/// Correlation id, available to handlers via request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

/// Bounded metric label for a request method.
pub fn method_label(method: &str) -> &'static str {
    STANDARD_METHODS
        .iter()
        .copied()
        .find(|m| *m == method)
        .unwrap_or(OTHER_METHOD)
}

/// Reuse a caller-supplied id when it is printable and short, otherwise mint one.
fn request_id_from(headers: &HeaderMap) -> String {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty() && s.len() <= MAX_REQUEST_ID_LEN)
        .filter(|s| s.bytes().all(|b| b.is_ascii_graphic()))
        .map(str::to_owned)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

macro_rules! access_log {
    ($level:expr, $c:expr, $status:expr, $duration_ms:expr, $ts:expr) => {
        tracing::event!(
            target: ACCESS_TARGET,
            $level,
            method = %$c.method,
            path = %$c.path,
            route = %$c.route,
            status = $status,
            duration_ms = $duration_ms,
            request_id = %$c.request_id,
            timestamp = %$ts,
            "request completed"
        )
    };
}

/// Single-fire completion hook for one request.
pub struct Completion {
    metrics: Arc<MetricsRegistry>,
    method: String,
    method_label: &'static str,
    path: String,
    route: String,
    request_id: String,
    started: Instant,
    done: bool,
}

impl Completion {
    /// Start timing and count the request as in flight.
    pub fn start(
        metrics: Arc<MetricsRegistry>,
        method: impl Into<String>,
        path: impl Into<String>,
        route: impl Into<String>,
        request_id: impl Into<String>,
    ) -> Self {
        let method = method.into();
        let label = method_label(&method);
        metrics.request_started(label);
        Self {
            metrics,
            method,
            method_label: label,
            path: path.into(),
            route: route.into(),
            request_id: request_id.into(),
            started: Instant::now(),
            done: false,
        }
    }

    /// Record the terminal status.
    pub fn finish(mut self, status: u16) {
        self.complete(status);
    }

    fn complete(&mut self, status: u16) {
        if self.done {
            return;
        }
        self.done = true;

        let elapsed = self.started.elapsed();
        self.metrics.request_ended(self.method_label);

        // Recording problems are logged, never surfaced to the client.
        if let Err(e) = self
            .metrics
            .record_request(self.method_label, &self.route, status, elapsed)
        {
            tracing::warn!(
                error = %e,
                kind = e.kind().as_str(),
                method = %self.method,
                route = %self.route,
                "failed to record request metrics"
            );
        }

        let duration_ms = elapsed.as_secs_f64() * 1000.0;
        let ts = iso8601(Utc::now());
        match status {
            500.. => access_log!(Level::ERROR, self, status, duration_ms, ts),
            400..=499 => access_log!(Level::WARN, self, status, duration_ms, ts),
            _ => access_log!(Level::INFO, self, status, duration_ms, ts),
        }
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        if !self.done {
            self.complete(CLIENT_CLOSED_REQUEST);
        }
    }
}

/// Outermost middleware; install with `axum::middleware::from_fn_with_state`.
pub async fn instrument(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED_ROUTE.to_string());
    let request_id = request_id_from(request.headers());

    request
        .extensions_mut()
        .insert(RequestId(request_id.clone()));

    let span = tracing::info_span!(
        "request",
        method = %method,
        path = %path,
        request_id = %request_id
    );
    let completion = Completion::start(state.metrics(), method, path, route, request_id.clone());

    let mut response = next.run(request).instrument(span).await;
    completion.finish(response.status().as_u16());

    if let Ok(v) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(X_REQUEST_ID, v);
    }
    response
}
